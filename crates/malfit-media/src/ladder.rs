//! Audio extraction fallback ladder.
//!
//! Tiers are tried in order and the first one that both exits cleanly and
//! leaves its output file behind wins. Candidates live next to the source so
//! they share its lifetime and cleanup.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::command::{tail_chars, FfmpegCommand, FfmpegRunner, STDERR_TAIL_CHARS};
use crate::error::{MediaError, MediaResult};
use crate::probe::MediaProber;

/// One rung of the extraction ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LadderTier {
    /// Stream copy of the existing audio track into `{stem}.m4a`
    Copy,
    /// AAC re-encode, 192k 44.1kHz stereo, into `{stem}_aac.m4a`
    Aac,
    /// 16kHz mono PCM into `{stem}.wav`
    Wav,
}

impl LadderTier {
    /// Tiers in the order they are attempted.
    pub const ALL: [LadderTier; 3] = [LadderTier::Copy, LadderTier::Aac, LadderTier::Wav];

    pub fn label(&self) -> &'static str {
        match self {
            LadderTier::Copy => "copy",
            LadderTier::Aac => "aac",
            LadderTier::Wav => "wav",
        }
    }

    /// Where this tier writes for the given source.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match self {
            LadderTier::Copy => format!("{stem}.m4a"),
            LadderTier::Aac => format!("{stem}_aac.m4a"),
            LadderTier::Wav => format!("{stem}.wav"),
        };
        source.with_file_name(name)
    }

    /// The ffmpeg invocation for this tier.
    pub fn command(&self, source: &Path, output: &Path) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(source, output).no_video();
        match self {
            LadderTier::Copy => cmd.audio_codec("copy"),
            LadderTier::Aac => cmd
                .audio_codec("aac")
                .audio_bitrate("192k")
                .sample_rate(44_100)
                .channels(2),
            LadderTier::Wav => cmd
                .output_arg("-acodec")
                .output_arg("pcm_s16le")
                .sample_rate(16_000)
                .channels(1),
        }
    }
}

impl fmt::Display for LadderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every path the ladder may write for `source`.
pub fn audio_candidates(source: &Path) -> Vec<PathBuf> {
    LadderTier::ALL
        .iter()
        .map(|tier| tier.output_path(source))
        .collect()
}

/// Executes a single tier.
#[async_trait]
pub trait TierRunner: Send + Sync {
    async fn run_tier(&self, tier: LadderTier, source: &Path, output: &Path) -> MediaResult<()>;
}

/// [`TierRunner`] that shells out to ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTierRunner {
    runner: FfmpegRunner,
}

impl FfmpegTierRunner {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl TierRunner for FfmpegTierRunner {
    async fn run_tier(&self, tier: LadderTier, source: &Path, output: &Path) -> MediaResult<()> {
        self.runner.run(&tier.command(source, output)).await
    }
}

/// Audio produced by a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAudio {
    pub path: PathBuf,
    pub tier: LadderTier,
}

/// Pulls an audio file out of a source video.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, source: &Path) -> MediaResult<ExtractedAudio>;

    /// Every derived file `extract` may leave behind for `source`.
    fn candidates(&self, source: &Path) -> Vec<PathBuf>;
}

/// Three-tier ladder guarded by an audio-stream precondition.
#[derive(Clone)]
pub struct LadderExtractor {
    prober: Arc<dyn MediaProber>,
    runner: Arc<dyn TierRunner>,
}

impl LadderExtractor {
    pub fn new(prober: Arc<dyn MediaProber>, runner: Arc<dyn TierRunner>) -> Self {
        Self { prober, runner }
    }
}

#[async_trait]
impl AudioExtractor for LadderExtractor {
    async fn extract(&self, source: &Path) -> MediaResult<ExtractedAudio> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }
        if !self.prober.has_audio(source).await? {
            return Err(MediaError::NoAudioStream(source.to_path_buf()));
        }

        let mut failures = Vec::with_capacity(LadderTier::ALL.len());
        for tier in LadderTier::ALL {
            let output = tier.output_path(source);
            debug!(tier = %tier, output = %output.display(), "Trying extraction tier");

            let detail = match self.runner.run_tier(tier, source, &output).await {
                Ok(()) if output.exists() => {
                    info!(tier = %tier, output = %output.display(), "Audio extracted");
                    return Ok(ExtractedAudio { path: output, tier });
                }
                Ok(()) => "exited successfully but wrote no output".to_string(),
                Err(e) => e.stderr().map(str::to_string).unwrap_or_else(|| e.to_string()),
            };

            warn!(tier = %tier, "Extraction tier failed");
            failures.push(format!(
                "[{}] {}",
                tier,
                tail_chars(detail.trim_end(), STDERR_TAIL_CHARS)
            ));
        }

        Err(MediaError::extraction_failed(failures.join("\n")))
    }

    fn candidates(&self, source: &Path) -> Vec<PathBuf> {
        audio_candidates(source)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    struct FixedProber(bool);

    #[async_trait]
    impl MediaProber for FixedProber {
        async fn has_audio(&self, _path: &Path) -> MediaResult<bool> {
            Ok(self.0)
        }
        async fn duration(&self, _path: &Path) -> MediaResult<f64> {
            Ok(10.0)
        }
    }

    /// Succeeds at `winner` (writing the output), fails every earlier tier.
    struct ScriptedRunner {
        winner: Option<LadderTier>,
        calls: Mutex<Vec<LadderTier>>,
    }

    impl ScriptedRunner {
        fn new(winner: Option<LadderTier>) -> Arc<Self> {
            Arc::new(Self {
                winner,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<LadderTier> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TierRunner for ScriptedRunner {
        async fn run_tier(&self, tier: LadderTier, _source: &Path, output: &Path) -> MediaResult<()> {
            self.calls.lock().unwrap().push(tier);
            if Some(tier) == self.winner {
                std::fs::write(output, b"audio")?;
                Ok(())
            } else {
                Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with non-zero status",
                    Some(format!("{} stderr", tier)),
                    Some(1),
                ))
            }
        }
    }

    fn source_in(dir: &TempDir) -> PathBuf {
        let source = dir.path().join("job-1.mp4");
        std::fs::write(&source, b"video").unwrap();
        source
    }

    fn extractor(has_audio: bool, runner: Arc<ScriptedRunner>) -> LadderExtractor {
        LadderExtractor::new(Arc::new(FixedProber(has_audio)), runner)
    }

    #[test]
    fn test_candidate_paths() {
        let source = Path::new("/work/uploads/abc.mov");
        assert_eq!(
            audio_candidates(source),
            vec![
                PathBuf::from("/work/uploads/abc.m4a"),
                PathBuf::from("/work/uploads/abc_aac.m4a"),
                PathBuf::from("/work/uploads/abc.wav"),
            ]
        );
    }

    #[test]
    fn test_tier_arguments() {
        let source = Path::new("in.mp4");
        let copy = LadderTier::Copy.command(source, Path::new("in.m4a")).build_args();
        assert!(copy.ends_with(&["-vn", "-c:a", "copy", "in.m4a"].map(String::from)));

        let wav = LadderTier::Wav.command(source, Path::new("in.wav")).build_args();
        assert!(wav.ends_with(
            &["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1", "in.wav"].map(String::from)
        ));
    }

    #[tokio::test]
    async fn test_first_tier_wins() {
        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        let runner = ScriptedRunner::new(Some(LadderTier::Copy));

        let audio = extractor(true, runner.clone()).extract(&source).await.unwrap();
        assert_eq!(audio.tier, LadderTier::Copy);
        assert_eq!(audio.path, dir.path().join("job-1.m4a"));
        assert_eq!(runner.calls(), vec![LadderTier::Copy]);
    }

    #[tokio::test]
    async fn test_falls_through_to_aac() {
        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        let runner = ScriptedRunner::new(Some(LadderTier::Aac));

        let audio = extractor(true, runner.clone()).extract(&source).await.unwrap();
        assert_eq!(audio.tier, LadderTier::Aac);
        assert_eq!(audio.path, dir.path().join("job-1_aac.m4a"));
        assert_eq!(runner.calls(), vec![LadderTier::Copy, LadderTier::Aac]);
    }

    #[tokio::test]
    async fn test_falls_through_to_wav() {
        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        let runner = ScriptedRunner::new(Some(LadderTier::Wav));

        let audio = extractor(true, runner.clone()).extract(&source).await.unwrap();
        assert_eq!(audio.tier, LadderTier::Wav);
        assert_eq!(runner.calls(), LadderTier::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_all_tiers_fail_with_labelled_diagnostic() {
        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        let runner = ScriptedRunner::new(None);

        let err = extractor(true, runner.clone()).extract(&source).await.unwrap_err();
        let MediaError::ExtractionFailed { diagnostic } = err else {
            panic!("expected extraction failure");
        };
        assert_eq!(
            diagnostic,
            "[copy] copy stderr\n[aac] aac stderr\n[wav] wav stderr"
        );
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_clean_exit_without_output_is_failure() {
        struct SilentRunner;

        #[async_trait]
        impl TierRunner for SilentRunner {
            async fn run_tier(&self, _: LadderTier, _: &Path, _: &Path) -> MediaResult<()> {
                Ok(())
            }
        }

        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        let extractor = LadderExtractor::new(Arc::new(FixedProber(true)), Arc::new(SilentRunner));

        let err = extractor.extract(&source).await.unwrap_err();
        assert!(err.to_string().contains("[wav] exited successfully but wrote no output"));
    }

    #[tokio::test]
    async fn test_long_stderr_is_truncated_per_tier() {
        struct NoisyRunner;

        #[async_trait]
        impl TierRunner for NoisyRunner {
            async fn run_tier(&self, _: LadderTier, _: &Path, _: &Path) -> MediaResult<()> {
                Err(MediaError::ffmpeg_failed("boom", Some("x".repeat(5000)), Some(1)))
            }
        }

        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        let extractor = LadderExtractor::new(Arc::new(FixedProber(true)), Arc::new(NoisyRunner));

        let MediaError::ExtractionFailed { diagnostic } = extractor.extract(&source).await.unwrap_err()
        else {
            panic!("expected extraction failure");
        };
        for line in diagnostic.lines() {
            assert!(line.chars().count() <= "[copy] ".len() + STDERR_TAIL_CHARS);
        }
    }

    #[tokio::test]
    async fn test_no_audio_short_circuits() {
        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        let runner = ScriptedRunner::new(Some(LadderTier::Copy));

        let err = extractor(false, runner.clone()).extract(&source).await.unwrap_err();
        assert!(matches!(err, MediaError::NoAudioStream(_)));
        assert!(err.is_input_error());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new(Some(LadderTier::Copy));

        let err = extractor(true, runner.clone())
            .extract(&dir.path().join("gone.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
        assert!(runner.calls().is_empty());
    }
}
