//! Shared harness: in-memory queue/store plus scripted media and AI fakes.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use malfit_ai::{AiError, AiResult, SpeechToText, TextGenerator};
use malfit_media::{LadderExtractor, LadderTier, MediaError, MediaProber, MediaResult, TierRunner};
use malfit_models::{JobId, JobRecord, JobUpdate};
use malfit_queue::{Intake, JobStore, MemoryJobStore, MemoryQueue, QueueResult, WorkQueue};
use malfit_worker::{ArtifactWriter, JobOutcome, JobPipeline, Stages, WorkerConfig};

pub const TRANSCRIPT: &str = "1\n00:00:00,000 --> 00:00:04,000\n오늘은 날씨가 좋네요\n\n2\n00:00:04,000 --> 00:00:10,000\n산책하러 갑시다\n";
pub const REWRITTEN: &str = "1\n00:00:00,000 --> 00:00:04,000\n날씨가 참 맑은 하루예요\n\n2\n00:00:04,000 --> 00:00:10,000\n같이 걸으러 나가요\n";
pub const VOICEOVER: &str = "날씨가 참 맑은 하루예요. 같이 걸으러 나가요.";

pub struct FakeProber {
    pub has_audio: bool,
    pub duration: Option<f64>,
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn has_audio(&self, _path: &Path) -> MediaResult<bool> {
        Ok(self.has_audio)
    }

    async fn duration(&self, path: &Path) -> MediaResult<f64> {
        self.duration.ok_or_else(|| MediaError::FfprobeFailed {
            message: format!("cannot read {}", path.display()),
            stderr: None,
        })
    }
}

/// Fails every tier before `winner`; the winner writes its output file.
pub struct ScriptedTierRunner {
    pub winner: Option<LadderTier>,
    pub calls: Mutex<Vec<LadderTier>>,
}

#[async_trait]
impl TierRunner for ScriptedTierRunner {
    async fn run_tier(&self, tier: LadderTier, _source: &Path, output: &Path) -> MediaResult<()> {
        self.calls.lock().unwrap().push(tier);
        if Some(tier) == self.winner {
            tokio::fs::write(output, b"audio").await?;
            return Ok(());
        }
        // A failed tier may still leave a truncated file behind.
        tokio::fs::write(output, b"").await?;
        Err(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some(format!("{}: Invalid data found when processing input", tier)),
            Some(1),
        ))
    }
}

pub struct FakeSpeech {
    pub reply: Result<String, String>,
    pub languages: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn transcribe(&self, audio: &Path, language: &str) -> AiResult<String> {
        assert!(audio.exists(), "transcription got a missing audio file");
        self.languages.lock().unwrap().push(language.to_string());
        self.reply.clone().map_err(|body| AiError::api(500, body))
    }
}

/// Answers rewrite and voice-over prompts from separate scripts.
pub struct FakeGenerator {
    pub rewrite: Result<String, String>,
    pub panic_on_rewrite: bool,
    pub voiceover: Result<String, String>,
    pub voiceover_calls: AtomicUsize,
    pub voiceover_inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn complete(&self, system: &str, user: &str, _temperature: f32) -> AiResult<String> {
        let reply = if system.contains("rewriter") {
            if self.panic_on_rewrite {
                panic!("rewrite client blew up");
            }
            &self.rewrite
        } else {
            self.voiceover_calls.fetch_add(1, Ordering::SeqCst);
            self.voiceover_inputs.lock().unwrap().push(user.to_string());
            &self.voiceover
        };
        reply.clone().map_err(|body| AiError::api(503, body))
    }
}

/// Store wrapper that checks, at every terminal write, whether the job's
/// source file is still on disk.
pub struct ObservingStore {
    pub inner: MemoryJobStore,
    pub source_present_at_terminal: Mutex<Vec<bool>>,
}

#[async_trait]
impl JobStore for ObservingStore {
    async fn create(&self, record: &JobRecord) -> QueueResult<()> {
        self.inner.create(record).await
    }

    async fn set_fields(&self, job_id: &JobId, update: &JobUpdate) -> QueueResult<()> {
        if update.status.is_some_and(|s| s.is_terminal()) {
            if let Some(record) = self.inner.read(job_id).await? {
                let stem = record.source_path.with_extension("");
                let leftovers = [
                    record.source_path.clone(),
                    stem.with_extension("m4a"),
                    record.source_path.with_file_name(format!("{}_aac.m4a", job_id)),
                    stem.with_extension("wav"),
                ];
                self.source_present_at_terminal
                    .lock()
                    .unwrap()
                    .push(leftovers.iter().any(|p| p.exists()));
            }
        }
        self.inner.set_fields(job_id, update).await
    }

    async fn append_log(&self, job_id: &JobId, line: &str) -> QueueResult<()> {
        self.inner.append_log(job_id, line).await
    }

    async fn read(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        self.inner.read(job_id).await
    }
}

pub struct Scenario {
    pub has_audio: bool,
    pub duration: Option<f64>,
    pub winner: Option<LadderTier>,
    pub transcript: Result<String, String>,
    pub rewrite: Result<String, String>,
    pub panic_on_rewrite: bool,
    pub voiceover: Result<String, String>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            has_audio: true,
            duration: Some(10.0),
            winner: Some(LadderTier::Copy),
            transcript: Ok(TRANSCRIPT.to_string()),
            rewrite: Ok(format!("```srt\n{}```", REWRITTEN)),
            panic_on_rewrite: false,
            voiceover: Ok(format!("  {}\n", VOICEOVER)),
        }
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub config: WorkerConfig,
    pub store: Arc<ObservingStore>,
    pub queue: Arc<MemoryQueue>,
    pub intake: Intake,
    pub pipeline: Arc<JobPipeline>,
    pub runner: Arc<ScriptedTierRunner>,
    pub speech: Arc<FakeSpeech>,
    pub generator: Arc<FakeGenerator>,
}

impl Harness {
    pub fn new(scenario: Scenario) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = WorkerConfig::default().with_root(dir.path());
        config.dequeue_timeout = Duration::from_millis(50);
        config.error_backoff = Duration::from_millis(10);
        std::fs::create_dir_all(config.uploads_dir()).unwrap();

        let store = Arc::new(ObservingStore {
            inner: MemoryJobStore::new(),
            source_present_at_terminal: Mutex::new(Vec::new()),
        });
        let queue = Arc::new(MemoryQueue::new());
        let intake = Intake::new(store.clone(), queue.clone());

        let prober = Arc::new(FakeProber {
            has_audio: scenario.has_audio,
            duration: scenario.duration,
        });
        let runner = Arc::new(ScriptedTierRunner {
            winner: scenario.winner,
            calls: Mutex::new(Vec::new()),
        });
        let speech = Arc::new(FakeSpeech {
            reply: scenario.transcript,
            languages: Mutex::new(Vec::new()),
        });
        let generator = Arc::new(FakeGenerator {
            rewrite: scenario.rewrite,
            panic_on_rewrite: scenario.panic_on_rewrite,
            voiceover: scenario.voiceover,
            voiceover_calls: AtomicUsize::new(0),
            voiceover_inputs: Mutex::new(Vec::new()),
        });

        let extractor = LadderExtractor::new(prober.clone(), runner.clone());
        let pipeline = Arc::new(JobPipeline::new(
            store.clone(),
            prober,
            Stages::new(Arc::new(extractor), speech.clone(), generator.clone()),
            ArtifactWriter::new(config.out_dir()),
        ));

        Self {
            dir,
            config,
            store,
            queue,
            intake,
            pipeline,
            runner,
            speech,
            generator,
        }
    }

    /// Write a fake upload and submit it the way the upload handler does.
    pub async fn submit(&self, language: &str) -> JobId {
        let job_id = JobId::new();
        let source = self.source_path(&job_id);
        std::fs::write(&source, b"fake video").unwrap();
        self.intake
            .submit_with_id(job_id, &source, language)
            .await
            .unwrap()
    }

    pub fn source_path(&self, job_id: &JobId) -> PathBuf {
        self.config.uploads_dir().join(format!("{}.mp4", job_id))
    }

    /// Dequeue the next id and process it.
    pub async fn run_next(&self) -> JobOutcome {
        let job_id = self
            .queue
            .dequeue(Duration::from_millis(100))
            .await
            .unwrap()
            .expect("queue is empty");
        self.pipeline.process(&job_id).await
    }

    pub async fn record(&self, job_id: &JobId) -> JobRecord {
        self.store.read(job_id).await.unwrap().expect("record exists")
    }

    pub async fn history(&self, job_id: &JobId) -> Vec<JobRecord> {
        self.store.inner.history(job_id).await
    }

    pub fn tier_calls(&self) -> Vec<LadderTier> {
        self.runner.calls.lock().unwrap().clone()
    }

    /// Derived audio or source files still on disk for `job_id`.
    pub fn leftovers(&self, job_id: &JobId) -> Vec<PathBuf> {
        let uploads = self.config.uploads_dir();
        [
            format!("{}.mp4", job_id),
            format!("{}.m4a", job_id),
            format!("{}_aac.m4a", job_id),
            format!("{}.wav", job_id),
        ]
        .into_iter()
        .map(|name| uploads.join(name))
        .filter(|p| p.exists())
        .collect()
    }

    pub fn artifacts(&self, job_id: &JobId) -> Vec<PathBuf> {
        let out = self.config.out_dir();
        [
            format!("{}.srt", job_id),
            format!("{}_rewritten.srt", job_id),
            format!("{}_vo.txt", job_id),
        ]
        .into_iter()
        .map(|name| out.join(name))
        .filter(|p| p.exists())
        .collect()
    }

    pub fn terminal_observations(&self) -> Vec<bool> {
        self.store.source_present_at_terminal.lock().unwrap().clone()
    }
}
