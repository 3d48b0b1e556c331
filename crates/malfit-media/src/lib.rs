//! FFmpeg CLI wrapper for audio extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - FFprobe stream/duration probing behind [`MediaProber`]
//! - The copy → aac → wav extraction ladder behind [`AudioExtractor`]

pub mod command;
pub mod error;
pub mod ladder;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, tail_chars, FfmpegCommand, FfmpegRunner, STDERR_TAIL_CHARS};
pub use error::{MediaError, MediaResult};
pub use ladder::{
    audio_candidates, AudioExtractor, ExtractedAudio, FfmpegTierRunner, LadderExtractor,
    LadderTier, TierRunner,
};
pub use probe::{parse_probe_output, probe_media, FfprobeProber, MediaInfo, MediaProber};
