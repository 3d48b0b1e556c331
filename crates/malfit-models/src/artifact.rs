//! Output artifacts produced by a finished job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::JobId;

/// The three text artifacts a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Verbatim SRT transcript
    #[serde(rename = "srt")]
    Transcript,
    /// Paraphrased SRT transcript
    #[serde(rename = "rewritten")]
    Rewritten,
    /// Timestamp-free narration script
    #[serde(rename = "vo")]
    VoiceOver,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Transcript,
        ArtifactKind::Rewritten,
        ArtifactKind::VoiceOver,
    ];

    /// Selector used in download URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Transcript => "srt",
            ArtifactKind::Rewritten => "rewritten",
            ArtifactKind::VoiceOver => "vo",
        }
    }

    /// File name for this artifact of `job_id`.
    pub fn file_name(&self, job_id: &JobId) -> String {
        match self {
            ArtifactKind::Transcript => format!("{}.srt", job_id),
            ArtifactKind::Rewritten => format!("{}_rewritten.srt", job_id),
            ArtifactKind::VoiceOver => format!("{}_vo.txt", job_id),
        }
    }

    /// Location of this artifact under the output directory.
    pub fn path(&self, out_dir: impl AsRef<Path>, job_id: &JobId) -> PathBuf {
        out_dir.as_ref().join(self.file_name(job_id))
    }

    /// Content type served for this artifact.
    pub fn media_type(&self) -> &'static str {
        match self {
            ArtifactKind::Transcript | ArtifactKind::Rewritten => "application/x-subrip",
            ArtifactKind::VoiceOver => "text/plain",
        }
    }

    /// Download URL path for this artifact of `job_id`.
    pub fn download_path(&self, job_id: &JobId) -> String {
        format!("/download/{}/{}", job_id, self.as_str())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown artifact kind: {}", s))
    }
}

/// References to the artifacts of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub transcript: String,
    pub rewritten: String,
    pub voiceover: String,
}

impl JobResult {
    /// Download references for `job_id`.
    pub fn for_job(job_id: &JobId) -> Self {
        Self {
            transcript: ArtifactKind::Transcript.download_path(job_id),
            rewritten: ArtifactKind::Rewritten.download_path(job_id),
            voiceover: ArtifactKind::VoiceOver.download_path(job_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_naming_convention() {
        let id = JobId::from_string("j1");
        assert_eq!(ArtifactKind::Transcript.file_name(&id), "j1.srt");
        assert_eq!(ArtifactKind::Rewritten.file_name(&id), "j1_rewritten.srt");
        assert_eq!(ArtifactKind::VoiceOver.file_name(&id), "j1_vo.txt");
        assert_eq!(
            ArtifactKind::VoiceOver.path("/tmp/out", &id),
            PathBuf::from("/tmp/out/j1_vo.txt")
        );
    }

    #[test]
    fn test_kind_selector_parsing() {
        assert_eq!("srt".parse::<ArtifactKind>().unwrap(), ArtifactKind::Transcript);
        assert_eq!("rewritten".parse::<ArtifactKind>().unwrap(), ArtifactKind::Rewritten);
        assert_eq!("vo".parse::<ArtifactKind>().unwrap(), ArtifactKind::VoiceOver);
        assert!("mp4".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn test_result_references() {
        let id = JobId::from_string("abc");
        let result = JobResult::for_job(&id);
        assert_eq!(result.transcript, "/download/abc/srt");
        assert_eq!(result.rewritten, "/download/abc/rewritten");
        assert_eq!(result.voiceover, "/download/abc/vo");
    }
}
