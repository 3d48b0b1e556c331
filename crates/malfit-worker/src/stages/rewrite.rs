use std::fmt;
use std::sync::Arc;

use malfit_ai::TextGenerator;
use malfit_models::{Conformance, SubtitleDocument};

use super::transcribe::Transcript;

const SYSTEM_PROMPT: &str = "You are a video script rewriter working in the language of the \
transcript. Keep the meaning but change the phrasing substantially. Never change subtitle \
indices or timestamps. Each block may grow or shrink by up to 30% in length.";

const TEMPERATURE: f32 = 0.7;

/// How the rewritten subtitles were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteResolution {
    /// The rewrite kept every index and timing.
    Accepted,
    /// Timings drifted; original timings were restored around the new text.
    Repaired,
    /// The original transcript is used instead.
    FellBack(String),
}

impl RewriteResolution {
    pub fn label(&self) -> &'static str {
        match self {
            RewriteResolution::Accepted => "accepted",
            RewriteResolution::Repaired => "repaired",
            RewriteResolution::FellBack(_) => "fallback",
        }
    }
}

impl fmt::Display for RewriteResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteResolution::Accepted => f.write_str("rewrite accepted"),
            RewriteResolution::Repaired => f.write_str("rewrite timings repaired"),
            RewriteResolution::FellBack(reason) => {
                write!(f, "rewrite fell back to original: {}", reason)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub srt: String,
    pub resolution: RewriteResolution,
}

/// Paraphrases the transcript while holding its timing fixed. Never fails.
#[derive(Clone)]
pub struct RewriteStage {
    generator: Arc<dyn TextGenerator>,
}

impl RewriteStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn run(&self, transcript: &Transcript) -> RewriteOutcome {
        let user = format!(
            "[SRT]\n{}\n[/SRT]\nFollow the rules above and output the SRT only.",
            transcript.srt
        );

        let reply = match self.generator.complete(SYSTEM_PROMPT, &user, TEMPERATURE).await {
            Ok(reply) => reply,
            Err(e) => return fallback(transcript, format!("request failed: {}", e)),
        };

        let candidate = match SubtitleDocument::parse(strip_code_fence(&reply)) {
            Ok(doc) => doc,
            Err(e) => return fallback(transcript, format!("unparseable reply: {}", e)),
        };

        match transcript.document.conform(&candidate) {
            Conformance::Exact => RewriteOutcome {
                srt: candidate.render(),
                resolution: RewriteResolution::Accepted,
            },
            Conformance::Repaired(doc) => RewriteOutcome {
                srt: doc.render(),
                resolution: RewriteResolution::Repaired,
            },
            Conformance::Mismatch { expected, actual } => fallback(
                transcript,
                format!("expected {} blocks, got {}", expected, actual),
            ),
        }
    }
}

fn fallback(transcript: &Transcript, reason: String) -> RewriteOutcome {
    RewriteOutcome {
        srt: transcript.srt.clone(),
        resolution: RewriteResolution::FellBack(reason),
    }
}

/// Remove a surrounding markdown code fence (```` ```srt ... ``` ````).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use malfit_ai::{AiError, AiResult};

    use super::*;

    const ORIGINAL: &str = "1\n00:00:00,000 --> 00:00:02,000\nhello there\n\n2\n00:00:02,000 --> 00:00:04,000\ngeneral kenobi\n";

    struct Reply(Result<&'static str, ()>);

    #[async_trait]
    impl TextGenerator for Reply {
        async fn complete(&self, system: &str, user: &str, temperature: f32) -> AiResult<String> {
            assert!(system.contains("timestamps"));
            assert!(user.contains("hello there"));
            assert_eq!(temperature, 0.7);
            self.0
                .map(str::to_string)
                .map_err(|_| AiError::api(503, "overloaded"))
        }
    }

    fn transcript() -> Transcript {
        Transcript {
            srt: ORIGINAL.to_string(),
            document: SubtitleDocument::parse(ORIGINAL).unwrap(),
        }
    }

    async fn run(reply: Result<&'static str, ()>) -> RewriteOutcome {
        RewriteStage::new(Arc::new(Reply(reply))).run(&transcript()).await
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```srt\n1\nabc\n```"), "1\nabc");
        assert_eq!(strip_code_fence("```\nx\n```\n"), "x");
        assert_eq!(strip_code_fence("  plain  "), "plain");
    }

    #[tokio::test]
    async fn test_conforming_rewrite_accepted() {
        let outcome = run(Ok("```srt\n1\n00:00:00,000 --> 00:00:02,000\nhi\n\n2\n00:00:02,000 --> 00:00:04,000\nobi-wan\n```")).await;
        assert_eq!(outcome.resolution, RewriteResolution::Accepted);
        assert!(outcome.srt.contains("obi-wan"));
    }

    #[tokio::test]
    async fn test_drifted_timings_repaired() {
        let outcome = run(Ok("1\n00:00:00,100 --> 00:00:02,300\nhi\n\n2\n00:00:02,300 --> 00:00:04,900\nobi-wan\n")).await;
        assert_eq!(outcome.resolution, RewriteResolution::Repaired);

        let repaired = SubtitleDocument::parse(&outcome.srt).unwrap();
        let original = transcript().document;
        assert!(repaired
            .blocks
            .iter()
            .zip(&original.blocks)
            .all(|(a, b)| a.same_timing(b)));
        assert_eq!(repaired.blocks[1].text, "obi-wan");
    }

    #[tokio::test]
    async fn test_block_count_mismatch_falls_back() {
        let outcome = run(Ok("1\n00:00:00,000 --> 00:00:04,000\nmerged\n")).await;
        assert_eq!(outcome.srt, ORIGINAL);
        assert_eq!(
            outcome.resolution,
            RewriteResolution::FellBack("expected 2 blocks, got 1".to_string())
        );
    }

    #[tokio::test]
    async fn test_prose_reply_falls_back() {
        let outcome = run(Ok("Sure! Here is your rewritten script.")).await;
        assert_eq!(outcome.srt, ORIGINAL);
        assert_eq!(outcome.resolution.label(), "fallback");
    }

    #[tokio::test]
    async fn test_remote_failure_passes_original_through() {
        let outcome = run(Err(())).await;
        assert_eq!(outcome.srt, ORIGINAL);
        assert!(outcome.resolution.to_string().contains("overloaded"));
    }
}
