use async_trait::async_trait;

/// One timed caption line in the shape a transcript source hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSnippet {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Captions for a single video, plus which track they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTranscript {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub snippets: Vec<TranscriptSnippet>,
}

/// Source of caption data for a video identifier.
///
/// A single instance is shared by every HTTP worker, so implementations must
/// be `Send + Sync`. The error's display string is reported to the caller
/// verbatim.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch(&self, video_id: &str) -> anyhow::Result<FetchedTranscript>;
}
