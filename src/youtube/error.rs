use reqwest::StatusCode;
use thiserror::Error;

/// Reasons a YouTube transcript could not be retrieved.
///
/// Every message names the video's watch URL so a log line is enough to
/// reproduce the failure by hand.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         You provided an invalid video id. Make sure you are using the video id and NOT the url \
         (for `https://www.youtube.com/watch?v=1234` the id is `1234`)"
    )]
    InvalidVideoId(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         The video is no longer available"
    )]
    VideoUnavailable(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         Subtitles are disabled for this video"
    )]
    TranscriptsDisabled(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={video_id}! \
         No transcripts were found for any of the requested language codes: {requested}. \
         Available language codes: {}",
        available_list(.available)
    )]
    NoTranscriptFound {
        video_id: String,
        requested: String,
        available: Vec<String>,
    },

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         This video is age-restricted and can not be accessed without authentication"
    )]
    AgeRestricted(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={video_id}! \
         The video is unplayable: {}{}",
        .reason.as_deref().unwrap_or("no reason specified"),
        sub_reason_list(.sub_reasons)
    )]
    VideoUnplayable {
        video_id: String,
        reason: Option<String>,
        sub_reasons: Vec<String>,
    },

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         YouTube is blocking requests from your IP (bot check)"
    )]
    RequestBlocked(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         YouTube is blocking requests from your IP (too many requests or captcha)"
    )]
    IpBlocked(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         The requested caption track requires a PO token"
    )]
    PoTokenRequired(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         Failed to automatically give consent to saving cookies"
    )]
    FailedToCreateConsentCookie(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={0}! \
         The data required to fetch the transcript is not parsable"
    )]
    DataUnparsable(String),

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={video_id}! \
         Request to YouTube failed with status {status}"
    )]
    RequestFailed { video_id: String, status: StatusCode },

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={video_id}! \
         Request to YouTube failed: {source}"
    )]
    Http {
        video_id: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn http(video_id: &str, source: reqwest::Error) -> Self {
        Self::Http {
            video_id: video_id.to_string(),
            source,
        }
    }
}

fn available_list(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

fn sub_reason_list(sub_reasons: &[String]) -> String {
    if sub_reasons.is_empty() {
        String::new()
    } else {
        format!(" ({})", sub_reasons.join("; "))
    }
}
