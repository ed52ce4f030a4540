//! Innertube player response handling and timed-text parsing.

use std::sync::OnceLock;

use html_escape::decode_html_entities;
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::transcript::TranscriptSnippet;
use crate::youtube::error::FetchError;

const PLAYABILITY_OK: &str = "OK";
const PLAYABILITY_ERROR: &str = "ERROR";
const PLAYABILITY_LOGIN_REQUIRED: &str = "LOGIN_REQUIRED";

const REASON_BOT_CHECK: &str = "Sign in to confirm you’re not a bot";
const REASON_AGE_RESTRICTED: &str = "This video may be inappropriate for some users.";
const REASON_UNAVAILABLE: &str = "This video is unavailable";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    #[serde(default)]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    pub captions: Option<Captions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub error_screen: Option<ErrorScreen>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorScreen {
    #[serde(default)]
    pub player_error_message_renderer: Option<PlayerErrorMessageRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerErrorMessageRenderer {
    #[serde(default)]
    pub subreason: Option<FormattedText>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedText {
    #[serde(default)]
    pub runs: Vec<TextRun>,
    #[serde(default)]
    pub simple_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
    #[serde(default)]
    pub player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracklistRenderer {
    #[serde(default)]
    pub caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCaptionTrack {
    pub base_url: String,
    #[serde(default)]
    pub name: Option<FormattedText>,
    pub language_code: String,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
}

impl FormattedText {
    fn display(&self) -> Option<String> {
        self.runs
            .first()
            .map(|run| run.text.clone())
            .or_else(|| self.simple_text.clone())
    }
}

/// Turns a non-OK playability status into the matching error.
pub fn check_playability(video_id: &str, player: &PlayerResponse) -> Result<(), FetchError> {
    let Some(playability) = player.playability_status.as_ref() else {
        return Ok(());
    };
    let status = match playability.status.as_deref() {
        None | Some(PLAYABILITY_OK) => return Ok(()),
        Some(status) => status,
    };
    let reason = playability.reason.as_deref();

    if status == PLAYABILITY_LOGIN_REQUIRED {
        match reason {
            Some(REASON_BOT_CHECK) => return Err(FetchError::RequestBlocked(video_id.to_string())),
            Some(REASON_AGE_RESTRICTED) => {
                return Err(FetchError::AgeRestricted(video_id.to_string()));
            }
            _ => {}
        }
    }

    if status == PLAYABILITY_ERROR && reason == Some(REASON_UNAVAILABLE) {
        if video_id.starts_with("http://") || video_id.starts_with("https://") {
            return Err(FetchError::InvalidVideoId(video_id.to_string()));
        }
        return Err(FetchError::VideoUnavailable(video_id.to_string()));
    }

    let sub_reasons = playability
        .error_screen
        .as_ref()
        .and_then(|screen| screen.player_error_message_renderer.as_ref())
        .and_then(|renderer| renderer.subreason.as_ref())
        .map(|subreason| subreason.runs.iter().map(|run| run.text.clone()).collect())
        .unwrap_or_default();

    Err(FetchError::VideoUnplayable {
        video_id: video_id.to_string(),
        reason: reason.map(str::to_string),
        sub_reasons,
    })
}

/// Lists the caption tracks advertised by a player response.
pub fn caption_tracks(video_id: &str, player: PlayerResponse) -> Result<Vec<CaptionTrack>, FetchError> {
    let raw_tracks = player
        .captions
        .and_then(|captions| captions.player_captions_tracklist_renderer)
        .map(|renderer| renderer.caption_tracks)
        .unwrap_or_default();

    if raw_tracks.is_empty() {
        return Err(FetchError::TranscriptsDisabled(video_id.to_string()));
    }

    Ok(raw_tracks
        .into_iter()
        .map(|track| CaptionTrack {
            base_url: track.base_url.replace("&fmt=srv3", ""),
            language: track
                .name
                .as_ref()
                .and_then(FormattedText::display)
                .unwrap_or_else(|| track.language_code.clone()),
            is_generated: track.kind.as_deref() == Some("asr"),
            language_code: track.language_code,
        })
        .collect())
}

/// Picks the first track matching `languages` in priority order, preferring
/// manually created captions over generated ones for the same language.
pub fn select_track<'a>(
    video_id: &str,
    tracks: &'a [CaptionTrack],
    languages: &[&str],
) -> Result<&'a CaptionTrack, FetchError> {
    for language in languages {
        let manual = tracks
            .iter()
            .find(|track| !track.is_generated && track.language_code == *language);
        let generated = || {
            tracks
                .iter()
                .find(|track| track.is_generated && track.language_code == *language)
        };
        if let Some(track) = manual.or_else(generated) {
            return Ok(track);
        }
    }

    Err(FetchError::NoTranscriptFound {
        video_id: video_id.to_string(),
        requested: languages.join(", "),
        available: tracks.iter().map(|track| track.language_code.clone()).collect(),
    })
}

fn text_element_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").expect("valid text element regex")
    })
}

fn attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*"([^"]*)""#).expect("valid attribute regex")
    })
}

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid markup regex"))
}

/// Parses a timed-text (`format 1`) caption document into snippets.
///
/// Elements without text, or whose text is only markup, are dropped.
/// Elements with an unreadable `start` are skipped.
pub fn parse_timedtext(xml: &str) -> Vec<TranscriptSnippet> {
    let mut snippets = Vec::new();

    for element in text_element_re().captures_iter(xml) {
        let Some(raw_text) = element.get(2).map(|m| m.as_str()).filter(|t| !t.is_empty()) else {
            continue;
        };

        let attributes = element.get(1).map_or("", |m| m.as_str());
        let mut start = None;
        let mut duration = 0.0;
        for attribute in attribute_re().captures_iter(attributes) {
            let value = decode_html_entities(&attribute[2]);
            match &attribute[1] {
                "start" => start = value.trim().parse::<f64>().ok(),
                "dur" => duration = value.trim().parse::<f64>().unwrap_or(0.0),
                _ => {}
            }
        }

        let Some(start) = start else {
            debug!("Skipping caption element without a readable start: {attributes}");
            continue;
        };

        // XML-level entities first, then the HTML entities they wrapped.
        let text = decode_html_entities(&decode_html_entities(raw_text)).into_owned();
        let text = markup_re().replace_all(&text, "").into_owned();
        if text.is_empty() {
            continue;
        }

        snippets.push(TranscriptSnippet {
            text,
            start,
            duration,
        });
    }

    snippets
}
