use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use reqwest::{RequestBuilder, Response, StatusCode, header};

use crate::transcript::{FetchedTranscript, TranscriptFetcher};
use crate::youtube::captions::{self, PlayerResponse};
use crate::youtube::config::YouTubeConfig;
use crate::youtube::error::FetchError;

/// Language codes tried, in order, when choosing a caption track.
const PREFERRED_LANGUAGES: &[&str] = &["en"];

const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

const CONSENT_FORM_ACTION: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";

fn api_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid api key regex")
    })
}

fn consent_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid consent regex"))
}

/// Watch page HTML and the consent cookie it took to get past the
/// consent interstitial, if one was served.
struct WatchPage {
    html: String,
    consent_cookie: Option<String>,
}

/// Fetches captions straight from YouTube's watch page and innertube API.
#[derive(Clone)]
pub struct YouTubeFetcher {
    client: reqwest::Client,
    config: YouTubeConfig,
}

impl YouTubeFetcher {
    pub fn new(config: YouTubeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self { client, config })
    }

    pub async fn fetch_transcript(&self, video_id: &str) -> Result<FetchedTranscript, FetchError> {
        if video_id.trim().is_empty() {
            return Err(FetchError::InvalidVideoId(video_id.to_string()));
        }

        let page = self.fetch_video_html(video_id).await?;
        let cookie = page.consent_cookie.as_deref();
        let api_key = extract_innertube_api_key(video_id, &page.html)?;
        debug!("Found innertube API key for {video_id}");

        let player = self.fetch_player_response(video_id, &api_key, cookie).await?;
        captions::check_playability(video_id, &player)?;

        let tracks = captions::caption_tracks(video_id, player)?;
        debug!("{} caption tracks available for {video_id}", tracks.len());
        let track = captions::select_track(video_id, &tracks, PREFERRED_LANGUAGES)?;

        if track.base_url.contains("&exp=xpe") {
            return Err(FetchError::PoTokenRequired(video_id.to_string()));
        }

        let response = self
            .prepare(self.client.get(&track.base_url), cookie)
            .send()
            .await
            .map_err(|e| FetchError::http(video_id, e))?;
        let xml = check_status(video_id, response)?
            .text()
            .await
            .map_err(|e| FetchError::http(video_id, e))?;

        let snippets = captions::parse_timedtext(&xml);
        info!(
            "Fetched {} caption snippets for {} ({}, generated={})",
            snippets.len(),
            video_id,
            track.language_code,
            track.is_generated
        );

        Ok(FetchedTranscript {
            video_id: video_id.to_string(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            snippets,
        })
    }

    /// Adds the headers every YouTube request carries.
    fn prepare(&self, request: RequestBuilder, cookie: Option<&str>) -> RequestBuilder {
        let request = request.header(header::ACCEPT_LANGUAGE, &self.config.accept_language);
        match cookie {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        }
    }

    async fn fetch_video_html(&self, video_id: &str) -> Result<WatchPage, FetchError> {
        let html = self.fetch_html(video_id, None).await?;
        if !html.contains(CONSENT_FORM_ACTION) {
            return Ok(WatchPage {
                html,
                consent_cookie: None,
            });
        }

        debug!("Consent page served for {video_id}, retrying with consent cookie");
        let consent = consent_value_re()
            .captures(&html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| FetchError::FailedToCreateConsentCookie(video_id.to_string()))?;

        let cookie = format!("CONSENT=YES+{consent}");
        let html = self.fetch_html(video_id, Some(&cookie)).await?;
        if html.contains(CONSENT_FORM_ACTION) {
            warn!("Consent page still served for {video_id} after setting cookie");
            return Err(FetchError::FailedToCreateConsentCookie(video_id.to_string()));
        }
        Ok(WatchPage {
            html,
            consent_cookie: Some(cookie),
        })
    }

    async fn fetch_html(&self, video_id: &str, cookie: Option<&str>) -> Result<String, FetchError> {
        let request = self
            .client
            .get(self.config.watch_url())
            .query(&[("v", video_id)]);

        let response = self
            .prepare(request, cookie)
            .send()
            .await
            .map_err(|e| FetchError::http(video_id, e))?;
        check_status(video_id, response)?
            .text()
            .await
            .map_err(|e| FetchError::http(video_id, e))
    }

    async fn fetch_player_response(
        &self,
        video_id: &str,
        api_key: &str,
        cookie: Option<&str>,
    ) -> Result<PlayerResponse, FetchError> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let request = self
            .client
            .post(self.config.player_url())
            .query(&[("key", api_key)]);
        let response = self
            .prepare(request, cookie)
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::http(video_id, e))?;

        check_status(video_id, response)?
            .json::<PlayerResponse>()
            .await
            .map_err(|e| {
                warn!("Unreadable player response for {video_id}: {e}");
                FetchError::DataUnparsable(video_id.to_string())
            })
    }
}

#[async_trait]
impl TranscriptFetcher for YouTubeFetcher {
    async fn fetch(&self, video_id: &str) -> Result<FetchedTranscript> {
        Ok(self.fetch_transcript(video_id).await?)
    }
}

fn extract_innertube_api_key(video_id: &str, html: &str) -> Result<String, FetchError> {
    if let Some(key) = api_key_re().captures(html).and_then(|caps| caps.get(1)) {
        return Ok(key.as_str().to_string());
    }
    if html.contains(RECAPTCHA_MARKER) {
        return Err(FetchError::IpBlocked(video_id.to_string()));
    }
    Err(FetchError::DataUnparsable(video_id.to_string()))
}

fn check_status(video_id: &str, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::IpBlocked(video_id.to_string()));
    }
    if !status.is_success() {
        return Err(FetchError::RequestFailed {
            video_id: video_id.to_string(),
            status,
        });
    }
    Ok(response)
}
