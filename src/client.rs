use anyhow::{Result, anyhow};

use crate::config::ClientConfig;
use crate::dto::{ErrorResponse, TranscriptRequest, TranscriptResponse, TranscriptSegment};
use crate::youtube::video_id::normalize_video_id;

pub async fn request_transcript(server_url: &str, video_id: &str) -> Result<TranscriptResponse> {
    let client = reqwest::Client::new();

    println!("🚀 Requesting transcript for {video_id} from: {server_url}/transcript");

    let response = client
        .post(format!("{server_url}/transcript"))
        .json(&TranscriptRequest {
            video_id: video_id.to_string(),
        })
        .send()
        .await
        .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response: {}", e))?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorResponse>(&response_text)
            .map(|error| error.detail)
            .unwrap_or_else(|_| format!("Server error: {}", status.as_u16()));
        return Err(anyhow!(detail));
    }

    serde_json::from_str(&response_text)
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))
}

pub async fn check_server_health(server_url: &str) -> Result<()> {
    let client = reqwest::Client::new();

    println!("🔍 Checking server health at: {server_url}/");

    let response = client
        .get(format!("{server_url}/"))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to connect to server: {}", e))?;

    if response.status().is_success() {
        println!("✅ Server is healthy");
        Ok(())
    } else {
        Err(anyhow!("Server health check failed: {}", response.status()))
    }
}

/// `[mm:ss.cc]`, or `[h:mm:ss.cc]` past the first hour.
pub fn format_timestamp(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let (hours, rest) = (centis / 360_000, centis % 360_000);
    let (minutes, rest) = (rest / 6_000, rest % 6_000);
    let (secs, centis) = (rest / 100, rest % 100);

    if hours > 0 {
        format!("[{hours}:{minutes:02}:{secs:02}.{centis:02}]")
    } else {
        format!("[{minutes:02}:{secs:02}.{centis:02}]")
    }
}

fn print_segments(segments: &[TranscriptSegment]) {
    for segment in segments {
        println!("{} {}", format_timestamp(segment.start), segment.text);
    }
}

pub async fn run_client(config: ClientConfig) -> Result<()> {
    println!("🎬 FactFinder Transcript Client");
    println!("==============================");

    let video_id = normalize_video_id(&config.video);
    if video_id != config.video.trim() {
        println!("🔗 Extracted video id {video_id} from {}", config.video);
    }

    if let Err(e) = check_server_health(&config.server_url).await {
        eprintln!("❌ {e}");
        eprintln!("💡 Make sure the server is running: factfinder-agent serve");
        return Err(e);
    }

    match request_transcript(&config.server_url, video_id).await {
        Ok(response) => {
            println!("\n✅ Transcript fetched: {} segments", response.transcript.len());
            if config.json_output {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_segments(&response.transcript);
            }
        }
        Err(e) => {
            eprintln!("❌ Transcript fetch failed: {e}");
            return Err(e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn formats_timestamps() {
        assert_eq!(format_timestamp(0.0), "[00:00.00]");
        assert_eq!(format_timestamp(1.2), "[00:01.20]");
        assert_eq!(format_timestamp(75.456), "[01:15.46]");
        assert_eq!(format_timestamp(3723.5), "[1:02:03.50]");
    }

    #[tokio::test]
    async fn parses_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcript"))
            .and(body_json(serde_json::json!({ "video_id": "abc123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transcript": [
                    { "text": "Hello", "start": 0.0, "duration": 1.2 },
                    { "text": "World", "start": 1.2, "duration": 0.8 }
                ]
            })))
            .mount(&server)
            .await;

        let response = request_transcript(&server.uri(), "abc123").await.unwrap();
        assert_eq!(
            response.transcript,
            vec![
                TranscriptSegment { text: "Hello".to_string(), start: 0.0, duration: 1.2 },
                TranscriptSegment { text: "World".to_string(), start: 1.2, duration: 0.8 },
            ]
        );
    }

    #[tokio::test]
    async fn surfaces_server_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcript"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "detail": "No transcripts available" })),
            )
            .mount(&server)
            .await;

        let err = request_transcript(&server.uri(), "nocaps").await.unwrap_err();
        assert_eq!(err.to_string(), "No transcripts available");
    }

    #[tokio::test]
    async fn falls_back_to_status_without_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = request_transcript(&server.uri(), "abc123").await.unwrap_err();
        assert_eq!(err.to_string(), "Server error: 502");
    }

    #[tokio::test]
    async fn health_check_requires_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "message": "FactFinder Agent Server Running"
            })))
            .mount(&server)
            .await;

        assert!(check_server_health(&server.uri()).await.is_ok());

        let down = MockServer::start().await;
        assert!(check_server_health(&down.uri()).await.is_err());
    }
}
