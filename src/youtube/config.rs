pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
pub const YOUTUBE_URL_ENV: &str = "FACTFINDER_YOUTUBE_URL";

#[derive(Clone, Debug)]
pub struct YouTubeConfig {
    /// Origin for watch pages and the innertube API, without trailing slash.
    pub base_url: String,
    pub accept_language: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            accept_language: "en-US".to_string(),
        }
    }
}

impl YouTubeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(YOUTUBE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        config
    }

    pub fn watch_url(&self) -> String {
        format!("{}/watch", self.base_url)
    }

    pub fn player_url(&self) -> String {
        format!("{}/youtubei/v1/player", self.base_url)
    }
}
