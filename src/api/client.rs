// Thin REST client for the Rewired backend

use crate::db::models::Affirmation;
use crate::error::ApiError;

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the affirmation list from `GET /api/affirmations`.
    pub async fn fetch_affirmations(&self) -> Result<Vec<Affirmation>, ApiError> {
        let url = format!("{}/api/affirmations", self.base_url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Response {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    /// Resolve an affirmation's audio path against the API base. Absolute
    /// URLs pass through untouched.
    pub fn resolve_audio_url(&self, audio_url: &str) -> String {
        if audio_url.starts_with("http://") || audio_url.starts_with("https://") {
            return audio_url.to_string();
        }
        format!("{}/{}", self.base_url, audio_url.trim_start_matches('/'))
    }
}
