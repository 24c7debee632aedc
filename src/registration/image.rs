//! Image host client: uploads logos and cover photos, returns a URL.
//!
//! The workflow treats the returned URL as opaque and only stores it in
//! the draft.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::draft::DraftField;
use crate::error::ImageHostError;

/// Which draft slot an uploaded image fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCategory {
    Logo,
    CoverPhoto,
}

impl ImageCategory {
    pub fn field(&self) -> DraftField {
        match self {
            Self::Logo => DraftField::Logo,
            Self::CoverPhoto => DraftField::CoverPhoto,
        }
    }
}

impl std::fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logo => write!(f, "logo"),
            Self::CoverPhoto => write!(f, "cover_photo"),
        }
    }
}

impl std::str::FromStr for ImageCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logo" => Ok(Self::Logo),
            "cover_photo" => Ok(Self::CoverPhoto),
            other => Err(format!("Unknown image category: {other}")),
        }
    }
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        category: ImageCategory,
    ) -> Result<String, ImageHostError>;
}

/// Image host reached with a multipart POST. Expects `{"url": "..."}` back.
pub struct HttpImageHost {
    client: reqwest::Client,
    url: String,
}

impl HttpImageHost {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        category: ImageCategory,
    ) -> Result<String, ImageHostError> {
        let size = bytes.len();
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new()
            .text("category", category.to_string())
            .part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageHostError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageHostError::UploadFailed(format!(
                "image host returned {status}: {body}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ImageHostError::UploadFailed(e.to_string()))?;

        let url = body
            .get("url")
            .and_then(|v| v.as_str())
            .filter(|u| !u.is_empty())
            .ok_or(ImageHostError::MissingUrl)?;

        tracing::info!(%category, size, "Image uploaded");
        Ok(url.to_string())
    }
}
