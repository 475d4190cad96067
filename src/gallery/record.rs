//! Gallery record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An input image as stored alongside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub filename: String,
    pub path: String,
}

/// One generated image in the gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: String,
    pub result_image: String,
    pub prompt: String,
    pub uploaded_images: Vec<UploadedImage>,
    pub response_text: String,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
}

impl GenerationRecord {
    /// New record stamped with the current time. An empty `id` is filled in
    /// by the store on append.
    pub fn new(
        id: impl Into<String>,
        result_image: impl Into<String>,
        prompt: impl Into<String>,
        uploaded_images: Vec<UploadedImage>,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            result_image: result_image.into(),
            prompt: prompt.into(),
            uploaded_images,
            response_text: response_text.into(),
            created_at: Utc::now(),
            likes: 0,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A record paired with whether the requesting client liked it
#[derive(Debug, Clone, Serialize)]
pub struct GalleryEntry {
    #[serde(flatten)]
    pub record: GenerationRecord,
    pub user_liked: bool,
}

/// Gallery ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Likes,
}

impl SortOrder {
    /// Parse a query value; unknown values fall back to `Newest`
    pub fn from_query(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "oldest" => Self::Oldest,
            "likes" => Self::Likes,
            _ => Self::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Likes => "likes",
        }
    }
}
