//! Wire types for the remote `generateContent` API

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::storage::base64;

/// Reason code the remote service uses for a revoked or unknown key
pub const API_KEY_INVALID_REASON: &str = "API_KEY_INVALID";

const PROMPT_PREFIX: &str = "Image generation prompt: ";
const MAX_OUTPUT_TOKENS: u32 = 4000;

const HARM_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

/// An input image attached to a prompt
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// Client-side filename
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageAttachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Request body sent to the remote service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    #[serde(default)]
    pub safety_settings: Vec<SafetySetting>,
}

/// Content container used in both requests and responses
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Text or inline media part.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 inline payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl GenerateContentRequest {
    /// Build an image generation request from a prompt and its attachments
    pub fn image_generation(prompt: &str, attachments: &[ImageAttachment]) -> Self {
        let mut parts = Vec::with_capacity(attachments.len() + 1);
        parts.push(Part::Text {
            text: format!("{PROMPT_PREFIX}{prompt}"),
        });
        parts.extend(attachments.iter().map(|a| Part::InlineData {
            inline_data: InlineData {
                mime_type: a.mime_type.clone(),
                data: base64::encode(&a.data),
            },
        }));

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig::default(),
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: "OFF".to_string(),
                })
                .collect(),
        }
    }
}

/// Top-level `generateContent` response envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One response candidate. Blocked candidates carry only a finish reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Decoded output of the first candidate
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    /// Text parts joined by newlines, trimmed
    pub text: String,
    pub images: Vec<DecodedImage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
    /// Text that preceded this image, trimmed
    pub text: String,
}

impl GenerateContentResponse {
    /// Extract text and decoded images from the first candidate
    pub fn into_output(self) -> Result<GenerationOutput> {
        let mut output = GenerationOutput::default();
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(output);
        };
        output.finish_reason = candidate.finish_reason;

        let mut text = String::new();
        for part in candidate.content.parts {
            match part {
                Part::Text { text: t } => {
                    text.push_str(&t);
                    text.push('\n');
                }
                Part::InlineData { inline_data } => {
                    let data = base64::decode(&inline_data.data).map_err(|e| {
                        AppError::UpstreamCallFailed(format!("undecodable inline image: {e}"))
                    })?;
                    output.images.push(DecodedImage {
                        mime_type: inline_data.mime_type,
                        data,
                        text: text.trim().to_string(),
                    });
                }
            }
        }
        output.text = text.trim().to_string();

        Ok(output)
    }
}

/// Structured error body returned with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<ApiErrorInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorInfo {
    #[serde(default)]
    pub reason: Option<String>,
}

impl ApiErrorBody {
    /// Parse an error body, returning `None` if it is not structured
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// True when any detail carries the invalid-key reason
    pub fn is_invalid_credential(&self) -> bool {
        self.error
            .details
            .iter()
            .any(|d| d.reason.as_deref() == Some(API_KEY_INVALID_REASON))
    }
}
