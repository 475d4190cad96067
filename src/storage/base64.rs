//! Base64 helpers for inline image payloads

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{AppError, Result};

/// Encode binary data to a base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a base64 string, tolerating a `data:<mime>;base64,` prefix
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    let data = match encoded.split_once(',') {
        Some((header, rest)) if header.starts_with("data:") => rest,
        _ => encoded,
    };

    STANDARD
        .decode(data.trim())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid base64 data: {}", e)))
}
