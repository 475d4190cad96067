//! Client identity used to key likes

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::{convert::Infallible, net::SocketAddr};

const UNKNOWN_CLIENT: &str = "unknown";

/// Identifier of the calling client: the first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the peer address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        };

        let id = forwarded
            .or_else(real_ip)
            .map(String::from)
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        Ok(Self::from_parts(&parts.headers, peer))
    }
}
