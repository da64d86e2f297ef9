use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use utoipa::ToSchema;

/// Peer socket address of the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RemoteAddressDto {
    #[schema(example = "203.0.113.7")]
    pub address: String,
    /// "IPv4" or "IPv6"
    #[schema(example = "IPv4")]
    pub family: String,
    pub port: u16,
}

impl From<SocketAddr> for RemoteAddressDto {
    fn from(addr: SocketAddr) -> Self {
        let family = if addr.is_ipv4() { "IPv4" } else { "IPv6" };
        Self {
            address: addr.ip().to_string(),
            family: family.to_string(),
            port: addr.port(),
        }
    }
}

/// How the server sees the caller, including proxy headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CallerInfoDto {
    /// Directly connected peer; null when unknown
    pub ip: Option<RemoteAddressDto>,
    /// Raw `X-Forwarded-For` header
    #[serde(rename = "forwardedFor")]
    pub forwarded_for: Option<String>,
    /// Raw `X-Real-IP` header (set by nginx)
    #[serde(rename = "nginxRealIP")]
    pub nginx_real_ip: Option<String>,
}
