use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    Json,
};
use std::net::SocketAddr;

use crate::features::diagnostics::dtos::{CallerInfoDto, RemoteAddressDto};

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Report the caller's address as seen by the server
///
/// Diagnostic only; proxy headers are echoed without validation.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "diagnostics",
    responses(
        (status = 200, description = "Caller address information", body = CallerInfoDto)
    )
)]
pub async fn get_caller_info(request: Request) -> Json<CallerInfoDto> {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| RemoteAddressDto::from(*addr));

    let headers = request.headers();

    Json(CallerInfoDto {
        ip,
        forwarded_for: header_value(headers, "x-forwarded-for"),
        nginx_real_ip: header_value(headers, "x-real-ip"),
    })
}
