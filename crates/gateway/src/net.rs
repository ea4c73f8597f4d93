//! Client address resolution.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

/// Resolve the client IP, honoring forwarding headers only when the
/// gateway is explicitly configured as sitting behind a proxy.
pub fn resolve_client_ip(headers: &HeaderMap, addr: SocketAddr, behind_proxy: bool) -> IpAddr {
    if behind_proxy && let Some(ip) = extract_forwarded_ip(headers) {
        return ip;
    }
    addr.ip()
}

fn extract_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());
    if let Some(xff) = xff
        && let Some(ip) = xff
            .split(',')
            .find_map(|candidate| parse_ip(candidate.trim()))
    {
        return Some(ip);
    }

    let xri = headers.get("x-real-ip").and_then(|v| v.to_str().ok());
    if let Some(xri) = xri
        && let Some(ip) = parse_ip(xri.trim())
    {
        return Some(ip);
    }

    None
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    if value.is_empty() {
        return None;
    }
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    None
}
