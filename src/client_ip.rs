//! Client IP resolution from proxy headers.

use http::HeaderMap;

/// Returned when no header identifies the client.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// Resolve the client IP from forwarding headers.
///
/// Precedence: the first entry of `x-forwarded-for`, then `x-real-ip`, then
/// [`UNKNOWN_CLIENT_IP`]. Empty or non-ASCII header values count as absent.
/// Values are returned as sent; they are not parsed as addresses.
pub fn get_client_ip(headers: &HeaderMap) -> String {
    from_forwarded_for(headers)
        .or_else(|| from_real_ip(headers))
        .unwrap_or(UNKNOWN_CLIENT_IP)
        .to_string()
}

/// Extract the leftmost address from X-Forwarded-For
fn from_forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        // "client, proxy1, proxy2"
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
}

fn from_real_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
}
