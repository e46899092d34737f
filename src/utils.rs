use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::net::IpAddr;

/// Salted, truncated hash of a personal identifier (phone, email, IP) so log
/// lines can be correlated without exposing the value.
pub fn log_safe_id(id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(id.as_bytes());
    let hash = hasher.finalize();

    hash[..4]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}

/// Resolves the caller IP used for rate limiting and address tracking.
///
/// Order: `X-Real-IP` (set by the fronting nginx), first hop of
/// `X-Forwarded-For`, then the socket peer. Header values that do not parse
/// as an IP are ignored.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> String {
    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(real_ip_str) = real_ip.to_str()
        && let Ok(ip) = real_ip_str.trim().parse::<IpAddr>()
    {
        return normalize_ip(ip);
    }

    if let Some(forwarded_for) = headers.get("x-forwarded-for")
        && let Ok(forwarded_str) = forwarded_for.to_str()
        && let Some(first_hop) = forwarded_str.split(',').next()
        && let Ok(ip) = first_hop.trim().parse::<IpAddr>()
    {
        return normalize_ip(ip);
    }

    match direct_ip {
        Some(ip) => normalize_ip(ip),
        None => "unknown".to_string(),
    }
}

/// IPv4-mapped IPv6 (`::ffff:1.2.3.4`) collapses to plain IPv4 so one caller
/// maps to one address row.
fn normalize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        IpAddr::V4(v4) => v4.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_log_safe_id_is_stable_and_salted() {
        let a = log_safe_id("79991234567", "salt-a");
        assert_eq!(a.len(), 8);
        assert_eq!(a, log_safe_id("79991234567", "salt-a"));
        assert_ne!(a, log_safe_id("79991234567", "salt-b"));
        assert!(!a.contains("7999"));
    }

    #[test]
    fn test_real_ip_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.1"));
        let direct = Some("10.0.0.1".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, direct), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.2, 10.0.0.3"),
        );
        assert_eq!(extract_client_ip(&headers, None), "198.51.100.1");
    }

    #[test]
    fn test_garbage_headers_fall_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("not-an-ip"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("nope"));
        let direct = Some("10.0.0.1".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, direct), "10.0.0.1");
        assert_eq!(extract_client_ip(&headers, None), "unknown");
    }

    #[test]
    fn test_ipv6_normalization() {
        let headers = HeaderMap::new();
        let mapped = Some("::ffff:192.0.2.10".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, mapped), "192.0.2.10");
        let v6 = Some("2001:db8::1".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, v6), "2001:db8::1");
    }
}
