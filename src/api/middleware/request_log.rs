//! Request logging to the `request_logs` table

use actix_web::dev::ServiceRequest;
use std::net::IpAddr;
use tracing::warn;

use crate::db::{DbPool, RequestLogEntry, UsageRepository};

/// Client IP, preferring proxy headers over the socket address
pub fn extract_client_ip(req: &ServiceRequest) -> Option<IpAddr> {
    let forwarded = req.headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = req.headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());
    if real_ip.is_some() {
        return real_ip;
    }

    req.peer_addr().map(|addr| addr.ip())
}

pub fn extract_user_agent(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("User-Agent")
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.chars().take(500).collect())
}

/// Write the entry in the background
pub fn spawn_request_log(pool: DbPool, entry: RequestLogEntry) {
    tokio::spawn(async move {
        if let Err(e) = UsageRepository::new(pool).log_request(entry).await {
            warn!(error = %e, "Failed to log request");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .to_srv_request();
        assert_eq!(extract_client_ip(&req), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "garbage"))
            .insert_header(("X-Real-IP", "2001:db8::1"))
            .to_srv_request();
        assert_eq!(extract_client_ip(&req), Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_user_agent_truncated() {
        let long = "a".repeat(800);
        let req = TestRequest::default()
            .insert_header(("User-Agent", long.as_str()))
            .to_srv_request();
        assert_eq!(extract_user_agent(&req).unwrap().len(), 500);
    }
}
