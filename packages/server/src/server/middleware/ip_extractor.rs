use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};

/// Identity used when no address can be determined.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Extension key for storing extracted IP address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    /// Rate-limit identity for this client.
    pub fn identity(&self) -> String {
        self.0
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
    }
}

/// Middleware to extract client IP address from request
///
/// Priority:
/// 1. X-Forwarded-For header (for requests through proxies)
/// 2. X-Real-IP header (for Nginx)
/// 3. ConnectInfo socket address (direct connection)
pub async fn extract_client_ip(mut request: Request, next: Next) -> Response {
    let socket = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let ip = client_ip(request.headers(), socket);
    request.extensions_mut().insert(ClientIp(ip));

    next.run(request).await
}

fn client_ip(headers: &HeaderMap, socket: Option<IpAddr>) -> Option<IpAddr> {
    // X-Forwarded-For is a comma-separated list, take first
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    forwarded.or_else(real_ip).or(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn forwarded_for_wins() {
        let ip = client_ip(
            &headers(&[
                ("x-forwarded-for", "203.0.113.1, 10.0.0.1"),
                ("x-real-ip", "198.51.100.1"),
            ]),
            Some("127.0.0.1".parse().unwrap()),
        );
        assert_eq!(ip, Some("203.0.113.1".parse().unwrap()));
    }

    #[test]
    fn real_ip_then_socket() {
        let socket: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(
            client_ip(&headers(&[("x-real-ip", "198.51.100.1")]), Some(socket)),
            Some("198.51.100.1".parse().unwrap())
        );
        assert_eq!(
            client_ip(&headers(&[("x-forwarded-for", "garbage")]), Some(socket)),
            Some(socket)
        );
    }

    #[test]
    fn unknown_client_is_anonymous() {
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
        assert_eq!(ClientIp(None).identity(), ANONYMOUS_CLIENT);
    }
}
