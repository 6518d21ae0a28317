//! # Client Origin
//!
//! Resolves the network origin a request is charged to.
//!
//! The socket peer is the origin unless it is a configured trusted proxy.
//! Only then are `X-Forwarded-For` and `X-Real-IP` consulted, and
//! `X-Forwarded-For` is walked from the right, skipping trusted hops, so a
//! client cannot choose its origin by prepending entries.

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, Request};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::debug;

/// Origin of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Proxies whose forwarding headers are believed.
#[derive(Debug, Clone)]
pub struct TrustedProxies(pub Arc<[IpAddr]>);

impl Default for TrustedProxies {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl TrustedProxies {
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
    TrustedProxies: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let trusted = TrustedProxies::from_ref(state);
        Ok(ClientIp(client_ip(&parts.headers, &parts.extensions, &trusted)))
    }
}

/// Extract client IP from request.
pub fn extract_client_ip<B>(req: &Request<B>, trusted: &TrustedProxies) -> IpAddr {
    client_ip(req.headers(), req.extensions(), trusted)
}

fn client_ip(headers: &HeaderMap, extensions: &Extensions, trusted: &TrustedProxies) -> IpAddr {
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if !trusted.contains(&peer) {
        return peer;
    }

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| nearest_untrusted_hop(v, trusted))
    {
        debug!(proxy = %peer, client = %ip, "Origin taken from X-Forwarded-For");
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    peer
}

/// Rightmost hop that is not a trusted proxy. Stops at the first
/// unparsable entry; everything left of it is client-controlled.
fn nearest_untrusted_hop(header: &str, trusted: &TrustedProxies) -> Option<IpAddr> {
    let mut origin = None;
    for hop in header.split(',').rev() {
        let Ok(ip) = hop.trim().parse::<IpAddr>() else {
            break;
        };
        origin = Some(ip);
        if !trusted.contains(&ip) {
            break;
        }
    }
    origin
}
