use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tracing::{debug, warn};

use crate::config::RateLimitTier;
use crate::error::ApiError;

/// Per-client-address limiter for one tier of routes (general API,
/// authentication-sensitive, Slack).
#[derive(Clone)]
pub struct RateLimiter {
    name: &'static str,
    tier: RateLimitTier,
    limiter: Option<Arc<DefaultKeyedRateLimiter<IpAddr>>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, tier: RateLimitTier, enabled: bool) -> Self {
        let limiter = enabled.then(|| Arc::new(governor::RateLimiter::keyed(quota(tier))));
        Self { name, tier, limiter }
    }

    pub fn disabled(name: &'static str) -> Self {
        Self::new(name, RateLimitTier { requests: 1, window_secs: 1 }, false)
    }

    /// `Err` carries the number of seconds until the client may retry
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        limiter.check_key(&ip).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            wait.as_secs().max(1)
        })
    }

    /// Drop per-address state that has fully replenished
    pub fn retain_recent(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Number of client addresses currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }
}

/// `requests` per `window_secs`, all available as an initial burst and
/// replenished evenly across the window.
fn quota(tier: RateLimitTier) -> Quota {
    let requests = NonZeroU32::new(tier.requests).unwrap_or(NonZeroU32::MIN);
    let period = Duration::from_secs(tier.window_secs) / requests.get();
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(requests))
        .allow_burst(requests)
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(&request);

    match limiter.check(ip) {
        Ok(()) => {
            debug!(ip = %ip, tier = limiter.name, "Rate limit check passed");
            Ok(next.run(request).await)
        }
        Err(retry_after) => {
            warn!(
                ip = %ip,
                tier = limiter.name,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            Err(ApiError::too_many_requests(
                format!(
                    "Too many requests: limit is {} per {} seconds",
                    limiter.tier.requests, limiter.tier.window_secs
                ),
                retry_after,
            ))
        }
    }
}
