//! Process-local sliding-window rate limiter keyed by source address.
//!
//! Deliberately not backed by Redis: the admission guard's anonymous-trial
//! budget is scoped per gateway process, not per fleet. An attacker
//! colocating across replicas gets proportionally more budget, which is
//! acceptable for this tier.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
};
use dashmap::DashMap;

/// Sliding-window counter keyed by an opaque source identifier (client IP).
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    budget: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(budget: u32, window_seconds: u64) -> Self {
        Self {
            windows: DashMap::new(),
            budget,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Consume one point against `source`'s window. Returns `true` if the
    /// request is admitted, `false` if the budget is exhausted.
    pub fn try_consume(&self, source: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(source.to_string()).or_default();

        while let Some(&oldest) = entry.front() {
            if now.duration_since(oldest) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() as u32 >= self.budget {
            return false;
        }

        entry.push_back(now);
        true
    }
}

/// Resolve the caller's source address, preferring forwarding headers so a
/// reverse-proxy deployment still rate-limits on the real client.
pub fn client_ip(request: &Request<Body>, connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    if let Some(real_ip) = request.headers().get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        return real_ip.to_string();
    }

    connect_info
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
