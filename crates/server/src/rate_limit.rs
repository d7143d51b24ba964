//! Sliding-window request admission.
//!
//! Two quotas are enforced together: one shared by the whole deployment and
//! one per client address. Each quota keeps a log of admission instants and
//! admits a request only if fewer than `limit` admissions fall inside the
//! trailing window, so no rolling window ever holds more than `limit`.

use std::collections::VecDeque;
use std::fmt;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A request budget over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub window: Duration,
}

impl Quota {
    pub fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window: Duration::from_secs(60),
        }
    }

    pub fn per_hour(limit: u32) -> Self {
        Self {
            limit,
            window: Duration::from_secs(60 * 60),
        }
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window.as_secs() {
            60 => write!(f, "{} per 1 minute", self.limit),
            3600 => write!(f, "{} per 1 hour", self.limit),
            secs => write!(f, "{} per {} seconds", self.limit, secs),
        }
    }
}

/// Which quota rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Client,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Client => "client",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Rate limit exceeded: {quota}")]
pub struct RateLimitError {
    pub scope: Scope,
    pub quota: Quota,
    /// Time until the oldest admission in the window expires.
    pub retry_after: Duration,
}

/// Process-wide limiter, shared through server state.
#[derive(Debug)]
pub struct RateLimiter {
    global_quota: Quota,
    client_quota: Quota,
    global: Mutex<VecDeque<Instant>>,
    clients: DashMap<IpAddr, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(global_quota: Quota, client_quota: Quota) -> Self {
        Self {
            global_quota,
            client_quota,
            global: Mutex::new(VecDeque::with_capacity(global_quota.limit as usize)),
            clients: DashMap::new(),
        }
    }

    pub fn global_quota(&self) -> Quota {
        self.global_quota
    }

    pub fn client_quota(&self) -> Quota {
        self.client_quota
    }

    /// Admit or reject a request from `client` now.
    pub fn check(&self, client: IpAddr) -> Result<(), RateLimitError> {
        self.check_at(client, Instant::now())
    }

    /// Admit or reject at an explicit instant. A rejection by either quota
    /// records nothing in the other.
    pub fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), RateLimitError> {
        let mut global = self
            .global
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        evict(&mut global, now, self.global_quota.window);
        if global.len() >= self.global_quota.limit as usize {
            return Err(rejection(Scope::Global, self.global_quota, &global, now));
        }

        // The global lock stays held so the two admissions land together.
        let mut entry = self.clients.entry(client).or_default();
        let log = entry.value_mut();
        evict(log, now, self.client_quota.window);
        if log.len() >= self.client_quota.limit as usize {
            return Err(rejection(Scope::Client, self.client_quota, log, now));
        }

        log.push_back(now);
        global.push_back(now);
        Ok(())
    }

    /// Drop client logs with no admission inside the window.
    pub fn purge_idle(&self) {
        self.purge_idle_at(Instant::now());
    }

    pub fn purge_idle_at(&self, now: Instant) {
        let window = self.client_quota.window;
        self.clients.retain(|_, log| {
            evict(log, now, window);
            !log.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

fn evict(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = log.front() {
        if now.saturating_duration_since(oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}

fn rejection(scope: Scope, quota: Quota, log: &VecDeque<Instant>, now: Instant) -> RateLimitError {
    let retry_after = log
        .front()
        .map(|&oldest| quota.window.saturating_sub(now.saturating_duration_since(oldest)))
        .unwrap_or(quota.window);
    RateLimitError {
        scope,
        quota,
        retry_after,
    }
}
