//! Core types for the caching system.

use chrono::{DateTime, Duration, Utc};

/// A decoded value held in memory, with the time it was stored and an
/// optional expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
  pub data: T,
  pub stored_at: DateTime<Utc>,
  pub expires_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
  /// Create an entry stored at `now`, expiring `ttl` later if given. A
  /// deadline past the representable range means no expiry.
  pub fn new(data: T, now: DateTime<Utc>, ttl: Option<Duration>) -> Self {
    Self {
      data,
      stored_at: now,
      expires_at: ttl.and_then(|ttl| now.checked_add_signed(ttl)),
    }
  }

  /// An entry without an expiry never expires.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    matches!(self.expires_at, Some(expires_at) if now > expires_at)
  }
}

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
  now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: std::sync::Mutex::new(start),
    }
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap();
    *now += by;
  }
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}
