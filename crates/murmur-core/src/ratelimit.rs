//! Per-address rate limiter for feedback submissions.
//!
//! Keeps a sliding log of accepted submissions per client IP. A submission is
//! allowed while fewer than `max` submissions from that IP fall inside the
//! trailing window. Check-and-record happens inside one critical section, so
//! concurrent requests from the same address cannot both take the last slot.
//!
//! Time comes from [`tokio::time::Instant`], which lets tests drive the
//! window with `tokio::time::pause()` / `advance()`.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Number of tracked addresses above which idle entries are swept.
const SWEEP_THRESHOLD: usize = 1024;

/// Snapshot of an address's quota, used for `RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    /// Time until the oldest counted submission leaves the window.
    pub reset_after: Duration,
}

/// A slot taken by [`RateLimiter::try_acquire`]. Hand it back with
/// [`RateLimiter::release`] if the submission ends up not being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub addr: IpAddr,
    pub quota: Quota,
    at: Instant,
}

/// A held slot that goes back to the limiter when dropped, unless
/// [`commit`](Self::commit) is called first. Cancelled requests therefore
/// never keep a slot they did not use.
#[derive(Debug)]
pub struct Slot<'a> {
    limiter: &'a RateLimiter,
    reservation: Reservation,
    committed: bool,
}

impl Slot<'_> {
    pub fn quota(&self) -> Quota {
        self.reservation.quota
    }

    /// Keep the slot: the submission it paid for was stored.
    pub fn commit(mut self) -> Quota {
        self.committed = true;
        self.reservation.quota
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.limiter.release(self.reservation);
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    hits: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Take a slot for `addr`, or report the exhausted quota.
    pub fn try_acquire(&self, addr: IpAddr) -> Result<Reservation, Quota> {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);

        if hits.len() > SWEEP_THRESHOLD {
            let window = self.window;
            hits.retain(|_, log| {
                expire(log, now, window);
                !log.is_empty()
            });
        }

        let log = hits.entry(addr).or_default();
        expire(log, now, self.window);

        if log.len() >= self.max as usize {
            return Err(self.quota(log, now));
        }

        log.push_back(now);
        Ok(Reservation {
            addr,
            quota: self.quota(log, now),
            at: now,
        })
    }

    /// Like [`try_acquire`](Self::try_acquire), but the slot is released
    /// automatically unless the returned [`Slot`] is committed.
    pub fn reserve(&self, addr: IpAddr) -> Result<Slot<'_>, Quota> {
        self.try_acquire(addr).map(|reservation| Slot {
            limiter: self,
            reservation,
            committed: false,
        })
    }

    /// Return a slot taken by [`try_acquire`](Self::try_acquire).
    pub fn release(&self, reservation: Reservation) {
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(log) = hits.get_mut(&reservation.addr) {
            if let Some(pos) = log.iter().rposition(|at| *at == reservation.at) {
                log.remove(pos);
            }
            if log.is_empty() {
                hits.remove(&reservation.addr);
            }
        }
    }

    /// Current quota for `addr` without taking a slot.
    pub fn peek(&self, addr: IpAddr) -> Quota {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        match hits.get_mut(&addr) {
            Some(log) => {
                expire(log, now, self.window);
                self.quota(log, now)
            }
            None => Quota {
                limit: self.max,
                remaining: self.max,
                reset_after: self.window,
            },
        }
    }

    fn quota(&self, log: &VecDeque<Instant>, now: Instant) -> Quota {
        let used = u32::try_from(log.len()).unwrap_or(u32::MAX);
        let reset_after = log
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(self.window);

        Quota {
            limit: self.max,
            remaining: self.max.saturating_sub(used),
            reset_after,
        }
    }
}

fn expire(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = log.front() {
        if now.duration_since(*oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}
