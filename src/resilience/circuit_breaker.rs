//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, outcomes recorded in a rolling window
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: a limited number of trial calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate >= threshold over the last `window_size` calls
//!                (once at least `minimum_calls` were recorded)
//! Open → Half-Open: after `open_duration`
//! Half-Open → Closed: `half_open_calls` trial calls succeed
//! Half-Open → Open: any trial call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per target (not global)
//! - Pure state machine: no I/O, the caller reports outcomes
//! - Fail fast in Open state (no waiting for timeout)
//! - Admission is a `CallPermit`; a cancelled trial call frees its slot

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use crate::config::CircuitBreakerConfig;

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum State {
    /// `true` entries are failures, oldest first.
    Closed { window: VecDeque<bool> },
    Open { until: Instant },
    HalfOpen { admitted: u32, successes: u32 },
}

/// Count-based circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<State>,
    window_size: usize,
    minimum_calls: usize,
    failure_rate_threshold: f64,
    open_duration: Duration,
    half_open_calls: u32,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        let window_size = config.window_size.max(1);
        Self {
            state: Mutex::new(State::Closed {
                window: VecDeque::with_capacity(window_size),
            }),
            window_size,
            minimum_calls: config.minimum_calls.clamp(1, window_size),
            failure_rate_threshold: config.failure_rate_threshold,
            open_duration: Duration::from_millis(config.open_duration_ms),
            half_open_calls: config.half_open_calls.max(1),
        }
    }

    /// Ask permission for one call. `Err` carries the remaining cool-down.
    ///
    /// The returned permit must be resolved with [`CallPermit::success`] or
    /// [`CallPermit::failure`]. A permit dropped unresolved (the call was
    /// cancelled) hands its half-open trial slot back.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, Duration> {
        self.try_acquire_at(Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, now: Instant) -> Result<CallPermit<'_>, Duration> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let trial = match &mut *state {
            State::Closed { .. } => false,
            State::Open { until } => {
                if now < *until {
                    return Err(until.saturating_duration_since(now));
                }
                tracing::info!("Circuit half-open, admitting trial call");
                *state = State::HalfOpen { admitted: 1, successes: 0 };
                true
            }
            State::HalfOpen { admitted, .. } => {
                if *admitted >= self.half_open_calls {
                    // Trial slots are taken; ask the caller to come back shortly.
                    return Err(Duration::from_millis(10));
                }
                *admitted += 1;
                true
            }
        };
        Ok(CallPermit {
            breaker: self,
            trial,
            resolved: false,
        })
    }

    fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            State::Closed { window } => {
                push_bounded(window, false, self.window_size);
            }
            State::HalfOpen { successes, .. } => {
                *successes += 1;
                if *successes >= self.half_open_calls {
                    tracing::info!("Circuit closed after successful trial calls");
                    *state = State::Closed {
                        window: VecDeque::with_capacity(self.window_size),
                    };
                }
            }
            State::Open { .. } => {}
        }
    }

    fn record_failure_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let open = match &mut *state {
            State::Closed { window } => {
                push_bounded(window, true, self.window_size);
                window.len() >= self.minimum_calls
                    && failure_rate(window) >= self.failure_rate_threshold
            }
            State::HalfOpen { .. } => true,
            State::Open { .. } => false,
        };
        if open {
            *state = State::Open {
                until: now + self.open_duration,
            };
        }
        open
    }

    /// Give back a trial slot whose call never reported an outcome.
    fn release_trial(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let State::HalfOpen { admitted, .. } = &mut *state {
            *admitted = admitted.saturating_sub(1);
            tracing::debug!("Trial call cancelled, slot released");
        }
    }

    pub fn state(&self) -> CircuitState {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            State::Closed { .. } => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

/// Admission for a single call. Resolve it with the call's outcome.
#[derive(Debug)]
#[must_use = "an unresolved permit is treated as a cancelled call"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    resolved: bool,
}

impl CallPermit<'_> {
    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.record_success();
    }

    /// Returns true when this failure opened the circuit.
    pub fn failure(self) -> bool {
        self.failure_at(Instant::now())
    }

    pub(crate) fn failure_at(mut self, now: Instant) -> bool {
        self.resolved = true;
        self.breaker.record_failure_at(now)
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.resolved {
            self.breaker.release_trial();
        }
    }
}

fn push_bounded(window: &mut VecDeque<bool>, failed: bool, capacity: usize) {
    if window.len() == capacity {
        window.pop_front();
    }
    window.push_back(failed);
}

fn failure_rate(window: &VecDeque<bool>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let failures = window.iter().filter(|failed| **failed).count();
    failures as f64 * 100.0 / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(&CircuitBreakerConfig {
            window_size: 4,
            minimum_calls: 4,
            failure_rate_threshold: 50.0,
            open_duration_ms: 1_000,
            half_open_calls: 2,
        })
    }

    fn trip(cb: &CircuitBreaker, now: Instant) {
        for _ in 0..4 {
            cb.try_acquire_at(now).unwrap().failure_at(now);
        }
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_stays_closed_below_minimum_calls() {
        let cb = breaker();
        for _ in 0..3 {
            assert!(!cb.try_acquire().unwrap().failure());
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire().is_ok());
    }

    #[test]
    fn test_opens_at_failure_rate() {
        let cb = breaker();
        cb.try_acquire().unwrap().success();
        cb.try_acquire().unwrap().success();
        cb.try_acquire().unwrap().failure();
        assert!(cb.try_acquire().unwrap().failure());
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.try_acquire().is_err());
    }

    #[test]
    fn test_window_rolls() {
        let cb = breaker();
        cb.try_acquire().unwrap().failure();
        for _ in 0..4 {
            cb.try_acquire().unwrap().success();
        }
        // Window is now all successes; one failure is 25%.
        assert!(!cb.try_acquire().unwrap().failure());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_then_closed() {
        let cb = breaker();
        let start = Instant::now();
        trip(&cb, start);
        let remaining = cb.try_acquire_at(start).unwrap_err();
        assert_eq!(remaining, Duration::from_millis(1_000));

        let later = start + Duration::from_millis(1_001);
        let first = cb.try_acquire_at(later).unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        let second = cb.try_acquire_at(later).unwrap();
        // Only two trial calls are admitted.
        assert!(cb.try_acquire_at(later).is_err());

        first.success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        second.success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = breaker();
        let start = Instant::now();
        trip(&cb, start);
        let later = start + Duration::from_millis(1_500);
        let trial = cb.try_acquire_at(later).unwrap();
        assert!(trial.failure_at(later));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.try_acquire_at(later + Duration::from_millis(999)).is_err());
    }

    #[test]
    fn test_dropped_trial_frees_its_slot() {
        let cb = breaker();
        let start = Instant::now();
        trip(&cb, start);
        let later = start + Duration::from_millis(1_001);

        let kept = cb.try_acquire_at(later).unwrap();
        drop(cb.try_acquire_at(later).unwrap());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // The cancelled call's slot is available again.
        let retried = cb.try_acquire_at(later).unwrap();
        assert!(cb.try_acquire_at(later).is_err());

        kept.success();
        retried.success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_dropped_closed_permit_records_nothing() {
        let cb = breaker();
        for _ in 0..10 {
            drop(cb.try_acquire().unwrap());
        }
        for _ in 0..3 {
            cb.try_acquire().unwrap().failure();
        }
        // Three failures in the window, below the minimum of four.
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
