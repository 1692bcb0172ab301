//! Reliability primitives shared by every source scheduler.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`rate_limiter`] | Per-second pacing and rolling-window request counters |
//! | [`circuit_breaker`] | 3-state breaker, time-based reset |
//! | [`retry`] | Exponential backoff triggered only by a rate-limit signal |
//! | [`checkpoint`] | Durable set of completed query fingerprints |

pub mod checkpoint;
pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;
