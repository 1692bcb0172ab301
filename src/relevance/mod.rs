//! Optional multi-provider LLM consensus layer for relevance filtering and
//! district tagging. Entirely optional: nothing in [`crate::query`] or
//! [`crate::dedup`] depends on this module, and every entry point here is
//! written to fail open (relevance) or fail safe (district tagging) so a
//! misbehaving or absent provider never turns into a hard pipeline error.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`checker`] | The `RelevanceChecker` trait, shared prompts, and fail-open/fail-safe wrappers |
//! | [`provider_a`] | chat-completions-style checker |
//! | [`provider_b`] | messages-style checker |
//! | [`provider_c`] | generateContent-style checker |
//! | [`consensus`] | Majority-vote composition over any number of checkers |

pub mod checker;
pub mod consensus;
pub mod provider_a;
pub mod provider_b;
pub mod provider_c;

pub use checker::RelevanceChecker;
