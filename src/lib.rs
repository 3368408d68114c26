//! Tsuyaku - Text and Speech Translation Sessions
//!
//! Keeps an in-memory history of translation exchanges, translating through a
//! pluggable translation service and optionally speaking the result.

pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod language;
pub mod playback;
pub mod recognize;
pub mod session;
pub mod speech;
pub mod translate;
