//! Background Tasks Module
//!
//! Contains the timers that refresh cached responses in the background.
//!
//! # Tasks
//! - Post-sync refresh: one-shot or recurring re-fetch of a key

mod scheduler;

pub use scheduler::{RefreshScheduler, TimerKind};
