//! Onboarding flow: multi-step profile wizard reported to a remote platform.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod webhook;
