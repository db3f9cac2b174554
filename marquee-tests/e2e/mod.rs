//! End-to-end tests for Marquee
//!
//! Full viewing sessions: a catalog descriptor opened on a simulated player
//! and played to the end, and every fault scenario checked against the
//! playback invariants.

mod catalog_playback;
mod fault_scenarios;
