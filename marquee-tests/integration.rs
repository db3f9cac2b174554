//! Integration tests for Marquee
//!
//! These tests drive the public player handle against the simulated backend,
//! the file-backed resume store and the HTTP manifest loader reading from
//! disk.

#[path = "integration/keyboard_controls.rs"]
mod keyboard_controls;
#[path = "integration/manifest_loading.rs"]
mod manifest_loading;
#[path = "integration/playback_workflow.rs"]
mod playback_workflow;
#[path = "integration/resume_persistence.rs"]
mod resume_persistence;
