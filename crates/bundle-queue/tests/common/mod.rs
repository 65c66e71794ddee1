//! Shared test utilities for bundle-queue integration tests.
//!
//! This module provides:
//! - Builders for archive and JSON bundle payloads
//! - Scripted converters that record call order and concurrency

pub mod builders;
pub mod converters;

pub use builders::*;
pub use converters::*;
