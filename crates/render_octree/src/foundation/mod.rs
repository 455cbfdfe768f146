//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Pooled per-frame buffers
//! - Collections (interning, handle maps)
//! - Time measurement
//! - Logging utilities

pub mod math;
pub mod memory;
pub mod collections;
pub mod time;
pub mod logging;
