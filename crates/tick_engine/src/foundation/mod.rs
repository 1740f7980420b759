//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types for 2D poses
//! - The fixed-timestep clock and its time/scheduling seams
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
