//! Mock transport implementations for testing and development.
//!
//! This module provides a simulated sensor bridge that can be controlled
//! programmatically without requiring physical hardware.

pub mod serial;

// Re-export commonly used types
pub use serial::{MockSerial, MockSerialHandle};
