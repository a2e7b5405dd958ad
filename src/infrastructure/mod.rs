//! Infrastructure layer
//!
//! ESP32 implementations of the engine's platform traits, the tasks that
//! drive them, and the concrete types shared between tasks.

pub mod drivers;
pub mod tasks;
pub mod types;
