//! Protocol module for control point commands.
//!
//! The Mi Band control protocol is a closed table of constant byte
//! sequences written to a single control point characteristic.

pub mod commands;

pub use commands::ControlCommand;
