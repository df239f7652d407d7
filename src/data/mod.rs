//! Decoded data types and the pure byte-payload decoders.
//!
//! Everything in this module is stateless and safe to call from any
//! thread; nothing here touches the session or the transport.

pub mod sensor;
pub mod steps;

pub use sensor::{AccelerationSample, SensorFrame};
pub use steps::parse_step_count;
