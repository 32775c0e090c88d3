// src/models/mod.rs
pub mod events;
pub mod state;

pub use events::{ConnectionEvent, CountryCode, ObservationWindow, UNKNOWN_ADDRESS};
pub use state::{StateKey, StateVector, STATE_FEATURE_COUNT};
