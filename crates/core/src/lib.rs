//! Core crafting simulation. Keep this crate free of IO and platform concerns.

pub mod actions;
pub mod error;
pub mod rng;
pub mod simulator;
pub mod state;

pub use actions::*;
pub use error::*;
pub use rng::*;
pub use simulator::*;
pub use state::*;
