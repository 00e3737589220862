//! Macro search package: MCTS variants and an exhaustive worst-case solver
//! over the core crafting simulator.

mod config;
mod error;
mod fork;
mod mcts;
mod optimal;
mod report;
mod result;
mod score;
mod solve;
mod stepwise;
mod tree;

pub use config::*;
pub use error::*;
pub use fork::*;
pub use mcts::*;
pub use optimal::*;
pub use report::*;
pub use result::*;
pub use score::*;
pub use solve::*;
pub use stepwise::*;
pub use tree::*;
