pub mod action;
pub mod config;
pub mod primitives;
pub mod rational;
pub mod snapshot;
pub mod state;

pub use action::*;
pub use config::*;
pub use primitives::*;
pub use rational::*;
pub use snapshot::*;
pub use state::*;
