pub mod access;
pub mod buyback;
pub mod claims;
pub mod client;
pub mod controller;
pub mod error;
pub mod math;
pub mod planner;
pub mod schedule;
pub mod types;
pub mod validation;
pub mod views;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use access::*;
pub use client::*;
pub use controller::*;
pub use error::*;
pub use types::*;
pub use views::*;
