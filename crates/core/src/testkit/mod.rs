//! In-memory exchange and feed for exercising the controller without a
//! chain. Enabled for this crate's tests and by the `testkit` feature.

mod exchange;
mod feed;
mod fixtures;

pub use exchange::{CommandKind, IssuedCommand, MockExchange, Rejection, ROUND_START_DELAY};
pub use feed::MockFeed;
pub use fixtures::*;
