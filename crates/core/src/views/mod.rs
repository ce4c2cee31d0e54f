pub mod exchange;
pub mod feed;

pub use exchange::*;
pub use feed::*;
