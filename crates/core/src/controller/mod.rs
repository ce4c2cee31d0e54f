mod core;
pub mod cycle;
pub mod decision;

pub use self::core::Controller;
pub use cycle::*;
pub use decision::*;
