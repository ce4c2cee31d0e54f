pub mod dutchx;
pub mod kyber;
mod receipt;

pub use dutchx::DxClient;
pub use kyber::KyberFeed;
