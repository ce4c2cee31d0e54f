pub mod dutchx;
pub mod erc20;
pub mod kyber;
pub mod oracle;

pub use dutchx::IDutchExchange;
pub use erc20::IERC20Minimal;
pub use kyber::IKyberNetworkProxy;
pub use oracle::IPriceOracle;
