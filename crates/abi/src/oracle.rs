use alloy::sol;

sol! {
    /// PriceOracleInterface as exposed through `DutchExchange.ethUSDOracle()`.
    #[sol(rpc)]
    interface IPriceOracle {
        /// USD per ether, as an unscaled integer.
        function getUSDETHPrice() external view returns (uint256);
    }
}
