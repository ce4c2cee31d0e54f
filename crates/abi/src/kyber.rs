use alloy::sol;

sol! {
    /// KyberNetworkProxy, reference-rate surface only.
    #[sol(rpc)]
    interface IKyberNetworkProxy {
        /// Rates are scaled by 1e18 and expressed in whole tokens of `dest`
        /// per whole token of `src`.
        function getExpectedRate(address src, address dest, uint256 srcQty)
            external view returns (uint256 expectedRate, uint256 slippageRate);
    }
}
