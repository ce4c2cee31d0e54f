use alloy::sol;

sol! {
    /// DutchExchange proxy, the subset of DutchExchange.sol the agent touches.
    ///
    /// Prices are `(num, den)` fractions: units of the buy token per unit of
    /// the sell token. A `den` of zero means "not set yet".
    #[sol(rpc)]
    interface IDutchExchange {
        // ---------- Events ----------

        event NewDeposit(address indexed token, uint256 amount);
        event NewWithdrawal(address indexed token, uint256 amount);

        event NewSellOrder(
            address indexed sellToken,
            address indexed buyToken,
            address indexed user,
            uint256 auctionIndex,
            uint256 amount
        );

        event NewBuyOrder(
            address indexed sellToken,
            address indexed buyToken,
            address indexed user,
            uint256 auctionIndex,
            uint256 amount
        );

        event NewSellerFundsClaim(
            address indexed sellToken,
            address indexed buyToken,
            address indexed user,
            uint256 auctionIndex,
            uint256 amount,
            uint256 frtsIssued
        );

        event NewBuyerFundsClaim(
            address indexed sellToken,
            address indexed buyToken,
            address indexed user,
            uint256 auctionIndex,
            uint256 amount,
            uint256 frtsIssued
        );

        event AuctionCleared(
            address indexed sellToken,
            address indexed buyToken,
            uint256 sellVolume,
            uint256 buyVolume,
            uint256 indexed auctionIndex
        );

        // ---------- Global parameters ----------

        function thresholdNewAuction() external view returns (uint256);
        function ethUSDOracle() external view returns (address);
        function getFeeRatio(address user) external view returns (uint256 num, uint256 den);

        // ---------- Auction state ----------

        function getAuctionIndex(address token1, address token2) external view returns (uint256);
        function getAuctionStart(address token1, address token2) external view returns (uint256);

        function sellVolumesCurrent(address sellToken, address buyToken) external view returns (uint256);
        function sellVolumesNext(address sellToken, address buyToken) external view returns (uint256);
        function buyVolumes(address sellToken, address buyToken) external view returns (uint256);

        function closingPrices(address sellToken, address buyToken, uint256 auctionIndex)
            external view returns (uint256 num, uint256 den);

        function getCurrentAuctionPrice(address sellToken, address buyToken, uint256 auctionIndex)
            external view returns (uint256 num, uint256 den);

        function getPriceOfTokenInLastAuction(address token)
            external view returns (uint256 num, uint256 den);

        // ---------- Per-account ledgers ----------

        function balances(address token, address user) external view returns (uint256);

        function sellerBalances(address sellToken, address buyToken, uint256 auctionIndex, address user)
            external view returns (uint256);

        function buyerBalances(address sellToken, address buyToken, uint256 auctionIndex, address user)
            external view returns (uint256);

        function claimedAmounts(address sellToken, address buyToken, uint256 auctionIndex, address user)
            external view returns (uint256);

        // ---------- Entrypoints ----------

        function deposit(address tokenAddress, uint256 amount) external returns (uint256 newBal);
        function withdraw(address tokenAddress, uint256 amount) external returns (uint256 newBal);

        function depositAndSell(address sellToken, address buyToken, uint256 amount)
            external returns (uint256 newBal, uint256 auctionIndex, uint256 newSellerBal);

        function postSellOrder(address sellToken, address buyToken, uint256 auctionIndex, uint256 amount)
            external returns (uint256 auctionIndex, uint256 newSellerBal);

        function postBuyOrder(address sellToken, address buyToken, uint256 auctionIndex, uint256 amount)
            external returns (uint256 newBuyerBal);

        function claimSellerFunds(address sellToken, address buyToken, address user, uint256 auctionIndex)
            external returns (uint256 returned, uint256 frtsIssued);

        function claimBuyerFunds(address sellToken, address buyToken, address user, uint256 auctionIndex)
            external returns (uint256 returned, uint256 frtsIssued);
    }
}
