use alloy::{
    consensus::BlockHeader,
    eips::{BlockId, BlockNumberOrTag},
    primitives::{Address, U256},
    providers::Provider,
};
use async_trait::async_trait;
use dxmm_abi::{IDutchExchange, IERC20Minimal, IPriceOracle};
use tracing::{debug, info};

use super::receipt::confirm;
use crate::{
    claims::ClaimCursor,
    error::{ConfigError, Error, StateError, TransactionError},
    types::{
        action::{BalanceReceipt, BuyReceipt, ClaimReceipt, SellReceipt, TransferReceipt},
        config::AgentConfig,
        primitives::{AuctionIndex, Direction, Timestamp, TokenAmount, TokenPair},
        rational::Rational,
        snapshot::{AccountPosition, AssetBalances, AuctionSnapshot, Balances, RoundMarker, RoundRange},
    },
    views::{Custody, ExchangeCommands, ExchangeView},
};

/// DutchExchange adapter for one holder, the signer of `provider`.
pub struct DxClient<P>
where
    P: Provider + Clone,
{
    provider: P,
    config: AgentConfig,
    holder: Address,
    confirmations: u64,
}

impl<P> DxClient<P>
where
    P: Provider + Clone,
{
    pub fn new(
        provider: P,
        config: AgentConfig,
        holder: Address,
        confirmations: u64,
    ) -> Result<Self, Error> {
        config.validate()?;
        if holder == Address::ZERO {
            return Err(ConfigError::MissingAddress { field: "holder" }.into());
        }
        Ok(Self {
            provider,
            config,
            holder,
            confirmations,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn holder(&self) -> Address {
        self.holder
    }

    /// Exchange-wide parameters, useful for a startup sanity check.
    pub async fn fetch_parameters(&self) -> Result<(U256, Address), Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let (threshold, oracle) = self
            .provider
            .multicall()
            .add(dx.thresholdNewAuction())
            .add(dx.ethUSDOracle())
            .aggregate()
            .await
            .map_err(ConfigError::from)?;
        Ok((threshold, oracle))
    }

    async fn fetch_positions(
        &self,
        at: BlockId,
        direction: Direction,
        pair: TokenPair,
        range: RoundRange,
    ) -> Result<Vec<AccountPosition>, Error> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let (sell, buy) = (pair.sell_token, pair.buy_token);

        let mut sellers = self.provider.multicall().dynamic().block(at);
        let mut buyers = self.provider.multicall().dynamic().block(at);
        let mut closings = self.provider.multicall().dynamic().block(at);
        for round in range.rounds() {
            sellers = sellers.add_dynamic(dx.sellerBalances(sell, buy, round.as_u256(), self.holder));
            buyers = buyers.add_dynamic(dx.buyerBalances(sell, buy, round.as_u256(), self.holder));
            closings = closings.add_dynamic(dx.closingPrices(sell, buy, round.as_u256()));
        }

        let seller_balances = sellers.aggregate().await.map_err(StateError::from)?;
        let buyer_balances = buyers.aggregate().await.map_err(StateError::from)?;
        let closing_prices = closings.aggregate().await.map_err(StateError::from)?;

        let positions = range
            .rounds()
            .zip(seller_balances)
            .zip(buyer_balances)
            .zip(closing_prices)
            .map(|(((round, seller), buyer), closing)| AccountPosition {
                direction,
                round,
                seller_balance: TokenAmount::new(seller),
                buyer_balance: TokenAmount::new(buyer),
                closing_price: Rational::from_exchange(closing.num, closing.den),
            })
            .collect();

        Ok(positions)
    }

    async fn ensure_allowance(&self, asset: Address, amount: TokenAmount) -> Result<(), Error> {
        let erc20 = IERC20Minimal::new(asset, &self.provider);
        let allowance = erc20
            .allowance(self.holder, self.config.exchange)
            .call()
            .await
            .map_err(StateError::from)?;
        if allowance >= amount.as_u256() {
            return Ok(());
        }

        let call = erc20.approve(self.config.exchange, amount.as_u256());
        call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;
        debug!(%asset, %amount, tx_hash = %confirmed.tx_hash, "approved exchange allowance");
        Ok(())
    }
}

#[async_trait]
impl<P> ExchangeView for DxClient<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    async fn fetch_snapshot(
        &self,
        cursor: &ClaimCursor,
        scan_limit: u64,
    ) -> Result<AuctionSnapshot, Error> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(StateError::from)?
            .ok_or(StateError::MissingBlock)?;
        let block_number = block.header.number();
        let current_time = Timestamp::new(block.header.timestamp());
        let at = BlockId::number(block_number);

        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let token = IERC20Minimal::new(self.config.token, &self.provider);
        let numeraire = IERC20Minimal::new(self.config.numeraire, &self.provider);
        let (t, n) = (self.config.token, self.config.numeraire);

        let (
            auction_index_raw,
            reverse_index_raw,
            auction_start_raw,
            sell_volume,
            buy_volume,
            usd_threshold,
            oracle,
            fee_ratio_raw,
            last_price_raw,
            exchange_token,
            exchange_numeraire,
            custody_token,
            custody_numeraire,
        ) = self
            .provider
            .multicall()
            .block(at)
            .add(dx.getAuctionIndex(t, n))
            .add(dx.getAuctionIndex(n, t))
            .add(dx.getAuctionStart(t, n))
            .add(dx.sellVolumesCurrent(t, n))
            .add(dx.buyVolumes(t, n))
            .add(dx.thresholdNewAuction())
            .add(dx.ethUSDOracle())
            .add(dx.getFeeRatio(self.holder))
            .add(dx.getPriceOfTokenInLastAuction(t))
            .add(dx.balances(t, self.holder))
            .add(dx.balances(n, self.holder))
            .add(token.balanceOf(self.holder))
            .add(numeraire.balanceOf(self.holder))
            .aggregate()
            .await
            .map_err(StateError::from)?;

        let auction_index = AuctionIndex::from_u256(auction_index_raw)?;
        let reverse_auction_index = AuctionIndex::from_u256(reverse_index_raw)?;

        let oracle = IPriceOracle::new(oracle, &self.provider);
        let (current_price_raw, oracle_usd_per_numeraire) = self
            .provider
            .multicall()
            .block(at)
            .add(dx.getCurrentAuctionPrice(t, n, auction_index.as_u256()))
            .add(oracle.getUSDETHPrice())
            .aggregate()
            .await
            .map_err(StateError::from)?;

        let cursor_window = cursor.window(auction_index, reverse_auction_index, scan_limit);
        let forward = self.config.pair(Direction::Forward);
        let mut positions = self
            .fetch_positions(at, Direction::Forward, forward, cursor_window.forward)
            .await?;
        positions.extend(
            self.fetch_positions(at, Direction::Reverse, forward.reversed(), cursor_window.reverse)
                .await?,
        );

        debug!(
            block_number,
            %auction_index,
            auction_start = %auction_start_raw,
            positions = positions.len(),
            "fetched snapshot"
        );

        Ok(AuctionSnapshot {
            block_number,
            current_time,
            holder: self.holder,
            pair: forward,
            auction_index,
            reverse_auction_index,
            auction_start: Timestamp::from_u256(auction_start_raw)?,
            sell_volume: TokenAmount::new(sell_volume),
            buy_volume: TokenAmount::new(buy_volume),
            current_price: Rational::from_exchange(current_price_raw.num, current_price_raw.den),
            usd_threshold,
            oracle_usd_per_numeraire,
            last_closing_price: Rational::from_exchange(last_price_raw.num, last_price_raw.den),
            fee_ratio: Rational::new(fee_ratio_raw.num, fee_ratio_raw.den)?,
            balances: Balances {
                exchange: AssetBalances {
                    token: TokenAmount::new(exchange_token),
                    numeraire: TokenAmount::new(exchange_numeraire),
                },
                custody: AssetBalances {
                    token: TokenAmount::new(custody_token),
                    numeraire: TokenAmount::new(custody_numeraire),
                },
            },
            claim_window: cursor_window,
            positions,
        })
    }

    async fn fetch_marker(&self) -> Result<RoundMarker, Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let (t, n) = (self.config.token, self.config.numeraire);
        let (index, start) = self
            .provider
            .multicall()
            .add(dx.getAuctionIndex(t, n))
            .add(dx.getAuctionStart(t, n))
            .aggregate()
            .await
            .map_err(StateError::from)?;
        Ok(RoundMarker {
            auction_index: AuctionIndex::from_u256(index)?,
            auction_start: Timestamp::from_u256(start)?,
        })
    }

    async fn closing_price(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
    ) -> Result<Option<Rational>, Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let price = dx
            .closingPrices(pair.sell_token, pair.buy_token, round.as_u256())
            .call()
            .await
            .map_err(StateError::from)?;
        Ok(Rational::from_exchange(price.num, price.den))
    }

    async fn exchange_balance(&self, asset: Address) -> Result<TokenAmount, Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let balance = dx
            .balances(asset, self.holder)
            .call()
            .await
            .map_err(StateError::from)?;
        Ok(TokenAmount::new(balance))
    }
}

#[async_trait]
impl<P> ExchangeCommands for DxClient<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    async fn deposit(&self, asset: Address, amount: TokenAmount) -> Result<BalanceReceipt, Error> {
        self.ensure_allowance(asset, amount).await?;

        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let call = dx.deposit(asset, amount.as_u256());
        let new_balance = call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;

        info!(%asset, %amount, tx_hash = %confirmed.tx_hash, "deposited");
        Ok(BalanceReceipt {
            tx_hash: confirmed.tx_hash,
            new_balance: TokenAmount::new(new_balance),
        })
    }

    async fn withdraw(
        &self,
        asset: Address,
        amount: TokenAmount,
    ) -> Result<BalanceReceipt, Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let call = dx.withdraw(asset, amount.as_u256());
        let new_balance = call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;

        info!(%asset, %amount, tx_hash = %confirmed.tx_hash, "withdrew");
        Ok(BalanceReceipt {
            tx_hash: confirmed.tx_hash,
            new_balance: TokenAmount::new(new_balance),
        })
    }

    async fn deposit_and_sell(
        &self,
        pair: TokenPair,
        amount: TokenAmount,
    ) -> Result<SellReceipt, Error> {
        self.ensure_allowance(pair.sell_token, amount).await?;

        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let call = dx.depositAndSell(pair.sell_token, pair.buy_token, amount.as_u256());
        call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;

        let order = confirmed.require_event::<IDutchExchange::NewSellOrder>()?;
        Ok(SellReceipt {
            tx_hash: confirmed.tx_hash,
            auction_index: AuctionIndex::from_u256(order.auctionIndex)?,
            amount: TokenAmount::new(order.amount),
        })
    }

    async fn post_sell_order(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
        amount: TokenAmount,
    ) -> Result<SellReceipt, Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let call = dx.postSellOrder(
            pair.sell_token,
            pair.buy_token,
            round.as_u256(),
            amount.as_u256(),
        );
        call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;

        let order = confirmed.require_event::<IDutchExchange::NewSellOrder>()?;
        Ok(SellReceipt {
            tx_hash: confirmed.tx_hash,
            auction_index: AuctionIndex::from_u256(order.auctionIndex)?,
            amount: TokenAmount::new(order.amount),
        })
    }

    async fn post_buy_order(
        &self,
        pair: TokenPair,
        round: AuctionIndex,
        amount: TokenAmount,
    ) -> Result<BuyReceipt, Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let call = dx.postBuyOrder(
            pair.sell_token,
            pair.buy_token,
            round.as_u256(),
            amount.as_u256(),
        );
        call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;

        let order = confirmed.require_event::<IDutchExchange::NewBuyOrder>()?;
        Ok(BuyReceipt {
            tx_hash: confirmed.tx_hash,
            auction_index: AuctionIndex::from_u256(order.auctionIndex)?,
            amount: TokenAmount::new(order.amount),
        })
    }

    async fn claim_seller_funds(
        &self,
        pair: TokenPair,
        holder: Address,
        round: AuctionIndex,
    ) -> Result<ClaimReceipt, Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let call = dx.claimSellerFunds(pair.sell_token, pair.buy_token, holder, round.as_u256());
        let expected = call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;

        let (returned, frts_issued) = confirmed
            .event::<IDutchExchange::NewSellerFundsClaim>()
            .map_or((expected.returned, expected.frtsIssued), |claim| {
                (claim.amount, claim.frtsIssued)
            });
        Ok(ClaimReceipt {
            tx_hash: confirmed.tx_hash,
            returned: TokenAmount::new(returned),
            frts_issued: TokenAmount::new(frts_issued),
        })
    }

    async fn claim_buyer_funds(
        &self,
        pair: TokenPair,
        holder: Address,
        round: AuctionIndex,
    ) -> Result<ClaimReceipt, Error> {
        let dx = IDutchExchange::new(self.config.exchange, &self.provider);
        let call = dx.claimBuyerFunds(pair.sell_token, pair.buy_token, holder, round.as_u256());
        let expected = call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;

        let (returned, frts_issued) = confirmed
            .event::<IDutchExchange::NewBuyerFundsClaim>()
            .map_or((expected.returned, expected.frtsIssued), |claim| {
                (claim.amount, claim.frtsIssued)
            });
        Ok(ClaimReceipt {
            tx_hash: confirmed.tx_hash,
            returned: TokenAmount::new(returned),
            frts_issued: TokenAmount::new(frts_issued),
        })
    }
}

#[async_trait]
impl<P> Custody for DxClient<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    async fn custody_balance(&self, asset: Address) -> Result<TokenAmount, Error> {
        let erc20 = IERC20Minimal::new(asset, &self.provider);
        let balance = erc20
            .balanceOf(self.holder)
            .call()
            .await
            .map_err(StateError::from)?;
        Ok(TokenAmount::new(balance))
    }

    async fn transfer_from_custody(
        &self,
        asset: Address,
        amount: TokenAmount,
        to: Address,
    ) -> Result<TransferReceipt, Error> {
        let erc20 = IERC20Minimal::new(asset, &self.provider);
        let call = erc20.transfer(to, amount.as_u256());
        call.call().await.map_err(TransactionError::from)?;
        let pending = call.send().await.map_err(TransactionError::from)?;
        let confirmed = confirm(pending, self.confirmations).await?;

        info!(%asset, %amount, %to, tx_hash = %confirmed.tx_hash, "transferred from custody");
        Ok(TransferReceipt {
            tx_hash: confirmed.tx_hash,
        })
    }
}
