use alloy::primitives::B256;

use crate::{
    buyback::BuyBackPlan,
    claims::ClaimCursor,
    planner::TriggerPlan,
    types::{
        action::{BuyReceipt, ClaimCommand, SellReceipt},
        primitives::{Timestamp, TokenAmount},
        rational::Rational,
        snapshot::{Balances, RoundMarker},
        state::ParticipationState,
    },
    validation::FundingSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Claimed { tx_hash: B256 },
    /// The exchange had not closed the round after all; nothing was paid.
    RoundNotYetClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub command: ClaimCommand,
    pub returned: TokenAmount,
    pub status: ClaimStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleAction {
    Idle {
        threshold: TokenAmount,
    },
    Triggered {
        plan: TriggerPlan,
        funding: FundingSource,
        receipt: SellReceipt,
    },
    Waiting {
        starts_at: Timestamp,
    },
    BoughtBack {
        plan: BuyBackPlan,
        receipt: BuyReceipt,
    },
    Held {
        price: Option<Rational>,
        reference: Option<Rational>,
    },
}

impl CycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleAction::Idle { .. } => "idle",
            CycleAction::Triggered { .. } => "triggered",
            CycleAction::Waiting { .. } => "waiting",
            CycleAction::BoughtBack { .. } => "bought_back",
            CycleAction::Held { .. } => "held",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub block_number: u64,
    pub state: ParticipationState,
    pub claims: Vec<ClaimOutcome>,
    pub action: CycleAction,
}

impl CycleReport {
    pub fn claimed_count(&self) -> u64 {
        self.claims
            .iter()
            .filter(|outcome| matches!(outcome.status, ClaimStatus::Claimed { .. }))
            .count() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub claims: u64,
    pub triggers: u64,
    pub buy_backs: u64,
}

/// Read-only view of where the agent stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub block_number: u64,
    pub current_time: Timestamp,
    pub marker: RoundMarker,
    pub state: ParticipationState,
    pub trigger: TriggerPlan,
    pub sell_volume: TokenAmount,
    pub buy_volume: TokenAmount,
    pub current_price: Option<Rational>,
    pub remaining_sell: Option<TokenAmount>,
    pub remaining_buy: Option<TokenAmount>,
    pub fee_ratio: Rational,
    pub balances: Balances,
    pub pending_claims: Vec<ClaimCommand>,
    pub cursor: ClaimCursor,
}
