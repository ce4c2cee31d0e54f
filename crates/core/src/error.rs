use std::{fmt, time::Duration};

use alloy::{
    contract,
    primitives::{Address, B256, U256},
    providers::{MulticallError, PendingTransactionError},
    transports::TransportError,
};
use thiserror::Error;

use crate::{
    access::Role,
    types::{
        primitives::{AuctionIndex, TokenAmount},
        snapshot::RoundMarker,
    },
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} address must be set")]
    MissingAddress { field: &'static str },

    #[error("failed to fetch config: {0}")]
    Transport(#[from] TransportError),

    #[error("contract call failed: {0}")]
    Contract(#[from] contract::Error),

    #[error("multicall failed: {0}")]
    Multicall(#[from] MulticallError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("reference price is zero")]
    InvalidOraclePrice,

    #[error("division by a zero denominator")]
    ZeroDenominator,

    #[error("fee ratio {num}/{den} leaves nothing after the fee")]
    InvalidFeeRatio { num: U256, den: U256 },

    #[error("arithmetic overflow")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("{caller} is not allowed to act as {role}")]
    Unauthorized { caller: Address, role: Role },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("insufficient balance of {asset}: need {required}, have {available}")]
    InsufficientBalance {
        asset: Address,
        required: TokenAmount,
        available: TokenAmount,
    },

    #[error("amount must be greater than zero")]
    AmountIsZero,

    #[error("round {round} has no closing price yet")]
    RoundNotYetClosed { round: AuctionIndex },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to fetch state: {0}")]
    Transport(#[from] TransportError),

    #[error("contract call failed: {0}")]
    Contract(#[from] contract::Error),

    #[error("multicall failed: {0}")]
    Multicall(#[from] MulticallError),

    #[error("{what} read timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },

    #[error("latest block not available")]
    MissingBlock,

    #[error("{field} does not fit in 64 bits")]
    ValueOutOfRange { field: &'static str },
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction failed: {0}")]
    Contract(#[from] contract::Error),

    #[error("pending transaction error: {0}")]
    Pending(#[from] PendingTransactionError),

    #[error("transaction receipt missing body")]
    MissingReceipt,

    #[error("transaction reverted: {tx_hash:?}")]
    Reverted { tx_hash: B256 },

    #[error("{event} event missing from receipt {tx_hash:?}")]
    MissingEvent { event: &'static str, tx_hash: B256 },

    #[error("command rejected, round moved from {expected} to {observed}")]
    StaleSnapshotRejected {
        expected: RoundMarker,
        observed: RoundMarker,
    },
}

/// Stable label for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Misconfigured,
    InvalidOraclePrice,
    Arithmetic,
    Unauthorized,
    InsufficientBalance,
    InvalidAmount,
    RoundNotYetClosed,
    Timeout,
    ReadFailed,
    Rejected,
    StaleSnapshotRejected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Misconfigured => "misconfigured",
            Self::InvalidOraclePrice => "invalid_oracle_price",
            Self::Arithmetic => "arithmetic",
            Self::Unauthorized => "unauthorized",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InvalidAmount => "invalid_amount",
            Self::RoundNotYetClosed => "round_not_yet_closed",
            Self::Timeout => "timeout",
            Self::ReadFailed => "read_failed",
            Self::Rejected => "rejected",
            Self::StaleSnapshotRejected => "stale_snapshot_rejected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Misconfigured,
            Error::Math(MathError::InvalidOraclePrice) => ErrorKind::InvalidOraclePrice,
            Error::Math(_) => ErrorKind::Arithmetic,
            Error::Access(_) => ErrorKind::Unauthorized,
            Error::Validation(ValidationError::InsufficientBalance { .. }) => {
                ErrorKind::InsufficientBalance
            }
            Error::Validation(ValidationError::AmountIsZero) => ErrorKind::InvalidAmount,
            Error::Validation(ValidationError::RoundNotYetClosed { .. }) => {
                ErrorKind::RoundNotYetClosed
            }
            Error::State(StateError::Timeout { .. }) => ErrorKind::Timeout,
            Error::State(_) => ErrorKind::ReadFailed,
            Error::Transaction(TransactionError::StaleSnapshotRejected { .. }) => {
                ErrorKind::StaleSnapshotRejected
            }
            Error::Transaction(_) => ErrorKind::Rejected,
        }
    }

    /// Whether the next cycle, starting from a fresh snapshot, can be
    /// expected to get past this failure without operator intervention.
    /// Bad oracle or price readings abort only the cycle that saw them.
    pub fn is_transient(&self) -> bool {
        match self.kind() {
            ErrorKind::Misconfigured | ErrorKind::Unauthorized | ErrorKind::InvalidAmount => false,
            ErrorKind::InvalidOraclePrice
            | ErrorKind::Arithmetic
            | ErrorKind::InsufficientBalance
            | ErrorKind::RoundNotYetClosed
            | ErrorKind::Timeout
            | ErrorKind::ReadFailed
            | ErrorKind::Rejected
            | ErrorKind::StaleSnapshotRejected => true,
        }
    }
}
