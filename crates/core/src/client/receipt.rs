use alloy::{
    consensus::TxReceipt, network::Ethereum, primitives::B256,
    providers::PendingTransactionBuilder, rpc::types::Log, sol_types::SolEvent,
};

use crate::error::TransactionError;

pub(crate) struct Confirmed {
    pub tx_hash: B256,
    logs: Vec<Log>,
}

impl Confirmed {
    pub fn event<E: SolEvent>(&self) -> Option<E> {
        self.logs
            .iter()
            .find_map(|log| log.log_decode::<E>().ok())
            .map(|decoded| decoded.inner.data)
    }

    pub fn require_event<E: SolEvent>(&self) -> Result<E, TransactionError> {
        self.event::<E>().ok_or(TransactionError::MissingEvent {
            event: E::SIGNATURE,
            tx_hash: self.tx_hash,
        })
    }
}

/// Waits for `confirmations` blocks and rejects reverted receipts.
pub(crate) async fn confirm(
    pending: PendingTransactionBuilder<Ethereum>,
    confirmations: u64,
) -> Result<Confirmed, TransactionError> {
    let receipt = pending
        .with_required_confirmations(confirmations)
        .get_receipt()
        .await?;

    let receipt_body = receipt
        .inner
        .as_receipt()
        .ok_or(TransactionError::MissingReceipt)?;

    if !receipt_body.status() {
        return Err(TransactionError::Reverted {
            tx_hash: receipt.transaction_hash,
        });
    }

    Ok(Confirmed {
        tx_hash: receipt.transaction_hash,
        logs: receipt_body.logs().to_vec(),
    })
}
