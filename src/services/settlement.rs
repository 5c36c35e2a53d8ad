//! Centralized transaction settlement
//!
//! Both the webhook reconciliation path and the status poll path observe
//! provider statuses; every status transition and the balance credit go
//! through this one service. The credit itself is the compare-and-swap in
//! `TransactionRepository::complete_with_credit`, so whichever path reports
//! completion first performs it and the other becomes a no-op.

use crate::database::transaction_repository::{CreditOutcome, TransactionRepository};
use crate::error::AppResult;
use crate::payments::types::{DepositStatus, ProviderStatus};
use std::sync::Arc;
use tracing::{info, warn};

/// What a settlement attempt did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Transaction completed and the balance was credited by this call
    Credited,
    /// Transaction transitioned to failed; no balance effect
    MarkedFailed,
    /// Non-terminal progress recorded (status fields only)
    Progressed,
    /// The row was already in a terminal state; nothing changed
    AlreadySettled,
    /// Provider status not in our vocabulary; raw value recorded only
    Unrecognized,
}

pub struct SettlementService {
    transactions: Arc<TransactionRepository>,
}

impl SettlementService {
    pub fn new(transactions: Arc<TransactionRepository>) -> Self {
        Self { transactions }
    }

    /// Apply a provider-reported status to the transaction identified by
    /// `nowpayments_id`. Idempotent under redelivery and concurrent callers.
    pub async fn apply(
        &self,
        nowpayments_id: &str,
        payment_status: &str,
        tx_hash: Option<&str>,
        confirmations: Option<i32>,
    ) -> AppResult<SettlementOutcome> {
        let provider_status = ProviderStatus::parse(payment_status);

        match provider_status.settlement() {
            Some(DepositStatus::Completed) => {
                let outcome = self
                    .transactions
                    .complete_with_credit(nowpayments_id, payment_status, tx_hash)
                    .await?;

                match outcome {
                    CreditOutcome::Credited => {
                        info!(
                            payment_id = %nowpayments_id,
                            payment_status = %payment_status,
                            "deposit completed, balance credited"
                        );
                        Ok(SettlementOutcome::Credited)
                    }
                    CreditOutcome::AlreadySettled => {
                        info!(
                            payment_id = %nowpayments_id,
                            "deposit already settled, skipping credit"
                        );
                        Ok(SettlementOutcome::AlreadySettled)
                    }
                }
            }
            Some(DepositStatus::Failed) => {
                let updated = self
                    .transactions
                    .mark_failed(nowpayments_id, payment_status)
                    .await?;

                if updated.is_some() {
                    info!(
                        payment_id = %nowpayments_id,
                        payment_status = %payment_status,
                        "deposit marked failed"
                    );
                    Ok(SettlementOutcome::MarkedFailed)
                } else {
                    Ok(SettlementOutcome::AlreadySettled)
                }
            }
            Some(DepositStatus::Pending) => {
                let updated = self
                    .transactions
                    .record_progress(nowpayments_id, payment_status, tx_hash, confirmations)
                    .await?;

                if updated.is_some() {
                    Ok(SettlementOutcome::Progressed)
                } else {
                    Ok(SettlementOutcome::AlreadySettled)
                }
            }
            None => {
                warn!(
                    payment_id = %nowpayments_id,
                    payment_status = %payment_status,
                    "unrecognized provider payment status"
                );
                // Keep the raw vocabulary on the row for audit; the internal
                // state is not moved by statuses we do not understand.
                self.transactions
                    .record_progress(nowpayments_id, payment_status, tx_hash, confirmations)
                    .await?;
                Ok(SettlementOutcome::Unrecognized)
            }
        }
    }
}
