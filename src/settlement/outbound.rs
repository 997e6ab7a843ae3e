//! Outbound settlement file
//!
//! Wire schema for the file handed to the external credit system, and the
//! builder that produces it from a Pending batch message. Requests sharing a
//! collation group settle as one line with the summed amount.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::crypto::BankAccountCipher;
use super::error::SettlementError;
use super::types::{BankAccount, BatchMessageType, HydratedBatchMessage};

/// One settlement line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementLine {
    pub line_id: String,
    /// Signed: positive = deposit, negative = withdrawal.
    pub amount: Decimal,
    pub account: BankAccount,
}

/// Root of the outbound file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementFile {
    pub credit_system: String,
    /// Batch date in UTC.
    pub batch_date: DateTime<Utc>,
    pub lines: Vec<SettlementLine>,
}

impl SettlementFile {
    pub fn to_json(&self) -> Result<String, SettlementError> {
        serde_json::to_string_pretty(self).map_err(|e| SettlementError::Schema(e.to_string()))
    }
}

/// Builds settlement files from fully hydrated Pending batch messages.
pub struct SettlementFileBuilder {
    cipher: Arc<dyn BankAccountCipher>,
}

impl SettlementFileBuilder {
    pub fn new(cipher: Arc<dyn BankAccountCipher>) -> Self {
        Self { cipher }
    }

    /// Emit one file for `message`.
    ///
    /// Lines keep the order requests first appear in; later members of a
    /// collation group only add to their line's amount. The group's members
    /// share a destination account, so the first member's descriptor is the
    /// line's descriptor.
    pub fn build(&self, message: &HydratedBatchMessage) -> Result<SettlementFile, SettlementError> {
        if message.message.message_type != BatchMessageType::Pending {
            return Err(SettlementError::Schema(format!(
                "settlement file requires a {} message, got {}",
                BatchMessageType::Pending,
                message.message.message_type
            )));
        }

        let credit_system = message
            .batch
            .credit_system
            .code_name
            .clone()
            .ok_or_else(|| {
                SettlementError::Schema(format!(
                    "batch {} has no credit system code name",
                    message.batch.id
                ))
            })?;

        let mut lines: Vec<SettlementLine> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for request in &message.requests {
            let line_id = request.line_id();
            match index.get(line_id) {
                Some(&at) => lines[at].amount += request.amount,
                None => {
                    let account = self.cipher.decrypt(&request.account)?;
                    index.insert(line_id, lines.len());
                    lines.push(SettlementLine {
                        line_id: line_id.to_string(),
                        amount: request.amount,
                        account,
                    });
                }
            }
        }

        info!(
            batch = %message.batch.id,
            credit_system = %credit_system,
            requests = message.requests.len(),
            lines = lines.len(),
            "settlement file built"
        );

        Ok(SettlementFile {
            credit_system,
            batch_date: message.batch.date,
            lines,
        })
    }
}
