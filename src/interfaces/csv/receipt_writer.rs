use crate::domain::payment::Payment;
use crate::error::{Result, StoreError};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Purchase,
    Restore,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Paid,
    Restored,
    Failed,
}

/// The outcome of one store operation, as reported by the replay binary.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct Receipt {
    pub operation: Operation,
    pub identifier: String,
    pub status: Status,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub detail: String,
}

impl Receipt {
    pub fn purchase(identifier: impl Into<String>, result: &Result<Payment>) -> Self {
        let identifier = identifier.into();
        match result {
            Ok(payment) => Self {
                operation: Operation::Purchase,
                identifier,
                status: Status::Paid,
                amount: Some(payment.amount),
                currency: Some(payment.currency.clone()).filter(|code| !code.is_empty()),
                detail: String::new(),
            },
            Err(err) => Self::failed(Operation::Purchase, identifier, err),
        }
    }

    /// One receipt per restored identifier, or a single failed receipt.
    pub fn restore(result: &Result<Vec<String>>) -> Vec<Self> {
        match result {
            Ok(identifiers) => identifiers
                .iter()
                .map(|identifier| Self {
                    operation: Operation::Restore,
                    identifier: identifier.clone(),
                    status: Status::Restored,
                    amount: None,
                    currency: None,
                    detail: String::new(),
                })
                .collect(),
            Err(err) => vec![Self::failed(Operation::Restore, String::new(), err)],
        }
    }

    fn failed(operation: Operation, identifier: String, err: &StoreError) -> Self {
        Self {
            operation,
            identifier,
            status: Status::Failed,
            amount: None,
            currency: None,
            detail: err.to_string(),
        }
    }
}

pub struct ReceiptWriter<W: Write> {
    output: W,
    format: OutputFormat,
}

impl<W: Write> ReceiptWriter<W> {
    pub fn new(output: W, format: OutputFormat) -> Self {
        Self { output, format }
    }

    pub fn write_receipts(&mut self, receipts: &[Receipt]) -> Result<()> {
        match self.format {
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(&mut self.output);
                for receipt in receipts {
                    writer.serialize(receipt)?;
                }
                writer.flush()?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.output, receipts)
                    .map_err(|err| StoreError::Json(err.to_string()))?;
                writeln!(self.output)?;
            }
        }
        Ok(())
    }
}
