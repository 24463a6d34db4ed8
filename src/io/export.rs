use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{
    Cents, Profile, ReferralCounters, Transaction, TransactionType, WithdrawalDetails,
    format_amount, format_cents,
};

/// Everything stored for one user, minus the wallet PIN.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub profile: Profile,
    pub balance: Cents,
    pub transactions: Vec<Transaction>,
    pub completed_task_ids: Vec<String>,
    pub referrals: ReferralCounters,
    pub saved_withdrawal_details: Option<WithdrawalDetails>,
    pub applied_job_ids: Vec<String>,
}

/// Exporter for the active user's ledger
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export the transaction log to CSV, with the running balance after
    /// each entry. Returns the number of rows written.
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.transactions().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "type",
            "description",
            "amount",
            "balance_after",
            "method",
            "account_name",
            "account_number",
            "bank_name",
        ])?;

        let mut running: Cents = 0;
        for tx in &transactions {
            running += tx.balance_effect();
            let details = tx.withdrawal_details.as_ref();

            csv_writer.write_record([
                tx.id.clone(),
                tx.date.to_rfc3339(),
                tx.kind.as_str().to_string(),
                tx.description.clone(),
                format_cents(tx.amount),
                format_cents(running),
                details.map(|d| d.method.to_string()).unwrap_or_default(),
                details.map(|d| d.account_name.clone()).unwrap_or_default(),
                details.map(|d| d.account_number.clone()).unwrap_or_default(),
                details
                    .and_then(|d| d.bank_name.clone())
                    .unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export the active user's stored state as pretty JSON.
    pub async fn export_snapshot_json<W: Write>(
        &self,
        mut writer: W,
    ) -> Result<Option<UserSnapshot>> {
        let Some(state) = self.service.snapshot().await? else {
            return Ok(None);
        };

        let snapshot = UserSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            balance: state.balance(),
            profile: state.profile,
            transactions: state.ledger.into_transactions(),
            completed_task_ids: state.completed_task_ids,
            referrals: state.referrals,
            saved_withdrawal_details: state.saved_withdrawal_details,
            applied_job_ids: state.applied_job_ids,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(Some(snapshot))
    }

    /// Write a plain-text receipt for one of the active user's withdrawals.
    pub async fn write_withdrawal_receipt<W: Write>(
        &self,
        transaction_id: &str,
        mut writer: W,
    ) -> Result<Transaction> {
        let Some(username) = self.service.current_user().map(str::to_string) else {
            bail!("No active session");
        };
        let transactions = self.service.transactions().await?;
        let Some(tx) = transactions.into_iter().find(|tx| tx.id == transaction_id) else {
            bail!("Transaction not found: {}", transaction_id);
        };
        let Some(receipt) = render_receipt(&username, &tx) else {
            bail!("Transaction {} is not a withdrawal", transaction_id);
        };

        writer.write_all(receipt.as_bytes())?;
        writer.flush()?;
        Ok(tx)
    }
}

/// Receipt text for a withdrawal; `None` for any other entry.
pub fn render_receipt(username: &str, tx: &Transaction) -> Option<String> {
    if tx.kind != TransactionType::Withdrawal {
        return None;
    }
    let details = tx.withdrawal_details.as_ref()?;
    let paid = format_amount(tx.amount.abs());

    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "PAYMENT RECEIPT");
    let _ = writeln!(out, "Transaction ID: {}", tx.id);
    let _ = writeln!(out, "Billed To:      {}", username);
    let _ = writeln!(out, "Payment Date:   {}", tx.date.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<40} {:>14}", tx.description, paid);
    let _ = writeln!(out, "{:<40} {:>14}", "Total Paid", paid);
    let _ = writeln!(out);
    let _ = writeln!(out, "Method:         {}", details.method);
    let _ = writeln!(out, "Account Name:   {}", details.account_name);
    let _ = writeln!(out, "Account Number: {}", details.account_number);
    if let Some(bank) = &details.bank_name {
        let _ = writeln!(out, "Bank Name:      {}", bank);
    }
    Some(out)
}
