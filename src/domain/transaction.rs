use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, WithdrawalDetails};

pub type TransactionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Task rewards and spin-wheel prizes
    Earning,
    Withdrawal,
    /// Referral bonuses
    Referral,
    /// Funding a campaign on the shared task board
    TaskCreation,
    /// One-time fee settled by the external signup payment; logged for
    /// history, moves no wallet money
    JoiningFee,
    JobSubscription,
    SpinPurchase,
    /// A confirmed deposit
    Deposit,
    /// A deposit request awaiting confirmation; moves no money
    PendingDeposit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Earning => "EARNING",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Referral => "REFERRAL",
            TransactionType::TaskCreation => "TASK_CREATION",
            TransactionType::JoiningFee => "JOINING_FEE",
            TransactionType::JobSubscription => "JOB_SUBSCRIPTION",
            TransactionType::SpinPurchase => "SPIN_PURCHASE",
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::PendingDeposit => "PENDING_DEPOSIT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "EARNING" => Some(TransactionType::Earning),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            "REFERRAL" => Some(TransactionType::Referral),
            "TASK_CREATION" => Some(TransactionType::TaskCreation),
            "JOINING_FEE" => Some(TransactionType::JoiningFee),
            "JOB_SUBSCRIPTION" => Some(TransactionType::JobSubscription),
            "SPIN_PURCHASE" => Some(TransactionType::SpinPurchase),
            "DEPOSIT" => Some(TransactionType::Deposit),
            "PENDING_DEPOSIT" => Some(TransactionType::PendingDeposit),
            _ => None,
        }
    }

    /// Whether entries of this type count towards the balance.
    pub fn affects_balance(&self) -> bool {
        !matches!(
            self,
            TransactionType::PendingDeposit | TransactionType::JoiningFee
        )
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable ledger entry. Positive amounts credit the balance, negative
/// amounts debit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: String,
    /// Signed amount in cents
    pub amount: Cents,
    pub date: DateTime<Utc>,
    /// Present on withdrawals and nowhere else
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_details: Option<WithdrawalDetails>,
}

impl Transaction {
    /// Create a non-withdrawal entry. Withdrawals go through
    /// [`Transaction::withdrawal`], and loose parts from outside the crate
    /// through [`Transaction::record`].
    pub(crate) fn new(
        kind: TransactionType,
        description: impl Into<String>,
        amount: Cents,
    ) -> Self {
        Self {
            id: new_transaction_id(),
            kind,
            description: description.into(),
            amount,
            date: Utc::now(),
            withdrawal_details: None,
        }
    }

    /// Create a withdrawal debiting `amount` cents.
    pub fn withdrawal(amount: Cents, details: WithdrawalDetails) -> Self {
        Self {
            id: new_transaction_id(),
            kind: TransactionType::Withdrawal,
            description: format!("Withdrawal via {}", details.method),
            amount: -amount.abs(),
            date: Utc::now(),
            withdrawal_details: Some(details),
        }
    }

    /// Build an entry from loose parts, refusing combinations that break the
    /// withdrawal-details rule instead of panicking.
    pub fn record(
        kind: TransactionType,
        description: impl Into<String>,
        amount: Cents,
        withdrawal_details: Option<WithdrawalDetails>,
    ) -> Result<Self, DetailsMismatch> {
        match (kind, withdrawal_details) {
            (TransactionType::Withdrawal, Some(details)) => Ok(Self {
                description: description.into(),
                amount,
                ..Self::withdrawal(amount, details)
            }),
            (TransactionType::Withdrawal, None) => Err(DetailsMismatch::Missing),
            (_, Some(_)) => Err(DetailsMismatch::Unexpected(kind)),
            (_, None) => Ok(Self::new(kind, description, amount)),
        }
    }

    pub fn is_credit(&self) -> bool {
        self.amount > 0
    }

    /// The amount this entry contributes to the balance.
    pub fn balance_effect(&self) -> Cents {
        if self.kind.affects_balance() {
            self.amount
        } else {
            0
        }
    }

    /// True when the withdrawal-details field matches the entry type.
    pub fn details_consistent(&self) -> bool {
        (self.kind == TransactionType::Withdrawal) == self.withdrawal_details.is_some()
    }
}

fn new_transaction_id() -> TransactionId {
    format!("tx_{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailsMismatch {
    Missing,
    Unexpected(TransactionType),
}

impl std::fmt::Display for DetailsMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailsMismatch::Missing => write!(f, "withdrawal entries need withdrawal details"),
            DetailsMismatch::Unexpected(kind) => {
                write!(f, "{} entries cannot carry withdrawal details", kind)
            }
        }
    }
}

impl std::error::Error for DetailsMismatch {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WithdrawalMethod;

    #[test]
    fn test_create_transaction() {
        let tx = Transaction::new(TransactionType::Earning, "Completed: Follow us", 1500);

        assert_eq!(tx.kind, TransactionType::Earning);
        assert_eq!(tx.amount, 1500);
        assert!(tx.is_credit());
        assert!(tx.id.starts_with("tx_"));
        assert!(tx.withdrawal_details.is_none());
        assert!(tx.details_consistent());
    }

    #[test]
    fn test_withdrawal_carries_details_and_debits() {
        let details = WithdrawalDetails::new(WithdrawalMethod::JazzCash, "Ali", "0300");
        let tx = Transaction::withdrawal(3000, details.clone());

        assert_eq!(tx.amount, -3000);
        assert_eq!(tx.description, "Withdrawal via JazzCash");
        assert_eq!(tx.withdrawal_details, Some(details));
        assert!(tx.details_consistent());
    }

    #[test]
    fn test_record_enforces_details_rule() {
        let details = WithdrawalDetails::new(WithdrawalMethod::EasyPaisa, "Sara", "0311");

        assert_eq!(
            Transaction::record(TransactionType::Withdrawal, "Payout", -2000, None),
            Err(DetailsMismatch::Missing)
        );
        assert_eq!(
            Transaction::record(
                TransactionType::Earning,
                "Prize",
                200,
                Some(details.clone())
            ),
            Err(DetailsMismatch::Unexpected(TransactionType::Earning))
        );

        let tx = Transaction::record(TransactionType::Earning, "Prize", 200, None).unwrap();
        assert!(tx.withdrawal_details.is_none());

        let tx =
            Transaction::record(TransactionType::Withdrawal, "Payout", -2000, Some(details))
                .unwrap();
        assert_eq!(tx.description, "Payout");
        assert_eq!(tx.amount, -2000);
        assert!(tx.details_consistent());
    }

    #[test]
    fn test_off_wallet_entries_have_no_balance_effect() {
        let tx = Transaction::new(TransactionType::PendingDeposit, "Deposit via TXID: 1", 5000);
        assert_eq!(tx.balance_effect(), 0);

        let tx = Transaction::new(TransactionType::JoiningFee, "One-time joining fee", -5000);
        assert_eq!(tx.balance_effect(), 0);

        let tx = Transaction::new(TransactionType::Deposit, "Deposit via TXID: 1", 5000);
        assert_eq!(tx.balance_effect(), 5000);
    }

    #[test]
    fn test_serialized_shape() {
        let tx = Transaction::new(TransactionType::JoiningFee, "One-time joining fee", -5000);
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["type"], "JOINING_FEE");
        assert_eq!(json["amount"], -5000);
        assert!(json.get("withdrawalDetails").is_none());
    }

    #[test]
    fn test_type_roundtrip() {
        for kind in [
            TransactionType::Earning,
            TransactionType::Withdrawal,
            TransactionType::Referral,
            TransactionType::TaskCreation,
            TransactionType::JoiningFee,
            TransactionType::JobSubscription,
            TransactionType::SpinPurchase,
            TransactionType::Deposit,
            TransactionType::PendingDeposit,
        ] {
            assert_eq!(TransactionType::from_str(kind.as_str()), Some(kind));
        }
    }
}
