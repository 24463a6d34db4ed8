use serde::Serialize;

use super::{Cents, Transaction, TransactionId, TransactionType};

/// Compute a balance from a transaction log.
/// Balance = sum of the amounts of every balance-affecting entry.
pub fn compute_balance(transactions: &[Transaction]) -> Cents {
    transactions.iter().map(Transaction::balance_effect).sum()
}

/// Total credited through referral bonuses.
pub fn referral_earnings(transactions: &[Transaction]) -> Cents {
    transactions
        .iter()
        .filter(|tx| tx.kind == TransactionType::Referral)
        .map(|tx| tx.amount)
        .sum()
}

/// One user's append-only transaction log with its balance projection.
///
/// The log is the source of truth; the balance is recomputed whenever a
/// ledger is built from stored entries and kept in step on every append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    balance: Cents,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let balance = compute_balance(&transactions);
        Self {
            transactions,
            balance,
        }
    }

    pub fn balance(&self) -> Cents {
        self.balance
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Append an entry and move the balance by its effect.
    pub fn append(&mut self, transaction: Transaction) -> &Transaction {
        self.balance += transaction.balance_effect();
        self.transactions.push(transaction);
        &self.transactions[self.transactions.len() - 1]
    }

    /// Discard the history and start over from a single opening entry.
    pub fn restart_with(&mut self, opening: Transaction) -> &Transaction {
        self.transactions.clear();
        self.balance = 0;
        self.append(opening)
    }

    pub fn find(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }

    /// Whether a confirmation entry already references `pending_id`.
    pub fn is_deposit_confirmed(&self, pending_id: &str) -> bool {
        self.transactions.iter().any(|tx| {
            tx.kind == TransactionType::Deposit
                && tx.description.ends_with(&confirmation_suffix(pending_id))
        })
    }
}

/// Description tail that links a confirmed deposit to its request.
pub fn confirmation_suffix(pending_id: &str) -> String {
    format!("[{}]", pending_id)
}

/// Result of checking a stored ledger against its own log.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub username: String,
    pub transaction_count: usize,
    pub computed_balance: Cents,
    /// Value found under the balance cache key, if any
    pub cached_balance: Option<Cents>,
    /// Entries whose withdrawal details do not match their type
    pub inconsistent_entries: Vec<TransactionId>,
    pub duplicate_ids: Vec<TransactionId>,
}

impl IntegrityReport {
    pub fn build(username: &str, ledger: &Ledger, cached_balance: Option<Cents>) -> Self {
        let inconsistent_entries = ledger
            .transactions()
            .iter()
            .filter(|tx| !tx.details_consistent())
            .map(|tx| tx.id.clone())
            .collect();

        let mut seen = std::collections::HashSet::new();
        let duplicate_ids = ledger
            .transactions()
            .iter()
            .filter(|tx| !seen.insert(tx.id.as_str()))
            .map(|tx| tx.id.clone())
            .collect();

        Self {
            username: username.to_string(),
            transaction_count: ledger.len(),
            computed_balance: ledger.balance(),
            cached_balance,
            inconsistent_entries,
            duplicate_ids,
        }
    }

    pub fn cache_in_sync(&self) -> bool {
        self.cached_balance
            .is_none_or(|cached| cached == self.computed_balance)
    }

    pub fn is_healthy(&self) -> bool {
        self.cache_in_sync() && self.inconsistent_entries.is_empty() && self.duplicate_ids.is_empty()
    }
}
