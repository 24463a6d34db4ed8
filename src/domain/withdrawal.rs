use serde::{Deserialize, Serialize};

/// Payout channel for a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalMethod {
    JazzCash,
    EasyPaisa,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
}

impl WithdrawalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalMethod::JazzCash => "JazzCash",
            WithdrawalMethod::EasyPaisa => "EasyPaisa",
            WithdrawalMethod::BankTransfer => "Bank Transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "jazzcash" => Some(WithdrawalMethod::JazzCash),
            "easypaisa" => Some(WithdrawalMethod::EasyPaisa),
            "banktransfer" | "bank" => Some(WithdrawalMethod::BankTransfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for WithdrawalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account identifiers a withdrawal is paid out to. The last used set is
/// saved per user to prefill the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalDetails {
    pub method: WithdrawalMethod,
    pub account_name: String,
    pub account_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

impl WithdrawalDetails {
    pub fn new(
        method: WithdrawalMethod,
        account_name: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            method,
            account_name: account_name.into(),
            account_number: account_number.into(),
            bank_name: None,
        }
    }

    /// Bank name only sticks for bank transfers; other methods drop it.
    pub fn with_bank_name(mut self, bank_name: impl Into<String>) -> Self {
        if self.method == WithdrawalMethod::BankTransfer {
            self.bank_name = Some(bank_name.into());
        }
        self
    }

    /// Returns the name of the first required field that is blank.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.account_name.trim().is_empty() {
            return Some("account name");
        }
        if self.account_number.trim().is_empty() {
            return Some("account number");
        }
        if self.method == WithdrawalMethod::BankTransfer
            && self.bank_name.as_deref().is_none_or(|b| b.trim().is_empty())
        {
            return Some("bank name");
        }
        None
    }
}
