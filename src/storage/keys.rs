/// Active session profile.
pub const ACTIVE_PROFILE_KEY: &str = "userProfile";

/// Campaign board shared by every user.
pub const GLOBAL_TASKS_KEY: &str = "globalUserTasks";

/// Date of the last free spin, shared by every user.
pub const LAST_SPIN_DATE_KEY: &str = "lastSpinDate";

/// Per-user keys. Each renders as `<prefix>_<username>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKey {
    Profile,
    Balance,
    Transactions,
    CompletedTaskIds,
    Referrals,
    WalletPin,
    SavedWithdrawalDetails,
    AppliedJobIds,
}

impl UserKey {
    pub fn prefix(&self) -> &'static str {
        match self {
            UserKey::Profile => "profile",
            UserKey::Balance => "balance",
            UserKey::Transactions => "transactions",
            UserKey::CompletedTaskIds => "completedTaskIds",
            UserKey::Referrals => "referrals",
            UserKey::WalletPin => "walletPin",
            UserKey::SavedWithdrawalDetails => "savedWithdrawalDetails",
            UserKey::AppliedJobIds => "appliedJobIds",
        }
    }

    pub fn for_user(&self, username: &str) -> String {
        format!("{}_{}", self.prefix(), username)
    }
}
