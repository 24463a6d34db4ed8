use anyhow::{Context, Result};

use crate::domain::{
    Campaign, Cents, Ledger, PaymentStatus, Profile, ReferralCounters, Transaction, WalletPin,
    WithdrawalDetails, format_cents, parse_stored_balance,
};

use super::{ACTIVE_PROFILE_KEY, GLOBAL_TASKS_KEY, KeyValueStore, UserKey, WriteBatch};

/// Everything stored for one user, loaded and saved as one unit.
#[derive(Debug, Clone)]
pub struct UserState {
    pub profile: Profile,
    pub ledger: Ledger,
    pub completed_task_ids: Vec<String>,
    pub referrals: ReferralCounters,
    pub wallet_pin: Option<WalletPin>,
    pub saved_withdrawal_details: Option<WithdrawalDetails>,
    pub applied_job_ids: Vec<String>,
}

impl UserState {
    /// Fresh state for a newly signed-up profile.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            ledger: Ledger::new(),
            completed_task_ids: Vec::new(),
            referrals: ReferralCounters::default(),
            wallet_pin: None,
            saved_withdrawal_details: None,
            applied_job_ids: Vec::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.profile.username
    }

    pub fn balance(&self) -> Cents {
        self.ledger.balance()
    }

    pub fn has_completed(&self, task_id: &str) -> bool {
        self.completed_task_ids.iter().any(|id| id == task_id)
    }

    /// Queue every key of this state, plus the active-session pointer.
    pub fn write_into(&self, batch: &mut WriteBatch) -> Result<()> {
        batch.set_json(ACTIVE_PROFILE_KEY, &self.profile)?;
        self.write_records_into(batch)
    }

    /// Queue the per-user keys of this state, leaving the active-session
    /// pointer alone.
    ///
    /// The balance is written as a cache of the log projection. A missing PIN
    /// or withdrawal details leave any stored value alone.
    pub fn write_records_into(&self, batch: &mut WriteBatch) -> Result<()> {
        let username = self.username();
        batch.set_json(UserKey::Profile.for_user(username), &self.profile)?;
        batch.set(
            UserKey::Balance.for_user(username),
            format_cents(self.ledger.balance()),
        );
        batch.set_json(
            UserKey::Transactions.for_user(username),
            self.ledger.transactions(),
        )?;
        batch.set_json(
            UserKey::CompletedTaskIds.for_user(username),
            &self.completed_task_ids,
        )?;
        batch.set_json(UserKey::Referrals.for_user(username), &self.referrals)?;
        batch.set_json(
            UserKey::AppliedJobIds.for_user(username),
            &self.applied_job_ids,
        )?;
        if let Some(pin) = &self.wallet_pin {
            batch.set(UserKey::WalletPin.for_user(username), pin.as_stored());
        }
        if let Some(details) = &self.saved_withdrawal_details {
            batch.set_json(UserKey::SavedWithdrawalDetails.for_user(username), details)?;
        }
        Ok(())
    }
}

impl KeyValueStore {
    /// Profile of the active session, if someone is logged in.
    pub async fn active_profile(&self) -> Result<Option<Profile>> {
        self.get_json(ACTIVE_PROFILE_KEY).await
    }

    /// Profile stored for `username`, whether or not it is active.
    pub async fn find_profile(&self, username: &str) -> Result<Option<Profile>> {
        self.get_json(&UserKey::Profile.for_user(username)).await
    }

    /// Load the per-user keys that accompany `profile`. Absent keys fall back
    /// to empty values and the balance is recomputed from the log.
    pub async fn load_user_state(&self, profile: Profile) -> Result<UserState> {
        let username = profile.username.clone();
        let transactions: Vec<Transaction> = self
            .get_json(&UserKey::Transactions.for_user(&username))
            .await?
            .unwrap_or_default();
        let completed_task_ids = self
            .get_json(&UserKey::CompletedTaskIds.for_user(&username))
            .await?
            .unwrap_or_default();
        let referrals = self
            .get_json(&UserKey::Referrals.for_user(&username))
            .await?
            .unwrap_or_default();
        let wallet_pin = self
            .get(&UserKey::WalletPin.for_user(&username))
            .await?
            .and_then(|raw| WalletPin::from_stored(&raw));
        let saved_withdrawal_details = self
            .get_json(&UserKey::SavedWithdrawalDetails.for_user(&username))
            .await?;
        let applied_job_ids = self
            .get_json(&UserKey::AppliedJobIds.for_user(&username))
            .await?
            .unwrap_or_default();

        Ok(UserState {
            profile,
            ledger: Ledger::from_transactions(transactions),
            completed_task_ids,
            referrals,
            wallet_pin,
            saved_withdrawal_details,
            applied_job_ids,
        })
    }

    /// Persist `state` and make it the active session in one transaction.
    pub async fn save_user_state(&self, state: &UserState) -> Result<()> {
        let mut batch = WriteBatch::new();
        state.write_into(&mut batch)?;
        self.commit(batch)
            .await
            .with_context(|| format!("Failed to save state for {}", state.username()))
    }

    /// Persist `state` together with `extra`, making it the active session,
    /// unless another writer moved the stored payment status past the one
    /// `state` was loaded with. Returns whether the write landed.
    pub async fn save_user_state_if_current(
        &self,
        state: &UserState,
        mut extra: WriteBatch,
    ) -> Result<bool> {
        state.write_into(&mut extra)?;
        let profile_key = UserKey::Profile.for_user(state.username());
        let status = state.profile.payment_status;
        self.commit_if(extra, &[profile_key.as_str()], |current| {
            stored_status(current[0].as_deref()).is_none_or(|stored| !stored.is_after(status))
        })
        .await
        .with_context(|| format!("Failed to save state for {}", state.username()))
    }

    /// Persist the state of a freshly verified profile. The write lands only
    /// while `state`'s user is still the active session and the stored profile
    /// is still awaiting verification; the active pointer is never touched.
    pub async fn save_verified_state(&self, state: &UserState) -> Result<bool> {
        let mut batch = WriteBatch::new();
        state.write_records_into(&mut batch)?;
        let username = state.username();
        let profile_key = UserKey::Profile.for_user(username);
        self.commit_if(
            batch,
            &[ACTIVE_PROFILE_KEY, profile_key.as_str()],
            |current| {
                let active = current[0]
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<Profile>(raw).ok());
                active.is_some_and(|profile| profile.username == username)
                    && stored_status(current[1].as_deref())
                        == Some(PaymentStatus::PendingVerification)
            },
        )
        .await
        .with_context(|| format!("Failed to save verified state for {}", username))
    }

    /// The balance cache as stored, without recomputation.
    pub async fn cached_balance(&self, username: &str) -> Result<Option<Cents>> {
        Ok(self
            .get(&UserKey::Balance.for_user(username))
            .await?
            .and_then(|raw| parse_stored_balance(&raw)))
    }

    pub async fn load_campaigns(&self) -> Result<Vec<Campaign>> {
        Ok(self.get_json(GLOBAL_TASKS_KEY).await?.unwrap_or_default())
    }

    pub async fn save_campaigns(&self, campaigns: &[Campaign]) -> Result<()> {
        self.set_json(GLOBAL_TASKS_KEY, campaigns).await
    }
}

fn stored_status(raw: Option<&str>) -> Option<PaymentStatus> {
    raw.and_then(|raw| serde_json::from_str::<Profile>(raw).ok())
        .map(|profile| profile.payment_status)
}
