use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::{
    Campaign, CampaignDraft, Cents, IntegrityReport, JobSubscription, PaymentStatus, Profile,
    ReferralCounters, ReferralLevel, SPIN_PRIZE_DESCRIPTION, SpinKind, SpinOutcome,
    SubscriptionPlan, Transaction, TransactionType, WalletPin, WithdrawalDetails,
    apply_daily_quota_check, confirmation_suffix, consume_application_slot, find_job,
    format_amount, referral_earnings,
};
use crate::settings::{LedgerRules, Settings};
use crate::storage::{
    ACTIVE_PROFILE_KEY, GLOBAL_TASKS_KEY, KeyValueStore, LAST_SPIN_DATE_KEY, UserState,
    WriteBatch,
};

use super::{AppError, SilentCue, SuccessCue};

const JOINING_FEE_DESCRIPTION: &str = "One-time joining fee";

/// Ledger state right after the joining fee was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub username: String,
    pub balance: Cents,
    pub transactions: Vec<Transaction>,
}

type VerificationTask = JoinHandle<Result<Option<VerificationOutcome>, AppError>>;

/// The logged-in user and the work scheduled on their behalf.
struct Session {
    username: String,
    verification: Option<VerificationTask>,
}

impl Session {
    fn new(username: String) -> Self {
        Self {
            username,
            verification: None,
        }
    }

    fn cancel_verification(&mut self) {
        if let Some(task) = self.verification.take() {
            task.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_verification();
    }
}

/// Numbers shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub username: String,
    pub payment_status: PaymentStatus,
    pub balance: Cents,
    pub tasks_completed: usize,
    pub level1_referrals: u32,
    pub referral_earnings: Cents,
    pub subscription: Option<JobSubscription>,
}

/// Result of one spin of the wheel.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinReceipt {
    pub outcome: SpinOutcome,
    /// The purchase debit (bought spins only) followed by the prize credit
    pub transactions: Vec<Transaction>,
}

/// Application service providing the ledger operations.
/// This is the primary interface for any client (CLI, TUI, tests).
///
/// Operations that need a logged-in user return `Ok(None)` (or `Ok(false)`)
/// when there is no active session. Writes hold `write_lock` from load to
/// commit, shared with the verification task.
pub struct LedgerService {
    store: KeyValueStore,
    rules: LedgerRules,
    cue: Arc<dyn SuccessCue>,
    session: Option<Session>,
    write_lock: Arc<Mutex<()>>,
}

impl LedgerService {
    /// Create a new ledger service over an opened store.
    pub fn new(store: KeyValueStore, rules: LedgerRules) -> Self {
        Self {
            store,
            rules,
            cue: Arc::new(SilentCue),
            session: None,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open the database named in `settings`, creating it if needed.
    pub async fn init(settings: &Settings) -> Result<Self, AppError> {
        let store = KeyValueStore::open(&settings.database).await?;
        Ok(Self::new(store, settings.rules.clone()))
    }

    pub fn with_cue(mut self, cue: Arc<dyn SuccessCue>) -> Self {
        self.cue = cue;
        self
    }

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    pub fn rules(&self) -> &LedgerRules {
        &self.rules
    }

    // ========================
    // Session
    // ========================

    /// Username of the active session.
    pub fn current_user(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.username.as_str())
    }

    /// Create an account and log it in.
    pub async fn signup(
        &mut self,
        username: &str,
        email: &str,
        phone: &str,
    ) -> Result<Profile, AppError> {
        let username = normalize_username(username)?;
        let email = required("email", email)?;
        let phone = required("phone", phone)?;

        let write = self.write_lock.lock().await;
        if self.store.find_profile(&username).await?.is_some() {
            return Err(AppError::UserAlreadyExists(username));
        }

        let state = UserState::new(Profile::new(username.clone(), email, phone));
        self.store.save_user_state(&state).await?;
        drop(write);
        self.session = Some(Session::new(username.clone()));

        tracing::info!(%username, "signed up");
        Ok(state.profile)
    }

    /// Log in an existing user. The lookup ignores case.
    pub async fn login(&mut self, username: &str, today: NaiveDate) -> Result<Profile, AppError> {
        let username = normalize_username(username)?;
        let profile = self
            .store
            .find_profile(&username)
            .await?
            .ok_or(AppError::UserNotFound(username))?;

        self.activate(profile, today).await
    }

    /// Restore the session recorded in the store, if any.
    pub async fn resume(&mut self, today: NaiveDate) -> Result<Option<Profile>, AppError> {
        let Some(active) = self.store.active_profile().await? else {
            return Ok(None);
        };
        let stored = self.store.find_profile(&active.username).await?;
        let profile = stored.unwrap_or(active);

        self.activate(profile, today).await.map(Some)
    }

    /// End the session and cancel any pending verification.
    pub async fn logout(&mut self) -> Result<(), AppError> {
        if let Some(session) = self.session.take() {
            tracing::info!(username = %session.username, "logged out");
        }
        self.store.remove(ACTIVE_PROFILE_KEY).await?;
        Ok(())
    }

    /// Profile of the active session.
    pub async fn profile(&self) -> Result<Option<Profile>, AppError> {
        Ok(self.load_active().await?.map(|state| state.profile))
    }

    async fn activate(&mut self, profile: Profile, today: NaiveDate) -> Result<Profile, AppError> {
        // Replacing the session aborts the previous user's verification.
        self.session = None;

        let write = self.write_lock.lock().await;
        let mut state = self.store.load_user_state(profile).await?;
        if let Some(subscription) = &state.profile.job_subscription {
            let rolled = apply_daily_quota_check(subscription, today);
            tracing::debug!(
                applications_today = rolled.applications_today,
                "daily quota checked"
            );
            state.profile.job_subscription = Some(rolled);
        }
        self.persist(&state, WriteBatch::new()).await?;
        drop(write);

        let username = state.username().to_string();
        self.session = Some(Session::new(username.clone()));
        if state.profile.payment_status == PaymentStatus::PendingVerification {
            self.schedule_verification();
        }

        tracing::info!(%username, status = %state.profile.payment_status, "session started");
        Ok(state.profile)
    }

    // ========================
    // Joining fee
    // ========================

    /// Mark the joining fee as paid and schedule verification.
    pub async fn submit_payment(&mut self) -> Result<bool, AppError> {
        let write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(false);
        };
        if !state.profile.advance_to(PaymentStatus::PendingVerification) {
            return Err(AppError::PaymentNotPending(state.profile.payment_status));
        }
        self.persist(&state, WriteBatch::new()).await?;
        drop(write);
        self.schedule_verification();

        tracing::info!(username = %state.username(), "payment submitted");
        Ok(true)
    }

    /// Whether a verification task is scheduled for the session.
    pub fn verification_pending(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|session| session.verification.as_ref())
            .is_some_and(|task| !task.is_finished())
    }

    /// Wait for the scheduled verification to run.
    ///
    /// Returns `Ok(None)` when nothing was scheduled, the task was cancelled,
    /// or the profile no longer needed verification.
    pub async fn wait_for_verification(&mut self) -> Result<Option<VerificationOutcome>, AppError> {
        let Some(task) = self
            .session
            .as_mut()
            .and_then(|session| session.verification.take())
        else {
            return Ok(None);
        };

        match task.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Ok(None),
            Err(err) => Err(AppError::Storage(
                anyhow::Error::new(err).context("Verification task failed"),
            )),
        }
    }

    fn schedule_verification(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.cancel_verification();

        let store = self.store.clone();
        let rules = self.rules.clone();
        let write_lock = Arc::clone(&self.write_lock);
        let username = session.username.clone();
        let delay = rules.verification_delay();
        tracing::debug!(%username, ?delay, "verification scheduled");

        session.verification = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _write = write_lock.lock().await;
            initialize_on_verification(&store, &rules, &username).await
        }));
    }

    // ========================
    // Ledger
    // ========================

    /// Append a transaction to the active user's log and persist the whole
    /// user state. No balance check is made here.
    ///
    /// The balance moves by `amount` except for kinds that never count
    /// towards it (`PendingDeposit`, `JoiningFee`), which are logged only.
    /// A withdrawal's details become the saved "last used" details.
    pub async fn apply_transaction(
        &self,
        kind: TransactionType,
        description: &str,
        amount: Cents,
        referrals: Option<ReferralCounters>,
        withdrawal_details: Option<WithdrawalDetails>,
    ) -> Result<Option<Transaction>, AppError> {
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };

        let transaction = Transaction::record(kind, description, amount, withdrawal_details)?;
        if let Some(referrals) = referrals {
            state.referrals = referrals;
        }
        if let Some(details) = &transaction.withdrawal_details {
            state.saved_withdrawal_details = Some(details.clone());
        }

        let mut recorded = self
            .record(&mut state, vec![transaction], WriteBatch::new())
            .await?;
        Ok(recorded.pop())
    }

    /// Credit the reward for a campaign task. Completing the same task twice
    /// is a no-op returning `Ok(None)`.
    pub async fn record_task_completion(
        &self,
        task_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };
        if state.has_completed(task_id) {
            tracing::debug!(task_id, "task already completed");
            return Ok(None);
        }

        let mut campaigns = self.store.load_campaigns().await?;
        let campaign = campaigns
            .iter_mut()
            .find(|campaign| campaign.id == task_id)
            .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))?;
        if !campaign.is_available() {
            return Err(AppError::TaskFull(task_id.to_string()));
        }
        campaign.completions += 1;
        let transaction = Transaction::new(
            TransactionType::Earning,
            campaign.completion_description(),
            campaign.reward,
        );

        state.completed_task_ids.push(task_id.to_string());
        let mut extra = WriteBatch::new();
        extra.set_json(GLOBAL_TASKS_KEY, &campaigns)?;

        let mut recorded = self.record(&mut state, vec![transaction], extra).await?;
        Ok(recorded.pop())
    }

    /// Count a referral and credit its bonus.
    pub async fn record_referral(
        &self,
        level: ReferralLevel,
    ) -> Result<Option<Transaction>, AppError> {
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };

        state.referrals = state.referrals.incremented(level);
        let transaction = Transaction::new(
            TransactionType::Referral,
            level.bonus_description(),
            self.rules.referral_bonus(level),
        );
        let mut recorded = self
            .record(&mut state, vec![transaction], WriteBatch::new())
            .await?;
        Ok(recorded.pop())
    }

    /// Pay out `amount` to the given account. The details become the saved
    /// "last used" details.
    pub async fn withdraw(
        &self,
        amount: Cents,
        details: WithdrawalDetails,
    ) -> Result<Option<Transaction>, AppError> {
        positive(amount)?;
        if let Some(field) = details.missing_field() {
            return Err(AppError::MissingField(field));
        }

        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };
        ensure_funds(state.balance(), amount)?;

        state.saved_withdrawal_details = Some(details.clone());
        let mut recorded = self
            .record(
                &mut state,
                vec![Transaction::withdrawal(amount, details)],
                WriteBatch::new(),
            )
            .await?;
        Ok(recorded.pop())
    }

    // ========================
    // Campaigns
    // ========================

    /// Fund a campaign from the balance and publish it to the shared board.
    pub async fn create_campaign(&self, draft: CampaignDraft) -> Result<Option<Campaign>, AppError> {
        if draft.title.trim().is_empty() {
            return Err(AppError::MissingField("title"));
        }
        if draft.url.trim().is_empty() {
            return Err(AppError::MissingField("url"));
        }
        positive(draft.reward)?;
        if draft.quantity == 0 {
            return Err(AppError::InvalidAmount(
                "quantity must be at least 1".to_string(),
            ));
        }

        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };
        let cost = draft.total_cost();
        ensure_funds(state.balance(), cost)?;

        let campaign = Campaign::publish(draft);
        let mut campaigns = self.store.load_campaigns().await?;
        campaigns.push(campaign.clone());
        let mut extra = WriteBatch::new();
        extra.set_json(GLOBAL_TASKS_KEY, &campaigns)?;

        let transaction = Transaction::new(
            TransactionType::TaskCreation,
            format!("Campaign: {}", campaign.title),
            -cost,
        );
        self.record(&mut state, vec![transaction], extra).await?;

        tracing::info!(id = %campaign.id, quantity = campaign.quantity, "campaign published");
        Ok(Some(campaign))
    }

    /// Count a view of a campaign task.
    pub async fn record_task_view(&self, task_id: &str) -> Result<(), AppError> {
        let _write = self.write_lock.lock().await;
        let mut campaigns = self.store.load_campaigns().await?;
        let campaign = campaigns
            .iter_mut()
            .find(|campaign| campaign.id == task_id)
            .ok_or_else(|| AppError::TaskNotFound(task_id.to_string()))?;
        campaign.views += 1;
        self.store.save_campaigns(&campaigns).await?;
        Ok(())
    }

    /// Campaigns still accepting completions.
    pub async fn available_campaigns(&self) -> Result<Vec<Campaign>, AppError> {
        Ok(self
            .store
            .load_campaigns()
            .await?
            .into_iter()
            .filter(Campaign::is_available)
            .collect())
    }

    pub async fn all_campaigns(&self) -> Result<Vec<Campaign>, AppError> {
        Ok(self.store.load_campaigns().await?)
    }

    // ========================
    // Job board
    // ========================

    /// Buy a job-board plan, replacing any current subscription.
    pub async fn subscribe(
        &self,
        plan: SubscriptionPlan,
        today: NaiveDate,
    ) -> Result<Option<JobSubscription>, AppError> {
        let price = plan.price().ok_or(AppError::PlanUnavailable(plan))?;
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };
        ensure_funds(state.balance(), price)?;

        let subscription = JobSubscription::start(plan, today);
        state.profile.job_subscription = Some(subscription.clone());
        let transaction = Transaction::new(
            TransactionType::JobSubscription,
            format!("Subscribed to {} plan", plan),
            -price,
        );
        self.record(&mut state, vec![transaction], WriteBatch::new())
            .await?;

        tracing::info!(%plan, expires = %subscription.expiry_date, "subscribed");
        Ok(Some(subscription))
    }

    /// Apply to a job, consuming one of today's application slots.
    pub async fn apply_for_job(
        &self,
        job_id: &str,
        today: NaiveDate,
    ) -> Result<Option<JobSubscription>, AppError> {
        let job = find_job(job_id).ok_or_else(|| AppError::JobNotFound(job_id.to_string()))?;
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };

        let subscription = state
            .profile
            .job_subscription
            .clone()
            .ok_or(AppError::NoSubscription)?;
        if subscription.is_expired(today) {
            return Err(AppError::SubscriptionExpired(subscription.expiry_date));
        }
        if job.is_premium && !subscription.plan.includes_premium_jobs() {
            return Err(AppError::PremiumJob {
                job_id: job.id.to_string(),
                plan: subscription.plan,
            });
        }
        if state.applied_job_ids.iter().any(|id| id == job.id) {
            return Err(AppError::AlreadyApplied(job.id.to_string()));
        }

        let decision = consume_application_slot(&subscription, today);
        tracing::debug!(
            allowed = decision.allowed,
            applications_today = decision.subscription.applications_today,
            "application slot"
        );
        if !decision.allowed {
            return Err(AppError::DailyLimitReached(subscription.daily_limit()));
        }

        state.profile.job_subscription = Some(decision.subscription.clone());
        state.applied_job_ids.push(job.id.to_string());
        self.persist(&state, WriteBatch::new()).await?;

        tracing::info!(job_id = job.id, "applied for job");
        Ok(Some(decision.subscription))
    }

    // ========================
    // Deposits
    // ========================

    /// Log a deposit request. The balance moves only once it is confirmed.
    pub async fn request_deposit(
        &self,
        amount: Cents,
        reference: &str,
    ) -> Result<Option<Transaction>, AppError> {
        positive(amount)?;
        let reference = required("transaction reference", reference)?;

        self.apply_transaction(
            TransactionType::PendingDeposit,
            &format!("Deposit via TXID: {}", reference),
            amount,
            None,
            None,
        )
        .await
    }

    /// Credit a pending deposit request. Each request is credited once.
    ///
    /// Nothing checks that the money arrived: this is an operator hook for
    /// settling requests by hand, or for simulating settlement locally. Any
    /// caller acting as the active user can credit that user's requests.
    pub async fn confirm_deposit(&self, pending_id: &str) -> Result<Option<Transaction>, AppError> {
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };

        let amount = state
            .ledger
            .find(pending_id)
            .filter(|tx| tx.kind == TransactionType::PendingDeposit)
            .map(|tx| tx.amount)
            .ok_or_else(|| AppError::DepositNotFound(pending_id.to_string()))?;
        if state.ledger.is_deposit_confirmed(pending_id) {
            return Err(AppError::DepositAlreadyConfirmed(pending_id.to_string()));
        }

        let transaction = Transaction::new(
            TransactionType::Deposit,
            format!("Deposit confirmed {}", confirmation_suffix(pending_id)),
            amount,
        );
        let mut recorded = self
            .record(&mut state, vec![transaction], WriteBatch::new())
            .await?;
        Ok(recorded.pop())
    }

    // ========================
    // Spin wheel
    // ========================

    /// Whether today's free spin is still unused. The gate is shared by
    /// every user of the store.
    pub async fn free_spin_available(&self, today: NaiveDate) -> Result<bool, AppError> {
        let last = self.store.get(LAST_SPIN_DATE_KEY).await?;
        Ok(last.as_deref() != Some(spin_date(today).as_str()))
    }

    pub async fn free_spin<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<Option<SpinReceipt>, AppError> {
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };
        if !self.free_spin_available(today).await? {
            return Err(AppError::FreeSpinUsed);
        }

        let outcome = SpinKind::Free.spin(rng);
        let prize = Transaction::new(TransactionType::Earning, SPIN_PRIZE_DESCRIPTION, outcome.prize);
        let mut extra = WriteBatch::new();
        extra.set(LAST_SPIN_DATE_KEY, spin_date(today));

        let transactions = self.record(&mut state, vec![prize], extra).await?;
        Ok(Some(SpinReceipt {
            outcome,
            transactions,
        }))
    }

    pub async fn buy_spin<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Option<SpinReceipt>, AppError> {
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(None);
        };
        let cost = self.rules.spin_cost();
        ensure_funds(state.balance(), cost)?;

        let outcome = SpinKind::Bought.spin(rng);
        let purchase = Transaction::new(
            TransactionType::SpinPurchase,
            format!("Spin purchase ({})", format_amount(cost)),
            -cost,
        );
        let prize = Transaction::new(TransactionType::Earning, SPIN_PRIZE_DESCRIPTION, outcome.prize);

        let transactions = self
            .record(&mut state, vec![purchase, prize], WriteBatch::new())
            .await?;
        Ok(Some(SpinReceipt {
            outcome,
            transactions,
        }))
    }

    // ========================
    // Wallet PIN
    // ========================

    pub async fn set_pin(&self, pin: &str) -> Result<bool, AppError> {
        let pin = WalletPin::new(pin).map_err(|err| AppError::InvalidPin(err.to_string()))?;
        self.store_pin(pin).await
    }

    /// Leave the wallet unlocked.
    pub async fn skip_pin(&self) -> Result<bool, AppError> {
        self.store_pin(WalletPin::Skipped).await
    }

    /// Stored PIN state of the active user; `None` when never chosen.
    pub async fn wallet_pin(&self) -> Result<Option<WalletPin>, AppError> {
        Ok(self
            .load_active()
            .await?
            .and_then(|state| state.wallet_pin))
    }

    /// Check `attempt` against the stored PIN. A wallet without a PIN, or
    /// with the PIN skipped, always opens.
    pub async fn unlock_wallet(&self, attempt: &str) -> Result<bool, AppError> {
        let Some(state) = self.load_active().await? else {
            return Ok(false);
        };
        match state.wallet_pin {
            Some(pin) if !pin.verify(attempt) => Err(AppError::IncorrectPin),
            _ => Ok(true),
        }
    }

    async fn store_pin(&self, pin: WalletPin) -> Result<bool, AppError> {
        let _write = self.write_lock.lock().await;
        let Some(mut state) = self.load_active().await? else {
            return Ok(false);
        };
        tracing::info!(username = %state.username(), locked = pin.locks_wallet(), "wallet pin saved");
        state.wallet_pin = Some(pin);
        self.persist(&state, WriteBatch::new()).await?;
        Ok(true)
    }

    // ========================
    // Reads
    // ========================

    pub async fn balance(&self) -> Result<Option<Cents>, AppError> {
        Ok(self.load_active().await?.map(|state| state.balance()))
    }

    /// Transaction log of the active user, oldest first.
    pub async fn transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self
            .load_active()
            .await?
            .map(|state| state.ledger.into_transactions())
            .unwrap_or_default())
    }

    pub async fn referrals(&self) -> Result<ReferralCounters, AppError> {
        Ok(self
            .load_active()
            .await?
            .map(|state| state.referrals)
            .unwrap_or_default())
    }

    pub async fn saved_withdrawal_details(&self) -> Result<Option<WithdrawalDetails>, AppError> {
        Ok(self
            .load_active()
            .await?
            .and_then(|state| state.saved_withdrawal_details))
    }

    pub async fn summary(&self) -> Result<Option<DashboardSummary>, AppError> {
        let Some(state) = self.load_active().await? else {
            return Ok(None);
        };
        Ok(Some(DashboardSummary {
            username: state.username().to_string(),
            payment_status: state.profile.payment_status,
            balance: state.balance(),
            tasks_completed: state.completed_task_ids.len(),
            level1_referrals: state.referrals.level1,
            referral_earnings: referral_earnings(state.ledger.transactions()),
            subscription: state.profile.job_subscription.clone(),
        }))
    }

    /// Full stored state of the active user.
    pub async fn snapshot(&self) -> Result<Option<UserState>, AppError> {
        self.load_active().await
    }

    /// Compare the stored balance cache with the log it should mirror.
    pub async fn check_integrity(&self) -> Result<Option<IntegrityReport>, AppError> {
        let Some(state) = self.load_active().await? else {
            return Ok(None);
        };
        let cached = self.store.cached_balance(state.username()).await?;
        let report = IntegrityReport::build(state.username(), &state.ledger, cached);
        if !report.cache_in_sync() {
            tracing::warn!(
                username = %report.username,
                cached = ?report.cached_balance,
                computed = report.computed_balance,
                "balance cache out of sync with transaction log"
            );
        }
        Ok(Some(report))
    }

    // ========================
    // Helpers
    // ========================

    async fn load_active(&self) -> Result<Option<UserState>, AppError> {
        let Some(session) = &self.session else {
            return Ok(None);
        };
        match self.store.find_profile(&session.username).await? {
            Some(profile) => Ok(Some(self.store.load_user_state(profile).await?)),
            None => Ok(None),
        }
    }

    /// Write `state` and `extra` in one commit, refusing to overwrite a
    /// payment status that moved on since `state` was loaded.
    async fn persist(&self, state: &UserState, extra: WriteBatch) -> Result<(), AppError> {
        if !self.store.save_user_state_if_current(state, extra).await? {
            tracing::warn!(username = %state.username(), "stale write refused");
            return Err(AppError::StateChanged(state.username().to_string()));
        }
        Ok(())
    }

    /// Append `transactions`, then write the user state and `extra` in one
    /// commit. The success cue fires for each credit once the commit lands.
    async fn record(
        &self,
        state: &mut UserState,
        transactions: Vec<Transaction>,
        extra: WriteBatch,
    ) -> Result<Vec<Transaction>, AppError> {
        for transaction in &transactions {
            state.ledger.append(transaction.clone());
        }
        self.persist(state, extra).await?;

        for transaction in &transactions {
            tracing::info!(
                username = %state.username(),
                id = %transaction.id,
                kind = %transaction.kind,
                amount = transaction.amount,
                balance = state.balance(),
                "transaction recorded"
            );
            if transaction.balance_effect() > 0 {
                self.cue.credited(transaction);
            }
        }
        Ok(transactions)
    }
}

/// Apply the joining fee to a profile awaiting verification.
///
/// The log restarts with a single fee entry, the balance ends at zero and the
/// completed-task and referral counters reset. Profiles in any other state are
/// left alone, so the fee is never charged twice. Nothing is written unless
/// `username` is still the active session when the commit runs.
pub async fn initialize_on_verification(
    store: &KeyValueStore,
    rules: &LedgerRules,
    username: &str,
) -> Result<Option<VerificationOutcome>, AppError> {
    let Some(mut profile) = store.find_profile(username).await? else {
        tracing::warn!(%username, "verification skipped: no profile");
        return Ok(None);
    };
    if !profile.advance_to(PaymentStatus::Verified) {
        tracing::warn!(%username, status = %profile.payment_status, "verification skipped");
        return Ok(None);
    }

    let mut state = store.load_user_state(profile).await?;
    state.ledger.restart_with(Transaction::new(
        TransactionType::JoiningFee,
        JOINING_FEE_DESCRIPTION,
        -rules.joining_fee(),
    ));
    state.completed_task_ids.clear();
    state.referrals = ReferralCounters::default();
    if !store.save_verified_state(&state).await? {
        tracing::warn!(%username, "verification skipped: no longer the active session");
        return Ok(None);
    }

    tracing::info!(%username, fee = rules.joining_fee(), "account verified");
    Ok(Some(VerificationOutcome {
        username: username.to_string(),
        balance: state.balance(),
        transactions: state.ledger.into_transactions(),
    }))
}

fn normalize_username(username: &str) -> Result<String, AppError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::MissingField("username"));
    }
    Ok(username)
}

fn required(field: &'static str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::MissingField(field));
    }
    Ok(value.to_string())
}

fn positive(amount: Cents) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(format!(
            "{} must be greater than zero",
            format_amount(amount)
        )));
    }
    Ok(())
}

fn ensure_funds(balance: Cents, required: Cents) -> Result<(), AppError> {
    if required > balance {
        return Err(AppError::InsufficientFunds { balance, required });
    }
    Ok(())
}

fn spin_date(today: NaiveDate) -> String {
    today.format("%Y-%m-%d").to_string()
}
