// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use chrono::NaiveDate;
use earnledger::application::{LedgerService, SuccessCue};
use earnledger::domain::{
    CampaignDraft, Cents, Profile, TaskCategory, Transaction, TransactionType,
};
use earnledger::settings::{LedgerRules, Settings};
use earnledger::storage::UserKey;
use tempfile::TempDir;

/// Rules with a verification delay short enough for tests.
pub fn fast_rules() -> LedgerRules {
    LedgerRules {
        verification_delay_ms: 10,
        ..LedgerRules::default()
    }
}

pub fn settings_in(temp_dir: &TempDir) -> Settings {
    Settings {
        database: temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned(),
        rules: fast_rules(),
    }
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(&settings_in(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Open a second service over the same database, as a new process would.
pub async fn reopen(temp_dir: &TempDir) -> Result<LedgerService> {
    Ok(LedgerService::init(&settings_in(temp_dir)).await?)
}

/// Helper to parse a date string into NaiveDate
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Counts credits instead of making a sound.
#[derive(Default)]
pub struct CountingCue {
    credits: AtomicUsize,
}

impl CountingCue {
    pub fn count(&self) -> usize {
        self.credits.load(Ordering::SeqCst)
    }
}

impl SuccessCue for CountingCue {
    fn credited(&self, _transaction: &Transaction) {
        self.credits.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn counting_cue() -> Arc<CountingCue> {
    Arc::new(CountingCue::default())
}

/// Sign up `username` with placeholder contact details.
pub async fn signed_up(service: &mut LedgerService, username: &str) -> Result<Profile> {
    Ok(service
        .signup(username, &format!("{}@example.com", username), "03001234567")
        .await?)
}

/// Sign up `username` and run the joining-fee verification.
pub async fn verified(service: &mut LedgerService, username: &str) -> Result<()> {
    signed_up(service, username).await?;
    service.submit_payment().await?;
    service.wait_for_verification().await?;
    Ok(())
}

/// Credit the active user directly.
pub async fn fund(service: &LedgerService, amount: Cents) -> Result<()> {
    service
        .apply_transaction(TransactionType::Earning, "Test credit", amount, None, None)
        .await?;
    Ok(())
}

pub fn draft(title: &str, reward: Cents, quantity: u32) -> CampaignDraft {
    CampaignDraft {
        category: TaskCategory::VisitWebsite,
        title: title.to_string(),
        description: "Stay for at least 30 seconds.".to_string(),
        url: "https://example.com".to_string(),
        reward,
        quantity,
    }
}

/// Overwrite the stored profile of `username`.
pub async fn store_profile(service: &LedgerService, profile: &Profile) -> Result<()> {
    service
        .store()
        .set_json(&UserKey::Profile.for_user(&profile.username), profile)
        .await
}
