mod common;

use anyhow::Result;
use common::{counting_cue, fund, signed_up, test_service, verified};
use earnledger::application::AppError;
use earnledger::domain::{
    ReferralCounters, ReferralLevel, Transaction, TransactionType, WithdrawalDetails,
    WithdrawalMethod, compute_balance, units,
};
use earnledger::storage::UserKey;

fn jazzcash() -> WithdrawalDetails {
    WithdrawalDetails::new(WithdrawalMethod::JazzCash, "Ali Khan", "03001234567")
}

#[tokio::test]
async fn test_balance_tracks_every_applied_transaction() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;

    let entries = [
        (TransactionType::Earning, 1500),
        (TransactionType::Referral, 2000),
        (TransactionType::SpinPurchase, -500),
        (TransactionType::Earning, 125),
        (TransactionType::TaskCreation, -3000),
    ];
    for (kind, amount) in entries {
        service
            .apply_transaction(kind, "entry", amount, None, None)
            .await?;
        let transactions = service.transactions().await?;
        assert_eq!(service.balance().await?, Some(compute_balance(&transactions)));
    }

    assert_eq!(service.balance().await?, Some(125));
    assert_eq!(service.transactions().await?.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_apply_transaction_does_not_clamp() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;

    service
        .apply_transaction(TransactionType::SpinPurchase, "debit", -700, None, None)
        .await?;
    assert_eq!(service.balance().await?, Some(-700));
    Ok(())
}

#[tokio::test]
async fn test_apply_transaction_enforces_withdrawal_details() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;

    let result = service
        .apply_transaction(TransactionType::Withdrawal, "payout", -100, None, None)
        .await;
    assert!(matches!(result, Err(AppError::InvalidTransaction(_))));

    let result = service
        .apply_transaction(TransactionType::Earning, "prize", 100, None, Some(jazzcash()))
        .await;
    assert!(matches!(result, Err(AppError::InvalidTransaction(_))));
    assert!(service.transactions().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_applied_withdrawal_saves_details() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(50)).await?;

    service
        .apply_transaction(
            TransactionType::Withdrawal,
            "Withdrawal via JazzCash",
            -units(20),
            None,
            Some(jazzcash()),
        )
        .await?;

    assert_eq!(service.saved_withdrawal_details().await?, Some(jazzcash()));
    assert_eq!(service.balance().await?, Some(units(30)));
    Ok(())
}

#[tokio::test]
async fn test_off_wallet_kinds_are_logged_without_moving_balance() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(10)).await?;

    service
        .apply_transaction(TransactionType::PendingDeposit, "Deposit via TXID: 9", units(5), None, None)
        .await?;
    service
        .apply_transaction(TransactionType::JoiningFee, "One-time joining fee", -units(50), None, None)
        .await?;

    assert_eq!(service.transactions().await?.len(), 3);
    assert_eq!(service.balance().await?, Some(units(10)));
    Ok(())
}

#[tokio::test]
async fn test_operations_without_session_are_noops() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let tx = service
        .apply_transaction(TransactionType::Earning, "orphan", 500, None, None)
        .await?;
    assert!(tx.is_none());
    assert!(service.record_referral(ReferralLevel::One).await?.is_none());
    assert!(service.withdraw(100, jazzcash()).await?.is_none());
    assert_eq!(service.balance().await?, None);
    assert!(service.transactions().await?.is_empty());
    assert!(!service.set_pin("1234").await?);
    Ok(())
}

#[tokio::test]
async fn test_success_cue_fires_on_credits_only() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let cue = counting_cue();
    let mut service = service.with_cue(cue.clone());
    signed_up(&mut service, "ali").await?;

    fund(&service, 1000).await?;
    service
        .apply_transaction(TransactionType::SpinPurchase, "debit", -500, None, None)
        .await?;
    service.request_deposit(units(10), "TX-1").await?;
    assert_eq!(cue.count(), 1);

    service.record_referral(ReferralLevel::Two).await?;
    assert_eq!(cue.count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_referral_credits_bonus_and_counts() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    verified(&mut service, "ali").await?;

    let tx = service.record_referral(ReferralLevel::One).await?.unwrap();
    assert_eq!(tx.kind, TransactionType::Referral);
    assert_eq!(tx.description, "Level 1 Referral Bonus");
    assert_eq!(tx.amount, units(20));

    service.record_referral(ReferralLevel::Two).await?;
    service.record_referral(ReferralLevel::One).await?;

    assert_eq!(
        service.referrals().await?,
        ReferralCounters {
            level1: 2,
            level2: 1
        }
    );
    assert_eq!(service.balance().await?, Some(units(45)));

    let summary = service.summary().await?.unwrap();
    assert_eq!(summary.level1_referrals, 2);
    assert_eq!(summary.referral_earnings, units(45));
    Ok(())
}

#[tokio::test]
async fn test_referral_snapshot_is_persisted_with_transaction() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;

    let counters = ReferralCounters {
        level1: 7,
        level2: 3,
    };
    service
        .apply_transaction(
            TransactionType::Referral,
            "Level 1 Referral Bonus",
            units(20),
            Some(counters),
            None,
        )
        .await?;

    let stored: Option<ReferralCounters> = service
        .store()
        .get_json(&UserKey::Referrals.for_user("ali"))
        .await?;
    assert_eq!(stored, Some(counters));
    Ok(())
}

#[tokio::test]
async fn test_withdrawal_larger_than_balance_is_rejected() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(20)).await?;

    let result = service.withdraw(units(30), jazzcash()).await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientFunds {
            balance: 2000,
            required: 3000
        })
    ));
    assert_eq!(service.transactions().await?.len(), 1);
    assert_eq!(service.balance().await?, Some(units(20)));
    Ok(())
}

#[tokio::test]
async fn test_withdrawal_debits_and_saves_details() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(50)).await?;

    let tx = service.withdraw(units(30), jazzcash()).await?.unwrap();
    assert_eq!(tx.kind, TransactionType::Withdrawal);
    assert_eq!(tx.amount, -units(30));
    assert_eq!(tx.description, "Withdrawal via JazzCash");
    assert_eq!(tx.withdrawal_details, Some(jazzcash()));

    assert_eq!(service.balance().await?, Some(units(20)));
    assert_eq!(service.saved_withdrawal_details().await?, Some(jazzcash()));
    Ok(())
}

#[tokio::test]
async fn test_withdrawal_validates_input() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(50)).await?;

    assert!(matches!(
        service.withdraw(0, jazzcash()).await,
        Err(AppError::InvalidAmount(_))
    ));

    let blank = WithdrawalDetails::new(WithdrawalMethod::EasyPaisa, " ", "0311");
    assert!(matches!(
        service.withdraw(units(10), blank).await,
        Err(AppError::MissingField("account name"))
    ));

    let no_bank = WithdrawalDetails::new(WithdrawalMethod::BankTransfer, "Ali", "PK00123");
    assert!(matches!(
        service.withdraw(units(10), no_bank.clone()).await,
        Err(AppError::MissingField(_))
    ));

    let with_bank = no_bank.with_bank_name("Meezan Bank");
    assert!(service.withdraw(units(10), with_bank).await?.is_some());
    assert_eq!(service.balance().await?, Some(units(40)));
    Ok(())
}

#[tokio::test]
async fn test_deposit_request_moves_no_money_until_confirmed() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;

    let pending = service.request_deposit(units(100), "TX-99").await?.unwrap();
    assert_eq!(pending.kind, TransactionType::PendingDeposit);
    assert_eq!(pending.description, "Deposit via TXID: TX-99");
    assert_eq!(service.balance().await?, Some(0));

    let confirmed = service.confirm_deposit(&pending.id).await?.unwrap();
    assert_eq!(confirmed.kind, TransactionType::Deposit);
    assert_eq!(service.balance().await?, Some(units(100)));

    assert!(matches!(
        service.confirm_deposit(&pending.id).await,
        Err(AppError::DepositAlreadyConfirmed(_))
    ));
    assert!(matches!(
        service.confirm_deposit(&confirmed.id).await,
        Err(AppError::DepositNotFound(_))
    ));
    assert_eq!(service.balance().await?, Some(units(100)));
    Ok(())
}

#[tokio::test]
async fn test_deposit_request_validation() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;

    assert!(matches!(
        service.request_deposit(units(10), "  ").await,
        Err(AppError::MissingField(_))
    ));
    assert!(matches!(
        service.request_deposit(-5, "TX").await,
        Err(AppError::InvalidAmount(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_integrity_detects_cache_drift() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, 1500).await?;

    let report = service.check_integrity().await?.unwrap();
    assert!(report.is_healthy());
    assert_eq!(report.cached_balance, Some(1500));

    service
        .store()
        .set(&UserKey::Balance.for_user("ali"), "999.00")
        .await?;
    let report = service.check_integrity().await?.unwrap();
    assert!(!report.cache_in_sync());
    assert_eq!(report.computed_balance, 1500);

    // The log wins; the next write repairs the cache.
    assert_eq!(service.balance().await?, Some(1500));
    fund(&service, 100).await?;
    assert!(service.check_integrity().await?.unwrap().is_healthy());
    Ok(())
}

#[tokio::test]
async fn test_integrity_flags_malformed_withdrawal() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;

    let mut broken = Transaction::withdrawal(100, jazzcash());
    broken.withdrawal_details = None;
    service
        .store()
        .set_json(&UserKey::Transactions.for_user("ali"), &vec![broken.clone()])
        .await?;

    let report = service.check_integrity().await?.unwrap();
    assert_eq!(report.inconsistent_entries, vec![broken.id]);
    assert!(!report.is_healthy());
    Ok(())
}
