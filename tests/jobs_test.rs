mod common;

use anyhow::Result;
use common::{date, fund, signed_up, store_profile, test_service};
use earnledger::application::AppError;
use earnledger::domain::{DailyLimit, SubscriptionPlan, TransactionType, units};
use earnledger::storage::UserKey;

#[tokio::test]
async fn test_subscribe_debits_plan_price() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(1200)).await?;

    let today = date("2025-01-01");
    let subscription = service
        .subscribe(SubscriptionPlan::Growth, today)
        .await?
        .unwrap();
    assert_eq!(subscription.plan, SubscriptionPlan::Growth);
    assert_eq!(subscription.expiry_date, date("2025-01-31"));
    assert_eq!(subscription.applications_today, 0);

    let transactions = service.transactions().await?;
    let last = transactions.last().unwrap();
    assert_eq!(last.kind, TransactionType::JobSubscription);
    assert_eq!(last.description, "Subscribed to Growth plan");
    assert_eq!(last.amount, -units(1000));
    assert_eq!(service.balance().await?, Some(units(200)));

    let profile = service.profile().await?.unwrap();
    assert_eq!(profile.job_subscription, Some(subscription));
    Ok(())
}

#[tokio::test]
async fn test_subscribe_requires_funds_and_known_plan() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(100)).await?;
    let today = date("2025-01-01");

    assert!(matches!(
        service.subscribe(SubscriptionPlan::Starter, today).await,
        Err(AppError::InsufficientFunds { .. })
    ));
    assert!(matches!(
        service.subscribe(SubscriptionPlan::Unrecognized, today).await,
        Err(AppError::PlanUnavailable(SubscriptionPlan::Unrecognized))
    ));
    assert!(service.profile().await?.unwrap().job_subscription.is_none());
    assert_eq!(service.transactions().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_apply_requires_subscription() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;

    assert!(matches!(
        service.apply_for_job("job1", date("2025-01-01")).await,
        Err(AppError::NoSubscription)
    ));
    assert!(matches!(
        service.apply_for_job("job42", date("2025-01-01")).await,
        Err(AppError::JobNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_starter_plan_excludes_premium_jobs() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(500)).await?;
    let today = date("2025-01-01");
    service.subscribe(SubscriptionPlan::Starter, today).await?;

    assert!(matches!(
        service.apply_for_job("job2", today).await,
        Err(AppError::PremiumJob { .. })
    ));

    let subscription = service.apply_for_job("job1", today).await?.unwrap();
    assert_eq!(subscription.applications_today, 1);

    assert!(matches!(
        service.apply_for_job("job1", today).await,
        Err(AppError::AlreadyApplied(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_starter_sixth_application_is_denied() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(500)).await?;
    let today = date("2025-01-01");
    service.subscribe(SubscriptionPlan::Starter, today).await?;

    // Four applications already made today elsewhere.
    let mut profile = service.profile().await?.unwrap();
    if let Some(subscription) = profile.job_subscription.as_mut() {
        subscription.applications_today = 4;
    }
    store_profile(&service, &profile).await?;

    let fifth = service.apply_for_job("job1", today).await?.unwrap();
    assert_eq!(fifth.applications_today, 5);

    // The only open listing is taken, so clear it to reach the quota check.
    service
        .store()
        .set_json(&UserKey::AppliedJobIds.for_user("ali"), &Vec::<String>::new())
        .await?;

    assert!(matches!(
        service.apply_for_job("job1", today).await,
        Err(AppError::DailyLimitReached(DailyLimit::Limited(5)))
    ));
    let subscription = service.profile().await?.unwrap().job_subscription.unwrap();
    assert_eq!(subscription.applications_today, 5);
    Ok(())
}

#[tokio::test]
async fn test_quota_rolls_over_on_a_new_day() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(1000)).await?;
    service
        .subscribe(SubscriptionPlan::Growth, date("2025-01-01"))
        .await?;

    let mut profile = service.profile().await?.unwrap();
    profile.job_subscription.as_mut().unwrap().applications_today = 15;
    store_profile(&service, &profile).await?;

    assert!(matches!(
        service.apply_for_job("job1", date("2025-01-01")).await,
        Err(AppError::DailyLimitReached(_))
    ));

    let subscription = service
        .apply_for_job("job1", date("2025-01-02"))
        .await?
        .unwrap();
    assert_eq!(subscription.applications_today, 1);
    assert_eq!(subscription.last_application_date, date("2025-01-02"));
    Ok(())
}

#[tokio::test]
async fn test_login_applies_daily_reset() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(500)).await?;
    service
        .subscribe(SubscriptionPlan::Starter, date("2025-01-01"))
        .await?;
    service.apply_for_job("job1", date("2025-01-01")).await?;
    service.logout().await?;

    let profile = service.login("ali", date("2025-01-03")).await?;
    let subscription = profile.job_subscription.unwrap();
    assert_eq!(subscription.applications_today, 0);
    assert_eq!(subscription.last_application_date, date("2025-01-03"));

    let stored = service.store().find_profile("ali").await?.unwrap();
    assert_eq!(stored.job_subscription, Some(subscription));
    Ok(())
}

#[tokio::test]
async fn test_expired_subscription_cannot_apply() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(500)).await?;
    service
        .subscribe(SubscriptionPlan::Starter, date("2025-01-01"))
        .await?;

    assert!(service
        .apply_for_job("job1", date("2025-01-31"))
        .await?
        .is_some());

    service.logout().await?;
    service.login("ali", date("2025-02-01")).await?;
    assert!(matches!(
        service.apply_for_job("job1", date("2025-02-01")).await,
        Err(AppError::SubscriptionExpired(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_unrecognized_stored_plan_is_never_allowed() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    signed_up(&mut service, "ali").await?;
    fund(&service, units(500)).await?;
    let today = date("2025-01-01");
    service.subscribe(SubscriptionPlan::Starter, today).await?;

    let mut profile = service.profile().await?.unwrap();
    profile.job_subscription.as_mut().unwrap().plan = SubscriptionPlan::Unrecognized;
    store_profile(&service, &profile).await?;

    assert!(matches!(
        service.apply_for_job("job1", today).await,
        Err(AppError::DailyLimitReached(DailyLimit::Limited(0)))
    ));
    Ok(())
}
