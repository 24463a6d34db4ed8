use thiserror::Error;

use crate::domain::{Cents, DailyLimit, DetailsMismatch, PaymentStatus, SubscriptionPlan, format_amount};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}. Please sign up.")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: have {}, need {}", amount(.balance), amount(.required))]
    InsufficientFunds { balance: Cents, required: Cents },

    #[error("Payment cannot be submitted while status is {0}")]
    PaymentNotPending(PaymentStatus),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task is no longer accepting completions: {0}")]
    TaskFull(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("No active job subscription")]
    NoSubscription,

    #[error("Job subscription expired on {0}")]
    SubscriptionExpired(chrono::NaiveDate),

    #[error("Plan {0} cannot be purchased")]
    PlanUnavailable(SubscriptionPlan),

    #[error("Job {job_id} requires a plan above {plan}")]
    PremiumJob { job_id: String, plan: SubscriptionPlan },

    #[error("Already applied to job {0}")]
    AlreadyApplied(String),

    #[error("Daily application limit reached ({0} per day)")]
    DailyLimitReached(DailyLimit),

    #[error("Free spin already used today")]
    FreeSpinUsed,

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("Incorrect PIN")]
    IncorrectPin,

    #[error("Deposit request not found: {0}")]
    DepositNotFound(String),

    #[error("Deposit already confirmed: {0}")]
    DepositAlreadyConfirmed(String),

    #[error("Account {0} changed while the operation ran; try again")]
    StateChanged(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(#[from] DetailsMismatch),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

fn amount(cents: &Cents) -> String {
    format_amount(*cents)
}
