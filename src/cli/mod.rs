use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::application::{LedgerService, TerminalBell};
use crate::domain::{
    CampaignDraft, Cents, JOB_BOARD, ReferralLevel, SubscriptionPlan, TaskCategory,
    TransactionType, WalletPin, WithdrawalDetails, WithdrawalMethod, format_amount, parse_cents,
};
use crate::settings::Settings;

/// earnledger - local rewards wallet
#[derive(Parser)]
#[command(name = "earnledger")]
#[command(about = "Earn from micro-tasks, referrals and the spin wheel, then withdraw")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides the config file)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Config file path (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Act as if today were this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub today: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and log in
    Signup {
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,
    },

    /// Log in to an existing account
    Login { username: String },

    /// Log out of the active account
    Logout,

    /// Show the dashboard for the active account
    Dashboard,

    /// Pay the joining fee
    Pay {
        /// Return without waiting for verification
        #[arg(long)]
        no_wait: bool,
    },

    /// Wait for a submitted payment to be verified
    Verify,

    /// Show the current balance
    Balance,

    /// List the transaction log
    History {
        /// Maximum number of entries to show (most recent)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Withdraw to a mobile wallet or bank account
    Withdraw {
        /// Amount to withdraw (e.g., "30" or "30.50")
        amount: String,

        /// JazzCash, EasyPaisa or "Bank Transfer"
        #[arg(long)]
        method: Option<String>,

        #[arg(long)]
        account_name: Option<String>,

        #[arg(long)]
        account_number: Option<String>,

        /// Required for bank transfers
        #[arg(long)]
        bank: Option<String>,

        /// Reuse the last withdrawal details
        #[arg(long)]
        saved: bool,
    },

    /// Campaign board commands
    #[command(subcommand)]
    Campaign(CampaignCommands),

    /// Complete a campaign task and collect its reward
    Complete { task_id: String },

    /// Record a view of a campaign task
    View { task_id: String },

    /// Record a referral at level 1 or 2
    Refer {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        level: u8,
    },

    /// List job-board plans
    Plans,

    /// Subscribe to a job-board plan
    Subscribe { plan: String },

    /// List job-board listings
    Jobs,

    /// Apply to a job listing
    Apply { job_id: String },

    /// Deposit commands
    #[command(subcommand)]
    Deposit(DepositCommands),

    /// Spin the reward wheel
    Spin {
        /// Pay for a spin instead of using the daily free one
        #[arg(long)]
        buy: bool,
    },

    /// Wallet PIN commands
    #[command(subcommand)]
    Pin(PinCommands),

    /// Verify the stored balance against the transaction log
    Check,

    /// Export data to CSV, JSON or a text receipt
    Export {
        /// What to export: transactions, snapshot, receipt
        export_type: String,

        /// Withdrawal transaction id (receipt only)
        #[arg(long)]
        id: Option<String>,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CampaignCommands {
    /// Fund and publish a campaign
    Create {
        /// Visit Website, YouTube Subscribe, Facebook Like, Instagram Follow, TikTok Follow
        #[arg(long)]
        category: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        url: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Reward per completion
        #[arg(long)]
        reward: String,

        /// Number of completions to pay for
        #[arg(long)]
        quantity: u32,
    },

    /// List campaigns
    List {
        /// Include campaigns that are fully completed
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum DepositCommands {
    /// Submit a deposit request
    Request {
        amount: String,

        /// Transaction reference from the payment provider
        #[arg(long)]
        txid: String,
    },

    /// Confirm a pending deposit request
    Confirm { id: String },
}

#[derive(Subcommand)]
pub enum PinCommands {
    /// Set a 4-digit PIN
    Set { pin: String },

    /// Keep the wallet unlocked
    Skip,

    /// Check a PIN against the stored one
    Unlock { pin: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut settings = Settings::load(self.config.as_deref()).context("Failed to load settings")?;
        if let Some(database) = self.database {
            settings.database = database;
        }
        let today = match self.today.as_deref() {
            Some(date) => parse_date(date)?,
            None => Local::now().date_naive(),
        };

        let mut service = LedgerService::init(&settings)
            .await?
            .with_cue(Arc::new(TerminalBell));

        match self.command {
            Commands::Signup {
                username,
                email,
                phone,
            } => {
                let profile = service.signup(&username, &email, &phone).await?;
                println!("Welcome, {}! Status: {}", profile.username, profile.payment_status);
                println!(
                    "Pay the {} joining fee with `earnledger pay` to activate your account.",
                    format_amount(service.rules().joining_fee())
                );
            }

            Commands::Login { username } => {
                let profile = service.login(&username, today).await?;
                println!("Logged in as {} ({})", profile.username, profile.payment_status);
            }

            Commands::Logout => {
                service.resume(today).await?;
                service.logout().await?;
                println!("Logged out.");
            }

            command => {
                if service.resume(today).await?.is_none() {
                    bail!("Not logged in. Run `earnledger login <username>` first.");
                }
                run_session_command(&mut service, command, today).await?;
            }
        }

        Ok(())
    }
}

async fn run_session_command(
    service: &mut LedgerService,
    command: Commands,
    today: NaiveDate,
) -> Result<()> {
    match command {
        Commands::Dashboard => run_dashboard_command(service).await?,

        Commands::Pay { no_wait } => {
            service.submit_payment().await?;
            println!("Payment submitted. Verification pending.");
            if !no_wait {
                run_verify_command(service).await?;
            }
        }

        Commands::Verify => run_verify_command(service).await?,

        Commands::Balance => {
            let balance = service.balance().await?.unwrap_or_default();
            println!("Balance: {}", format_amount(balance));
        }

        Commands::History { limit } => run_history_command(service, limit).await?,

        Commands::Withdraw {
            amount,
            method,
            account_name,
            account_number,
            bank,
            saved,
        } => {
            let amount = parse_amount(&amount)?;
            let details = if saved {
                service
                    .saved_withdrawal_details()
                    .await?
                    .context("No saved withdrawal details")?
            } else {
                build_details(method, account_name, account_number, bank)?
            };

            if let Some(tx) = service.withdraw(amount, details).await? {
                println!("Withdrawal requested: {} ({})", format_amount(-tx.amount), tx.id);
            }
        }

        Commands::Campaign(cmd) => run_campaign_command(service, cmd).await?,

        Commands::Complete { task_id } => match service.record_task_completion(&task_id).await? {
            Some(tx) => println!("{}: +{}", tx.description, format_amount(tx.amount)),
            None => println!("Task {} already completed.", task_id),
        },

        Commands::View { task_id } => {
            service.record_task_view(&task_id).await?;
            println!("View recorded for {}", task_id);
        }

        Commands::Refer { level } => {
            let level = ReferralLevel::from_number(level).context("Referral level must be 1 or 2")?;
            if let Some(tx) = service.record_referral(level).await? {
                println!("{}: +{}", tx.description, format_amount(tx.amount));
            }
        }

        Commands::Plans => {
            println!("{:<12} {:>12} {:>8} {:>10} PREMIUM", "PLAN", "PRICE", "DAYS", "DAILY");
            println!("{}", "-".repeat(54));
            for plan in SubscriptionPlan::PURCHASABLE {
                println!(
                    "{:<12} {:>12} {:>8} {:>10} {}",
                    plan.as_str(),
                    plan.price().map(format_amount).unwrap_or_default(),
                    plan.duration_days(),
                    plan.daily_limit().to_string(),
                    if plan.includes_premium_jobs() { "yes" } else { "no" }
                );
            }
        }

        Commands::Subscribe { plan } => {
            let plan = SubscriptionPlan::from_name(&plan);
            if let Some(subscription) = service.subscribe(plan, today).await? {
                println!(
                    "Subscribed to {} until {} ({} applications per day)",
                    subscription.plan,
                    subscription.expiry_date,
                    subscription.daily_limit()
                );
            }
        }

        Commands::Jobs => {
            println!("{:<6} {:<24} {:<10} {:<18} PREMIUM", "ID", "TITLE", "TYPE", "SALARY");
            println!("{}", "-".repeat(70));
            for job in &JOB_BOARD {
                println!(
                    "{:<6} {:<24} {:<10} {:<18} {}",
                    job.id,
                    job.title,
                    job.kind,
                    job.salary,
                    if job.is_premium { "yes" } else { "no" }
                );
            }
        }

        Commands::Apply { job_id } => {
            if let Some(subscription) = service.apply_for_job(&job_id, today).await? {
                println!(
                    "Applied to {}. Applications today: {} of {}",
                    job_id,
                    subscription.applications_today,
                    subscription.daily_limit()
                );
            }
        }

        Commands::Deposit(cmd) => run_deposit_command(service, cmd).await?,

        Commands::Spin { buy } => {
            let mut rng = rand::thread_rng();
            let receipt = if buy {
                service.buy_spin(&mut rng).await?
            } else {
                service.free_spin(today, &mut rng).await?
            };
            if let Some(receipt) = receipt {
                println!(
                    "The wheel stopped on segment {}: you won {}",
                    receipt.outcome.segment + 1,
                    format_amount(receipt.outcome.prize)
                );
            }
        }

        Commands::Pin(cmd) => run_pin_command(service, cmd).await?,

        Commands::Check => run_check_command(service).await?,

        Commands::Export {
            export_type,
            id,
            output,
        } => run_export_command(service, &export_type, id.as_deref(), output.as_deref()).await?,

        Commands::Signup { .. } | Commands::Login { .. } | Commands::Logout => {
            bail!("Account commands run outside a session")
        }
    }

    Ok(())
}

async fn run_dashboard_command(service: &LedgerService) -> Result<()> {
    let Some(summary) = service.summary().await? else {
        return Ok(());
    };

    println!("User:              {}", summary.username);
    println!("Status:            {}", summary.payment_status);
    println!("Balance:           {}", format_amount(summary.balance));
    println!("Tasks completed:   {}", summary.tasks_completed);
    println!("Referrals:         {}", summary.level1_referrals);
    println!("Referral earnings: {}", format_amount(summary.referral_earnings));
    match summary.subscription {
        Some(sub) => println!(
            "Job plan:          {} until {} ({} of {} today)",
            sub.plan,
            sub.expiry_date,
            sub.applications_today,
            sub.daily_limit()
        ),
        None => println!("Job plan:          none"),
    }
    Ok(())
}

async fn run_verify_command(service: &mut LedgerService) -> Result<()> {
    match service.wait_for_verification().await? {
        Some(outcome) => println!(
            "Account verified. Balance: {}",
            format_amount(outcome.balance)
        ),
        None => println!("No verification pending."),
    }
    Ok(())
}

async fn run_history_command(service: &LedgerService, limit: Option<usize>) -> Result<()> {
    let transactions = service.transactions().await?;
    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let skip = limit.map_or(0, |limit| transactions.len().saturating_sub(limit));
    println!(
        "{:<12} {:<17} {:>12}  {:<34} DESCRIPTION",
        "DATE", "TYPE", "AMOUNT", "ID"
    );
    println!("{}", "-".repeat(100));
    for tx in transactions.iter().skip(skip).rev() {
        let note = match tx.kind {
            TransactionType::PendingDeposit => " (pending)",
            TransactionType::JoiningFee => " (paid at signup)",
            _ => "",
        };
        println!(
            "{:<12} {:<17} {:>12}  {:<34} {}{}",
            tx.date.format("%Y-%m-%d"),
            tx.kind.as_str(),
            format_amount(tx.amount),
            tx.id,
            truncate(&tx.description, 40),
            note
        );
    }
    Ok(())
}

async fn run_campaign_command(service: &LedgerService, cmd: CampaignCommands) -> Result<()> {
    match cmd {
        CampaignCommands::Create {
            category,
            title,
            url,
            description,
            reward,
            quantity,
        } => {
            let category = TaskCategory::from_str(&category).with_context(|| {
                format!(
                    "Invalid category '{}'. Valid categories: {}",
                    category,
                    TaskCategory::ALL.map(|c| c.as_str()).join(", ")
                )
            })?;
            let draft = CampaignDraft {
                category,
                title,
                description,
                url,
                reward: parse_amount(&reward)?,
                quantity,
            };

            if let Some(campaign) = service.create_campaign(draft).await? {
                println!(
                    "Published campaign {} ({} x {} = {})",
                    campaign.id,
                    campaign.quantity,
                    format_amount(campaign.reward),
                    format_amount(campaign.total_cost())
                );
            }
        }

        CampaignCommands::List { all } => {
            let campaigns = if all {
                service.all_campaigns().await?
            } else {
                service.available_campaigns().await?
            };
            if campaigns.is_empty() {
                println!("No campaigns found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<18} {:>10} {:>9} {:>6}  TITLE",
                "ID", "TYPE", "REWARD", "LEFT", "VIEWS"
            );
            println!("{}", "-".repeat(100));
            for campaign in &campaigns {
                println!(
                    "{:<38} {:<18} {:>10} {:>9} {:>6}  {}",
                    campaign.id,
                    campaign.category.as_str(),
                    format_amount(campaign.reward),
                    campaign.remaining(),
                    campaign.views,
                    truncate(&campaign.title, 30)
                );
            }
        }
    }
    Ok(())
}

async fn run_deposit_command(service: &LedgerService, cmd: DepositCommands) -> Result<()> {
    match cmd {
        DepositCommands::Request { amount, txid } => {
            let amount = parse_amount(&amount)?;
            if let Some(tx) = service.request_deposit(amount, &txid).await? {
                println!(
                    "Deposit request {} for {} submitted for review.",
                    tx.id,
                    format_amount(tx.amount)
                );
            }
        }
        DepositCommands::Confirm { id } => {
            if let Some(tx) = service.confirm_deposit(&id).await? {
                println!("Deposit confirmed: +{}", format_amount(tx.amount));
            }
        }
    }
    Ok(())
}

async fn run_pin_command(service: &LedgerService, cmd: PinCommands) -> Result<()> {
    match cmd {
        PinCommands::Set { pin } => {
            service.set_pin(&pin).await?;
            println!("Wallet PIN set.");
        }
        PinCommands::Skip => {
            service.skip_pin().await?;
            println!("Wallet PIN skipped.");
        }
        PinCommands::Unlock { pin } => {
            service.unlock_wallet(&pin).await?;
            match service.wallet_pin().await? {
                Some(WalletPin::Set(_)) => println!("Wallet unlocked."),
                _ => println!("Wallet has no PIN."),
            }
        }
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let Some(report) = service.check_integrity().await? else {
        return Ok(());
    };

    println!("User:         {}", report.username);
    println!("Transactions: {}", report.transaction_count);
    println!("Computed:     {}", format_amount(report.computed_balance));
    println!(
        "Cached:       {}",
        report
            .cached_balance
            .map(format_amount)
            .unwrap_or_else(|| "-".to_string())
    );
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        if !report.cache_in_sync() {
            println!("  - balance cache does not match the transaction log");
        }
        for id in &report.inconsistent_entries {
            println!("  - {} has withdrawal details that do not match its type", id);
        }
        for id in &report.duplicate_ids {
            println!("  - duplicate transaction id {}", id);
        }
        bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    id: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "snapshot" => {
            let snapshot = exporter.export_snapshot_json(writer).await?;
            if let (Some(snapshot), Some(_)) = (snapshot, output) {
                eprintln!(
                    "Exported snapshot of {}: {} transactions",
                    snapshot.profile.username,
                    snapshot.transactions.len()
                );
            }
        }
        "receipt" => {
            let id = id.context("--id is required for receipts")?;
            exporter.write_withdrawal_receipt(id, writer).await?;
        }
        _ => {
            bail!(
                "Invalid export type '{}'. Valid types: transactions, snapshot, receipt",
                export_type
            );
        }
    }

    Ok(())
}

fn build_details(
    method: Option<String>,
    account_name: Option<String>,
    account_number: Option<String>,
    bank: Option<String>,
) -> Result<WithdrawalDetails> {
    let method = method.context("--method is required (or use --saved)")?;
    let method = WithdrawalMethod::from_str(&method).with_context(|| {
        format!(
            "Invalid method '{}'. Valid methods: JazzCash, EasyPaisa, Bank Transfer",
            method
        )
    })?;

    let mut details = WithdrawalDetails::new(
        method,
        account_name.unwrap_or_default(),
        account_number.unwrap_or_default(),
    );
    if let Some(bank) = bank {
        details = details.with_bank_name(bank);
    }
    Ok(details)
}

fn parse_amount(input: &str) -> Result<Cents> {
    parse_cents(input).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", input))
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
