use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::{Cents, ReferralLevel, units};

pub const DEFAULT_DATABASE: &str = "earnledger.db";

/// Amounts and timings the ledger applies. Amounts are whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerRules {
    pub joining_fee: i64,
    pub level1_bonus: i64,
    pub level2_bonus: i64,
    pub spin_cost: i64,
    /// Delay between payment submission and verification
    pub verification_delay_ms: u64,
}

impl Default for LedgerRules {
    fn default() -> Self {
        Self {
            joining_fee: 50,
            level1_bonus: ReferralLevel::One.default_bonus() / 100,
            level2_bonus: ReferralLevel::Two.default_bonus() / 100,
            spin_cost: 5,
            verification_delay_ms: 5_000,
        }
    }
}

impl LedgerRules {
    pub fn joining_fee(&self) -> Cents {
        units(self.joining_fee)
    }

    pub fn referral_bonus(&self, level: ReferralLevel) -> Cents {
        match level {
            ReferralLevel::One => units(self.level1_bonus),
            ReferralLevel::Two => units(self.level2_bonus),
        }
    }

    pub fn spin_cost(&self) -> Cents {
        units(self.spin_cost)
    }

    pub fn verification_delay(&self) -> Duration {
        Duration::from_millis(self.verification_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: String,
    pub rules: LedgerRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            rules: LedgerRules::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (required when given, otherwise an optional
    /// `earnledger.toml` in the working directory), then `EARNLEDGER__*`
    /// environment overrides such as `EARNLEDGER__RULES__JOINING_FEE=75`.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name("earnledger").required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("EARNLEDGER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
