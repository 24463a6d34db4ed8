use serde::{Deserialize, Serialize};

use super::{Cents, units};

/// Depth of a referral: direct invites are level one, their invites level two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferralLevel {
    One,
    Two,
}

impl ReferralLevel {
    pub fn from_number(level: u8) -> Option<Self> {
        match level {
            1 => Some(ReferralLevel::One),
            2 => Some(ReferralLevel::Two),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            ReferralLevel::One => 1,
            ReferralLevel::Two => 2,
        }
    }

    /// Default bonus credited per referral at this level.
    pub fn default_bonus(&self) -> Cents {
        match self {
            ReferralLevel::One => units(20),
            ReferralLevel::Two => units(5),
        }
    }

    pub fn bonus_description(&self) -> String {
        format!("Level {} Referral Bonus", self.number())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralCounters {
    pub level1: u32,
    pub level2: u32,
}

impl ReferralCounters {
    /// Counters after one more referral at `level`.
    pub fn incremented(self, level: ReferralLevel) -> Self {
        match level {
            ReferralLevel::One => Self {
                level1: self.level1 + 1,
                ..self
            },
            ReferralLevel::Two => Self {
                level2: self.level2 + 1,
                ..self
            },
        }
    }

    pub fn total(&self) -> u32 {
        self.level1 + self.level2
    }
}
