use std::fmt;

/// Sentinel stored when a user declines to set a PIN.
pub const PIN_SKIPPED: &str = "SKIPPED";

pub const PIN_LENGTH: usize = 4;

/// Wallet lock state as stored under `walletPin_<username>`.
#[derive(Clone, PartialEq, Eq)]
pub enum WalletPin {
    Set(String),
    Skipped,
}

impl WalletPin {
    /// Validate and wrap a new PIN.
    pub fn new(pin: &str) -> Result<Self, InvalidPin> {
        if pin.len() == PIN_LENGTH && pin.chars().all(|c| c.is_ascii_digit()) {
            Ok(WalletPin::Set(pin.to_string()))
        } else {
            Err(InvalidPin)
        }
    }

    pub fn from_stored(value: &str) -> Option<Self> {
        if value == PIN_SKIPPED {
            Some(WalletPin::Skipped)
        } else {
            WalletPin::new(value).ok()
        }
    }

    pub fn as_stored(&self) -> &str {
        match self {
            WalletPin::Set(pin) => pin,
            WalletPin::Skipped => PIN_SKIPPED,
        }
    }

    /// Whether opening the wallet needs a PIN entry.
    pub fn locks_wallet(&self) -> bool {
        matches!(self, WalletPin::Set(_))
    }

    /// Skipped PINs unlock with anything.
    pub fn verify(&self, attempt: &str) -> bool {
        match self {
            WalletPin::Set(pin) => pin == attempt,
            WalletPin::Skipped => true,
        }
    }
}

// Keep PIN digits out of logs.
impl fmt::Debug for WalletPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletPin::Set(_) => write!(f, "WalletPin::Set(****)"),
            WalletPin::Skipped => write!(f, "WalletPin::Skipped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPin;

impl fmt::Display for InvalidPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PIN must be exactly {} digits", PIN_LENGTH)
    }
}

impl std::error::Error for InvalidPin {}
