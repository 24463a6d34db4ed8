use std::io::Write;

use crate::domain::Transaction;

/// Hook fired after a credit has been persisted.
pub trait SuccessCue: Send + Sync {
    fn credited(&self, transaction: &Transaction);
}

/// Does nothing. The default for library use.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl SuccessCue for SilentCue {
    fn credited(&self, _transaction: &Transaction) {}
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl SuccessCue for TerminalBell {
    fn credited(&self, _transaction: &Transaction) {
        let mut stderr = std::io::stderr();
        // A missing terminal is not worth failing a credit over.
        if stderr.write_all(b"\x07").and_then(|_| stderr.flush()).is_err() {
            tracing::debug!("could not ring terminal bell");
        }
    }
}
