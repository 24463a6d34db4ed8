mod campaign;
mod job;
mod ledger;
mod money;
mod pin;
mod profile;
mod referral;
mod spin;
mod subscription;
mod transaction;
mod withdrawal;

pub use campaign::*;
pub use job::*;
pub use ledger::*;
pub use money::*;
pub use pin::*;
pub use profile::*;
pub use referral::*;
pub use spin::*;
pub use subscription::*;
pub use transaction::*;
pub use withdrawal::*;
