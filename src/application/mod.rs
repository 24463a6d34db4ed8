// Application layer - use cases and orchestration over the key-value store.
// The CLI talks to `LedgerService`; nothing above this layer touches storage keys.

pub mod error;
pub mod feedback;
pub mod service;

pub use error::*;
pub use feedback::*;
pub use service::*;
