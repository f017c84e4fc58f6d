mod accounts;
mod auth;
mod ledger;
mod snapshot;

pub use accounts::Account;
pub use accounts::AccountError;
pub use accounts::AccountRegistry;
pub use auth::TokenManager;
pub use ledger::DeliveryHistory;
pub use ledger::DeliveryLedger;
pub use ledger::LedgerEntry;
pub use ledger::LedgerError;
pub use ledger::lookback_days;
pub use snapshot::SnapshotError;
pub use snapshot::SnapshotStore;
