//! Offline-capable QR access scanner: roster cache, pending queue,
//! offline verification, background sync, reporting and access logs.

pub mod offline;
pub mod queue;
pub mod report;
pub mod roster;
pub mod scanner;
pub mod sink;

pub use offline::verify_offline;
pub use queue::PendingQueue;
pub use roster::RosterCache;
pub use scanner::{Connectivity, ReplaySummary, Scanner, ScannerConfig};
pub use sink::ScanLogSink;
