// Weekly roster snapshots and their cache.

pub mod cache;
pub mod entry;

pub use cache::{PrefetchReport, RosterCache};
pub use entry::{RosterEntry, RosterSnapshot, RosterStatus};
