//! In-memory caches over the stored records.
//!
//! Each schedule is loaded once from the [`Database`](crate::storage::Database),
//! answers queries from memory, and writes every mutation straight back.
//! Store failures are logged and never undo the in-memory change.

pub mod hormones;
pub mod pills;
pub mod sites;

pub use hormones::HormoneSchedule;
pub use pills::PillSchedule;
pub use sites::SiteSchedule;
