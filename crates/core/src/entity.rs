//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};

/// A persisted marketplace record.
///
/// Every record has a stable identifier and a creation timestamp; stores key
/// their collections by `id()` and list views order by `created_at()`.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// When the record was first created.
    fn created_at(&self) -> DateTime<Utc>;
}

/// Sort records newest first (ties broken by id for a stable order).
pub fn newest_first<E: Entity>(records: &mut [E]) {
    records.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(a.id()))
    });
}
