use thiserror::Error;

/// Errors reported while driving a detached [`RangedQuery`](crate::RangedQuery).
///
/// Both conditions are programming errors local to one iterator and leave the
/// tree itself intact; callers can recover by creating a fresh query.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum IterError {
    /// The tree was structurally mutated (insert, remove, or clear) after the
    /// query was created, other than through the query's own
    /// [`remove`](crate::RangedQuery::remove).
    #[error("tree was structurally modified while iterating")]
    TreeModified,
    /// [`remove`](crate::RangedQuery::remove) was called before any successful
    /// advance, or twice for the same yielded entry.
    #[error("no entry to remove; nothing yielded since the last removal")]
    NothingToRemove,
}
