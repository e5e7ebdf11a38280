//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Order lines are entities: two lines with identical type, description and
/// amounts are still different rows of the document.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Identity equality (as opposed to structural `PartialEq`).
    fn same_identity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
