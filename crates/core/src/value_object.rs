//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attributes, e.g. a
/// `Currency { code: "EUR", digits: 2 }` is interchangeable with any other
/// currency carrying the same code and precision.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
