use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use subchapters_core::{AggregateId, DomainError, Entity};

/// Sale line identifier, unique within (and across) orders.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub AggregateId);

impl LineId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for LineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Kind of a sale line.
///
/// `Line`, `Title` and `Subtotal` come from the base order model; `Subtitle`
/// and `Subsubtotal` add the nested grouping level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Line,
    Title,
    Subtotal,
    Subtitle,
    Subsubtotal,
}

impl LineType {
    pub const ALL: [LineType; 5] = [
        LineType::Line,
        LineType::Title,
        LineType::Subtotal,
        LineType::Subtitle,
        LineType::Subsubtotal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LineType::Line => "line",
            LineType::Title => "title",
            LineType::Subtotal => "subtotal",
            LineType::Subtitle => "subtitle",
            LineType::Subsubtotal => "subsubtotal",
        }
    }

    /// Whether the amount column is displayed for this kind of line.
    pub fn shows_amount(self) -> bool {
        matches!(
            self,
            LineType::Line | LineType::Subtotal | LineType::Subsubtotal
        )
    }

    /// Subtotal and subsubtotal lines terminate a scope.
    pub fn is_terminator(self) -> bool {
        matches!(self, LineType::Subtotal | LineType::Subsubtotal)
    }
}

impl core::fmt::Display for LineType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LineType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown line type '{s}'")))
    }
}

/// One row of a sale order.
///
/// `quantity` and `unit_price` only carry meaning for `LineType::Line`; the
/// other kinds keep them at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub id: LineId,
    #[serde(rename = "type")]
    pub line_type: LineType,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl SaleLine {
    pub fn new(line_type: LineType, description: impl Into<String>) -> Self {
        Self::with_id(LineId::generate(), line_type, description)
    }

    pub fn with_id(id: LineId, line_type: LineType, description: impl Into<String>) -> Self {
        Self {
            id,
            line_type,
            description: description.into(),
            quantity: Decimal::ZERO,
            unit_price: Decimal::ZERO,
        }
    }

    pub fn line(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            quantity,
            unit_price,
            ..Self::new(LineType::Line, description)
        }
    }

    pub fn title(description: impl Into<String>) -> Self {
        Self::new(LineType::Title, description)
    }

    pub fn subtitle(description: impl Into<String>) -> Self {
        Self::new(LineType::Subtitle, description)
    }

    pub fn subtotal(description: impl Into<String>) -> Self {
        Self::new(LineType::Subtotal, description)
    }

    pub fn subsubtotal(description: impl Into<String>) -> Self {
        Self::new(LineType::Subsubtotal, description)
    }

    /// Unrounded `quantity * unit_price`, `None` when it does not fit a `Decimal`.
    pub fn raw_amount(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }
}

impl Entity for SaleLine {
    type Id = LineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_visibility_follows_line_type() {
        let visible: Vec<_> = LineType::ALL
            .into_iter()
            .filter(|t| t.shows_amount())
            .collect();
        assert_eq!(
            visible,
            vec![LineType::Line, LineType::Subtotal, LineType::Subsubtotal]
        );
    }

    #[test]
    fn line_type_parses_every_variant() {
        for t in LineType::ALL {
            assert_eq!(t.as_str().parse::<LineType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_line_type_is_a_validation_error() {
        let err = "comment".parse::<LineType>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("comment")));
    }

    #[test]
    fn serializes_type_in_lowercase() {
        let line = SaleLine::subsubtotal("Subtotal Chapter 1");
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["type"], "subsubtotal");
        assert_eq!(json["description"], "Subtotal Chapter 1");
    }

    #[test]
    fn raw_amount_overflow_is_none() {
        let line = SaleLine::line("Huge", Decimal::MAX, dec!(2));
        assert_eq!(line.raw_amount(), None);
        assert_eq!(
            SaleLine::line("x", dec!(3), dec!(1.5)).raw_amount(),
            Some(dec!(4.5))
        );
    }

    #[test]
    fn identical_rows_are_distinct_entities() {
        let a = SaleLine::line("Normal line", dec!(1), dec!(10));
        let b = SaleLine::line("Normal line", dec!(1), dec!(10));
        assert!(!a.same_identity(&b));
        assert!(a.same_identity(&a.clone()));
    }
}
