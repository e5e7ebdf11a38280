//! Amounts of computed lines.
//!
//! Aggregate lines carry no stored amount; it is derived on read by scanning
//! the order in document order.

use rust_decimal::Decimal;

use subchapters_core::{DomainError, DomainResult};

use crate::currency::Rounding;
use crate::line::{LineId, LineType, SaleLine};

/// Amount of a `subsubtotal` line.
///
/// Sums the rounded amounts of plain lines since the previous `subtotal` or
/// `subsubtotal` line (either kind resets), or since the start of the order.
/// Headings are transparent.
pub fn resolve_subsubtotal(
    lines: &[SaleLine],
    target: LineId,
    rounding: &impl Rounding,
) -> DomainResult<Decimal> {
    debug_assert!(
        lines
            .iter()
            .any(|l| l.id == target && l.line_type == LineType::Subsubtotal),
        "resolve_subsubtotal called for a line that is not a subsubtotal of this order"
    );

    accumulate(lines, target, rounding, LineType::is_terminator)
}

/// Amount of a `subtotal` line.
///
/// Same scan as [`resolve_subsubtotal`] but only earlier `subtotal` lines
/// reset the running total, so a title spanning several subtitles sums all of
/// them.
pub fn resolve_subtotal(
    lines: &[SaleLine],
    target: LineId,
    rounding: &impl Rounding,
) -> DomainResult<Decimal> {
    debug_assert!(
        lines
            .iter()
            .any(|l| l.id == target && l.line_type == LineType::Subtotal),
        "resolve_subtotal called for a line that is not a subtotal of this order"
    );

    accumulate(lines, target, rounding, |t| t == LineType::Subtotal)
}

/// Displayed amount of the line at `index`, `Ok(None)` for headings.
pub fn line_amount(
    lines: &[SaleLine],
    index: usize,
    rounding: &impl Rounding,
) -> DomainResult<Option<Decimal>> {
    let line = lines.get(index).ok_or_else(DomainError::not_found)?;
    let amount = match line.line_type {
        LineType::Line => rounded(line, rounding)?,
        LineType::Subtotal => resolve_subtotal(lines, line.id, rounding)?,
        LineType::Subsubtotal => resolve_subsubtotal(lines, line.id, rounding)?,
        LineType::Title | LineType::Subtitle => return Ok(None),
    };
    Ok(Some(amount))
}

/// `round(quantity * unit_price)` of a plain line.
fn rounded(line: &SaleLine, rounding: &impl Rounding) -> DomainResult<Decimal> {
    line.raw_amount()
        .map(|amount| rounding.round(amount))
        .ok_or_else(|| DomainError::invariant(format!("line {} amount overflow", line.id)))
}

fn accumulate(
    lines: &[SaleLine],
    target: LineId,
    rounding: &impl Rounding,
    resets: impl Fn(LineType) -> bool,
) -> DomainResult<Decimal> {
    let mut total = Decimal::ZERO;
    for line in lines {
        if line.id == target {
            break;
        }
        match line.line_type {
            LineType::Line => {
                total = total
                    .checked_add(rounded(line, rounding)?)
                    .ok_or_else(|| DomainError::invariant("running total overflow"))?;
            }
            t if resets(t) => total = Decimal::ZERO,
            _ => {}
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use rust_decimal_macros::dec;

    fn ten() -> SaleLine {
        SaleLine::line("Normal line", dec!(1), dec!(10))
    }

    fn amounts(lines: &[SaleLine]) -> Vec<Option<Decimal>> {
        let eur = Currency::eur();
        (0..lines.len())
            .map(|i| line_amount(lines, i, &eur).unwrap())
            .collect()
    }

    #[test]
    fn subtotal_sums_preceding_lines() {
        let lines = vec![ten(), ten(), SaleLine::subtotal("Subtotal line"), ten()];
        assert_eq!(amounts(&lines)[2], Some(dec!(20)));
    }

    #[test]
    fn subsubtotal_sums_preceding_lines() {
        let lines = vec![ten(), ten(), SaleLine::subsubtotal("Subtotal line"), ten()];
        assert_eq!(amounts(&lines)[2], Some(dec!(20)));
    }

    #[test]
    fn subtotal_spans_earlier_subsubtotal() {
        let lines = vec![
            ten(),
            ten(),
            SaleLine::subsubtotal("Subtotal line"),
            ten(),
            ten(),
            SaleLine::subtotal("Subtotal line"),
            ten(),
        ];
        let a = amounts(&lines);
        assert_eq!(a[2], Some(dec!(20)));
        assert_eq!(a[5], Some(dec!(40)));
    }

    #[test]
    fn subsubtotal_resets_at_earlier_subtotal() {
        let lines = vec![
            ten(),
            ten(),
            SaleLine::subtotal("Subtotal line"),
            ten(),
            ten(),
            SaleLine::subsubtotal("Subtotal line"),
            ten(),
        ];
        let a = amounts(&lines);
        assert_eq!(a[2], Some(dec!(20)));
        assert_eq!(a[5], Some(dec!(20)));
    }

    #[test]
    fn headings_are_transparent_and_have_no_amount() {
        let lines = vec![
            SaleLine::title("Title"),
            ten(),
            SaleLine::subtitle("Subtitle"),
            ten(),
            SaleLine::subsubtotal("Subtotal"),
        ];
        let a = amounts(&lines);
        assert_eq!(a[0], None);
        assert_eq!(a[2], None);
        assert_eq!(a[4], Some(dec!(20)));
    }

    #[test]
    fn plain_line_amount_is_rounded_in_currency() {
        let lines = vec![
            SaleLine::line("a", dec!(3), dec!(0.3333)),
            SaleLine::line("b", dec!(3), dec!(0.3333)),
            SaleLine::subsubtotal("Subtotal"),
        ];
        let a = amounts(&lines);
        assert_eq!(a[0], Some(dec!(1.00)));
        assert_eq!(a[2], Some(dec!(2.00)));
    }

    #[test]
    fn identical_subsubtotals_are_told_apart_by_identity() {
        let first = SaleLine::subsubtotal("Subtotal");
        let mut second = first.clone();
        second.id = LineId::generate();
        let lines = vec![ten(), first.clone(), ten(), ten(), second.clone()];

        let eur = Currency::eur();
        assert_eq!(resolve_subsubtotal(&lines, first.id, &eur).unwrap(), dec!(10));
        assert_eq!(resolve_subsubtotal(&lines, second.id, &eur).unwrap(), dec!(20));
    }

    #[test]
    fn overflowing_running_total_is_an_error() {
        let lines = vec![
            SaleLine::line("a", Decimal::MAX, dec!(1)),
            SaleLine::line("b", Decimal::MAX, dec!(1)),
            SaleLine::subsubtotal("Subtotal"),
        ];
        let eur = Currency::new("EUR", 0);

        assert_eq!(line_amount(&lines, 0, &eur).unwrap(), Some(Decimal::MAX));
        let err = line_amount(&lines, 2, &eur).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(msg) if msg.contains("overflow")));
    }

    #[test]
    fn index_out_of_range_is_not_found() {
        let eur = Currency::eur();
        assert_eq!(line_amount(&[ten()], 1, &eur).unwrap_err(), DomainError::NotFound);
    }
}
