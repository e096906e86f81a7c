use crate::{RtError, RtResult};

/// Floating point type used throughout the workspace
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> RtResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RtError::NonFinite { what, value: v })
    }
}

/// Strict two-sided band check: `center - half_width < v < center + half_width`.
///
/// Values exactly on either edge are outside the band.
pub fn strictly_within(v: Real, center: Real, half_width: Real) -> bool {
    v < center + half_width && v > center - half_width
}

/// Parse a definition string that must hold exactly one numeric literal.
///
/// Surrounding whitespace is ignored. Anything else (symbolic expressions,
/// field references, several tokens) is rejected, as are non-finite values.
pub fn parse_literal(text: &str) -> RtResult<Real> {
    let trimmed = text.trim();
    let value: Real = trimmed.parse().map_err(|_| RtError::NotALiteral {
        text: text.to_string(),
    })?;
    if !value.is_finite() {
        return Err(RtError::NotALiteral {
            text: text.to_string(),
        });
    }
    Ok(value)
}

/// Format a value so that [`parse_literal`] reads back the same `f64`.
pub fn format_literal(v: Real) -> String {
    // Display for f64 is the shortest representation that round-trips.
    format!("{v}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn finite_values_round_trip_through_text(v in -1.0e9f64..1.0e9) {
            prop_assert_eq!(parse_literal(&format_literal(v)).unwrap(), v);
        }
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn band_edges_are_exclusive() {
        assert!(strictly_within(13332.23, 13332.23, 10.0));
        assert!(strictly_within(13341.0, 13332.23, 10.0));
        assert!(!strictly_within(13342.23, 13332.23, 10.0));
        assert!(!strictly_within(13322.23, 13332.23, 10.0));
    }

    #[test]
    fn parse_literal_accepts_plain_numbers() {
        assert_eq!(parse_literal("2000").unwrap(), 2000.0);
        assert_eq!(parse_literal(" 1999.9894 ").unwrap(), 1999.9894);
        assert_eq!(parse_literal("-5e2").unwrap(), -500.0);
    }

    #[test]
    fn parse_literal_rejects_expressions() {
        assert!(parse_literal("$rotationSpeed * 2").is_err());
        assert!(parse_literal("100 200").is_err());
        assert!(parse_literal("").is_err());
        assert!(parse_literal("NaN").is_err());
        assert!(parse_literal("inf").is_err());
    }

    #[test]
    fn format_literal_round_trips() {
        for v in [2000.0, 1999.989_473_5, -0.1, 1.0e-15, 123_456_789.125] {
            assert_eq!(parse_literal(&format_literal(v)).unwrap(), v);
        }
    }
}
