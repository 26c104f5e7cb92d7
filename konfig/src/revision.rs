//! Revision numbers and the sentinels returned in their place.
//!
//! Every read returns its value together with a revision. Non-negative
//! revisions identify the snapshot the value came from; the negative
//! sentinels below report why no value was available.

use crate::error::{KonfigError, KonfigResult};

/// The key path is absent, or its value cannot be converted to the
/// requested type.
pub const NOT_FOUND: i64 = -1;

/// The value exists but could not be decoded into the requested shape.
pub const PARSE_FAILED: i64 = -2;

/// Revision carried by the empty snapshot created when the resource does
/// not exist yet.
pub const EMPTY: i64 = 0;

/// Parse a resource version token into a numeric revision.
///
/// Tokens are compared numerically once parsed, so `"10"` is newer than
/// `"9"`.
///
/// # Errors
///
/// Returns [`KonfigError::InvalidRevision`] when the token is not a decimal
/// integer.
pub fn parse_revision(token: &str) -> KonfigResult<i64> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|source| KonfigError::InvalidRevision {
            token: token.to_owned(),
            source,
        })
}

/// Returns `true` when `revision` identifies a snapshot rather than a
/// failure sentinel.
#[must_use]
pub const fn is_found(revision: i64) -> bool {
    revision >= 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("42", 42)]
    #[case(" 1007 ", 1007)]
    fn parses_decimal_tokens(#[case] token: &str, #[case] expected: i64) {
        assert!(matches!(parse_revision(token), Ok(rev) if rev == expected));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1.5")]
    fn rejects_non_integer_tokens(#[case] token: &str) {
        let err = parse_revision(token).expect_err("token should be rejected");
        assert!(matches!(err, KonfigError::InvalidRevision { .. }));
    }

    #[test]
    fn numeric_order_beats_lexical_order() {
        let nine = parse_revision("9").expect("nine");
        let ten = parse_revision("10").expect("ten");
        assert!(ten > nine);
    }

    #[test]
    fn sentinels_are_not_found() {
        assert!(!is_found(NOT_FOUND));
        assert!(!is_found(PARSE_FAILED));
        assert!(is_found(EMPTY));
    }
}
