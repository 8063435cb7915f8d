//! Numeric capacity extraction from free-text capacity descriptions.

use tracing::debug;

/// Largest integer that round-trips through an IEEE-754 double (2^53 - 1).
pub const MAX_SAFE_CAPACITY: u64 = 9_007_199_254_740_991;

/// Parse a capacity string such as `"10,000 tonnes/year"` or `"5,000+ tonnes"`.
///
/// Thousands separators and `+` markers are removed, then the first run of
/// ASCII digits is read. Returns `None` when there is no input, no digits, or
/// the number exceeds [`MAX_SAFE_CAPACITY`].
pub fn parse_capacity(text: Option<&str>) -> Option<u64> {
    let text = text?;
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '+').collect();

    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = cleaned[start..]
        .split(|c: char| !c.is_ascii_digit())
        .next()?;

    // Overflowing u64 also means overflowing the safe range
    match digits.parse::<u64>() {
        Ok(value) if value <= MAX_SAFE_CAPACITY => Some(value),
        _ => {
            debug!(text, "capacity exceeds safe integer range");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capacity_examples() {
        assert_eq!(parse_capacity(Some("10,000+")), Some(10_000));
        assert_eq!(parse_capacity(Some("10,000 tonnes/year")), Some(10_000));
        assert_eq!(parse_capacity(Some("5,000+ tonnes")), Some(5_000));
        assert_eq!(parse_capacity(Some("approx. 250 t/yr")), Some(250));
        assert_eq!(parse_capacity(Some("")), None);
        assert_eq!(parse_capacity(Some("TBD")), None);
        assert_eq!(parse_capacity(None), None);
    }

    #[test]
    fn test_first_run_only() {
        assert_eq!(parse_capacity(Some("1.5 million / 2024")), Some(1));
        assert_eq!(parse_capacity(Some("Phase 2: 60,000")), Some(2));
    }

    #[test]
    fn test_safe_range_cap() {
        assert_eq!(
            parse_capacity(Some("9,007,199,254,740,991")),
            Some(MAX_SAFE_CAPACITY)
        );
        assert_eq!(parse_capacity(Some("9007199254740992")), None);
        assert_eq!(parse_capacity(Some("99999999999999999999999")), None);
    }
}
