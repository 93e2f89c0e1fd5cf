//! Parsing of Kubernetes resource quantities into byte counts

const BINARY_SUFFIXES: &[(&str, u32)] = &[
    ("Ki", 1),
    ("Mi", 2),
    ("Gi", 3),
    ("Ti", 4),
    ("Pi", 5),
    ("Ei", 6),
];

const DECIMAL_SUFFIXES: &[(&str, i32)] = &[
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
    ("m", -3),
];

/// Parse a quantity such as `10Gi`, `500M`, `1e9` or `1024` into bytes.
///
/// Fractions are truncated toward zero. Returns `None` for text that is
/// not a quantity or is negative.
pub fn parse_quantity(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return None;
    }

    for (suffix, power) in BINARY_SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            let value: f64 = number.parse().ok()?;
            return to_bytes(value * 1024f64.powi(*power as i32));
        }
    }

    for (suffix, exponent) in DECIMAL_SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            // "1E" is exa, but a plain exponent like "1e3" parses below
            if let Ok(value) = number.parse::<f64>() {
                return to_bytes(value * 10f64.powi(*exponent));
            }
        }
    }

    to_bytes(quantity.parse().ok()?)
}

fn to_bytes(value: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_suffixes() {
        assert_eq!(parse_quantity("1Ki"), Some(1024));
        assert_eq!(parse_quantity("10Gi"), Some(10 * 1024 * 1024 * 1024));
        assert_eq!(parse_quantity("1.5Mi"), Some(1572864));
    }

    #[test]
    fn test_decimal_suffixes_and_exponents() {
        assert_eq!(parse_quantity("500M"), Some(500_000_000));
        assert_eq!(parse_quantity("2k"), Some(2000));
        assert_eq!(parse_quantity("1E"), Some(1_000_000_000_000_000_000));
        assert_eq!(parse_quantity("1e3"), Some(1000));
        assert_eq!(parse_quantity("4096"), Some(4096));
    }

    #[test]
    fn test_invalid_quantities() {
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("lots"), None);
        assert_eq!(parse_quantity("-1Gi"), None);
    }
}
