//! Byte-unit size strings as reported by `lvs --units=b`.

use super::error::SizeFormatError;

/// Parse a size reported in byte units (e.g. `"1073741824B"`) into bytes.
///
/// Only the byte suffix is accepted. Any other unit means `lvs` was not run
/// with `--units=b`, so the value is rejected rather than converted.
pub fn parse_size(s: &str) -> Result<u64, SizeFormatError> {
    let digits = s
        .strip_suffix('B')
        .or_else(|| s.strip_suffix('b'))
        .ok_or_else(|| SizeFormatError::UnknownSuffix(s.to_string()))?;

    digits
        .parse::<u64>()
        .map_err(|source| SizeFormatError::InvalidNumber {
            value: s.to_string(),
            source,
        })
}

/// Render a byte count as a size argument for `lvcreate --virtualsize`.
pub fn size_spec_from_bytes(bytes: u64) -> String {
    format!("{}b", bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size("1073741824B").unwrap(), 1073741824);
        assert_eq!(parse_size("4096b").unwrap(), 4096);
        assert_eq!(parse_size("0B").unwrap(), 0);
    }

    #[test]
    fn test_parse_size_rejects_other_units() {
        assert_eq!(
            parse_size("10G"),
            Err(SizeFormatError::UnknownSuffix("10G".into()))
        );
        assert!(matches!(
            parse_size("1.00g"),
            Err(SizeFormatError::UnknownSuffix(_))
        ));
        assert!(matches!(
            parse_size("512"),
            Err(SizeFormatError::UnknownSuffix(_))
        ));
        assert!(matches!(parse_size(""), Err(SizeFormatError::UnknownSuffix(_))));
    }

    #[test]
    fn test_parse_size_rejects_bad_numbers() {
        assert!(matches!(
            parse_size("abcB"),
            Err(SizeFormatError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_size("B"),
            Err(SizeFormatError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_size("-1B"),
            Err(SizeFormatError::InvalidNumber { .. })
        ));
        // u64::MAX + 1
        assert!(matches!(
            parse_size("18446744073709551616B"),
            Err(SizeFormatError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_size_spec_from_bytes() {
        let spec = size_spec_from_bytes(1 << 30);
        assert_eq!(spec, "1073741824b");
        assert_eq!(parse_size(&spec).unwrap(), 1 << 30);
    }
}
