//! Number scanning and display formatting

/// Scan a number at the start of `input`.
///
/// Accepts an integer part with optional thousands separators (groups of exactly
/// three digits after a leading group of one to three), an optional fraction,
/// and an optional `e`/`E` exponent with sign. Returns the value and the byte
/// length consumed.
pub fn scan_number(input: &str) -> Option<(f64, usize)> {
    let bytes = input.as_bytes();
    let mut pos = 0;
    let mut digits = String::new();

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    digits.push_str(&input[int_start..pos]);

    if pos > int_start && pos - int_start <= 3 {
        while pos + 4 <= bytes.len()
            && bytes[pos] == b','
            && bytes[pos + 1..pos + 4].iter().all(u8::is_ascii_digit)
            && !bytes.get(pos + 4).is_some_and(u8::is_ascii_digit)
        {
            digits.push_str(&input[pos + 1..pos + 4]);
            pos += 4;
        }
    }

    if pos < bytes.len() && bytes[pos] == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)
    {
        let frac_start = pos;
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        digits.push_str(&input[frac_start..pos]);
    }

    if digits.is_empty() || digits == "." {
        return None;
    }

    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp_end = pos + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            digits.push_str(&input[pos..exp_end]);
            pos = exp_end;
        }
    }

    digits.parse().ok().map(|value| (value, pos))
}

/// Format with at most `decimals` fraction digits, trailing zeros removed
pub fn format_decimals(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let text = format!("{:.*}", decimals, value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}

/// Format with `digits` significant digits, trailing zeros removed.
///
/// Integer digits are never dropped: `1234567` stays `1234567`.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format_decimals(value, 0);
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - magnitude).clamp(0, 15) as usize;
    format_decimals(value, decimals)
}

/// Format with exactly `decimals` fraction digits
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        text.trim_start_matches('-').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_plain() {
        assert_eq!(scan_number("42"), Some((42.0, 2)));
        assert_eq!(scan_number("3.14 km"), Some((3.14, 4)));
        assert_eq!(scan_number(".5"), Some((0.5, 2)));
        assert_eq!(scan_number("abc"), None);
        assert_eq!(scan_number("."), None);
    }

    #[test]
    fn test_scan_thousands() {
        assert_eq!(scan_number("1,000,000"), Some((1_000_000.0, 9)));
        assert_eq!(scan_number("1,234.5"), Some((1234.5, 7)));
        // Groups must be exactly three digits
        assert_eq!(scan_number("1,5"), Some((1.0, 1)));
        assert_eq!(scan_number("1,2345"), Some((1.0, 1)));
        assert_eq!(scan_number("1234,567"), Some((1234.0, 4)));
    }

    #[test]
    fn test_scan_scientific() {
        assert_eq!(scan_number("1e5"), Some((1e5, 3)));
        assert_eq!(scan_number("2.5E-3"), Some((2.5e-3, 6)));
        // No digits after the marker: the `e` is not part of the number
        assert_eq!(scan_number("2eggs"), Some((2.0, 1)));
        assert_eq!(scan_number("2e-x"), Some((2.0, 1)));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_decimals(72.25663103, 6), "72.256631");
        assert_eq!(format_decimals(2.3, 6), "2.3");
        assert_eq!(format_decimals(-0.0000001, 6), "0");
        assert_eq!(format_significant(3333.333333, 6), "3333.33");
        assert_eq!(format_significant(0.001, 6), "0.001");
        assert_eq!(format_significant(1234567.0, 6), "1234567");
        assert_eq!(format_fixed(3.5, 2), "3.50");
        assert_eq!(format_fixed(-0.001, 2), "0.00");
    }
}
