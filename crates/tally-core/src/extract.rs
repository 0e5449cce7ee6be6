//! Numeric answer extraction

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d+\.?\d*").expect("number pattern is valid")
});

/// Extract the single numeric value from a response.
///
/// Returns `None` when the text contains no number or more than one: a
/// response that needs disambiguation is not a parseable answer.
pub fn extract_numeric(text: &str) -> Option<f64> {
    let mut numbers = NUMBER_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok());

    match (numbers.next(), numbers.next()) {
        (Some(value), None) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_integer() {
        assert_eq!(extract_numeric("4"), Some(4.0));
        assert_eq!(extract_numeric("The answer is 17."), Some(17.0));
    }

    #[test]
    fn test_negative_and_decimal() {
        assert_eq!(extract_numeric("roughly -3.5 degrees"), Some(-3.5));
    }

    #[test]
    fn test_no_number() {
        assert_eq!(extract_numeric("I am not sure."), None);
        assert_eq!(extract_numeric(""), None);
    }

    #[test]
    fn test_multiple_numbers_are_ambiguous() {
        assert_eq!(extract_numeric("either 4 or 5"), None);
    }
}
