/// Canonical form used as the employee lookup key: `+` and digits only.
///
/// `whatsapp:+33 6 12-34.56.78` and `0033612345678` both become `+33612345678`.
pub fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix("whatsapp:")
        .or_else(|| raw.strip_prefix("WHATSAPP:"))
        .unwrap_or(raw);

    let mut digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if let Some(rest) = digits.strip_prefix("00") {
        digits = format!("+{rest}");
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_separators() {
        assert_eq!(normalize("whatsapp:+33 6 12-34.56.78"), "+33612345678");
        assert_eq!(normalize(" (221) 77 000 00 01 "), "221770000001");
    }

    #[test]
    fn international_prefix_becomes_plus() {
        assert_eq!(normalize("0033612345678"), "+33612345678");
    }
}
