use sha2::{Digest, Sha256};

/// Log-safe renderings of Social Security Numbers.
///
/// Raw SSNs never reach the log output. Two forms are available:
///
/// - `mask_ssn`: keeps the last four digits (`***-**-6789`), for humans
/// - `ssn_fingerprint`: short SHA-256 prefix, for correlating log lines
///   about the same applicant without storing the number

/// Number of hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 12;

/// Masks all but the last four digits.
pub fn mask_ssn(ssn: &str) -> String {
    let digits: Vec<char> = ssn.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return "***".to_string();
    }
    let last4: String = digits[digits.len() - 4..].iter().collect();
    format!("***-**-{}", last4)
}

/// Stable short hash of the SSN digits; formatting characters are ignored.
pub fn ssn_fingerprint(ssn: &str) -> String {
    let digits: String = ssn.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut hasher = Sha256::new();
    hasher.update(digits.as_bytes());
    let mut encoded = hex::encode(hasher.finalize());
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_last_four() {
        assert_eq!(mask_ssn("123-45-6789"), "***-**-6789");
        assert_eq!(mask_ssn("123456789"), "***-**-6789");
    }

    #[test]
    fn test_mask_short_input() {
        assert_eq!(mask_ssn("12"), "***");
        assert_eq!(mask_ssn(""), "***");
    }

    #[test]
    fn test_fingerprint_ignores_formatting() {
        assert_eq!(ssn_fingerprint("123-45-6789"), ssn_fingerprint("123456789"));
        assert_eq!(ssn_fingerprint("123-45-6789").len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_differs_per_ssn() {
        assert_ne!(ssn_fingerprint("123-45-6789"), ssn_fingerprint("123-45-6780"));
    }
}
