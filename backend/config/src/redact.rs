//! Masking of credential values for logs and diagnostics.

/// Mask a secret, keeping the first four characters as a hint.
pub fn redact_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() > 4 {
        format!("{visible}***")
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_a_short_hint() {
        assert_eq!(redact_secret("sk-abcdef123456"), "sk-a***");
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        assert_eq!(redact_secret("abcd"), "***");
        assert_eq!(redact_secret(""), "***");
    }

    #[test]
    fn multibyte_input_does_not_split_chars() {
        assert_eq!(redact_secret("ééééé"), "éééé***");
    }
}
