use rand::{distributions::Alphanumeric, thread_rng, Rng};

const CODE_LENGTH: usize = 12;

/// Human-presentable certificate code: "CERT-" plus a random alphanumeric
/// token. Uppercased for readability; the certificates table enforces
/// uniqueness.
pub fn generate_certificate_code() -> String {
    let token: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect();
    format!("CERT-{}", token.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_expected_shape() {
        let code = generate_certificate_code();
        assert!(code.starts_with("CERT-"));
        assert_eq!(code.len(), 5 + CODE_LENGTH);
        assert!(code[5..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn codes_do_not_repeat_casually() {
        let a = generate_certificate_code();
        let b = generate_certificate_code();
        assert_ne!(a, b);
    }
}
