use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 over the delivery body, sent in the X-Signature
/// header so receivers can authenticate webhook payloads.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_per_secret() {
        let body = br#"{"event":"assessment_completed"}"#;
        assert_eq!(sign_payload("s1", body), sign_payload("s1", body));
        assert_ne!(sign_payload("s1", body), sign_payload("s2", body));
    }
}
