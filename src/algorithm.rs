use std::fmt::{self, Debug};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// A keyed signature algorithm used to produce the `Authorization` header.
///
/// The platform only defines `hmac-sha256`, but signers are held behind this
/// trait so that a verifier can be handed any algorithm with the same shape.
pub trait HttpSignature: Debug + Send + Sync + 'static {
    /// Returns the base64 encoded signature of the provided bytes.
    fn http_sign(&self, bytes_to_sign: &[u8]) -> String;
    /// Returns true if the signature is valid for the provided content. The
    /// comparison is performed in constant time.
    fn http_verify(&self, bytes_to_verify: &[u8], signature: &str) -> bool {
        let expected_signature = self.http_sign(bytes_to_verify);
        expected_signature
            .as_bytes()
            .ct_eq(signature.as_bytes())
            .into()
    }
}

/// A digest algorithm used to condense a request body into the canonical
/// body line.
pub trait HttpDigest: Debug + Send + Sync + 'static {
    /// Returns the base64 encoded digest of the provided bytes.
    fn http_digest(&self, bytes_to_digest: &[u8]) -> String;
}

/// HMAC-SHA256 keyed with the access secret.
#[derive(Clone)]
pub struct HmacSha256(Hmac<Sha256>);

impl HmacSha256 {
    /// Creates a signer from a key of any length.
    pub fn new(key: &[u8]) -> Self {
        Self(Hmac::new_from_slice(key).expect("HMAC can take key of any size"))
    }
}

// The key must never end up in logs.
impl Debug for HmacSha256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("HmacSha256")
    }
}

impl HttpSignature for HmacSha256 {
    fn http_sign(&self, bytes_to_sign: &[u8]) -> String {
        let mut mac = self.0.clone();
        mac.update(bytes_to_sign);
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

/// SHA-256, base64 encoded.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sha256Digest;

impl HttpDigest for Sha256Digest {
    fn http_digest(&self, bytes_to_digest: &[u8]) -> String {
        STANDARD.encode(Sha256::digest(bytes_to_digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_digest_of_empty_body() {
        assert_eq!(
            Sha256Digest.http_digest(b""),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn hmac_verifies_own_signature() {
        let alg = HmacSha256::new(b"secret");
        let signature = alg.http_sign(b"content");

        assert!(alg.http_verify(b"content", &signature));
        assert!(!alg.http_verify(b"content!", &signature));
        assert!(!HmacSha256::new(b"other").http_verify(b"content", &signature));
    }

    #[test]
    fn debug_hides_key() {
        assert_eq!(format!("{:?}", HmacSha256::new(b"secret")), "HmacSha256");
    }
}
