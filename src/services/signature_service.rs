use sha1::{Digest, Sha1};

/// Verifies the platform's webhook handshake signature.
///
/// The platform signs every webhook call by lexicographically sorting the
/// shared token, the request timestamp, and a nonce, concatenating the
/// three, and hex-encoding the SHA-1 digest. The ordering is part of the
/// interoperability contract and must not change.
#[derive(Clone, Debug)]
pub struct SignatureService {
    token: String,
}

impl SignatureService {
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self { token }
    }

    /// Returns true iff `signature` matches the digest computed from the
    /// shared token and the request-supplied `timestamp` and `nonce`.
    /// Deterministic and stateless; a failed verification is an ordinary
    /// `false`, never an error.
    #[must_use]
    pub fn verify(&self, signature: &str, timestamp: &str, nonce: &str) -> bool {
        let mut params = [self.token.as_str(), timestamp, nonce];
        params.sort_unstable();

        let mut hasher = Sha1::new();
        for param in params {
            hasher.update(param.as_bytes());
        }
        let digest = hex::encode(hasher.finalize());

        digest == signature
    }
}
