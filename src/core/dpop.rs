//! DPoP Proofs
//!
//! RFC 9449 proof-of-possession headers for token endpoint requests.

use std::sync::Mutex;

use crate::error::DpopError;

/// Header carrying the proof.
pub const DPOP_HEADER: &str = "DPoP";

/// Builds a signed DPoP proof for one outgoing request.
pub trait DpopProver: Send + Sync {
    /// Proof bound to `method` and `url`.
    fn proof(&self, method: &str, url: &str) -> Result<String, DpopError>;
}

#[cfg(feature = "jwt")]
pub use jwt::{JwtDpopProver, KeyMaterialReader};

#[cfg(feature = "jwt")]
mod jwt {
    use base64::Engine;
    use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde::Serialize;
    use std::path::Path;

    use super::DpopProver;
    use crate::error::{ConfigurationError, DpopError};

    /// DER prefix of a P-256 SubjectPublicKeyInfo, up to the uncompressed point.
    const P256_SPKI_PREFIX: [u8; 26] = [
        0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
        0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
    ];

    #[derive(Serialize)]
    struct DpopClaims<'a> {
        jti: String,
        htm: &'a str,
        htu: String,
        iat: i64,
    }

    /// DPoP prover signing with a local key pair.
    pub struct JwtDpopProver {
        key: EncodingKey,
        algorithm: Algorithm,
        jwk: Jwk,
    }

    impl JwtDpopProver {
        /// Create a prover from a private signing key and its public JWK.
        /// The algorithm follows the key type.
        pub fn new(key_pem: &[u8], jwk: Jwk) -> Result<Self, DpopError> {
            let algorithm = algorithm_for(&jwk)?;
            let key = match algorithm {
                Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(key_pem),
                Algorithm::EdDSA => EncodingKey::from_ed_pem(key_pem),
                _ => EncodingKey::from_rsa_pem(key_pem),
            }
            .map_err(|e| DpopError::InvalidKey {
                message: e.to_string(),
            })?;

            Ok(Self {
                key,
                algorithm,
                jwk,
            })
        }

        pub fn algorithm(&self) -> Algorithm {
            self.algorithm
        }
    }

    impl DpopProver for JwtDpopProver {
        fn proof(&self, method: &str, url: &str) -> Result<String, DpopError> {
            let mut header = Header::new(self.algorithm);
            header.typ = Some("dpop+jwt".to_string());
            header.jwk = Some(self.jwk.clone());

            let claims = DpopClaims {
                jti: uuid::Uuid::new_v4().to_string(),
                htm: method,
                htu: target_uri(url),
                iat: chrono::Utc::now().timestamp(),
            };

            encode(&header, &claims, &self.key).map_err(|e| DpopError::Signing {
                message: e.to_string(),
            })
        }
    }

    /// `htu` excludes query and fragment (RFC 9449 section 4.2).
    fn target_uri(url: &str) -> String {
        match url::Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_query(None);
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => url.to_string(),
        }
    }

    fn algorithm_for(jwk: &Jwk) -> Result<Algorithm, DpopError> {
        match &jwk.algorithm {
            AlgorithmParameters::EllipticCurve(ec) => match ec.curve {
                EllipticCurve::P256 => Ok(Algorithm::ES256),
                EllipticCurve::P384 => Ok(Algorithm::ES384),
                ref other => Err(DpopError::InvalidKey {
                    message: format!("unsupported curve {:?}", other),
                }),
            },
            AlgorithmParameters::RSA(_) => Ok(Algorithm::RS256),
            AlgorithmParameters::OctetKeyPair(_) => Ok(Algorithm::EdDSA),
            _ => Err(DpopError::InvalidKey {
                message: "symmetric keys cannot be used for DPoP".to_string(),
            }),
        }
    }

    /// Reads DPoP key material from files.
    ///
    /// The private key is a PKCS#8 PEM. The public key is either a JWK JSON
    /// document or a PEM-encoded P-256 SubjectPublicKeyInfo. Only the first
    /// PEM block is read. For any other curve or key type, use a JWK.
    pub struct KeyMaterialReader;

    impl KeyMaterialReader {
        /// Read both files and build a prover.
        pub fn load(
            private_key_path: &Path,
            public_key_path: &Path,
        ) -> Result<JwtDpopProver, ConfigurationError> {
            let private_pem = read(private_key_path)?;
            let public_raw = read(public_key_path)?;
            let jwk = Self::parse_public_key(&public_raw).map_err(|message| {
                ConfigurationError::KeyMaterial {
                    path: public_key_path.display().to_string(),
                    message,
                }
            })?;

            JwtDpopProver::new(&private_pem, jwk).map_err(|e| ConfigurationError::KeyMaterial {
                path: private_key_path.display().to_string(),
                message: e.to_string(),
            })
        }

        /// Parse a public key given as JWK JSON or P-256 SPKI PEM.
        pub fn parse_public_key(raw: &[u8]) -> Result<Jwk, String> {
            let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?.trim();
            if text.starts_with('{') {
                return serde_json::from_str(text).map_err(|e| format!("invalid JWK: {}", e));
            }
            Self::jwk_from_spki_pem(text)
        }

        fn jwk_from_spki_pem(pem: &str) -> Result<Jwk, String> {
            if !pem.starts_with("-----BEGIN PUBLIC KEY-----") {
                return Err("expected a JWK or a PEM public key".to_string());
            }
            let body: String = pem
                .lines()
                .skip(1)
                .take_while(|line| !line.starts_with("-----END"))
                .map(str::trim)
                .collect();
            let der = base64::engine::general_purpose::STANDARD
                .decode(body)
                .map_err(|e| format!("invalid PEM body: {}", e))?;

            if der.len() != P256_SPKI_PREFIX.len() + 65
                || der[..P256_SPKI_PREFIX.len()] != P256_SPKI_PREFIX
                || der[P256_SPKI_PREFIX.len()] != 0x04
            {
                return Err(
                    "only P-256 PEM public keys are supported, use a JWK for other key types"
                        .to_string(),
                );
            }

            let point = &der[P256_SPKI_PREFIX.len() + 1..];
            let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD;
            let jwk = serde_json::json!({
                "kty": "EC",
                "crv": "P-256",
                "x": b64.encode(&point[..32]),
                "y": b64.encode(&point[32..]),
            });
            serde_json::from_value(jwk).map_err(|e| e.to_string())
        }
    }

    fn read(path: &Path) -> Result<Vec<u8>, ConfigurationError> {
        std::fs::read(path).map_err(|e| ConfigurationError::KeyMaterial {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Mock DPoP prover for testing.
#[derive(Default)]
pub struct MockDpopProver {
    history: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl MockDpopProver {
    /// Create new mock prover.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent proofs fail.
    pub fn set_failing(&self, fail: bool) -> &Self {
        *self.fail.lock().unwrap() = fail;
        self
    }

    /// Get (method, url) pairs proofs were requested for.
    pub fn get_history(&self) -> Vec<(String, String)> {
        self.history.lock().unwrap().clone()
    }
}

impl DpopProver for MockDpopProver {
    fn proof(&self, method: &str, url: &str) -> Result<String, DpopError> {
        if *self.fail.lock().unwrap() {
            return Err(DpopError::Signing {
                message: "mock failure".to_string(),
            });
        }
        let mut history = self.history.lock().unwrap();
        history.push((method.to_string(), url.to_string()));
        Ok(format!("mock-proof-{}", history.len()))
    }
}
