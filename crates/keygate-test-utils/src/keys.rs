//! Signing keypairs and their published JWK form.

use crate::fixtures::{
    PRIMARY_CERT_DER_B64, PRIMARY_EXPONENT_B64URL, PRIMARY_MODULUS_B64URL,
    PRIMARY_PRIVATE_KEY_PEM, ROTATED_CERT_DER_B64, ROTATED_EXPONENT_B64URL,
    ROTATED_MODULUS_B64URL, ROTATED_PRIVATE_KEY_PEM,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

/// `kid` of [`TestKeypair::primary`].
pub const PRIMARY_KID: &str = "keygate-test-primary";

/// `kid` of [`TestKeypair::rotated`].
pub const ROTATED_KID: &str = "keygate-test-rotated";

/// A fixed RSA signing key with its certificate.
///
/// # Example
/// ```rust,ignore
/// let key = TestKeypair::primary();
/// let token = key.sign(&TestTokenBuilder::new().with_scope("read").build());
/// let jwks = jwks_json(&[&key]);
/// ```
#[derive(Debug, Clone)]
pub struct TestKeypair {
    kid: String,
    private_key_pem: &'static str,
    cert_der_b64: &'static str,
    modulus: &'static str,
    exponent: &'static str,
}

impl TestKeypair {
    /// The key a freshly deployed issuer signs with.
    pub fn primary() -> Self {
        Self {
            kid: PRIMARY_KID.to_string(),
            private_key_pem: PRIMARY_PRIVATE_KEY_PEM,
            cert_der_b64: PRIMARY_CERT_DER_B64,
            modulus: PRIMARY_MODULUS_B64URL,
            exponent: PRIMARY_EXPONENT_B64URL,
        }
    }

    /// The key the issuer rotates to.
    pub fn rotated() -> Self {
        Self {
            kid: ROTATED_KID.to_string(),
            private_key_pem: ROTATED_PRIVATE_KEY_PEM,
            cert_der_b64: ROTATED_CERT_DER_B64,
            modulus: ROTATED_MODULUS_B64URL,
            exponent: ROTATED_EXPONENT_B64URL,
        }
    }

    /// Same key material published under another `kid`.
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = kid.to_string();
        self
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Base64 DER certificate (the `x5c[0]` value).
    pub fn cert_der_b64(&self) -> &'static str {
        self.cert_der_b64
    }

    /// The PEM a resolver is expected to produce for this key.
    pub fn expected_certificate_pem(&self) -> String {
        format!(
            "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----",
            self.cert_der_b64
        )
    }

    /// The key as published in a key set.
    pub fn jwk(&self) -> Value {
        json!({
            "kid": self.kid,
            "kty": "RSA",
            "use": "sig",
            "n": self.modulus,
            "e": self.exponent,
            "x5c": [self.cert_der_b64],
        })
    }

    /// The key as published with an empty certificate chain.
    pub fn jwk_without_certificate(&self) -> Value {
        json!({
            "kid": self.kid,
            "kty": "RSA",
            "use": "sig",
            "n": self.modulus,
            "e": self.exponent,
            "x5c": [],
        })
    }

    /// Sign `claims` as an RS256 token carrying this key's `kid`.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        self.sign_with_header(&header, claims)
    }

    /// Sign `claims` under an arbitrary RS256-family header.
    pub fn sign_with_header(&self, header: &Header, claims: &Value) -> String {
        let key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .expect("fixture private key must parse");
        encode(header, claims, &key).expect("signing with fixture key must succeed")
    }
}

/// A `{"keys":[...]}` document publishing `keys`.
pub fn jwks_json(keys: &[&TestKeypair]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}
