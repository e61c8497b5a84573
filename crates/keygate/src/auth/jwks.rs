//! JSON Web Key Set wire types.
//!
//! The publication endpoint returns
//! `{"keys":[{"kid","kty","use","n","e","x5c":[...]}]}`. Keys are matched by
//! `kid`, and the first `x5c` entry (a base64 DER certificate) is wrapped
//! into a PEM certificate for signature verification.

use crate::auth::error::AuthError;
use serde::{Deserialize, Serialize};

const PEM_CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_CERTIFICATE_FOOTER: &str = "-----END CERTIFICATE-----";

/// JSON Web Key from the publication endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Key type ("RSA").
    #[serde(default)]
    pub kty: String,

    /// Key use ("sig").
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// X.509 certificate chain, leaf first (base64 DER).
    #[serde(default)]
    pub x5c: Vec<String>,
}

impl Jwk {
    /// PEM-wrap the first certificate in the chain.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCertificate` if `x5c` is empty.
    pub fn certificate_pem(&self) -> Result<String, AuthError> {
        let cert = self.x5c.first().ok_or_else(|| {
            tracing::warn!(target: "keygate.auth.jwks", kid = %self.kid, "JWK has no x5c certificate");
            AuthError::MissingCertificate
        })?;
        Ok(format!(
            "{PEM_CERTIFICATE_HEADER}\n{cert}\n{PEM_CERTIFICATE_FOOTER}"
        ))
    }
}

/// A published key set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find the key whose `kid` equals `kid`.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SET_JSON: &str = r#"{
        "keys": [
            {"kid": "k1", "kty": "RSA", "use": "sig", "n": "p7EO", "e": "AQAB", "x5c": ["MIIC1", "MIIC2"]},
            {"kid": "k2", "kty": "RSA", "use": "sig", "n": "tEtJ", "e": "AQAB", "x5c": []}
        ]
    }"#;

    #[test]
    fn test_jwk_set_deserialization() {
        let set: JwkSet = serde_json::from_str(SET_JSON).unwrap();
        assert_eq!(set.keys.len(), 2);

        let k1 = set.find("k1").unwrap();
        assert_eq!(k1.kty, "RSA");
        assert_eq!(k1.key_use.as_deref(), Some("sig"));
        assert_eq!(k1.n.as_deref(), Some("p7EO"));
        assert_eq!(k1.e.as_deref(), Some("AQAB"));
        assert_eq!(k1.x5c, ["MIIC1", "MIIC2"]);
    }

    #[test]
    fn test_find_unknown_kid() {
        let set: JwkSet = serde_json::from_str(SET_JSON).unwrap();
        assert!(set.find("k3").is_none());
        assert!(set.find("").is_none());
    }

    #[test]
    fn test_certificate_pem_uses_first_chain_entry() {
        let set: JwkSet = serde_json::from_str(SET_JSON).unwrap();
        let pem = set.find("k1").unwrap().certificate_pem().unwrap();
        assert_eq!(
            pem,
            "-----BEGIN CERTIFICATE-----\nMIIC1\n-----END CERTIFICATE-----"
        );
    }

    #[test]
    fn test_certificate_pem_empty_chain() {
        let set: JwkSet = serde_json::from_str(SET_JSON).unwrap();
        assert_eq!(
            set.find("k2").unwrap().certificate_pem(),
            Err(AuthError::MissingCertificate)
        );
    }

    #[test]
    fn test_minimal_key_deserializes() {
        let set: JwkSet = serde_json::from_str(r#"{"keys":[{"kid":"only"}]}"#).unwrap();
        let key = set.find("only").unwrap();
        assert!(key.x5c.is_empty());
        assert!(key.key_use.is_none());
    }

    #[test]
    fn test_missing_keys_field_is_error() {
        assert!(serde_json::from_str::<JwkSet>(r#"{"items":[]}"#).is_err());
    }

    #[test]
    fn test_serialization_round_trip_preserves_use_field_name() {
        let set: JwkSet = serde_json::from_str(SET_JSON).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains(r#""use":"sig""#));
        let back: JwkSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
