//! Business-level authorization on raw tokens.
//!
//! These predicates run after the token validator has authenticated the
//! request. They decode claims without verifying the signature again and
//! collapse every failure into `false`.
//!
//! # Customer tokens
//!
//! A token carrying the user-journey scope was issued to a customer; its
//! subject must equal the customer id being acted on. Tokens WITHOUT that
//! scope (service tokens) are handled by a [`NonCustomerTokenPolicy`] chosen
//! by the caller:
//!
//! - [`Authorizer::is_authorized_user`] denies them
//! - [`Authorizer::validate_customer_token_with_id`] allows them

use crate::auth::claims::decode_claims;
use uuid::Uuid;

/// Default name of the scope that marks a customer token.
pub const DEFAULT_USER_JOURNEY_SCOPE: &str = "user_journey";

/// What to decide when a token lacks the user-journey scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonCustomerTokenPolicy {
    /// Not a customer token: not authorized.
    Deny,
    /// Not a customer token: no customer restriction applies.
    Allow,
}

/// How a token scope is matched against the accepted scopes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopeMatching {
    /// A token scope must equal one whitespace-separated accepted scope.
    #[default]
    Exact,
    /// A token scope must be a substring of the accepted-scope string.
    ///
    /// Lenient: scope `read` matches `"pre-read-only"`. Kept for issuers
    /// whose consumers relied on it.
    Substring,
}

/// Authorization predicates over raw tokens.
#[derive(Debug, Clone)]
pub struct Authorizer {
    user_journey_scope: String,
    scope_matching: ScopeMatching,
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new(DEFAULT_USER_JOURNEY_SCOPE, ScopeMatching::Exact)
    }
}

impl Authorizer {
    /// Create an authorizer.
    pub fn new(user_journey_scope: impl Into<String>, scope_matching: ScopeMatching) -> Self {
        Self {
            user_journey_scope: user_journey_scope.into(),
            scope_matching,
        }
    }

    /// Whether `token` is a customer token for `customer_id`.
    ///
    /// Tokens without the user-journey scope are denied.
    pub fn is_authorized_user(&self, token: &str, customer_id: &str) -> bool {
        self.authorize_customer(token, customer_id, NonCustomerTokenPolicy::Deny)
    }

    /// Whether `token` may act on `customer_id`.
    ///
    /// Tokens without the user-journey scope are allowed.
    pub fn validate_customer_token_with_id(&self, token: &str, customer_id: &str) -> bool {
        self.authorize_customer(token, customer_id, NonCustomerTokenPolicy::Allow)
    }

    /// Match the token subject against `customer_id` under `policy`.
    ///
    /// Returns `false` without decoding when either input is empty or the
    /// customer id is the nil UUID. Subject comparison ignores case.
    pub fn authorize_customer(
        &self,
        token: &str,
        customer_id: &str,
        policy: NonCustomerTokenPolicy,
    ) -> bool {
        if token.is_empty() || is_nil_customer_id(customer_id) {
            tracing::debug!(target: "keygate.auth.authorization", "Empty token or customer id");
            return false;
        }

        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(target: "keygate.auth.authorization", error = %e, "Claims decode failed");
                return false;
            }
        };

        if !claims.has_scope_ignore_case(&self.user_journey_scope) {
            tracing::debug!(
                target: "keygate.auth.authorization",
                policy = ?policy,
                "Token is not a customer token"
            );
            return policy == NonCustomerTokenPolicy::Allow;
        }

        if claims.sub.is_empty() {
            tracing::debug!(target: "keygate.auth.authorization", "Customer token has empty subject");
            return false;
        }

        let matches = claims.sub.to_lowercase() == customer_id.to_lowercase();
        if !matches {
            tracing::debug!(target: "keygate.auth.authorization", "Customer token subject mismatch");
        }
        matches
    }

    /// Whether the token carries `required` exactly, whatever the configured
    /// [`ScopeMatching`].
    ///
    /// Privileged endpoints gate on this, never on [`Self::validate_scope`].
    pub fn has_exact_scope(&self, token: &str, required: &str) -> bool {
        let required = required.trim();
        if token.is_empty() || required.is_empty() {
            return false;
        }

        match decode_claims(token) {
            Ok(claims) => claims.scopes().iter().any(|scope| scope == required),
            Err(e) => {
                tracing::debug!(target: "keygate.auth.authorization", error = %e, "Claims decode failed");
                false
            }
        }
    }

    /// Whether any token scope is accepted by `valid_scope`.
    ///
    /// `valid_scope` is a whitespace-separated list (e.g. `"read write"`).
    /// Empty token scopes never match.
    pub fn validate_scope(&self, token: &str, valid_scope: &str) -> bool {
        if token.is_empty() || valid_scope.trim().is_empty() {
            return false;
        }

        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(target: "keygate.auth.authorization", error = %e, "Claims decode failed");
                return false;
            }
        };

        claims
            .scopes()
            .iter()
            .filter(|scope| !scope.is_empty())
            .any(|scope| match self.scope_matching {
                ScopeMatching::Exact => valid_scope.split_whitespace().any(|v| v == scope.as_str()),
                ScopeMatching::Substring => valid_scope.contains(scope.as_str()),
            })
    }
}

/// Empty, blank, or the nil UUID in any accepted spelling.
fn is_nil_customer_id(customer_id: &str) -> bool {
    let trimmed = customer_id.trim();
    trimmed.is_empty() || Uuid::parse_str(trimmed).is_ok_and(|id| id.is_nil())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn token(payload: &str) -> String {
        format!(
            "{}.{}.c2ln",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"k1"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    const CUSTOMER: &str = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";

    fn customer_token() -> String {
        token(&format!(
            r#"{{"sub":"{}","scope":["read","USER_JOURNEY"]}}"#,
            CUSTOMER.to_uppercase()
        ))
    }

    fn service_token() -> String {
        token(r#"{"sub":"billing-service","scope":"read"}"#)
    }

    // -------------------------------------------------------------------------
    // is_authorized_user / validate_customer_token_with_id
    // -------------------------------------------------------------------------

    #[test]
    fn test_customer_token_matching_subject_ignores_case() {
        let authz = Authorizer::default();
        assert!(authz.is_authorized_user(&customer_token(), CUSTOMER));
        assert!(authz.validate_customer_token_with_id(&customer_token(), CUSTOMER));
    }

    #[test]
    fn test_customer_token_other_subject() {
        let authz = Authorizer::default();
        let other = "9b2c1f3e-0000-4000-8000-000000000001";
        assert!(!authz.is_authorized_user(&customer_token(), other));
        assert!(!authz.validate_customer_token_with_id(&customer_token(), other));
    }

    #[test]
    fn test_service_token_depends_on_policy() {
        let authz = Authorizer::default();
        assert!(!authz.is_authorized_user(&service_token(), CUSTOMER));
        assert!(authz.validate_customer_token_with_id(&service_token(), CUSTOMER));
        assert!(authz.authorize_customer(
            &service_token(),
            CUSTOMER,
            NonCustomerTokenPolicy::Allow
        ));
        assert!(!authz.authorize_customer(
            &service_token(),
            CUSTOMER,
            NonCustomerTokenPolicy::Deny
        ));
    }

    #[test]
    fn test_customer_token_empty_subject() {
        let authz = Authorizer::default();
        let t = token(r#"{"sub":"","scope":"user_journey"}"#);
        assert!(!authz.is_authorized_user(&t, CUSTOMER));
        assert!(!authz.validate_customer_token_with_id(&t, CUSTOMER));
    }

    #[test]
    fn test_empty_inputs_are_rejected_under_both_policies() {
        let authz = Authorizer::default();
        for policy in [NonCustomerTokenPolicy::Deny, NonCustomerTokenPolicy::Allow] {
            assert!(!authz.authorize_customer("", CUSTOMER, policy));
            assert!(!authz.authorize_customer(&service_token(), "", policy));
            assert!(!authz.authorize_customer(&service_token(), "   ", policy));
        }
    }

    #[test]
    fn test_nil_uuid_customer_is_rejected_under_both_policies() {
        let authz = Authorizer::default();
        for nil in [
            "00000000-0000-0000-0000-000000000000",
            "00000000000000000000000000000000",
        ] {
            assert!(!authz.is_authorized_user(&service_token(), nil));
            assert!(!authz.validate_customer_token_with_id(&service_token(), nil));
        }
    }

    #[test]
    fn test_decode_failure_is_false_under_both_policies() {
        let authz = Authorizer::default();
        let no_scope = token(r#"{"sub":"x"}"#);
        for t in ["a.b", "a.b.c.d", no_scope.as_str()] {
            assert!(!authz.is_authorized_user(t, CUSTOMER));
            assert!(!authz.validate_customer_token_with_id(t, CUSTOMER));
        }
    }

    #[test]
    fn test_non_uuid_customer_id_is_compared() {
        let authz = Authorizer::default();
        let t = token(r#"{"sub":"Alice","scope":"user_journey"}"#);
        assert!(authz.is_authorized_user(&t, "alice"));
    }

    #[test]
    fn test_custom_user_journey_scope() {
        let authz = Authorizer::new("customer", ScopeMatching::Exact);
        let t = token(r#"{"sub":"alice","scope":"customer"}"#);
        assert!(authz.is_authorized_user(&t, "alice"));
        assert!(!Authorizer::default().is_authorized_user(&t, "alice"));
    }

    // -------------------------------------------------------------------------
    // validate_scope
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_scope_exact() {
        let authz = Authorizer::default();
        assert!(authz.validate_scope(&token(r#"{"scope":"read"}"#), "read write"));
        assert!(authz.validate_scope(&token(r#"{"scope":["admin","write"]}"#), "read write"));
        assert!(!authz.validate_scope(&token(r#"{"scope":["admin"]}"#), "read write"));
        assert!(!authz.validate_scope(&token(r#"{"scope":"read"}"#), "pre-read-only"));
    }

    #[test]
    fn test_validate_scope_substring() {
        let authz = Authorizer::new(DEFAULT_USER_JOURNEY_SCOPE, ScopeMatching::Substring);
        assert!(authz.validate_scope(&token(r#"{"scope":"read"}"#), "read write"));
        assert!(!authz.validate_scope(&token(r#"{"scope":["admin"]}"#), "read write"));
        assert!(authz.validate_scope(&token(r#"{"scope":"read"}"#), "pre-read-only"));
    }

    #[test]
    fn test_validate_scope_failures_are_false() {
        let authz = Authorizer::default();
        assert!(!authz.validate_scope("", "read"));
        assert!(!authz.validate_scope(&token(r#"{"scope":"read"}"#), ""));
        assert!(!authz.validate_scope("a.b", "read"));
        assert!(!authz.validate_scope(&token(r#"{"sub":"x"}"#), "read"));
        assert!(!authz.validate_scope(&token(r#"{"scope":[]}"#), "read"));
    }

    #[test]
    fn test_validate_scope_ignores_empty_array_entries() {
        let authz = Authorizer::new(DEFAULT_USER_JOURNEY_SCOPE, ScopeMatching::Substring);
        assert!(!authz.validate_scope(&token(r#"{"scope":[""]}"#), "read"));
    }

    #[test]
    fn test_has_exact_scope_ignores_substring_mode() {
        let authz = Authorizer::new(DEFAULT_USER_JOURNEY_SCOPE, ScopeMatching::Substring);
        for partial in ["a", "admin", "keygate", ":"] {
            let t = token(&format!(r#"{{"scope":"{partial}"}}"#));
            assert!(authz.validate_scope(&t, "keygate:admin"));
            assert!(!authz.has_exact_scope(&t, "keygate:admin"), "{partial}");
        }
        let admin = token(r#"{"scope":["read","keygate:admin"]}"#);
        assert!(authz.has_exact_scope(&admin, "keygate:admin"));
    }

    #[test]
    fn test_has_exact_scope_failures_are_false() {
        let authz = Authorizer::default();
        assert!(!authz.has_exact_scope("", "keygate:admin"));
        assert!(!authz.has_exact_scope(&token(r#"{"scope":"keygate:admin"}"#), " "));
        assert!(!authz.has_exact_scope(&token(r#"{"sub":"x"}"#), "keygate:admin"));
        assert!(!authz.has_exact_scope(&token(r#"{"scope":"KEYGATE:ADMIN"}"#), "keygate:admin"));
    }

    #[test]
    fn test_is_nil_customer_id() {
        assert!(is_nil_customer_id(""));
        assert!(is_nil_customer_id("00000000-0000-0000-0000-000000000000"));
        assert!(!is_nil_customer_id(CUSTOMER));
        assert!(!is_nil_customer_id("alice"));
    }
}
