//! Token authentication and authorization.
//!
//! # Components
//!
//! - `claims` - Unverified claims decoding with string-or-array scopes
//! - `jwks` - JSON Web Key Set wire types
//! - `resolver` - `kid` to PEM resolution through the key cache
//! - `validator` - RS256 token validation
//! - `authorization` - Customer and scope predicates on raw tokens

pub mod authorization;
pub mod claims;
pub mod error;
pub mod jwks;
pub mod resolver;
pub mod validator;

pub use authorization::{Authorizer, NonCustomerTokenPolicy, ScopeMatching};
pub use claims::{decode_claims, Claims};
pub use error::AuthError;
pub use jwks::{Jwk, JwkSet};
pub use resolver::{CacheKeyScheme, KeyResolver, ResolverConfig};
pub use validator::{TokenValidator, ValidatorConfig, VerifiedToken};
