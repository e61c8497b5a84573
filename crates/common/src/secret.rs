//! Secret types for values that must never reach a log line.
//!
//! Keygate holds two kinds of secret material: Redis ACL passwords loaded at
//! startup, and raw bearer tokens carried through a request. Both are wrapped
//! in [`SecretString`], whose `Debug` output is redacted, so a struct that
//! derives `Debug` over them stays safe to trace.
//!
//! Reading the value requires an explicit [`ExposeSecret::expose_secret`]
//! call, which keeps every use site greppable.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let password = SecretString::from("hunter2");
//! assert!(!format!("{password:?}").contains("hunter2"));
//! assert_eq!(password.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
