//! `bazaar-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it issues and
//! verifies bearer tokens, hashes passwords and answers capability questions
//! about an already-resolved actor.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod roles;
pub mod token;

pub use authorize::{Actor, AuthzError, Capability, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use password::{PasswordError, hash_password, verify_password};
pub use roles::Role;
pub use token::{AuthError, Hs256TokenService, JwtValidator};
