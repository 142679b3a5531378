//! `shopdesk-auth`: authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: the API layer hands in a bearer token and
//! gets back validated claims, then asks `authorize` about permissions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, DenialKind, RbacRegistry, authorize, explain_authorization,
};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::{Principal, TenantMembership};
pub use roles::{Role, role_permissions};
