//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, 429 when empty)
//!     → authentication.rs (Authorization header → Principal in extensions)
//!     → [route matched]
//!     → authorization.rs (route requirement: authenticated/activated/permission)
//!     → Business handler
//! ```
//!
//! # Design Decisions
//! - Rejections are ordinary responses, never faults
//! - Exactly one Principal per request, anonymous when no credential is sent
//! - Invalid, malformed and unknown credentials are indistinguishable to the client

pub mod authentication;
pub mod authorization;
pub mod principal;
pub mod rate_limit;

pub use authentication::{Authenticator, Credential};
pub use authorization::{Gate, Requirement};
pub use principal::{Permissions, Principal, User};
pub use rate_limit::ClientRegistry;
