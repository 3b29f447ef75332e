//! Pipeline stages that are not security decisions.

pub mod cors;
pub mod recover;

pub use cors::{enable_cors, CorsPolicy};
pub use recover::recover_panic;
