//! HTTP glue shared by module routers and the API binary.

pub mod errors;

pub use errors::{ApiError, domain_error_response, json_error};

/// Routing handle every module hands to the registry.
pub type ModuleRouter = axum::Router;
