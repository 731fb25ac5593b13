//! HTTP surface for the assistant.
//!
//! `api_router()` returns a composable `Router` with all routes under
//! `/api/`; `server::serve` binds it and runs until Ctrl-C.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use types::ApiContext;
