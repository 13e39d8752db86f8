//! HTTP server exposing the in-memory store
//!
//! `ServerBuilder` assembles the router: a root `/health` probe, the API under
//! `/api`, request tracing and optional CORS.

pub mod builder;
pub mod extract;
pub mod handlers;
pub mod router;

pub use builder::ServerBuilder;
pub use router::AppState;
