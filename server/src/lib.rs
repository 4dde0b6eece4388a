//! HTTP front end for the csvmark job pipeline.
//!
//! `POST /api/upload` stores a CSV and starts a background job,
//! `GET /api/download/{id}` serves the processed result once the job is done.

pub mod error;
pub mod router;
pub mod routes;
pub mod state;

pub use router::build_router;
pub use state::AppState;
