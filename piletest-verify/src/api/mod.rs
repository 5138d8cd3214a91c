//! HTTP API handlers for piletest-verify
//!
//! REST endpoints for the verification workflow plus an SSE stream of
//! report events.

pub mod health;
pub mod report;
pub mod sse;

pub use health::health_routes;
pub use report::report_routes;
pub use sse::event_stream;
