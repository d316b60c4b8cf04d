//! concept-adapters: the two non-in-process `Transport` implementations
//! — an HTTP client/server pair built on `reqwest`/`axum`, matching the
//! wire format `concept_domain::ActionRecord` already serializes to.

pub mod client;
pub mod server;

pub use client::HttpTransport;
pub use server::ConceptServer;
