//! Middleware stages.
//!
//! - [`response_envelope`] - Normalizes every response into the envelope

pub mod response_envelope;

pub use response_envelope::{EnvelopeRecord, ResponseEnvelopeMiddleware};
