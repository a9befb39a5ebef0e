//! # Veneer Core
//!
//! Core types for the Veneer response normalization layer.
//!
//! - [`ApiFault`] - Faults raised by downstream handlers
//! - [`CallerIdentity`] - Identity read from the `UserId` header
//! - [`RequestId`] - UUID v7 request identifier
//! - [`ApiResponse`] - The uniform JSON envelope written to clients
//! - [`CapturedBody`] - A downstream body, classified at capture time

#![doc(html_root_url = "https://docs.rs/veneer-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod envelope;
mod error;
mod identity;
mod payload;

pub use context::RequestId;
pub use envelope::{ApiError, ApiResponse, Outcome, ValidationErrors};
pub use error::{ApiFault, ApplicationFault, EnvelopeError, HandlerResult, IdentityError};
pub use identity::{CallerIdentity, USER_ID_HEADER};
pub use payload::CapturedBody;
