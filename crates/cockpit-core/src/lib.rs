//! Core types for the cockpit gateway.
//!
//! This crate provides the small set of types shared by every other crate:
//!
//! - **Identifiers**: correlation ids for requests and ids for live
//!   streaming connections
//! - **`IdError`**: why a supplied identifier was refused
//!
//! # Example
//!
//! ```
//! use cockpit_core::{ConnectionId, RequestId};
//!
//! // Echo a caller-supplied correlation id
//! let echoed = RequestId::parse("trace-42").unwrap();
//! assert_eq!(echoed.as_str(), "trace-42");
//!
//! // Or mint a fresh one
//! let fresh = RequestId::generate();
//! assert!(fresh.as_str().starts_with("req_"));
//!
//! let conn = ConnectionId::generate();
//! assert_ne!(conn, ConnectionId::generate());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{ConnectionId, IdError, RequestId};
