//! This is a workload generator library which synthesizes realistic client
//! load against an HTTP server.
//!
//! A run opens many short-lived [`Session`]s, each fetching one resource
//! chosen from a *Zipf-like* popularity distribution, so that a small number
//! of resources receive most of the requests. Session starts are paced by a
//! randomized inter-arrival process, modeling bursty human-driven traffic.
//!
//! Every fetch validates that the response is well-formed and complete: the
//! body is read byte-accurately against the advertised `Content-Length`, and
//! under-length, over-length and malformed responses are classified rather
//! than dropped. One outcome record per session is emitted to the record
//! sink, so failure rates stay observable in aggregate.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod fetch;
pub mod generator;
pub mod pacing;
pub mod popularity;
pub mod session;
pub mod sink;

pub use crate::config::Config;
pub use crate::generator::WorkloadGenerator;
pub use crate::session::Session;
