//! # turbridge-cli — command wrapper around the cache proxy
//!
//! Library side of the `turbridge` binary: the [`supervisor`] wires the
//! remote cache client and the HTTP proxy together, runs the wrapped
//! build command, and reports its exit code and cache statistics.

pub mod supervisor;

pub(crate) mod retry;
