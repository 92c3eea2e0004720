//! An intercepting TCP proxy that routes traffic between two real sockets
//! through a simulated, adverse transport.
//!
//! The interesting machinery lives in `evilproxy_core`; this crate supplies
//! the process around it: command line parsing, logging, the accept loop,
//! and the per-session byte pumps.

pub mod cli;
pub mod proxy;
