//! Simulated packet transport for exercising client/server pairs under
//! adverse network conditions.
//!
//! Evilproxy sits between two real TCP endpoints and routes their bytes
//! through a simulated transport instead of copying them directly. The
//! simulation is packet-oriented: bytes read from a socket are packaged into
//! [`Packet`]s, travel through a [`Pipe`] that may treat them unkindly, and
//! are unpacked back into bytes on the far side. Neither endpoint needs to be
//! modified to take part.
//!
//! # Organization
//!
//! - [`Packet`] is the atomic unit of simulated transport
//! - [`Pipe`] is a thread-safe, unidirectional packet queue with explicit
//!   close/drain semantics; [`BasicPipe`] delivers faithfully while
//!   [`LatentPipe`] delays every packet by a fixed latency
//! - [`Connection`] composes two pipes into a bidirectional channel built in
//!   peer pairs
//! - [`ConnectionReader`] and [`ConnectionWriter`] adapt a connection's
//!   packet traffic to a conventional byte-stream contract for interop with
//!   real sockets
//! - [`construct_connections`] builds the connection pair a proxied session
//!   communicates through, as described by a rule string

pub mod packet;
pub use packet::{Flags, Packet};

pub mod pipe;
pub use pipe::{BasicPipe, LatentPipe, Pipe, PipeError};

pub mod connection;
pub use connection::Connection;

pub mod adaptor;
pub use adaptor::{ConnectionReader, ConnectionWriter};

pub mod parser;
pub use parser::{construct_connections, ParseError};
