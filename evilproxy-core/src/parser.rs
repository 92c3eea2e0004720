//! Builds connection pairs from rule strings.
//!
//! The rule language is deliberately tiny. It will grow alongside the pipe
//! variants; for now it covers faithful delivery and uniform latency.

use crate::{BasicPipe, Connection, LatentPipe, Pipe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error as ThisError;

/// An error produced for rules the parser does not recognize.
#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("Unable to parse rule {0:?}")]
    UnrecognizedRule(String),
    #[error("The latency in rule {0:?} is not a number of milliseconds")]
    InvalidLatency(String),
}

/// Builds the pair of peer connections a proxied session communicates
/// through, as described by `rule`.
///
/// The empty rule yields a pair backed by plain FIFO pipes. The rule
/// `latency:<millis>` yields a pair that delays every packet by the given
/// number of milliseconds in each direction. Anything else fails.
pub fn construct_connections(rule: &str) -> Result<(Connection, Connection), ParseError> {
    if rule.is_empty() {
        return Ok(Connection::pair(
            Arc::new(BasicPipe::new()),
            Arc::new(BasicPipe::new()),
        ));
    }

    if let Some(millis) = rule.strip_prefix("latency:") {
        let millis: u64 = millis
            .parse()
            .map_err(|_| ParseError::InvalidLatency(rule.to_string()))?;
        let latency = Duration::from_millis(millis);
        return Ok(Connection::pair(latent(latency), latent(latency)));
    }

    Err(ParseError::UnrecognizedRule(rule.to_string()))
}

fn latent(latency: Duration) -> Arc<dyn Pipe> {
    Arc::new(LatentPipe::new(Arc::new(BasicPipe::new()), latency))
}
