//! Asterisk Manager Interface (AMI) session handling.
//!
//! The manager interface is a CRLF line protocol over one TCP connection.
//! Actions go out as `Key: Value` blocks closed by a blank line; responses
//! and events come back on the same stream with no request identifiers and
//! no length prefix.
//!
//! Submodules, leaf first:
//! - `codec`: CRLF framing with lossy UTF-8 decoding.
//! - `channel`: line reader/writer over one socket, with read timeout.
//! - `action`: outbound action blocks and agent commands.
//! - `parser`: declarative grammars decoding event lists into records.
//! - `handshake`: the `Login` exchange.
//! - `dispatcher`: one write-then-drain exchange at a time.
//! - `session`: connection lifecycle and the public operations.
//! - `worker`: bounded command queue in front of a long-lived session.

pub mod action;
pub mod channel;
pub mod codec;
pub mod dispatcher;
pub mod handshake;
pub mod parser;
pub mod session;
pub mod worker;
