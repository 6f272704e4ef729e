//! Domain model module declarations.

pub mod channel;
pub mod queue;
pub mod realtime;
