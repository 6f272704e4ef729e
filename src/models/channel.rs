//! Active call legs reported by `CoreShowChannels`.

use serde::{Deserialize, Serialize};

/// One live channel, built from an `Event: CoreShowChannel` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChannelRecord {
    /// Channel name, e.g. `SIP/1001-00000012`.
    pub channel: String,
    /// Caller number.
    pub caller_id: String,
    /// Elapsed time as reported by the switch (`HH:MM:SS`).
    pub duration: String,
    /// Dialplan application currently running on the channel.
    pub application: String,
}
