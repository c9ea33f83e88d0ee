use serde::{Deserialize, Serialize};

/// Length of the legacy sub-header that precedes the payload when bit 0 of the
/// frame's skip flag is set.
pub const DEFAULT_SKIP_BLOCK_LEN: usize = 0x8080;

/// Tunables for [`Codec47Decoder`](crate::Codec47Decoder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Reject frames whose reserved header bytes are non-zero.
    pub validate_reserved: bool,
    /// Bytes skipped before the payload when the skip flag is set.
    pub skip_block_len: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            validate_reserved: true,
            skip_block_len: DEFAULT_SKIP_BLOCK_LEN,
        }
    }
}
