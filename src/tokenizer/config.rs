//! Configuration for the default transport tokenizer.

/// Default cap on a single frame (100 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 100 * 1024 * 1024;

/// Limits applied by [`TransportTokenizer`](super::TransportTokenizer).
///
/// # Examples
///
/// ```
/// use inbound_pipeline::tokenizer::TokenizerConfig;
///
/// let config = TokenizerConfig::default()
///     .max_frame_length(64 * 1024)
///     .min_compatible_version(7);
///
/// assert_eq!(config.max_frame_length, 64 * 1024);
/// assert_eq!(config.min_compatible_version, 7);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// Largest frame accepted, counting the 6-byte prefix.
    ///
    /// Default: 100 MiB.
    pub max_frame_length: usize,

    /// Oldest protocol version accepted outside of handshakes.
    ///
    /// Default: 0 (any version).
    pub min_compatible_version: u32,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            min_compatible_version: 0,
        }
    }
}

impl TokenizerConfig {
    /// Set the maximum frame length.
    #[must_use]
    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.max_frame_length = length;
        self
    }

    /// Set the minimum compatible protocol version.
    #[must_use]
    pub fn min_compatible_version(mut self, version: u32) -> Self {
        self.min_compatible_version = version;
        self
    }
}
