//! Parser limits and policy knobs.

/// Maximum accepted input size (64 MiB).
const MAX_FILE_SIZE: usize = 64 * 1024 * 1024;

/// Maximum number of frames accepted in one stream.
const MAX_FRAMES: usize = 65_535;

/// What to do with a graphics control disposal method in the reserved 4..=7 range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DisposalPolicy {
    /// Fail with [`crate::ParseError::UnknownDisposalMethod`].
    #[default]
    Reject,
    /// Treat reserved values as `Unspecified`.
    Coerce,
}

/// Which Netscape repeat count wins when a stream carries several.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RepeatCountPolicy {
    #[default]
    LastWins,
    FirstWins,
}

/// Hardened GIF parser configuration
#[derive(Debug, Clone)]
pub struct GifParserConfig {
    pub max_file_size: usize,
    pub max_frames: usize,
    pub disposal_policy: DisposalPolicy,
    pub repeat_count_policy: RepeatCountPolicy,
}

impl Default for GifParserConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_frames: MAX_FRAMES,
            disposal_policy: DisposalPolicy::Reject,
            repeat_count_policy: RepeatCountPolicy::LastWins,
        }
    }
}

impl GifParserConfig {
    /// Defaults with reserved disposal methods accepted and the first repeat
    /// count kept. Matches what lenient decoders do in practice.
    pub fn lenient() -> Self {
        Self {
            disposal_policy: DisposalPolicy::Coerce,
            repeat_count_policy: RepeatCountPolicy::FirstWins,
            ..Self::default()
        }
    }
}
