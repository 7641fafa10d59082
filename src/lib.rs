//! Hardened GIF89a container parser.
//!
//! `gif_harden` walks an untrusted GIF89a byte buffer and produces a
//! validated description of it: logical screen, palettes, per-frame timing,
//! disposal and geometry, and the location of each frame's compressed
//! sub-block chain. It never reads outside the input buffer, whatever the
//! input contains.
//!
//! Security measures:
//! - Every multi-byte read is bounds-checked before any byte is consumed
//! - Distinct failure code per malformation, plus the offending byte offset
//! - All allocations go through a caller-supplied [`Allocator`]
//! - Input size and frame count limits ([`GifParserConfig`])
//! - Fail-fast: the first error ends the parse, partial output stays owned
//!
//! LZW decompression is not performed; [`GifParser::decode`] is reserved for
//! it.
//!
//! ```no_run
//! use gif_harden::{GifDetails, GifParser};
//!
//! let bytes = std::fs::read("animation.gif").unwrap();
//! let mut parser = GifParser::new();
//! let mut details = GifDetails::new();
//! match parser.parse(&bytes, &mut details) {
//!     Ok(leftover) => println!("{} frames, {} trailing bytes", details.frames.len(), leftover),
//!     Err(e) => eprintln!("{} at offset {:?}", e, parser.take_last_position()),
//! }
//! ```

use std::fmt;
use thiserror::Error;

pub mod alloc;
pub mod api;
pub mod config;
pub mod cursor;
pub mod details;
pub mod frames;
pub mod parse;

#[cfg(feature = "metrics")]
pub mod metrics;
#[cfg(feature = "metrics")]
pub mod metrics_server;

pub use alloc::{AllocFailure, Allocator, SystemAllocator};
pub use api::{inspect, inspect_file, parse, FrameSummary, GifSummary, Parsed};
pub use config::{DisposalPolicy, GifParserConfig, RepeatCountPolicy};
pub use details::{
    ColorTable, DisposalMethod, Frame, FrameDescriptor, FramePacked, GifDetails,
    GraphicControl, ScreenDescriptor, ScreenPacked, SubBlocks,
};
pub use frames::{FrameVec, FRAME_BATCH_SIZE};
pub use parse::GifParser;

/// Every way a parse can fail. The discriminant is a stable numeric code;
/// `0` is reserved for success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParseError {
    ZeroSizedBuffer = 1,
    ReadPastBuffer = 2,
    AllocationFailed = 3,
    ReallocationFailed = 4,
    NotAGif = 5,
    NotAGif89a = 6,
    UnknownBlock = 7,
    UnknownExtension = 8,
    ImageDescriptorMissing = 9,
    GraphicsControlExtensionSizeMismatch = 10,
    GraphicsControlExtensionNullMissing = 11,
    MultipleGraphicsControlExtensions = 12,
    UnknownDisposalMethod = 13,
    ApplicationExtensionSizeMismatch = 14,
    NotANetscapeExtension = 15,
    NotANetscape20Extension = 16,
    IncorrectNetscapeSubblockSize = 17,
    IncorrectNetscapeSubblockId = 18,
    NetscapeNullMissing = 19,
    FrameSizeInvalid = 20,
    FrameOutOfBounds = 21,
    FrameDataEmpty = 22,
    FileTooLarge = 23,
    TooManyFrames = 24,
    DecodeNotImplemented = 25,
}

impl ParseError {
    pub const ALL: [ParseError; 25] = [
        ParseError::ZeroSizedBuffer,
        ParseError::ReadPastBuffer,
        ParseError::AllocationFailed,
        ParseError::ReallocationFailed,
        ParseError::NotAGif,
        ParseError::NotAGif89a,
        ParseError::UnknownBlock,
        ParseError::UnknownExtension,
        ParseError::ImageDescriptorMissing,
        ParseError::GraphicsControlExtensionSizeMismatch,
        ParseError::GraphicsControlExtensionNullMissing,
        ParseError::MultipleGraphicsControlExtensions,
        ParseError::UnknownDisposalMethod,
        ParseError::ApplicationExtensionSizeMismatch,
        ParseError::NotANetscapeExtension,
        ParseError::NotANetscape20Extension,
        ParseError::IncorrectNetscapeSubblockSize,
        ParseError::IncorrectNetscapeSubblockId,
        ParseError::NetscapeNullMissing,
        ParseError::FrameSizeInvalid,
        ParseError::FrameOutOfBounds,
        ParseError::FrameDataEmpty,
        ParseError::FileTooLarge,
        ParseError::TooManyFrames,
        ParseError::DecodeNotImplemented,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    /// Human-readable description.
    pub fn as_str(self) -> &'static str {
        match self {
            ParseError::ZeroSizedBuffer => "zero-sized buffer",
            ParseError::ReadPastBuffer => "read past buffer",
            ParseError::AllocationFailed => "allocation failed",
            ParseError::ReallocationFailed => "reallocation failed",
            ParseError::NotAGif => "not a GIF",
            ParseError::NotAGif89a => "unsupported version, not GIF89a",
            ParseError::UnknownBlock => "unknown block",
            ParseError::UnknownExtension => "unknown extension",
            ParseError::ImageDescriptorMissing => "image descriptor missing",
            ParseError::GraphicsControlExtensionSizeMismatch => {
                "graphics control extension size mismatch"
            }
            ParseError::GraphicsControlExtensionNullMissing => {
                "graphics control extension null terminator missing"
            }
            ParseError::MultipleGraphicsControlExtensions => {
                "multiple graphics control extensions for one frame"
            }
            ParseError::UnknownDisposalMethod => "unknown disposal method",
            ParseError::ApplicationExtensionSizeMismatch => "application extension size mismatch",
            ParseError::NotANetscapeExtension => "not a NETSCAPE extension",
            ParseError::NotANetscape20Extension => "not a NETSCAPE2.0 extension",
            ParseError::IncorrectNetscapeSubblockSize => "incorrect NETSCAPE sub-block size",
            ParseError::IncorrectNetscapeSubblockId => "incorrect NETSCAPE sub-block id",
            ParseError::NetscapeNullMissing => "NETSCAPE extension null terminator missing",
            ParseError::FrameSizeInvalid => "frame size invalid",
            ParseError::FrameOutOfBounds => "frame out of bounds",
            ParseError::FrameDataEmpty => "frame data empty",
            ParseError::FileTooLarge => "file too large",
            ParseError::TooManyFrames => "too many frames",
            ParseError::DecodeNotImplemented => "decoding not implemented",
        }
    }

    /// Short snake_case identifier, used for metric labels.
    pub fn name(self) -> &'static str {
        match self {
            ParseError::ZeroSizedBuffer => "zero_sized_buffer",
            ParseError::ReadPastBuffer => "read_past_buffer",
            ParseError::AllocationFailed => "alloc_fail",
            ParseError::ReallocationFailed => "realloc_fail",
            ParseError::NotAGif => "not_a_gif",
            ParseError::NotAGif89a => "not_a_gif89a",
            ParseError::UnknownBlock => "unknown_block",
            ParseError::UnknownExtension => "unknown_extension",
            ParseError::ImageDescriptorMissing => "image_descriptor_missing",
            ParseError::GraphicsControlExtensionSizeMismatch => "gce_size_mismatch",
            ParseError::GraphicsControlExtensionNullMissing => "gce_null_missing",
            ParseError::MultipleGraphicsControlExtensions => "multiple_gce",
            ParseError::UnknownDisposalMethod => "unknown_disposal_method",
            ParseError::ApplicationExtensionSizeMismatch => "app_ext_size_mismatch",
            ParseError::NotANetscapeExtension => "not_netscape",
            ParseError::NotANetscape20Extension => "not_netscape_2_0",
            ParseError::IncorrectNetscapeSubblockSize => "netscape_subblock_size",
            ParseError::IncorrectNetscapeSubblockId => "netscape_subblock_id",
            ParseError::NetscapeNullMissing => "netscape_null_missing",
            ParseError::FrameSizeInvalid => "frame_size_invalid",
            ParseError::FrameOutOfBounds => "frame_out_of_bounds",
            ParseError::FrameDataEmpty => "frame_data_empty",
            ParseError::FileTooLarge => "file_too_large",
            ParseError::TooManyFrames => "too_many_frames",
            ParseError::DecodeNotImplemented => "decode_not_implemented",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ParseError {}

impl From<cursor::OutOfBounds> for ParseError {
    fn from(_: cursor::OutOfBounds) -> Self {
        ParseError::ReadPastBuffer
    }
}

/// Text for a numeric result code. `0` is success; unknown codes are `None`.
pub fn describe_code(code: u8) -> Option<&'static str> {
    if code == 0 {
        return Some("success");
    }
    ParseError::from_code(code).map(ParseError::as_str)
}

/// A parse error together with the input offset that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{error} at byte offset {}", .position.map_or_else(|| "-".to_string(), |p| p.to_string()))]
pub struct ParseFailure {
    #[source]
    pub error: ParseError,
    pub position: Option<usize>,
}

#[derive(Debug, Error)]
pub enum GifHardenError {
    #[error("GIF parsing failed: {0}")]
    Parse(#[from] ParseFailure),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for error in ParseError::ALL {
            assert_eq!(ParseError::from_code(error.code()), Some(error));
        }
    }

    #[test]
    fn test_codes_are_unique_and_nonzero() {
        let mut codes: Vec<u8> = ParseError::ALL.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ParseError::ALL.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_describe_code() {
        assert_eq!(describe_code(0), Some("success"));
        assert_eq!(describe_code(2), Some("read past buffer"));
        assert_eq!(describe_code(200), None);
    }

    #[test]
    fn test_failure_display() {
        let failure = ParseFailure { error: ParseError::NotAGif, position: Some(3) };
        assert_eq!(failure.to_string(), "not a GIF at byte offset 3");
        let failure = ParseFailure { error: ParseError::ZeroSizedBuffer, position: None };
        assert_eq!(failure.to_string(), "zero-sized buffer at byte offset -");
    }
}
