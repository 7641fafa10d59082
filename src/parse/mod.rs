//! Block-walking state machine.
//!
//! A GIF89a stream is read strictly in order, with no backtracking:
//!
//! * Header - `"GIF"` then `"89a"`
//! * Logical screen descriptor - 7 bytes
//! * Global color table - if the descriptor says so
//! * Any number of blocks, each introduced by one byte:
//!     * `0x21` extension, typed by the next byte
//!         * `0xF9` graphics control, attached to the next frame
//!         * `0xFF` application, only NETSCAPE2.0 looping is accepted
//!         * `0xFE` comment and `0x01` plain text, skipped
//!     * `0x2C` image descriptor, optional local color table, LZW data
//!     * `0x3B` trailer, ends the stream
//!
//! All per-call state lives in [`ParseState`], threaded by reference through
//! every sub-parser, so independent parses never share anything.

mod color_table;
mod extension;
mod image;

use tracing::{debug, trace, warn};

use crate::alloc::{Allocator, SystemAllocator};
use crate::config::GifParserConfig;
use crate::cursor::{Comparison, Cursor};
use crate::details::{Frame, GifDetails, ScreenDescriptor, ScreenPacked};
use crate::ParseError;

pub(crate) use color_table::read_color_table;

const GIF_SIGNATURE: &[u8] = b"GIF";
const GIF_VERSION: &[u8] = b"89a";

const LOGICAL_SCREEN_DESCRIPTOR_SIZE: usize = 7;

const EXTENSION_BLOCK: u8 = 0x21;
const IMAGE_DESCRIPTOR_BLOCK: u8 = 0x2C;
const TRAILER_BLOCK: u8 = 0x3B;

/// Cursor, output and allocator for one parse call.
pub(crate) struct ParseState<'a, 'p, A: Allocator> {
    pub(crate) cursor: Cursor<'a>,
    pub(crate) details: &'p mut GifDetails<'a>,
    pub(crate) allocator: &'p mut A,
    pub(crate) config: &'p GifParserConfig,
    pub(crate) repeat_count_seen: bool,
}

impl<'a, 'p, A: Allocator> ParseState<'a, 'p, A> {
    pub(crate) fn new(
        buffer: &'a [u8],
        details: &'p mut GifDetails<'a>,
        allocator: &'p mut A,
        config: &'p GifParserConfig,
    ) -> Self {
        Self {
            cursor: Cursor::new(buffer),
            details,
            allocator,
            config,
            repeat_count_seen: false,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Walk the whole stream. On success returns the number of bytes left
    /// after the trailer.
    pub(crate) fn run(&mut self) -> Result<usize, ParseError> {
        self.expect(GIF_SIGNATURE, ParseError::NotAGif)?;
        self.expect(GIF_VERSION, ParseError::NotAGif89a)?;
        self.read_screen_descriptor()?;

        let packed = self.details.descriptor.packed;
        if packed.global_color_table_flag {
            let table = read_color_table(&mut self.cursor, packed.size, &mut *self.allocator)?;
            trace!(entries = table.len(), "global color table");
            self.details.global_color_table = Some(table);
        }

        let mut frame_index = 0;
        let mut seen_graphics_control = false;
        loop {
            let block_type = self.cursor.read_u8()?;
            match block_type {
                EXTENSION_BLOCK => {
                    self.read_extension_block(frame_index, &mut seen_graphics_control)?;
                }
                IMAGE_DESCRIPTOR_BLOCK => {
                    self.read_image_descriptor_block(frame_index)?;
                    frame_index += 1;
                    seen_graphics_control = false;
                }
                TRAILER_BLOCK => {
                    if frame_index == 0 {
                        return Err(ParseError::ImageDescriptorMissing);
                    }
                    // A graphics control extension right before the trailer
                    // opened a slot no image descriptor completed.
                    self.details.frames.truncate_unfinished(frame_index);
                    return Ok(self.cursor.remaining());
                }
                _ => return Err(ParseError::UnknownBlock),
            }
        }
    }

    fn expect(&mut self, constant: &[u8], mismatch: ParseError) -> Result<(), ParseError> {
        match self.cursor.compare(constant) {
            Comparison::Equal => Ok(()),
            Comparison::NotEqual => Err(mismatch),
            Comparison::OutOfBounds => Err(ParseError::ReadPastBuffer),
        }
    }

    fn read_screen_descriptor(&mut self) -> Result<(), ParseError> {
        let bytes = self.cursor.take(LOGICAL_SCREEN_DESCRIPTOR_SIZE)?;
        let descriptor = ScreenDescriptor {
            canvas_width: u16::from_le_bytes([bytes[0], bytes[1]]),
            canvas_height: u16::from_le_bytes([bytes[2], bytes[3]]),
            packed: ScreenPacked::from_byte(bytes[4]),
            background_color_index: bytes[5],
            pixel_aspect_ratio: bytes[6],
        };
        debug!(
            width = descriptor.canvas_width,
            height = descriptor.canvas_height,
            global_color_table = descriptor.packed.global_color_table_flag,
            "logical screen descriptor"
        );
        self.details.descriptor = descriptor;
        Ok(())
    }

    /// Open (or reopen) frame slot `index`, enforcing the frame limit first.
    pub(crate) fn open_frame(&mut self, index: usize) -> Result<&mut Frame<'a>, ParseError> {
        if index >= self.config.max_frames {
            return Err(ParseError::TooManyFrames);
        }
        self.details.frames.ensure_frame(index, &mut *self.allocator)
    }

    /// Walk a chain of length-prefixed sub-blocks up to and including the
    /// zero-length terminator. Returns the summed payload length.
    pub(crate) fn skip_subblocks(&mut self) -> Result<usize, ParseError> {
        let mut total = 0usize;
        loop {
            let length = self.cursor.read_u8()?;
            if length == 0 {
                return Ok(total);
            }
            self.cursor.skip(usize::from(length))?;
            total += usize::from(length);
        }
    }
}

/// Reusable parser: configuration, allocator and the diagnostic slot.
///
/// Each call to [`GifParser::parse`] builds its own [`ParseState`]; the only
/// thing carried between calls is the last failure position, which
/// [`GifParser::take_last_position`] hands out once.
#[derive(Debug)]
pub struct GifParser<A: Allocator = SystemAllocator> {
    config: GifParserConfig,
    allocator: A,
    last_position: Option<usize>,
}

impl GifParser<SystemAllocator> {
    pub fn new() -> Self {
        Self::with_config(GifParserConfig::default())
    }

    pub fn with_config(config: GifParserConfig) -> Self {
        Self::with_allocator(config, SystemAllocator)
    }
}

impl Default for GifParser<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> GifParser<A> {
    pub fn with_allocator(config: GifParserConfig, allocator: A) -> Self {
        Self {
            config,
            allocator,
            last_position: None,
        }
    }

    pub fn config(&self) -> &GifParserConfig {
        &self.config
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    /// Parse `buffer` into `details`.
    ///
    /// `details` is released and zeroed first. On success the return value
    /// is the number of bytes after the trailer. On failure `details` keeps
    /// whatever was attached before the error (palettes, frames), and the
    /// offending offset is available from [`GifParser::take_last_position`].
    pub fn parse<'a>(
        &mut self,
        buffer: &'a [u8],
        details: &mut GifDetails<'a>,
    ) -> Result<usize, ParseError> {
        details.free(&mut self.allocator);
        self.last_position = None;

        if buffer.is_empty() {
            warn!("refusing zero-sized buffer");
            return Err(ParseError::ZeroSizedBuffer);
        }
        if buffer.len() > self.config.max_file_size {
            warn!(
                size = buffer.len(),
                max = self.config.max_file_size,
                "input exceeds size limit"
            );
            self.last_position = Some(0);
            return Err(ParseError::FileTooLarge);
        }

        details.raw_data = buffer;
        let mut state = ParseState::new(buffer, details, &mut self.allocator, &self.config);
        let result = state.run();
        let position = state.position();

        match result {
            Ok(leftover) => {
                debug!(
                    frames = details.frames.len(),
                    repeat_count = details.repeat_count,
                    leftover,
                    "parsed GIF"
                );
                Ok(leftover)
            }
            Err(error) => {
                warn!(code = error.code(), %error, position, "GIF rejected");
                self.last_position = Some(position);
                Err(error)
            }
        }
    }

    /// Pop the offset recorded by the last failed parse.
    pub fn take_last_position(&mut self) -> Option<usize> {
        self.last_position.take()
    }

    /// Reserved for LZW decompression of the spans located by
    /// [`GifParser::parse`]. Always fails for now.
    pub fn decode(&mut self, _details: &GifDetails<'_>) -> Result<(), ParseError> {
        Err(ParseError::DecodeNotImplemented)
    }

    /// Release everything `details` owns through this parser's allocator.
    pub fn free_details(&mut self, details: &mut GifDetails<'_>) {
        details.free(&mut self.allocator);
    }
}
