//! Parsed representation of a GIF89a stream.
//!
//! Everything here is populated in place by the parser. Palettes and the frame
//! storage are owned by [`GifDetails`]; compressed pixel data is only borrowed
//! from the input buffer, so a `GifDetails<'a>` cannot outlive the bytes it
//! was parsed from.

use crate::alloc::Allocator;
use crate::frames::FrameVec;

/// Packed field of the logical screen descriptor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScreenPacked {
    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    pub size: u8,
}

impl ScreenPacked {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            global_color_table_flag: byte & 0b1000_0000 != 0,
            color_resolution: (byte & 0b0111_0000) >> 4,
            sort_flag: byte & 0b0000_1000 != 0,
            size: byte & 0b0000_0111,
        }
    }
}

/// Logical screen descriptor: the canvas every frame is drawn onto.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScreenDescriptor {
    pub canvas_width: u16,
    pub canvas_height: u16,
    pub packed: ScreenPacked,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

/// Palette of `0x00RRGGBB` entries, `2^(size + 1)` long.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColorTable(pub(crate) Vec<u32>);

impl ColorTable {
    pub fn entries(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: u8) -> Option<u32> {
        self.0.get(usize::from(index)).copied()
    }
}

/// How a frame's area is treated before the next frame is drawn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposalMethod {
    #[default]
    Unspecified = 0,
    DoNotDispose = 1,
    RestoreBackground = 2,
    RestorePrevious = 3,
}

impl DisposalMethod {
    /// Values 4 through 7 are reserved and yield `None`.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::DoNotDispose),
            2 => Some(Self::RestoreBackground),
            3 => Some(Self::RestorePrevious),
            _ => None,
        }
    }
}

/// Graphics Control Extension. Zeroed when a frame has none.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GraphicControl {
    pub disposal_method: DisposalMethod,
    pub user_input_flag: bool,
    pub transparent_color_flag: bool,
    /// Hundredths of a second.
    pub delay: u16,
    pub transparent_color_index: u8,
}

/// Packed field of an image descriptor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FramePacked {
    pub local_color_table_flag: bool,
    pub interlace_flag: bool,
    pub sort_flag: bool,
    pub size: u8,
}

impl FramePacked {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            local_color_table_flag: byte & 0b1000_0000 != 0,
            interlace_flag: byte & 0b0100_0000 != 0,
            sort_flag: byte & 0b0010_0000 != 0,
            size: byte & 0b0000_0111,
        }
    }
}

/// Frame geometry and packed flags from an image descriptor block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub packed: FramePacked,
}

/// Borrowed view of a frame's compressed sub-block chain.
///
/// `chain` starts at the first length byte and ends with the zero-length
/// terminator. `data_length` is the sum of all sub-block payload lengths.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubBlocks<'a> {
    pub(crate) chain: &'a [u8],
    pub(crate) data_offset: usize,
    pub(crate) data_length: usize,
}

impl<'a> SubBlocks<'a> {
    /// Offset into the input buffer of the first sub-block's payload.
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    /// Total payload bytes across every sub-block.
    pub fn data_length(&self) -> usize {
        self.data_length
    }

    /// Raw chain including length prefixes and the terminator.
    pub fn chain(&self) -> &'a [u8] {
        self.chain
    }

    /// Payload of the first sub-block.
    pub fn first_subblock(&self) -> &'a [u8] {
        self.iter().next().unwrap_or_default()
    }

    /// Iterate over every sub-block's payload in stream order.
    pub fn iter(&self) -> SubBlockIter<'a> {
        SubBlockIter { rest: self.chain }
    }
}

impl<'a> IntoIterator for &SubBlocks<'a> {
    type Item = &'a [u8];
    type IntoIter = SubBlockIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct SubBlockIter<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for SubBlockIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&length, tail) = self.rest.split_first()?;
        let length = usize::from(length);
        if length == 0 || tail.len() < length {
            self.rest = &[];
            return None;
        }
        let (block, rest) = tail.split_at(length);
        self.rest = rest;
        Some(block)
    }
}

/// One frame: its control extension, palette, geometry and compressed data.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub graphic_control: GraphicControl,
    pub local_color_table: Option<ColorTable>,
    pub descriptor: FrameDescriptor,
    pub min_code_size: u8,
    pub image_data: SubBlocks<'a>,
}

/// Top-level parse output.
///
/// Created zeroed, filled in by the parser, and left partially populated if
/// parsing fails. Dropping it releases everything; [`GifDetails::free`]
/// does the same through an explicit [`Allocator`] and may be called any
/// number of times.
#[derive(Debug, Default)]
pub struct GifDetails<'a> {
    pub descriptor: ScreenDescriptor,
    pub global_color_table: Option<ColorTable>,
    /// Netscape loop count, 0 when absent (or "loop forever" when present).
    pub repeat_count: u16,
    pub frames: FrameVec<'a>,
    pub raw_data: &'a [u8],
}

impl<'a> GifDetails<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame<'a>> {
        self.frames.get(index)
    }

    /// The palette a frame is drawn with: its local table, else the global one.
    pub fn color_table_for(&self, index: usize) -> Option<&ColorTable> {
        let frame = self.frames.get(index)?;
        frame
            .local_color_table
            .as_ref()
            .or(self.global_color_table.as_ref())
    }

    /// Release the global table, every local table, then the frame storage.
    ///
    /// Only allocations actually held are handed to `allocator`; calling
    /// this on a zeroed or already freed value does nothing.
    pub fn free<A: Allocator>(&mut self, allocator: &mut A) {
        if let Some(table) = self.global_color_table.take() {
            allocator.release(table.0);
        }
        for frame in self.frames.iter_mut() {
            if let Some(table) = frame.local_color_table.take() {
                allocator.release(table.0);
            }
        }
        let storage = std::mem::take(&mut self.frames).into_storage();
        if storage.capacity() != 0 {
            allocator.release(storage);
        }
        *self = Self::default();
    }
}
