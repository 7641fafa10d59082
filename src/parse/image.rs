use tracing::trace;

use super::{read_color_table, ParseState};
use crate::alloc::Allocator;
use crate::details::{FrameDescriptor, FramePacked, ScreenDescriptor, SubBlocks};
use crate::ParseError;

/// left, top, width, height (u16 each) plus the packed byte.
const IMAGE_DESCRIPTOR_SIZE: usize = 9;

/// Zero-area frames are rejected as useless even though the format allows them.
fn is_frame_size_invalid(frame: &FrameDescriptor) -> bool {
    u32::from(frame.width) + u32::from(frame.left) > u32::from(u16::MAX)
        || u32::from(frame.height) + u32::from(frame.top) > u32::from(u16::MAX)
        || frame.width == 0
        || frame.height == 0
}

fn is_frame_out_of_bounds(screen: &ScreenDescriptor, frame: &FrameDescriptor) -> bool {
    u32::from(frame.width) + u32::from(frame.left) > u32::from(screen.canvas_width)
        || u32::from(frame.height) + u32::from(frame.top) > u32::from(screen.canvas_height)
}

impl<A: Allocator> ParseState<'_, '_, A> {
    /// Image descriptor, optional local color table, minimum LZW code size
    /// and the compressed sub-block chain (measured, not decoded).
    pub(super) fn read_image_descriptor_block(&mut self, frame_index: usize) -> Result<(), ParseError> {
        if self.cursor.remaining() < IMAGE_DESCRIPTOR_SIZE {
            return Err(ParseError::ReadPastBuffer);
        }

        self.open_frame(frame_index)?;

        let left = self.cursor.read_le_u16()?;
        let top = self.cursor.read_le_u16()?;
        let width = self.cursor.read_le_u16()?;
        let height = self.cursor.read_le_u16()?;
        let mut descriptor = FrameDescriptor {
            left,
            top,
            width,
            height,
            packed: FramePacked::default(),
        };

        if is_frame_size_invalid(&descriptor) {
            return Err(ParseError::FrameSizeInvalid);
        }
        if is_frame_out_of_bounds(&self.details.descriptor, &descriptor) {
            return Err(ParseError::FrameOutOfBounds);
        }

        descriptor.packed = FramePacked::from_byte(self.cursor.read_u8()?);
        self.open_frame(frame_index)?.descriptor = descriptor;

        if descriptor.packed.local_color_table_flag {
            let table = read_color_table(
                &mut self.cursor,
                descriptor.packed.size,
                &mut *self.allocator,
            )?;
            trace!(frame_index, entries = table.len(), "local color table");
            self.open_frame(frame_index)?.local_color_table = Some(table);
        }

        let min_code_size = self.cursor.read_u8()?;

        let chain_start = self.cursor.position();
        let data_length = self.skip_subblocks()?;
        if data_length == 0 {
            return Err(ParseError::FrameDataEmpty);
        }
        let chain = &self.cursor.buffer()[chain_start..self.cursor.position()];

        trace!(
            frame_index,
            left,
            top,
            width,
            height,
            data_length,
            "image descriptor"
        );

        let frame = self.open_frame(frame_index)?;
        frame.min_code_size = min_code_size;
        frame.image_data = SubBlocks {
            chain,
            data_offset: chain_start + 1,
            data_length,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::GifDetails;
    use crate::GifParser;

    fn screen(width: u16, height: u16) -> Vec<u8> {
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&[0, 0, 0]);
        data
    }

    fn descriptor(data: &mut Vec<u8>, left: u16, top: u16, width: u16, height: u16, packed: u8) {
        data.push(0x2C);
        for value in [left, top, width, height] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.push(packed);
    }

    fn parse(data: &[u8]) -> (Result<usize, ParseError>, GifDetails<'_>) {
        let mut parser = GifParser::new();
        let mut details = GifDetails::new();
        let result = parser.parse(data, &mut details);
        (result, details)
    }

    #[test]
    fn test_size_checks() {
        let fd = |left, top, width, height| FrameDescriptor {
            left,
            top,
            width,
            height,
            packed: FramePacked::default(),
        };
        assert!(is_frame_size_invalid(&fd(0, 0, 0, 1)));
        assert!(is_frame_size_invalid(&fd(0, 0, 1, 0)));
        assert!(is_frame_size_invalid(&fd(u16::MAX, 0, 1, 1)));
        assert!(is_frame_size_invalid(&fd(0, 1, 1, u16::MAX)));
        assert!(!is_frame_size_invalid(&fd(u16::MAX - 1, 0, 1, 1)));
    }

    #[test]
    fn test_subblock_span() {
        let mut data = screen(8, 8);
        descriptor(&mut data, 0, 0, 8, 8, 0);
        let chain_start = data.len() + 1;
        data.extend_from_slice(&[0x02, 0x03, 0xAA, 0xBB, 0xCC, 0x02, 0xDD, 0xEE, 0x00, 0x3B]);
        let (result, details) = parse(&data);
        assert_eq!(result, Ok(0));

        let frame = details.frames.get(0).unwrap();
        assert_eq!(frame.min_code_size, 2);
        assert_eq!(frame.image_data.data_length(), 5);
        assert_eq!(frame.image_data.data_offset(), chain_start + 1);
        assert_eq!(frame.image_data.first_subblock(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(frame.image_data.chain().len(), 8);
        assert_eq!(frame.image_data.iter().count(), 2);
    }

    #[test]
    fn test_frame_size_invalid() {
        let mut data = screen(8, 8);
        descriptor(&mut data, 0, 0, 0, 8, 0);
        data.extend_from_slice(&[0x02, 0x01, 0x00, 0x00, 0x3B]);
        let (result, _) = parse(&data);
        assert_eq!(result, Err(ParseError::FrameSizeInvalid));
    }

    #[test]
    fn test_frame_out_of_bounds() {
        let mut data = screen(8, 8);
        descriptor(&mut data, 4, 0, 5, 8, 0);
        data.extend_from_slice(&[0x02, 0x01, 0x00, 0x00, 0x3B]);
        let (result, _) = parse(&data);
        assert_eq!(result, Err(ParseError::FrameOutOfBounds));
    }

    #[test]
    fn test_frame_data_empty() {
        let mut data = screen(8, 8);
        descriptor(&mut data, 0, 0, 8, 8, 0);
        data.extend_from_slice(&[0x02, 0x00, 0x3B]);
        let (result, _) = parse(&data);
        assert_eq!(result, Err(ParseError::FrameDataEmpty));
    }

    #[test]
    fn test_truncated_descriptor() {
        let mut data = screen(8, 8);
        data.extend_from_slice(&[0x2C, 0, 0, 0, 0, 8, 0]);
        let (result, details) = parse(&data);
        assert_eq!(result, Err(ParseError::ReadPastBuffer));
        assert!(details.frames.is_empty());
    }

    #[test]
    fn test_truncated_local_color_table_keeps_geometry() {
        let mut data = screen(8, 8);
        descriptor(&mut data, 1, 2, 3, 4, 0b1000_0001);
        data.extend_from_slice(&[0xFF; 11]);
        let (result, details) = parse(&data);
        assert_eq!(result, Err(ParseError::ReadPastBuffer));
        let frame = details.frames.get(0).unwrap();
        assert_eq!(frame.descriptor.width, 3);
        assert!(frame.local_color_table.is_none());
    }

    #[test]
    fn test_interlaced_local_table() {
        let mut data = screen(8, 8);
        descriptor(&mut data, 0, 0, 8, 8, 0b1100_0000);
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        data.extend_from_slice(&[0x02, 0x01, 0x44, 0x00, 0x3B]);
        let (result, details) = parse(&data);
        assert_eq!(result, Ok(0));
        let frame = details.frames.get(0).unwrap();
        assert!(frame.descriptor.packed.interlace_flag);
        assert_eq!(
            frame.local_color_table.as_ref().unwrap().entries(),
            &[0x0001_0203, 0x0004_0506]
        );
    }
}
