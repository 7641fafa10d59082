use tracing::trace;

use super::ParseState;
use crate::alloc::Allocator;
use crate::config::{DisposalPolicy, RepeatCountPolicy};
use crate::details::{DisposalMethod, GraphicControl};
use crate::ParseError;

const GRAPHICS_CONTROL_EXTENSION: u8 = 0xF9;
const APPLICATION_EXTENSION: u8 = 0xFF;
const COMMENT_EXTENSION: u8 = 0xFE;
const PLAIN_TEXT_EXTENSION: u8 = 0x01;

const GRAPHICS_CONTROL_EXTENSION_SIZE: u8 = 4;

const APPLICATION_EXTENSION_SIZE: u8 = 11;
const NETSCAPE_IDENTIFIER: &[u8; 8] = b"NETSCAPE";
const NETSCAPE_AUTH_CODE: &[u8; 3] = b"2.0";
const NETSCAPE_SUBBLOCK_SIZE: u8 = 3;
const NETSCAPE_SUBBLOCK_ID: u8 = 1;

impl<A: Allocator> ParseState<'_, '_, A> {
    /// Dispatch on the byte after an `0x21` extension introducer.
    pub(super) fn read_extension_block(
        &mut self,
        frame_index: usize,
        seen_graphics_control: &mut bool,
    ) -> Result<(), ParseError> {
        let extension_type = self.cursor.read_u8()?;
        match extension_type {
            GRAPHICS_CONTROL_EXTENSION => {
                if *seen_graphics_control {
                    return Err(ParseError::MultipleGraphicsControlExtensions);
                }
                *seen_graphics_control = true;
                self.read_graphics_control_extension(frame_index)
            }
            APPLICATION_EXTENSION => self.read_application_extension(),
            COMMENT_EXTENSION | PLAIN_TEXT_EXTENSION => {
                let skipped = self.skip_subblocks()?;
                trace!(extension_type, skipped, "skipped extension");
                Ok(())
            }
            _ => Err(ParseError::UnknownExtension),
        }
    }

    /// Size byte, packed byte, delay, transparent index, terminator.
    fn read_graphics_control_extension(&mut self, frame_index: usize) -> Result<(), ParseError> {
        // Payload plus the leading size byte and the trailing terminator.
        let block_length = usize::from(GRAPHICS_CONTROL_EXTENSION_SIZE) + 2;
        if self.cursor.remaining() < block_length {
            return Err(ParseError::ReadPastBuffer);
        }

        self.open_frame(frame_index)?;

        if self.cursor.read_u8()? != GRAPHICS_CONTROL_EXTENSION_SIZE {
            return Err(ParseError::GraphicsControlExtensionSizeMismatch);
        }
        let packed = self.cursor.read_u8()?;
        let delay = self.cursor.read_le_u16()?;
        let transparent_color_index = self.cursor.read_u8()?;
        if self.cursor.read_u8()? != 0 {
            return Err(ParseError::GraphicsControlExtensionNullMissing);
        }

        let disposal_bits = (packed & 0b0001_1100) >> 2;
        let disposal_method = match DisposalMethod::from_u8(disposal_bits) {
            Some(method) => method,
            None if self.config.disposal_policy == DisposalPolicy::Coerce => {
                trace!(disposal_bits, "coercing reserved disposal method");
                DisposalMethod::Unspecified
            }
            None => return Err(ParseError::UnknownDisposalMethod),
        };

        let control = GraphicControl {
            disposal_method,
            user_input_flag: packed & 0b0000_0010 != 0,
            transparent_color_flag: packed & 0b0000_0001 != 0,
            delay,
            transparent_color_index,
        };
        trace!(frame_index, ?control, "graphics control extension");
        self.open_frame(frame_index)?.graphic_control = control;
        Ok(())
    }

    /// Only the NETSCAPE2.0 looping extension is accepted.
    fn read_application_extension(&mut self) -> Result<(), ParseError> {
        // Payload plus the size byte and the sub-block length byte.
        let block_length = usize::from(APPLICATION_EXTENSION_SIZE) + 2;
        if self.cursor.remaining() < block_length {
            return Err(ParseError::ReadPastBuffer);
        }

        if self.cursor.read_u8()? != APPLICATION_EXTENSION_SIZE {
            return Err(ParseError::ApplicationExtensionSizeMismatch);
        }
        self.expect(NETSCAPE_IDENTIFIER, ParseError::NotANetscapeExtension)?;
        self.expect(NETSCAPE_AUTH_CODE, ParseError::NotANetscape20Extension)?;

        if self.cursor.read_u8()? != NETSCAPE_SUBBLOCK_SIZE {
            return Err(ParseError::IncorrectNetscapeSubblockSize);
        }
        if self.cursor.read_u8()? != NETSCAPE_SUBBLOCK_ID {
            return Err(ParseError::IncorrectNetscapeSubblockId);
        }
        let repeat_count = self.cursor.read_le_u16()?;
        if self.cursor.read_u8()? != 0 {
            return Err(ParseError::NetscapeNullMissing);
        }

        let keep_existing = self.repeat_count_seen
            && self.config.repeat_count_policy == RepeatCountPolicy::FirstWins;
        if !keep_existing {
            self.details.repeat_count = repeat_count;
        }
        self.repeat_count_seen = true;
        trace!(repeat_count, kept = self.details.repeat_count, "netscape looping extension");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{DisposalPolicy, GifParserConfig, RepeatCountPolicy};
    use crate::details::{DisposalMethod, GifDetails};
    use crate::{GifParser, ParseError};

    const HEADER: &[u8] = b"GIF89a\x04\x00\x04\x00\x00\x00\x00";
    const FRAME: &[u8] = &[
        0x2C, 0, 0, 0, 0, 4, 0, 4, 0, 0x00, 0x02, 0x02, 0x4C, 0x01, 0x00,
    ];

    fn gif(blocks: &[&[u8]]) -> Vec<u8> {
        let mut data = HEADER.to_vec();
        for block in blocks {
            data.extend_from_slice(block);
        }
        data
    }

    fn netscape(repeat: u16) -> Vec<u8> {
        let mut block = vec![0x21, 0xFF, 0x0B];
        block.extend_from_slice(b"NETSCAPE2.0");
        block.extend_from_slice(&[0x03, 0x01]);
        block.extend_from_slice(&repeat.to_le_bytes());
        block.push(0x00);
        block
    }

    fn run(config: GifParserConfig, data: &[u8]) -> (Result<usize, ParseError>, GifDetails<'_>) {
        let mut parser = GifParser::with_config(config);
        let mut details = GifDetails::new();
        let result = parser.parse(data, &mut details);
        (result, details)
    }

    #[test]
    fn test_graphics_control_fields() {
        // disposal 2, user input, transparent; delay 0x0105; index 7
        let gce: &[u8] = &[0x21, 0xF9, 0x04, 0b0000_1011, 0x05, 0x01, 0x07, 0x00];
        let data = gif(&[gce, FRAME, &[0x3B]]);
        let (result, details) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Ok(0));
        let control = details.frames.get(0).unwrap().graphic_control;
        assert_eq!(control.disposal_method, DisposalMethod::RestoreBackground);
        assert!(control.user_input_flag);
        assert!(control.transparent_color_flag);
        assert_eq!(control.delay, 0x0105);
        assert_eq!(control.transparent_color_index, 7);
    }

    #[test]
    fn test_graphics_control_size_mismatch() {
        let gce: &[u8] = &[0x21, 0xF9, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00];
        let data = gif(&[gce, FRAME, &[0x3B]]);
        let (result, _) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Err(ParseError::GraphicsControlExtensionSizeMismatch));
    }

    #[test]
    fn test_graphics_control_truncated() {
        let gce: &[u8] = &[0x21, 0xF9, 0x04, 0x00, 0x00];
        let data = gif(&[gce]);
        let (result, details) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Err(ParseError::ReadPastBuffer));
        assert!(details.frames.is_empty());
    }

    #[test]
    fn test_graphics_control_null_missing() {
        let gce: &[u8] = &[0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x01];
        let data = gif(&[gce, FRAME, &[0x3B]]);
        let (result, _) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Err(ParseError::GraphicsControlExtensionNullMissing));
    }

    #[test]
    fn test_two_graphics_controls_for_one_frame() {
        let gce: &[u8] = &[0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
        let data = gif(&[gce, gce, FRAME, &[0x3B]]);
        let (result, _) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Err(ParseError::MultipleGraphicsControlExtensions));
    }

    #[test]
    fn test_one_graphics_control_per_frame_is_fine() {
        let gce: &[u8] = &[0x21, 0xF9, 0x04, 0x04, 0x0A, 0x00, 0x00, 0x00];
        let data = gif(&[gce, FRAME, gce, FRAME, &[0x3B]]);
        let (result, details) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Ok(0));
        assert_eq!(details.frames.len(), 2);
        for frame in &details.frames {
            assert_eq!(frame.graphic_control.disposal_method, DisposalMethod::DoNotDispose);
            assert_eq!(frame.graphic_control.delay, 10);
        }
    }

    #[test]
    fn test_reserved_disposal_rejected_by_default() {
        let gce: &[u8] = &[0x21, 0xF9, 0x04, 0b0001_0000, 0x00, 0x00, 0x00, 0x00];
        let data = gif(&[gce, FRAME, &[0x3B]]);
        let (result, _) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Err(ParseError::UnknownDisposalMethod));
    }

    #[test]
    fn test_reserved_disposal_coerced() {
        let gce: &[u8] = &[0x21, 0xF9, 0x04, 0b0001_1100, 0x00, 0x00, 0x00, 0x00];
        let data = gif(&[gce, FRAME, &[0x3B]]);
        let config = GifParserConfig { disposal_policy: DisposalPolicy::Coerce, ..Default::default() };
        let (result, details) = run(config, &data);
        assert_eq!(result, Ok(0));
        assert_eq!(
            details.frames.get(0).unwrap().graphic_control.disposal_method,
            DisposalMethod::Unspecified
        );
    }

    #[test]
    fn test_netscape_repeat_count() {
        let data = gif(&[&netscape(5), FRAME, &[0x3B]]);
        let (result, details) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Ok(0));
        assert_eq!(details.repeat_count, 5);
    }

    #[test]
    fn test_netscape_last_write_wins() {
        let data = gif(&[&netscape(5), FRAME, &netscape(9), &[0x3B]]);
        let (_, details) = run(GifParserConfig::default(), &data);
        assert_eq!(details.repeat_count, 9);
    }

    #[test]
    fn test_netscape_first_write_wins() {
        let data = gif(&[&netscape(5), FRAME, &netscape(9), &[0x3B]]);
        let config = GifParserConfig {
            repeat_count_policy: RepeatCountPolicy::FirstWins,
            ..Default::default()
        };
        let (_, details) = run(config, &data);
        assert_eq!(details.repeat_count, 5);
    }

    #[test]
    fn test_application_extension_failures() {
        let mut wrong_size = netscape(0);
        wrong_size[2] = 0x0A;
        let mut wrong_identifier = netscape(0);
        wrong_identifier[3..11].copy_from_slice(b"XMP Data");
        let mut wrong_auth = netscape(0);
        wrong_auth[11..14].copy_from_slice(b"1.0");
        let mut wrong_subblock_size = netscape(0);
        wrong_subblock_size[14] = 0x05;
        let mut wrong_subblock_id = netscape(0);
        wrong_subblock_id[15] = 0x02;
        let mut no_terminator = netscape(0);
        no_terminator[18] = 0x01;

        let cases = [
            (wrong_size, ParseError::ApplicationExtensionSizeMismatch),
            (wrong_identifier, ParseError::NotANetscapeExtension),
            (wrong_auth, ParseError::NotANetscape20Extension),
            (wrong_subblock_size, ParseError::IncorrectNetscapeSubblockSize),
            (wrong_subblock_id, ParseError::IncorrectNetscapeSubblockId),
            (no_terminator, ParseError::NetscapeNullMissing),
        ];
        for (block, expected) in cases {
            let data = gif(&[&block, FRAME, &[0x3B]]);
            let (result, _) = run(GifParserConfig::default(), &data);
            assert_eq!(result, Err(expected));
        }
    }

    #[test]
    fn test_netscape_truncated_after_header() {
        let block = netscape(3);
        let data = gif(&[&block[..16]]);
        let (result, _) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Err(ParseError::ReadPastBuffer));
    }

    #[test]
    fn test_comment_and_plain_text_skipped() {
        let comment: &[u8] = &[0x21, 0xFE, 0x03, b'h', b'e', b'y', 0x00];
        let text: &[u8] = &[0x21, 0x01, 0x02, 0xAA, 0xBB, 0x01, 0xCC, 0x00];
        let data = gif(&[comment, text, FRAME, &[0x3B]]);
        let (result, details) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Ok(0));
        assert_eq!(details.frames.len(), 1);
    }

    #[test]
    fn test_comment_truncated() {
        let comment: &[u8] = &[0x21, 0xFE, 0x09, b'h', b'i'];
        let data = gif(&[comment]);
        let (result, _) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Err(ParseError::ReadPastBuffer));
    }

    #[test]
    fn test_unknown_extension() {
        let data = gif(&[&[0x21, 0x99, 0x00]]);
        let (result, _) = run(GifParserConfig::default(), &data);
        assert_eq!(result, Err(ParseError::UnknownExtension));
    }
}
