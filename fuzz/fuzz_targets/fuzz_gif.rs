#![no_main]

use gif_harden::{GifDetails, GifParser, GifParserConfig};
use libfuzzer_sys::fuzz_target;

// Fuzz target for the GIF89a block walker
// Every input must end in Ok or a coded error, never a panic or an
// out-of-bounds read, and both policy settings must agree on offsets.
fuzz_target!(|data: &[u8]| {
    let mut parser = GifParser::new();
    let mut details = GifDetails::new();
    match parser.parse(data, &mut details) {
        Ok(leftover) => {
            assert!(leftover < data.len());
            assert!(!details.frames.is_empty());
            for frame in &details.frames {
                let span = &frame.image_data;
                assert!(span.data_offset() + span.data_length() <= data.len());
                assert_eq!(
                    span.iter().map(<[u8]>::len).sum::<usize>(),
                    span.data_length()
                );
            }
        }
        Err(_) => {
            if let Some(position) = parser.take_last_position() {
                assert!(position <= data.len());
            }
        }
    }

    let mut lenient = GifParser::with_config(GifParserConfig::lenient());
    let mut details = GifDetails::new();
    let _ = lenient.parse(data, &mut details);
    lenient.free_details(&mut details);
    lenient.free_details(&mut details);
});
