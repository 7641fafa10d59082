//! Public API surface for embedding gif_harden as a library.
//!
//! [`GifParser`] is the full-control entry point. The functions here wrap it
//! into a small surface for callers that just want an answer: parse a buffer
//! into owned-by-RAII details, or inspect a buffer or file into a plain
//! summary with metrics recorded along the way.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::details::GifDetails;
use crate::parse::GifParser;
use crate::{GifHardenError, ParseFailure};

/// Successful parse: the details plus the byte count after the trailer.
#[derive(Debug)]
pub struct Parsed<'a> {
    pub details: GifDetails<'a>,
    pub leftover: usize,
}

/// Parse `buffer` with default configuration.
///
/// Everything allocated is dropped with the returned value, or immediately
/// on failure.
pub fn parse(buffer: &[u8]) -> Result<Parsed<'_>, ParseFailure> {
    let mut parser = GifParser::new();
    let mut details = GifDetails::new();
    match parser.parse(buffer, &mut details) {
        Ok(leftover) => Ok(Parsed { details, leftover }),
        Err(error) => Err(ParseFailure {
            error,
            position: parser.take_last_position(),
        }),
    }
}

/// Geometry and timing of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub delay: u16,
    pub interlaced: bool,
    pub local_colors: usize,
    pub compressed_bytes: usize,
}

/// Owned description of a parsed GIF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifSummary {
    pub width: u16,
    pub height: u16,
    pub global_colors: usize,
    pub repeat_count: u16,
    /// Sum of all frame delays, in hundredths of a second.
    pub total_delay: u32,
    pub leftover_bytes: usize,
    pub frames: Vec<FrameSummary>,
}

impl GifSummary {
    fn from_details(details: &GifDetails<'_>, leftover_bytes: usize) -> Self {
        let frames: Vec<FrameSummary> = details
            .frames
            .iter()
            .map(|frame| FrameSummary {
                left: frame.descriptor.left,
                top: frame.descriptor.top,
                width: frame.descriptor.width,
                height: frame.descriptor.height,
                delay: frame.graphic_control.delay,
                interlaced: frame.descriptor.packed.interlace_flag,
                local_colors: frame.local_color_table.as_ref().map_or(0, |t| t.len()),
                compressed_bytes: frame.image_data.data_length(),
            })
            .collect();

        Self {
            width: details.descriptor.canvas_width,
            height: details.descriptor.canvas_height,
            global_colors: details.global_color_table.as_ref().map_or(0, |t| t.len()),
            repeat_count: details.repeat_count,
            total_delay: frames.iter().map(|f| u32::from(f.delay)).sum(),
            leftover_bytes,
            frames,
        }
    }
}

/// Parse `data` and summarize it, recording metrics for the attempt.
pub fn inspect(data: &[u8]) -> Result<GifSummary, GifHardenError> {
    let started = Instant::now();
    let result = parse(data);
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(parsed) => {
            let summary = GifSummary::from_details(&parsed.details, parsed.leftover);
            #[cfg(feature = "metrics")]
            crate::metrics::record_gif_parsed(data.len(), summary.frames.len(), elapsed);
            info!(
                frames = summary.frames.len(),
                width = summary.width,
                height = summary.height,
                elapsed,
                "inspected GIF"
            );
            Ok(summary)
        }
        Err(failure) => {
            #[cfg(feature = "metrics")]
            crate::metrics::record_gif_failed(failure.error);
            Err(failure.into())
        }
    }
}

/// Read a file into memory and [`inspect`] it.
pub fn inspect_file(path: impl AsRef<Path>) -> Result<GifSummary, GifHardenError> {
    let data = std::fs::read(path.as_ref())?;
    inspect(&data)
}

/// Returns the crate version to make it easy to verify the linked build.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseError;

    fn two_frame_gif() -> Vec<u8> {
        let mut data = b"GIF89a\x04\x00\x04\x00\x80\x00\x00".to_vec();
        data.extend_from_slice(&[0, 0, 0, 0xFF, 0xFF, 0xFF]);
        for delay in [10u8, 20] {
            data.extend_from_slice(&[0x21, 0xF9, 0x04, 0x00, delay, 0x00, 0x00, 0x00]);
            data.extend_from_slice(&[0x2C, 0, 0, 0, 0, 4, 0, 4, 0, 0x00]);
            data.extend_from_slice(&[0x02, 0x02, 0x4C, 0x01, 0x00]);
        }
        data.push(0x3B);
        data
    }

    #[test]
    fn test_parse_success() {
        let data = two_frame_gif();
        let parsed = parse(&data).unwrap();
        assert_eq!(parsed.leftover, 0);
        assert_eq!(parsed.details.frames.len(), 2);
    }

    #[test]
    fn test_parse_failure_has_position() {
        let failure = parse(b"GIF89").unwrap_err();
        assert_eq!(failure.error, ParseError::ReadPastBuffer);
        assert_eq!(failure.position, Some(3));
    }

    #[test]
    fn test_inspect_summary() {
        let summary = inspect(&two_frame_gif()).unwrap();
        assert_eq!((summary.width, summary.height), (4, 4));
        assert_eq!(summary.global_colors, 2);
        assert_eq!(summary.total_delay, 30);
        assert_eq!(summary.frames[1].compressed_bytes, 2);
    }

    #[test]
    fn test_inspect_error() {
        let result = inspect(b"not a gif");
        assert!(matches!(
            result,
            Err(GifHardenError::Parse(ParseFailure { error: ParseError::NotAGif, .. }))
        ));
    }

    #[test]
    fn test_inspect_missing_file() {
        let result = inspect_file("/nonexistent/definitely/missing.gif");
        assert!(matches!(result, Err(GifHardenError::IoError(_))));
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
