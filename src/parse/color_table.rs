use crate::alloc::Allocator;
use crate::cursor::Cursor;
use crate::details::ColorTable;
use crate::ParseError;

/// Bytes per palette entry on the wire.
const BYTES_PER_COLOR: usize = 3;

/// Number of entries for a 3-bit size exponent: `2^(size + 1)`.
pub(crate) fn color_count(size: u8) -> usize {
    debug_assert!(size < 8);
    2usize << (size & 0b111)
}

/// Read a color table of `2^(size + 1)` RGB triplets.
///
/// The full table length is checked before anything is allocated, and the
/// allocation is made before anything is consumed, so a failure leaves both
/// the cursor and the allocator untouched beyond the refused request.
pub(crate) fn read_color_table<A: Allocator>(
    cursor: &mut Cursor<'_>,
    size: u8,
    allocator: &mut A,
) -> Result<ColorTable, ParseError> {
    let count = color_count(size);
    if cursor.remaining() < count * BYTES_PER_COLOR {
        return Err(ParseError::ReadPastBuffer);
    }

    let mut entries = Vec::new();
    allocator
        .reserve(&mut entries, count)
        .map_err(|_| ParseError::AllocationFailed)?;

    for _ in 0..count {
        entries.push(cursor.read_rgb_triplet());
    }

    Ok(ColorTable(entries))
}
