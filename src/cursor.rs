//! Bounds-checked reading over the input buffer.
//!
//! Every checked read either advances the cursor and succeeds, or leaves the
//! cursor where it was and reports [`OutOfBounds`]. Nothing here can read past
//! the end of the slice it was built from.

/// A checked read found fewer bytes remaining than it needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds;

/// Outcome of comparing upcoming input against a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    OutOfBounds,
}

/// Read position over a borrowed input buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Offset of the next unread byte from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The whole buffer this cursor walks, independent of position.
    pub fn buffer(&self) -> &'a [u8] {
        self.data
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        let byte = *self.data.get(self.pos).ok_or(OutOfBounds)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_le_u16(&mut self) -> Result<u16, OutOfBounds> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn skip(&mut self, count: usize) -> Result<(), OutOfBounds> {
        self.take(count).map(|_| ())
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn take(&mut self, count: usize) -> Result<&'a [u8], OutOfBounds> {
        if self.remaining() < count {
            return Err(OutOfBounds);
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    /// Compare the next `expected.len()` bytes against `expected`.
    ///
    /// When enough input remains the bytes are consumed whatever the outcome
    /// of the comparison, so a caller that continues after `NotEqual` is
    /// already positioned past the field.
    pub fn compare(&mut self, expected: &[u8]) -> Comparison {
        match self.take(expected.len()) {
            Ok(bytes) if bytes == expected => Comparison::Equal,
            Ok(_) => Comparison::NotEqual,
            Err(OutOfBounds) => Comparison::OutOfBounds,
        }
    }

    /// Read a 3-byte RGB triplet as `0x00RRGGBB`.
    ///
    /// Unchecked: the caller must already have verified that three bytes
    /// remain. Used only inside loops bounded by a check on the whole table.
    pub fn read_rgb_triplet(&mut self) -> u32 {
        debug_assert!(self.remaining() >= 3);
        let rgb = &self.data[self.pos..self.pos + 3];
        self.pos += 3;
        u32::from(rgb[0]) << 16 | u32::from(rgb[1]) << 8 | u32::from(rgb[2])
    }
}
