//! Batch-grown frame storage.

use crate::alloc::Allocator;
use crate::details::Frame;
use crate::ParseError;

/// Frame records are reserved this many at a time.
pub const FRAME_BATCH_SIZE: usize = 10;

/// Index-addressed, amortized-growth collection of frame records.
///
/// `capacity` is the number of slots reserved through the allocator, which is
/// always a multiple of [`FRAME_BATCH_SIZE`]. The logical length never
/// exceeds it.
#[derive(Debug, Default)]
pub struct FrameVec<'a> {
    frames: Vec<Frame<'a>>,
    capacity: usize,
}

impl<'a> FrameVec<'a> {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Frame<'a>> {
        self.frames.get(index)
    }

    pub fn as_slice(&self) -> &[Frame<'a>] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame<'a>> {
        self.frames.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Frame<'a>> {
        self.frames.iter_mut()
    }

    /// Drop a trailing slot that was opened but never completed.
    pub(crate) fn truncate_unfinished(&mut self, finished: usize) {
        self.frames.truncate(finished);
    }

    pub(crate) fn into_storage(self) -> Vec<Frame<'a>> {
        self.frames
    }

    /// Make sure slot `index` exists and return it.
    ///
    /// Indices must arrive in stream order: `index` is either the next new
    /// slot or the slot most recently opened (a graphics control extension
    /// opens a slot that the following image descriptor completes). Anything
    /// else is a bug in the caller and panics.
    ///
    /// When `index` reaches the reserved capacity another batch is requested
    /// from `allocator`. A refused first batch is
    /// [`ParseError::AllocationFailed`]; a refused growth is
    /// [`ParseError::ReallocationFailed`] and leaves the existing frames in
    /// place so they can still be inspected and released.
    pub(crate) fn ensure_frame<A: Allocator>(
        &mut self,
        index: usize,
        allocator: &mut A,
    ) -> Result<&mut Frame<'a>, ParseError> {
        assert!(
            index <= self.capacity,
            "frame index {index} skips past capacity {}",
            self.capacity
        );

        if index == self.capacity {
            let fresh = self.capacity == 0;
            allocator
                .reserve(&mut self.frames, FRAME_BATCH_SIZE)
                .map_err(|_| {
                    if fresh {
                        ParseError::AllocationFailed
                    } else {
                        ParseError::ReallocationFailed
                    }
                })?;
            self.capacity += FRAME_BATCH_SIZE;
        }

        let len = self.frames.len();
        if index == len {
            self.frames.push(Frame::default());
        } else {
            assert!(
                index + 1 == len,
                "frame index {index} out of order with {len} frames"
            );
        }

        Ok(&mut self.frames[index])
    }
}

impl<'a, 'b> IntoIterator for &'b FrameVec<'a> {
    type Item = &'b Frame<'a>;
    type IntoIter = std::slice::Iter<'b, Frame<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
