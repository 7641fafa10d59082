//! Injected allocation capability.
//!
//! The parser never grows its own storage directly: every color table and
//! every batch of frame records is reserved through an [`Allocator`] handed in
//! by the caller, and teardown hands each allocation back through the same
//! object. This keeps allocation failure a reportable parse outcome rather
//! than an abort, and lets callers put a budget on untrusted input.

/// The allocator refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocFailure;

/// Grow-or-allocate and release hooks used by the parser.
///
/// Storage with zero capacity is a fresh allocation; anything else is a
/// growth of an existing one. On failure `storage` must be left untouched so
/// the caller still owns its previous contents.
pub trait Allocator {
    /// Make room for at least `additional` more elements in `storage`.
    fn reserve<T>(&mut self, storage: &mut Vec<T>, additional: usize) -> Result<(), AllocFailure> {
        storage.try_reserve_exact(additional).map_err(|_| AllocFailure)
    }

    /// Give back an allocation previously obtained through [`Allocator::reserve`].
    fn release<T>(&mut self, storage: Vec<T>) {
        drop(storage);
    }
}

/// Allocator backed by the global heap with fallible reservation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {}

impl<A: Allocator> Allocator for &mut A {
    fn reserve<T>(&mut self, storage: &mut Vec<T>, additional: usize) -> Result<(), AllocFailure> {
        (**self).reserve(storage, additional)
    }

    fn release<T>(&mut self, storage: Vec<T>) {
        (**self).release(storage);
    }
}
