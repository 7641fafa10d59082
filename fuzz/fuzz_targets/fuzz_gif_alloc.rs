#![no_main]

use gif_harden::{AllocFailure, Allocator, GifDetails, GifParser, GifParserConfig};
use libfuzzer_sys::fuzz_target;

/// Refuses every request after a budget taken from the input, and counts
/// what is still held so teardown can be checked.
struct BudgetAllocator {
    budget: usize,
    live: isize,
}

impl Allocator for BudgetAllocator {
    fn reserve<T>(&mut self, storage: &mut Vec<T>, additional: usize) -> Result<(), AllocFailure> {
        if self.budget == 0 {
            return Err(AllocFailure);
        }
        self.budget -= 1;
        let fresh = storage.capacity() == 0;
        storage.try_reserve_exact(additional).map_err(|_| AllocFailure)?;
        if fresh {
            self.live += 1;
        }
        Ok(())
    }

    fn release<T>(&mut self, storage: Vec<T>) {
        if storage.capacity() != 0 {
            self.live -= 1;
        }
    }
}

// Fuzz target for allocation failure handling
// First byte is the allocation budget, the rest is the GIF.
fuzz_target!(|data: &[u8]| {
    let Some((&budget, gif)) = data.split_first() else {
        return;
    };
    let allocator = BudgetAllocator { budget: usize::from(budget), live: 0 };
    let mut parser = GifParser::with_allocator(GifParserConfig::default(), allocator);
    let mut details = GifDetails::new();
    let _ = parser.parse(gif, &mut details);
    parser.free_details(&mut details);
    assert_eq!(parser.allocator().live, 0);
});
