// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout},
    cell::Cell,
    fmt, slice, str,
};

/// Default backing size for the driver's scratch arena. Path strings and
/// rendered arguments are tiny; 8 MiB is deliberately oversized so that
/// running out is a programming error, not something to handle.
pub const DEFAULT_CAPACITY: usize = 8 * 1024 * 1024;

/// A bump allocator for cheap throwaway strings, with a constant capacity.
///
/// Allocations advance a monotonically increasing offset into a single
/// pre-sized buffer and are never freed individually: memory is reclaimed
/// wholesale with [`ScratchArena::rewind`] or [`ScratchArena::reset`], both
/// of which take `&mut self` so the borrow checker proves no allocation
/// outlives the point it is reclaimed at. Exceeding the capacity panics.
///
/// NOTE: The allocation functions return borrows of plain bytes/strs, so
/// there is nothing to drop; rewinding simply forgets the memory.
pub struct ScratchArena {
    backing_mem_ptr: *mut u8,
    backing_mem_size: usize,

    allocated: Cell<usize>,
}

/// A saved arena offset, produced by [`ScratchArena::save`]. Rewinding to it
/// releases everything allocated after the save without affecting earlier
/// allocations.
#[derive(Debug, Clone, Copy)]
pub struct ArenaCheckpoint(usize);

impl Drop for ScratchArena {
    fn drop(&mut self) {
        // Safety: backing_mem_ptr is a private field, so the only way to use
        // it is via ScratchArena's API, which only deals out borrows which
        // cannot outlive the arena itself. Since we're in the Drop impl,
        // nobody is using the memory anymore, and the layout is the same one
        // the constructor allocated with.
        unsafe { dealloc(self.backing_mem_ptr, Self::layout(self.backing_mem_size)) };
    }
}

impl Default for ScratchArena {
    fn default() -> ScratchArena {
        ScratchArena::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ScratchArena {
    /// Creates a new [`ScratchArena`] with `capacity` bytes of backing
    /// memory. Aborts the process if the memory cannot be allocated; there is
    /// no recoverable out-of-memory path in the driver.
    pub fn with_capacity(capacity: usize) -> ScratchArena {
        let layout = Self::layout(capacity);
        // Zeroed so that every byte of the buffer is initialized up front;
        // slices handed out after a rewind would otherwise point at
        // uninitialized memory.
        let backing_mem_ptr = unsafe { alloc_zeroed(layout) };
        if backing_mem_ptr.is_null() {
            handle_alloc_error(layout);
        }

        ScratchArena {
            backing_mem_ptr,
            backing_mem_size: capacity,

            allocated: Cell::new(0),
        }
    }

    fn layout(capacity: usize) -> Layout {
        assert!(
            0 < capacity && capacity <= isize::MAX as usize,
            "invalid scratch arena capacity",
        );
        match Layout::from_size_align(capacity, 1) {
            Ok(layout) => layout,
            // The size was checked against isize::MAX above.
            Err(_) => unreachable!(),
        }
    }

    /// Allocates the next `len` bytes, zeroed. Panics if the capacity is
    /// exceeded; size the arena generously instead of handling this.
    pub fn alloc_bytes(&self, len: usize) -> &mut [u8] {
        let offset = self.allocated.get();
        let new_offset = match offset.checked_add(len) {
            Some(end) if end <= self.backing_mem_size => end,
            _ => panic!(
                "scratch arena out of capacity ({} bytes requested, {} of {} in use)",
                len,
                offset,
                self.backing_mem_size,
            ),
        };

        // Advance the offset. `allocated` is in a Cell, so nobody can observe
        // it between the `get()` above and this `set()`; every call hands out
        // a distinct, non-overlapping byte range.
        self.allocated.set(new_offset);

        // Safety: offset + len is within the backing allocation (checked
        // above), and the backing size never exceeds isize::MAX.
        let ptr = unsafe { self.backing_mem_ptr.add(offset) };
        // A previous rewind may have left stale bytes behind; the contract
        // says zeroed.
        unsafe { ptr.write_bytes(0, len) };

        // Safety:
        // - The range is within one allocated object, non-null, aligned
        //   (align is 1), and initialized (zeroed just above).
        // - No other borrow covers this range: the bump offset was advanced
        //   past it, and it is only ever moved back by `rewind`/`reset`,
        //   which take `&mut self` and therefore cannot be called while this
        //   borrow (tied to `&self`) is alive.
        unsafe { slice::from_raw_parts_mut(ptr, len) }
    }

    /// Duplicates `s` into the arena.
    pub fn strdup<'a>(&'a self, s: &str) -> &'a str {
        let bytes = self.alloc_bytes(s.len());
        bytes.copy_from_slice(s.as_bytes());
        // Safety: a verbatim copy of a valid &str is valid UTF-8.
        unsafe { str::from_utf8_unchecked(bytes) }
    }

    /// Formats directly into the arena and returns the result, e.g.
    /// `arena.format(format_args!("{dir}/{name}.spv"))`. No intermediate heap
    /// allocation is made.
    pub fn format<'a>(&'a self, args: fmt::Arguments) -> &'a str {
        let start = self.allocated.get();
        let mut writer = ArenaWriter { arena: self };
        // write_str never returns Err (it panics on capacity overflow), so
        // formatting itself cannot fail.
        let _ = fmt::Write::write_fmt(&mut writer, args);
        let end = self.allocated.get();

        // Safety: the writer's consecutive alloc_bytes calls are contiguous
        // (the bump offset has no alignment gaps for u8), nothing else
        // allocated in between, and each chunk is a valid UTF-8 copy of a
        // &str. The shared reborrow of the range is fine: the &mut slices the
        // writer held are gone.
        let bytes = unsafe { slice::from_raw_parts(self.backing_mem_ptr.add(start), end - start) };
        unsafe { str::from_utf8_unchecked(bytes) }
    }

    /// Returns a checkpoint of the current allocation offset for a later
    /// [`ScratchArena::rewind`].
    pub fn save(&self) -> ArenaCheckpoint {
        ArenaCheckpoint(self.allocated.get())
    }

    /// Releases everything allocated since `checkpoint`. Requiring `&mut
    /// self` is what makes this safe: borrows handed out by the allocation
    /// functions are tied to `&self`, so none of them can still be alive.
    pub fn rewind(&mut self, checkpoint: ArenaCheckpoint) {
        debug_assert!(checkpoint.0 <= self.allocated.get());
        self.allocated.set(checkpoint.0);
    }

    /// Releases everything. Same borrow reasoning as
    /// [`ScratchArena::rewind`].
    pub fn reset(&mut self) {
        self.allocated.set(0);
    }

    /// The amount of currently allocated bytes.
    pub fn allocated(&self) -> usize {
        self.allocated.get()
    }

    /// The total (free and allocated) amount of backing memory, in bytes.
    pub fn capacity(&self) -> usize {
        self.backing_mem_size
    }
}

struct ArenaWriter<'a> {
    arena: &'a ScratchArena,
}

impl fmt::Write for ArenaWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.arena
            .alloc_bytes(s.len())
            .copy_from_slice(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ScratchArena;

    #[test]
    fn strdup_and_format_produce_independent_strings() {
        let arena = ScratchArena::with_capacity(1024);
        let a = arena.strdup("foo.slang");
        let b = arena.format(format_args!("{}/{}.spv", "out/shader_cache", "foo"));
        assert_eq!(a, "foo.slang");
        assert_eq!(b, "out/shader_cache/foo.spv");
        assert_eq!(arena.allocated(), a.len() + b.len());
    }

    #[test]
    fn rewind_releases_everything_since_the_checkpoint() {
        let mut arena = ScratchArena::with_capacity(64);
        let _keep = arena.strdup("keep");
        let checkpoint = arena.save();
        for _ in 0..10 {
            arena.strdup("scratch");
            arena.rewind(checkpoint);
        }
        assert_eq!(arena.allocated(), "keep".len());

        arena.reset();
        assert_eq!(arena.allocated(), 0);
        assert_eq!(arena.strdup("reused"), "reused");
    }

    #[test]
    #[should_panic(expected = "scratch arena out of capacity")]
    fn overflow_is_fatal() {
        let arena = ScratchArena::with_capacity(8);
        arena.strdup("this does not fit in eight bytes");
    }
}
