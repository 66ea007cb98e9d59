//! Paged linear memory with a first-fit allocator.

use std::collections::BTreeMap;

use zeroize::Zeroize;

use super::Pointer;

/// Size of one memory page (64 KiB).
pub const PAGE_SIZE: usize = 64 * 1024;
/// Alignment of every allocation.
pub const ALIGN: usize = std::mem::align_of::<u64>();
/// Largest addressable memory, in pages (4 GiB).
pub const MAX_PAGES: usize = 1 << 16;

/// A growable byte buffer that hands out aligned regions by offset.
///
/// Offset 0 is never allocated so that it can serve as null.
#[derive(Debug)]
pub struct LinearMemory {
    bytes: Vec<u8>,
    max_pages: usize,
    /// offset -> length, coalesced
    free: BTreeMap<usize, usize>,
    /// offset -> rounded length
    live: BTreeMap<usize, usize>,
    high_water: usize,
}

impl LinearMemory {
    pub fn new(initial_pages: usize, max_pages: usize) -> Self {
        let max_pages = max_pages.clamp(1, MAX_PAGES);
        let initial_pages = initial_pages.clamp(1, max_pages);

        let mut memory = Self {
            bytes: vec![0; initial_pages * PAGE_SIZE],
            max_pages,
            free: BTreeMap::new(),
            live: BTreeMap::new(),
            high_water: ALIGN,
        };
        memory.insert_free(ALIGN, memory.bytes.len() - ALIGN);
        memory
    }

    pub fn pages(&self) -> usize {
        self.bytes.len() / PAGE_SIZE
    }

    /// Bytes currently handed out, after rounding.
    pub fn in_use(&self) -> usize {
        self.live.values().sum()
    }

    /// Highest offset ever handed out.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn allocate(&mut self, size: usize) -> Option<Pointer> {
        let rounded = round_up(size)?;

        let offset = match self.first_fit(rounded) {
            Some(offset) => offset,
            None => {
                self.grow_for(rounded)?;
                self.first_fit(rounded)?
            }
        };
        let ptr = Pointer::new(u32::try_from(offset).ok()?);

        let len = self.free.remove(&offset)?;
        if len > rounded {
            self.free.insert(offset + rounded, len - rounded);
        }
        self.live.insert(offset, rounded);
        self.high_water = self.high_water.max(offset + rounded);

        Some(ptr)
    }

    /// Returns a region to the free list, zeroing it first.
    ///
    /// `size` must be the size the region was allocated with.
    pub fn deallocate(&mut self, ptr: Pointer, size: usize) -> Result<(), String> {
        let offset = ptr.offset();
        let rounded = round_up(size).ok_or_else(|| format!("invalid deallocation size {size}"))?;

        match self.live.get(&offset) {
            Some(&len) if len == rounded => {}
            Some(&len) => {
                return Err(format!(
                    "deallocate of {size} bytes at {ptr}, but {len} bytes were allocated"
                ));
            }
            None => return Err(format!("deallocate of unknown region at {ptr}")),
        }

        self.live.remove(&offset);
        self.bytes[offset..offset + rounded].zeroize();
        self.insert_free(offset, rounded);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn get(&self, ptr: Pointer, len: usize) -> Option<&[u8]> {
        let start = ptr.offset();
        self.bytes.get(start..start.checked_add(len)?)
    }

    pub fn get_mut(&mut self, ptr: Pointer, len: usize) -> Option<&mut [u8]> {
        let start = ptr.offset();
        self.bytes.get_mut(start..start.checked_add(len)?)
    }

    fn first_fit(&self, rounded: usize) -> Option<usize> {
        self.free
            .iter()
            .find(|&(_, &len)| len >= rounded)
            .map(|(&offset, _)| offset)
    }

    /// Adds enough pages that a block of `rounded` bytes fits at the end.
    fn grow_for(&mut self, rounded: usize) -> Option<()> {
        let end = self.bytes.len();
        let tail = self
            .free
            .range(..end)
            .next_back()
            .filter(|&(&offset, &len)| offset + len == end)
            .map_or(0, |(_, &len)| len);

        let pages = rounded.saturating_sub(tail).div_ceil(PAGE_SIZE);
        if self.pages() + pages > self.max_pages {
            log::debug!(
                "linear memory exhausted: need {pages} more pages, {} of {} in use",
                self.pages(),
                self.max_pages
            );
            return None;
        }

        self.bytes.resize(end + pages * PAGE_SIZE, 0);
        self.insert_free(end, pages * PAGE_SIZE);
        Some(())
    }

    fn insert_free(&mut self, mut offset: usize, mut len: usize) {
        if let Some((&prev, &prev_len)) = self.free.range(..offset).next_back() {
            if prev + prev_len == offset {
                self.free.remove(&prev);
                offset = prev;
                len += prev_len;
            }
        }
        if let Some(next_len) = self.free.remove(&(offset + len)) {
            len += next_len;
        }
        self.free.insert(offset, len);
    }
}

fn round_up(size: usize) -> Option<usize> {
    size.max(1).checked_next_multiple_of(ALIGN)
}
