//! Slab Object Pool
//!
//! Fixed-size slots for transient hot-path objects (ticks, order records).
//! Storage grows one block at a time and is reused through a LIFO free list,
//! so a `destroy` followed by a `construct` lands in the same slot without
//! touching the allocator.
//!
//! Handles are `(index, generation)` pairs. Destroying a slot bumps its
//! generation, turning use-after-destroy and double-destroy into a checked
//! [`PoolError::StaleHandle`] instead of undefined behaviour.
//!
//! The pool is single-writer: every mutation takes `&mut self`. Share it
//! across threads by wrapping it in a [`SpinLock`](crate::sync::SpinLock).
//!
//! # Example
//! ```
//! use yz_core::perf::pools::ObjectPool;
//!
//! let mut pool = ObjectPool::<u64>::new();
//! let h = pool.construct(42).unwrap();
//! *pool.get_mut(h).unwrap() += 1;
//! assert_eq!(pool.destroy(h).unwrap(), 43);
//! assert!(pool.get(h).is_err());
//! ```

use crate::core::PoolError;

/// Default number of slots per block
pub const BLOCK_SLOTS: usize = 64;

/// Non-owning handle to a live pool object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    /// Slot index (stable for the lifetime of the object)
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn stale(&self) -> PoolError {
        PoolError::StaleHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

struct Block<T> {
    /// `None` once the block's storage has been released
    slots: Option<Box<[Option<T>]>>,
    /// Survives release so old handles stay stale after regrowth
    generations: Box<[u32]>,
    live: usize,
}

/// Slab allocator with generational handles
pub struct ObjectPool<T> {
    blocks: Vec<Block<T>>,
    free: Vec<u32>,
    block_slots: usize,
    max_slots: Option<usize>,
    in_use: usize,
    backed_blocks: usize,
    backed_slots: usize,
}

impl<T> ObjectPool<T> {
    /// Unbounded pool with [`BLOCK_SLOTS`]-slot blocks. Allocates nothing yet.
    pub fn new() -> Self {
        Self::with_limits(BLOCK_SLOTS, None)
    }

    /// Pool with a custom block size and an optional cap on allocated slots
    ///
    /// The block that reaches `max_slots` is cut short; growth past it fails
    /// with [`PoolError::Exhausted`].
    pub fn with_limits(block_slots: usize, max_slots: Option<usize>) -> Self {
        Self {
            blocks: Vec::new(),
            free: Vec::new(),
            block_slots: block_slots.max(1),
            max_slots,
            in_use: 0,
            backed_blocks: 0,
            backed_slots: 0,
        }
    }

    /// Build `value` into a free slot, growing by one block if none is free
    #[inline]
    pub fn construct(&mut self, value: T) -> Result<PoolHandle, PoolError> {
        self.construct_with(|| value)
    }

    /// Build the object in place from `init`
    #[inline]
    pub fn construct_with<F>(&mut self, init: F) -> Result<PoolHandle, PoolError>
    where
        F: FnOnce() -> T,
    {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.grow()?;
                self.free.pop().ok_or_else(|| self.exhausted())?
            }
        };

        let (b, s) = self.locate(index);
        let block = &mut self.blocks[b];
        if let Some(slots) = block.slots.as_mut() {
            debug_assert!(slots[s].is_none(), "free list handed out a live slot");
            slots[s] = Some(init());
            block.live += 1;
            self.in_use += 1;
            return Ok(PoolHandle {
                index,
                generation: block.generations[s],
            });
        }

        // Free list pointed into a released block
        Err(self.exhausted())
    }

    /// Destroy the object behind `handle`, returning it; the slot becomes free
    /// but its storage is kept
    #[inline]
    pub fn destroy(&mut self, handle: PoolHandle) -> Result<T, PoolError> {
        let (b, s) = self.locate(handle.index);
        let block = self.blocks.get_mut(b).ok_or_else(|| handle.stale())?;
        if block.generations.get(s) != Some(&handle.generation) {
            return Err(handle.stale());
        }
        let value = block
            .slots
            .as_mut()
            .and_then(|slots| slots.get_mut(s))
            .and_then(Option::take)
            .ok_or_else(|| handle.stale())?;

        block.generations[s] = block.generations[s].wrapping_add(1);
        block.live -= 1;
        self.in_use -= 1;
        self.free.push(handle.index);
        Ok(value)
    }

    #[inline]
    pub fn get(&self, handle: PoolHandle) -> Result<&T, PoolError> {
        let (b, s) = self.locate(handle.index);
        self.blocks
            .get(b)
            .filter(|block| block.generations.get(s) == Some(&handle.generation))
            .and_then(|block| block.slots.as_ref())
            .and_then(|slots| slots.get(s))
            .and_then(Option::as_ref)
            .ok_or_else(|| handle.stale())
    }

    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Result<&mut T, PoolError> {
        let (b, s) = self.locate(handle.index);
        self.blocks
            .get_mut(b)
            .filter(|block| block.generations.get(s) == Some(&handle.generation))
            .and_then(|block| block.slots.as_mut())
            .and_then(|slots| slots.get_mut(s))
            .and_then(Option::as_mut)
            .ok_or_else(|| handle.stale())
    }

    /// Whether `handle` refers to a live object
    #[inline]
    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Grow until at least `slots` free slots exist (startup warm-up)
    pub fn reserve(&mut self, slots: usize) -> Result<(), PoolError> {
        while self.free.len() < slots {
            self.grow()?;
        }
        Ok(())
    }

    /// Return the storage of fully free blocks to the allocator
    ///
    /// Blocks holding any live object are left untouched, so every in-use
    /// handle stays valid. Returns the number of slots reclaimed.
    pub fn release(&mut self) -> usize {
        let block_slots = self.block_slots;
        let mut released = Vec::new();
        let mut reclaimed = 0;

        for (b, block) in self.blocks.iter_mut().enumerate() {
            if block.live == 0 {
                if let Some(slots) = block.slots.take() {
                    reclaimed += slots.len();
                    released.push(b);
                }
            }
        }

        if released.is_empty() {
            return 0;
        }

        self.backed_blocks -= released.len();
        self.backed_slots -= reclaimed;
        self.free
            .retain(|&index| !released.contains(&(index as usize / block_slots)));
        reclaimed
    }

    /// Live objects
    #[inline]
    pub fn len(&self) -> usize {
        self.in_use
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    /// Slots currently backed by storage (free + in use)
    #[inline]
    pub fn slots(&self) -> usize {
        self.backed_slots
    }

    /// Free slots backed by storage
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn allocated_blocks(&self) -> usize {
        self.backed_blocks
    }

    pub fn max_slots(&self) -> Option<usize> {
        self.max_slots
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats::from_pool(self)
    }

    #[inline]
    fn locate(&self, index: u32) -> (usize, usize) {
        let index = index as usize;
        (index / self.block_slots, index % self.block_slots)
    }

    fn exhausted(&self) -> PoolError {
        PoolError::Exhausted {
            slots: self.slots(),
            limit: self.max_slots,
        }
    }

    /// Back one more block with storage: a released block first, else a new one
    fn grow(&mut self) -> Result<(), PoolError> {
        let reuse = self.blocks.iter().position(|block| block.slots.is_none());
        let capacity = match reuse {
            Some(b) => self.blocks[b].generations.len(),
            None => self.block_slots,
        };
        let n = match self.max_slots {
            Some(max) => capacity.min(max.saturating_sub(self.backed_slots)),
            None => capacity,
        };
        if n == 0 {
            return Err(self.exhausted());
        }

        let mut storage: Vec<Option<T>> = Vec::new();
        storage
            .try_reserve_exact(n)
            .map_err(|_| self.exhausted())?;
        storage.resize_with(n, || None);
        self.free.try_reserve(n).map_err(|_| self.exhausted())?;

        let b = match reuse {
            Some(b) => {
                self.blocks[b].slots = Some(storage.into_boxed_slice());
                b
            }
            None => {
                let b = self.blocks.len();
                if (b + 1)
                    .checked_mul(self.block_slots)
                    .map_or(true, |end| end > u32::MAX as usize)
                {
                    return Err(self.exhausted());
                }
                self.blocks.try_reserve(1).map_err(|_| self.exhausted())?;
                self.blocks.push(Block {
                    slots: Some(storage.into_boxed_slice()),
                    generations: vec![0; n].into_boxed_slice(),
                    live: 0,
                });
                b
            }
        };

        self.backed_blocks += 1;
        self.backed_slots += n;

        // Reverse so the lowest index is handed out first
        let base = b * self.block_slots;
        self.free.extend((base..base + n).rev().map(|i| i as u32));
        Ok(())
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("in_use", &self.in_use)
            .field("slots", &self.slots())
            .field("free", &self.free.len())
            .field("max_slots", &self.max_slots)
            .finish()
    }
}

/// Pool statistics for monitoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub slots: usize,
    pub in_use: usize,
    pub free: usize,
    pub blocks: usize,
    pub utilization: f64,
}

impl PoolStats {
    /// Create stats from pool
    pub fn from_pool<T>(pool: &ObjectPool<T>) -> Self {
        let slots = pool.slots();
        let capacity = pool.max_slots().unwrap_or(slots);
        let utilization = if capacity == 0 {
            0.0
        } else {
            pool.len() as f64 / capacity as f64
        };

        Self {
            slots,
            in_use: pool.len(),
            free: pool.free_slots(),
            blocks: pool.allocated_blocks(),
            utilization,
        }
    }

    /// Check if pool is near exhaustion (>90% utilized)
    pub fn is_near_exhaustion(&self) -> bool {
        self.utilization > 0.9
    }
}
