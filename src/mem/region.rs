/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Page aligned memory regions with in place growth.
//!
//! A tag owns a list of regions. Each region is a
//! contiguous mapping (anonymous mmap, or a heap buffer
//! when configured) with a bump cursor. When a request does
//! not fit, the allocator first tries to grow an existing
//! region without moving it -- on Linux via mremap with
//! moves forbidden -- and only then maps a fresh region.
//!
//! Once handed out, bytes in an mmap backed region never
//! move until the tag is released or reset. The streaming
//! reader leans on this to keep token slices valid while
//! the buffer keeps growing.

use bitflags::bitflags;
use memmap2::MmapMut;

use crate::mem::{
    bitset::{align_up, IdBitSet},
    stats::ArenaStats,
    Arena, ArenaConfig, MemError, MemRef, MemResult, RegionBacking, Tag,
};

const PAGE: usize = 4096;
const MAX_TAGS: usize = 64;
const ALLOC_ALIGN: usize = 8;

bitflags! {
    /// Per region state bits
    #[derive(Default)]
    struct RegionFlags: u8 {
        /// No further allocations will be served from this region
        const FULL      = 0b0000_0001;
        /// In place growth already failed, don't retry
        const CANT_GROW = 0b0000_0010;
        /// A grow attempt is underway
        const GROWING   = 0b0000_0100;
    }
}

/// Arena of growable page aligned regions
#[derive(Debug)]
pub struct RegionArena
{
    config:  ArenaConfig,
    tag_ids: IdBitSet,
    tags:    Vec<Option<TagRegions>>,
}

#[derive(Debug)]
struct TagRegions
{
    regions:     Vec<Region>,
    next_region: usize,
    stats:       ArenaStats,
}

struct Region
{
    map:    Mapping,
    /// Usable bytes; may lag behind the mapping's size when
    /// a balloon reserve is held
    limit:  usize,
    cursor: usize,
    flags:  RegionFlags,
}

enum Mapping
{
    Anon(MmapMut),
    Heap(Vec<u8>),
}

impl Mapping
{
    fn with_size(backing: RegionBacking, size: usize) -> MemResult<Self>
    {
        let size = align_up(size.max(PAGE), PAGE);

        match backing
        {
            RegionBacking::MmapAnon => MmapMut::map_anon(size)
                .map(Self::Anon)
                .map_err(|_| MemError::Exhausted),
            RegionBacking::Heap => Ok(Self::Heap(vec![0; size])),
        }
    }

    fn size(&self) -> usize
    {
        match self
        {
            Self::Anon(map) => map.len(),
            Self::Heap(buf) => buf.len(),
        }
    }

    fn bytes(&self) -> &[u8]
    {
        match self
        {
            Self::Anon(map) => &map[..],
            Self::Heap(buf) => &buf[..],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8]
    {
        match self
        {
            Self::Anon(map) => &mut map[..],
            Self::Heap(buf) => &mut buf[..],
        }
    }

    /// Resize the mapping without moving its base address.
    /// Fails when the platform (or neighboring mappings)
    /// cannot satisfy that
    fn resize_in_place(&mut self, new_size: usize) -> MemResult<()>
    {
        match self
        {
            Self::Anon(map) =>
            {
                cfg_if::cfg_if! {
                    if #[cfg(target_os = "linux")]
                    {
                        use memmap2::RemapOptions;

                        // Safety: no live borrows of the mapping escape
                        // this allocator except through resolve(),
                        // whose callers are bound by the tag lifecycle;
                        // with moves forbidden the base address (and
                        // thus every outstanding slice) stays valid
                        unsafe {
                            map.remap(new_size, RemapOptions::new().may_move(false))
                                .map_err(|_| MemError::Exhausted)
                        }
                    }
                    else
                    {
                        let _ = (map, new_size);

                        Err(MemError::Exhausted)
                    }
                }
            },
            Self::Heap(buf) =>
            {
                // A heap buffer can always "grow", at the cost of a
                // possible move; callers that need address stability
                // must configure MmapAnon
                buf.resize(new_size, 0);

                Ok(())
            },
        }
    }
}

impl std::fmt::Debug for Region
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Region")
            .field("size", &self.map.size())
            .field("limit", &self.limit)
            .field("cursor", &self.cursor)
            .field("flags", &self.flags)
            .finish()
    }
}

impl Region
{
    fn new(backing: RegionBacking, limit: usize, reserve: usize) -> MemResult<Self>
    {
        let map = Mapping::with_size(backing, limit.max(reserve))?;
        let limit = align_up(limit.max(PAGE), PAGE).min(map.size());

        Ok(Self {
            map,
            limit,
            cursor: 0,
            flags: RegionFlags::default(),
        })
    }

    fn remaining(&self) -> usize
    {
        self.limit - align_up(self.cursor, ALLOC_ALIGN).min(self.limit)
    }

    fn fits(&self, size: usize) -> bool
    {
        !self.flags.contains(RegionFlags::FULL) && self.remaining() >= size
    }

    fn bump(&mut self, size: usize) -> usize
    {
        let start = align_up(self.cursor, ALLOC_ALIGN);
        self.cursor = start + size;

        start
    }

    /// Attempt to grow this region to fit .size more bytes,
    /// at most doubling it
    fn grow(&mut self, size: usize) -> bool
    {
        if self
            .flags
            .intersects(RegionFlags::CANT_GROW | RegionFlags::GROWING)
        {
            return false;
        }

        let needed = align_up(self.cursor, ALLOC_ALIGN) + size;
        let doubled = self.limit * 2;

        // Growth past doubling is not worth it, a new region
        // will serve the request better
        if needed > doubled
        {
            return false;
        }

        self.flags.insert(RegionFlags::GROWING);

        // The balloon reserve may already cover the target
        let grown = if doubled <= self.map.size()
        {
            true
        }
        else
        {
            self.map.resize_in_place(doubled).is_ok()
        };

        match grown
        {
            true => self.limit = doubled.min(self.map.size()),
            false => self.flags.insert(RegionFlags::CANT_GROW),
        }

        self.flags.remove(RegionFlags::GROWING);

        grown
    }
}

impl RegionArena
{
    pub fn new(config: ArenaConfig) -> Self
    {
        Self {
            config,
            tag_ids: IdBitSet::with_capacity(MAX_TAGS),
            tags: Vec::new(),
        }
    }

    pub fn with_backing(backing: RegionBacking) -> Self
    {
        Self::new(ArenaConfig {
            backing,
            ..ArenaConfig::default()
        })
    }

    fn tag_regions(&mut self, tag: Tag) -> MemResult<&mut TagRegions>
    {
        self.tags
            .get_mut(tag as usize)
            .and_then(Option::as_mut)
            .ok_or(MemError::UnknownTag)
    }

    /// Locate (or create) a region able to serve .size
    /// bytes, returning its index
    fn region_for(&mut self, tag: Tag, size: usize) -> MemResult<usize>
    {
        let config = self.config.clone();
        let state = self.tag_regions(tag)?;

        // Dedicated region for big allocations, sized to fit
        // and immediately full
        if size >= config.big_alloc_threshold
        {
            let mut region = Region::new(config.backing, size, 0)?;
            region.flags.insert(RegionFlags::FULL);

            state.regions.push(region);

            return Ok(state.regions.len() - 1);
        }

        // 1. A region with room wins outright
        if let Some(index) = state.regions.iter().position(|r| r.fits(size))
        {
            return Ok(index);
        }

        // 2. Otherwise try to grow one in place
        if let Some(index) = state.regions.iter().position(|r| {
            !r.flags
                .intersects(RegionFlags::FULL | RegionFlags::CANT_GROW)
        })
        {
            if state.regions[index].grow(size)
            {
                return Ok(index);
            }
        }

        // 3. Otherwise map a fresh region
        let mut next = state.next_region;

        while next < size + ALLOC_ALIGN
        {
            next = next.saturating_mul(config.grow_ratio.max(2));
        }

        next = align_up(next.max(config.minimum_region), PAGE);

        let region = Region::new(config.backing, next, 0)?;

        state.next_region = next.saturating_mul(config.grow_ratio.max(2));
        state.regions.push(region);

        Ok(state.regions.len() - 1)
    }

    fn mark_if_drained(&mut self, tag: Tag, index: usize)
    {
        let threshold = self.config.empty_threshold;

        if let Ok(state) = self.tag_regions(tag)
        {
            let region = &mut state.regions[index];

            if region.remaining() < threshold
                && region.flags.contains(RegionFlags::CANT_GROW)
            {
                region.flags.insert(RegionFlags::FULL);
            }
        }
    }
}

impl Arena for RegionArena
{
    fn acquire_tag(&mut self) -> MemResult<Tag>
    {
        let mut state = TagRegions {
            regions:     Vec::new(),
            next_region: self.config.initial_region.max(PAGE),
            stats:       ArenaStats::default(),
        };

        // Balloon: reserve a larger mapping up front but only
        // use the first slice of it, so growth stays in place
        if self.config.balloon_ratio > 0
        {
            let limit = self.config.initial_region.max(PAGE);
            let reserve = limit.saturating_mul(self.config.balloon_ratio);

            state
                .regions
                .push(Region::new(self.config.backing, limit, reserve)?);
            state.next_region = limit.saturating_mul(self.config.grow_ratio.max(2));
        }

        let id = self.tag_ids.alloc().ok_or(MemError::Exhausted)?;

        if self.tags.len() <= id
        {
            self.tags.resize_with(id + 1, || None);
        }

        self.tags[id] = Some(state);

        Ok(id as Tag)
    }

    fn release_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        match self.tags.get_mut(tag as usize).and_then(Option::take)
        {
            Some(_) =>
            {
                self.tag_ids.free(tag as usize);

                Ok(())
            },
            None => Err(MemError::UnknownTag),
        }
    }

    fn reset_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        let initial = self.config.initial_region.max(PAGE);
        let state = self.tag_regions(tag)?;

        state.regions.clear();
        state.next_region = initial;
        state.stats = ArenaStats::default();

        Ok(())
    }

    fn trim_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        let state = self.tag_regions(tag)?;

        for region in &mut state.regions
        {
            let keep = align_up(region.cursor.max(1), PAGE);

            if keep < region.map.size()
            {
                // Shrinking never moves; failures just leave the
                // tail mapped
                let _ = region.map.resize_in_place(keep);
                region.limit = region.limit.min(region.map.size());
            }
        }

        Ok(())
    }

    fn store(&mut self, tag: Tag, bytes: &[u8]) -> MemResult<MemRef>
    {
        self.storev(tag, &[bytes])
    }

    fn storev(&mut self, tag: Tag, parts: &[&[u8]]) -> MemResult<MemRef>
    {
        let total: usize = parts.iter().map(|p| p.len()).sum();

        let index = self.region_for(tag, total)?;
        let state = self.tag_regions(tag)?;

        let start = state.regions[index].bump(total);

        let mut at = start;
        for part in parts
        {
            state.regions[index].map.bytes_mut()[at..at + part.len()].copy_from_slice(part);
            at += part.len();
        }

        state.stats.record_alloc(total);

        self.mark_if_drained(tag, index);

        Ok(MemRef::direct(tag, ((index as u64) << 32) | start as u64, total))
    }

    fn release(&mut self, handle: MemRef) -> MemResult<()>
    {
        let state = self.tag_regions(handle.tag())?;

        // Regions are bump allocated; space returns at tag
        // release or reset
        state.stats.record_free(handle.len());

        Ok(())
    }

    fn resolve(&self, handle: &MemRef) -> MemResult<&[u8]>
    {
        let index = (handle.raw() >> 32) as usize;
        let start = (handle.raw() & 0xFFFF_FFFF) as usize;

        let region = self
            .tags
            .get(handle.tag() as usize)
            .and_then(Option::as_ref)
            .and_then(|t| t.regions.get(index))
            .ok_or(MemError::UnknownRef)?;

        if start + handle.len() > region.cursor
        {
            return Err(MemError::UnknownRef);
        }

        Ok(&region.map.bytes()[start..start + handle.len()])
    }

    fn stats(&self, tag: Tag) -> MemResult<ArenaStats>
    {
        self.tags
            .get(tag as usize)
            .and_then(Option::as_ref)
            .map(|t| t.stats)
            .ok_or(MemError::UnknownTag)
    }

    fn info(&self) -> String
    {
        let regions: usize = self
            .tags
            .iter()
            .flatten()
            .map(|t| t.regions.len())
            .sum();

        format!(
            "mremap(tags: {}, regions: {})",
            self.tag_ids.count_used(),
            regions
        )
    }
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::*;

    fn small_config(backing: RegionBacking) -> ArenaConfig
    {
        ArenaConfig {
            backing,
            initial_region: PAGE,
            minimum_region: PAGE,
            big_alloc_threshold: 64 * 1024,
            ..ArenaConfig::default()
        }
    }

    #[test]
    fn store_and_resolve_mmap()
    {
        let mut arena = RegionArena::new(small_config(RegionBacking::MmapAnon));
        let tag = arena.acquire_tag().unwrap();

        let a = arena.store(tag, b"over the mountain").unwrap();
        let b = arena.store(tag, b"and through the woods").unwrap();

        assert_eq!(arena.resolve(&a).unwrap(), b"over the mountain");
        assert_eq!(arena.resolve(&b).unwrap(), b"and through the woods");
    }

    #[test]
    fn store_and_resolve_heap()
    {
        let mut arena = RegionArena::new(small_config(RegionBacking::Heap));
        let tag = arena.acquire_tag().unwrap();

        let handle = arena.storev(tag, &[b"hel", b"lo"]).unwrap();

        assert_eq!(arena.resolve(&handle).unwrap(), b"hello");
    }

    #[test]
    fn spills_into_new_regions()
    {
        let mut arena = RegionArena::new(small_config(RegionBacking::Heap));
        let tag = arena.acquire_tag().unwrap();

        // Push well past the first region's size
        let mut handles = Vec::new();
        for i in 0..64
        {
            let payload = vec![i as u8; 1024];
            handles.push((arena.store(tag, &payload).unwrap(), payload));
        }

        // Every payload remains resolvable afterwards
        for (handle, payload) in &handles
        {
            assert_eq!(arena.resolve(handle).unwrap(), &payload[..]);
        }
    }

    #[test]
    fn big_allocations_get_own_region()
    {
        let mut arena = RegionArena::new(ArenaConfig {
            big_alloc_threshold: 8 * 1024,
            ..small_config(RegionBacking::Heap)
        });
        let tag = arena.acquire_tag().unwrap();

        let big = vec![0xEE; 32 * 1024];
        let handle = arena.store(tag, &big).unwrap();

        assert_eq!(arena.resolve(&handle).unwrap(), &big[..]);
    }

    #[test]
    fn balloon_reserves_ahead()
    {
        let mut arena = RegionArena::new(ArenaConfig {
            balloon_ratio: 4,
            ..small_config(RegionBacking::MmapAnon)
        });
        let tag = arena.acquire_tag().unwrap();

        // Fill past the initial limit; the balloon lets the
        // region grow without moving
        for _ in 0..6
        {
            arena.store(tag, &[0xAA; 1024]).unwrap();
        }

        let state = arena.tags[tag as usize].as_ref().unwrap();

        assert_eq!(state.regions.len(), 1);
    }

    #[test]
    fn release_tag_invalidates()
    {
        let mut arena = RegionArena::new(small_config(RegionBacking::Heap));
        let tag = arena.acquire_tag().unwrap();

        let handle = arena.store(tag, b"gone soon").unwrap();

        arena.release_tag(tag).unwrap();

        assert_eq!(arena.resolve(&handle), Err(MemError::UnknownRef));
    }

    #[test]
    fn trim_keeps_contents()
    {
        let mut arena = RegionArena::new(ArenaConfig {
            balloon_ratio: 8,
            ..small_config(RegionBacking::MmapAnon)
        });
        let tag = arena.acquire_tag().unwrap();

        let handle = arena.store(tag, b"sticky bytes").unwrap();

        arena.trim_tag(tag).unwrap();

        assert_eq!(arena.resolve(&handle).unwrap(), b"sticky bytes");
    }

    #[test]
    fn stats_accumulate()
    {
        let mut arena = RegionArena::new(small_config(RegionBacking::Heap));
        let tag = arena.acquire_tag().unwrap();

        arena.store(tag, &[0; 100]).unwrap();
        arena.store(tag, &[0; 28]).unwrap();

        let stats = arena.stats(tag).unwrap();

        assert_eq!(stats.allocs, 2);
        assert_eq!(stats.alloc_bytes, 128);
    }
}
