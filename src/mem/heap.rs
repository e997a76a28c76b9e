/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Per allocation boxed storage with tag scoped
//! bookkeeping.
//!
//! Each allocation lives in its own heap block; every tag
//! tracks its live blocks so releasing the tag frees them
//! all at once. Released slots are recycled through a
//! freelist, keeping handles dense.

use crate::mem::{
    bitset::IdBitSet, stats::ArenaStats, Arena, MemError, MemRef, MemResult, Tag,
};

const MAX_TAGS: usize = 64;

/// An allocator wrapping the system heap, one block per
/// allocation
#[derive(Debug)]
pub struct HeapArena
{
    tag_ids: IdBitSet,
    tags:    Vec<Option<TagBlocks>>,
}

#[derive(Debug, Default)]
struct TagBlocks
{
    blocks:   Vec<Option<Box<[u8]>>>,
    freelist: Vec<u32>,
    stats:    ArenaStats,
}

impl TagBlocks
{
    fn insert(&mut self, block: Box<[u8]>) -> u32
    {
        match self.freelist.pop()
        {
            Some(slot) =>
            {
                self.blocks[slot as usize] = Some(block);

                slot
            },
            None =>
            {
                self.blocks.push(Some(block));

                (self.blocks.len() - 1) as u32
            },
        }
    }
}

impl HeapArena
{
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self
    {
        Self {
            tag_ids: IdBitSet::with_capacity(MAX_TAGS),
            tags:    Vec::new(),
        }
    }

    fn tag_blocks(&mut self, tag: Tag) -> MemResult<&mut TagBlocks>
    {
        self.tags
            .get_mut(tag as usize)
            .and_then(Option::as_mut)
            .ok_or(MemError::UnknownTag)
    }
}

impl Arena for HeapArena
{
    fn acquire_tag(&mut self) -> MemResult<Tag>
    {
        let id = self.tag_ids.alloc().ok_or(MemError::Exhausted)?;

        if self.tags.len() <= id
        {
            self.tags.resize_with(id + 1, || None);
        }

        self.tags[id] = Some(TagBlocks::default());

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
        let blocks = self.tag_blocks(tag)?;

        *blocks = TagBlocks::default();

        Ok(())
    }

    fn trim_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        let blocks = self.tag_blocks(tag)?;

        blocks.blocks.shrink_to_fit();
        blocks.freelist.shrink_to_fit();

        Ok(())
    }

    fn store(&mut self, tag: Tag, bytes: &[u8]) -> MemResult<MemRef>
    {
        self.storev(tag, &[bytes])
    }

    fn storev(&mut self, tag: Tag, parts: &[&[u8]]) -> MemResult<MemRef>
    {
        let blocks = self.tag_blocks(tag)?;

        let total: usize = parts.iter().map(|p| p.len()).sum();
        let mut block = Vec::with_capacity(total);

        for part in parts
        {
            block.extend_from_slice(part);
        }

        let slot = blocks.insert(block.into_boxed_slice());
        blocks.stats.record_alloc(total);

        Ok(MemRef::direct(tag, slot as u64, total))
    }

    fn release(&mut self, handle: MemRef) -> MemResult<()>
    {
        let blocks = self.tag_blocks(handle.tag())?;
        let slot = handle.raw() as usize;

        match blocks.blocks.get_mut(slot).and_then(Option::take)
        {
            Some(_) =>
            {
                blocks.freelist.push(slot as u32);
                blocks.stats.record_free(handle.len());

                Ok(())
            },
            None => Err(MemError::UnknownRef),
        }
    }

    fn resolve(&self, handle: &MemRef) -> MemResult<&[u8]>
    {
        let block = self
            .tags
            .get(handle.tag() as usize)
            .and_then(Option::as_ref)
            .and_then(|t| t.blocks.get(handle.raw() as usize))
            .and_then(Option::as_ref)
            .ok_or(MemError::UnknownRef)?;

        Ok(&block[..handle.len()])
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
        format!("malloc(tags: {})", self.tag_ids.count_used())
    }
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tags_are_independent()
    {
        let mut arena = HeapArena::new();

        let one = arena.acquire_tag().unwrap();
        let two = arena.acquire_tag().unwrap();

        let a = arena.store(one, b"first tag bytes").unwrap();
        let b = arena.store(two, b"second tag bytes").unwrap();

        arena.release_tag(one).unwrap();

        // Tag two's allocations survive tag one's release
        assert_eq!(arena.resolve(&b).unwrap(), b"second tag bytes");
        assert_eq!(arena.resolve(&a), Err(MemError::UnknownRef));
    }

    #[test]
    fn release_recycles_slots()
    {
        let mut arena = HeapArena::new();
        let tag = arena.acquire_tag().unwrap();

        let first = arena.store(tag, b"one").unwrap();
        arena.release(first).unwrap();

        let second = arena.store(tag, b"two").unwrap();

        // The freed slot is reused
        assert_eq!(first.raw(), second.raw());
        assert_eq!(arena.resolve(&second).unwrap(), b"two");
    }

    #[test]
    fn double_release_rejected()
    {
        let mut arena = HeapArena::new();
        let tag = arena.acquire_tag().unwrap();

        let handle = arena.store(tag, b"bytes").unwrap();

        arena.release(handle).unwrap();

        assert_eq!(arena.release(handle), Err(MemError::UnknownRef));
    }

    #[test]
    fn tag_ids_recycled()
    {
        let mut arena = HeapArena::new();

        let tag = arena.acquire_tag().unwrap();
        arena.release_tag(tag).unwrap();

        assert_eq!(arena.acquire_tag().unwrap(), tag);
    }

    #[test]
    fn storev_gathers()
    {
        let mut arena = HeapArena::new();
        let tag = arena.acquire_tag().unwrap();

        let joined = arena.storev(tag, &[b"a", b"", b"bc"]).unwrap();

        assert_eq!(arena.resolve(&joined).unwrap(), b"abc");
    }

    #[test]
    fn stats_follow_lifecycle()
    {
        let mut arena = HeapArena::new();
        let tag = arena.acquire_tag().unwrap();

        let h = arena.store(tag, &[0; 100]).unwrap();
        arena.store(tag, &[0; 50]).unwrap();
        arena.release(h).unwrap();

        let stats = arena.stats(tag).unwrap();

        assert_eq!(stats.allocs, 2);
        assert_eq!(stats.frees, 1);
        assert_eq!(stats.in_use_bytes, 50);
        assert_eq!(stats.peak_bytes, 150);
    }
}
