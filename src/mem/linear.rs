/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Bump allocation over one fixed buffer.
//!
//! The simplest member of the allocator family: a single
//! cursor advancing through a caller sized buffer. There is
//! exactly one tag (0); releasing it rewinds the cursor to
//! the start.

use crate::mem::{
    bitset::align_up, stats::ArenaStats, Arena, MemError, MemRef, MemResult, Tag,
};

/// Alignment applied to every allocation's start
const ALLOC_ALIGN: usize = 8;

/// The only tag a [`LinearArena`] ever hands out
pub(in crate::mem) const LINEAR_TAG: Tag = 0;

/// A bump allocator over a single fixed size buffer.
///
/// Individual [`release`](Arena::release) calls only adjust
/// accounting; space is reclaimed when the tag is released
/// or reset.
#[derive(Debug)]
pub struct LinearArena
{
    buffer: Box<[u8]>,
    cursor: usize,
    stats:  ArenaStats,
}

impl LinearArena
{
    /// Instantiate a new arena backed by a fresh .size byte
    /// buffer
    pub fn new(size: usize) -> Self
    {
        Self::with_buffer(vec![0; size].into_boxed_slice())
    }

    /// Instantiate a new arena over a caller provided
    /// buffer
    pub fn with_buffer(buffer: Box<[u8]>) -> Self
    {
        Self {
            buffer,
            cursor: 0,
            stats: ArenaStats::default(),
        }
    }

    /// Bytes left before the arena reports OutOfSpace
    pub fn remaining(&self) -> usize
    {
        self.buffer.len() - self.cursor
    }

    fn bump(&mut self, size: usize) -> MemResult<usize>
    {
        let start = align_up(self.cursor, ALLOC_ALIGN);
        let end = start.checked_add(size).ok_or(MemError::OutOfSpace)?;

        if end > self.buffer.len()
        {
            return Err(MemError::OutOfSpace);
        }

        self.cursor = end;
        self.stats.record_alloc(size);

        Ok(start)
    }
}

impl Arena for LinearArena
{
    fn acquire_tag(&mut self) -> MemResult<Tag>
    {
        Ok(LINEAR_TAG)
    }

    fn release_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        self.reset_tag(tag)
    }

    fn reset_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        if tag != LINEAR_TAG
        {
            return Err(MemError::UnknownTag);
        }

        self.cursor = 0;
        self.stats = ArenaStats::default();

        Ok(())
    }

    fn store(&mut self, tag: Tag, bytes: &[u8]) -> MemResult<MemRef>
    {
        self.storev(tag, &[bytes])
    }

    fn storev(&mut self, tag: Tag, parts: &[&[u8]]) -> MemResult<MemRef>
    {
        if tag != LINEAR_TAG
        {
            return Err(MemError::UnknownTag);
        }

        let total = parts.iter().map(|p| p.len()).sum();
        let start = self.bump(total)?;

        let mut at = start;
        for part in parts
        {
            self.buffer[at..at + part.len()].copy_from_slice(part);
            at += part.len();
        }

        Ok(MemRef::direct(tag, start as u64, total))
    }

    fn release(&mut self, handle: MemRef) -> MemResult<()>
    {
        if handle.tag() != LINEAR_TAG
        {
            return Err(MemError::UnknownTag);
        }

        // Space comes back at tag release; only the books
        // move here
        self.stats.record_free(handle.len());

        Ok(())
    }

    fn resolve(&self, handle: &MemRef) -> MemResult<&[u8]>
    {
        let start = handle.raw() as usize;
        let end = start + handle.len();

        if handle.tag() != LINEAR_TAG || end > self.cursor
        {
            return Err(MemError::UnknownRef);
        }

        Ok(&self.buffer[start..end])
    }

    fn stats(&self, tag: Tag) -> MemResult<ArenaStats>
    {
        match tag
        {
            LINEAR_TAG => Ok(self.stats),
            _ => Err(MemError::UnknownTag),
        }
    }

    fn info(&self) -> String
    {
        format!(
            "linear(size: {}, used: {})",
            self.buffer.len(),
            self.cursor
        )
    }
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn store_and_resolve()
    {
        let mut arena = LinearArena::new(256);
        let tag = arena.acquire_tag().unwrap();

        let hello = arena.store(tag, b"hello").unwrap();
        let world = arena.store(tag, b"world").unwrap();

        assert_eq!(arena.resolve(&hello).unwrap(), b"hello");
        assert_eq!(arena.resolve(&world).unwrap(), b"world");
        assert_ne!(hello, world);
    }

    #[test]
    fn storev_joins_parts()
    {
        let mut arena = LinearArena::new(64);
        let tag = arena.acquire_tag().unwrap();

        let joined = arena.storev(tag, &[b"hel", b"lo ", b"world"]).unwrap();

        assert_eq!(arena.resolve(&joined).unwrap(), b"hello world");
        assert_eq!(joined.len(), 11);
    }

    #[test]
    fn out_of_space()
    {
        let mut arena = LinearArena::new(16);
        let tag = arena.acquire_tag().unwrap();

        arena.store(tag, &[0xAB; 8]).unwrap();

        assert_eq!(arena.store(tag, &[0xCD; 16]), Err(MemError::OutOfSpace));
    }

    #[test]
    fn release_tag_rewinds()
    {
        let mut arena = LinearArena::new(16);
        let tag = arena.acquire_tag().unwrap();

        arena.store(tag, &[1; 12]).unwrap();
        arena.release_tag(tag).unwrap();

        // The full buffer is available again
        assert!(arena.store(tag, &[2; 12]).is_ok());
    }

    #[test]
    fn alignment_applied()
    {
        let mut arena = LinearArena::new(64);
        let tag = arena.acquire_tag().unwrap();

        arena.store(tag, b"abc").unwrap();
        let second = arena.store(tag, b"d").unwrap();

        assert_eq!(second.raw() % 8, 0);
    }

    #[test]
    fn stats_accounting()
    {
        let mut arena = LinearArena::new(128);
        let tag = arena.acquire_tag().unwrap();

        let r = arena.store(tag, &[1; 10]).unwrap();
        arena.store(tag, &[2; 20]).unwrap();
        arena.release(r).unwrap();

        let stats = arena.stats(tag).unwrap();

        assert_eq!(stats.allocs, 2);
        assert_eq!(stats.frees, 1);
        assert_eq!(stats.alloc_bytes, 30);
        assert_eq!(stats.in_use_bytes, 20);
        assert_eq!(stats.peak_bytes, 30);
    }
}
