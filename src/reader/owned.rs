/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Contains an implementation of [`Read`](super::Read) for
//! arbitrary [`std::io::Read`] byte streams.
//!
//! Bytes are pulled in growing chunks which live in a
//! memory region arena for the reader's lifetime. A chunk
//! is never resized or unmapped while the reader lives, so
//! token slices handed out from earlier chunks stay valid
//! as the stream keeps growing -- the same invariant the
//! arena's in place growth guarantees for its regions.

use std::{cell::UnsafeCell, fmt, io};

use super::{
    error::{ReadError, ReaderResult},
    private::Sealed,
    Read, ReadContext, Reader,
};
use crate::{
    mem::{Arena, ArenaConfig, MemRef, RegionArena, RegionBacking, Tag},
    queue::Queue,
    scanner::{
        entry::TokenEntry,
        error::ScanError,
        flag::{Flags, O_EXTENDABLE},
        Scanner,
    },
};

const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug)]
pub struct OwnedReader
{
    inner: ReadHolder,
}

impl OwnedReader
{
    pub fn new<T>(src: T) -> Self
    where
        T: io::Read + 'static,
    {
        let inner = ReadHolder::new(src);

        Self { inner }
    }

    pub(crate) fn new_reader(&self, opts: Flags) -> Reader<'_, Self>
    {
        Reader::new(self, opts)
    }

    fn drive_scanner<'de>(
        &'de self,
        scanner: &mut Scanner,
        queue: &mut Queue<TokenEntry<'de>>,
        mut opts: Flags,
    ) -> ReaderResult<()>
    {
        loop
        {
            match self.inner.is_exhausted()
            {
                true => opts.remove(O_EXTENDABLE),
                false => opts.insert(O_EXTENDABLE),
            }

            match scanner.scan_tokens(opts, self.inner.data(), queue)
            {
                Err(ScanError::Extend) =>
                {
                    let read_to = scanner.offset();

                    self.inner.read_next_chunk(Some(read_to))?;

                    scanner.reset_offset();
                },

                Ok(_) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Read for OwnedReader
{
    fn drive<'de>(&'de self, cxt: ReadContext<'_, '_, 'de>) -> Result<(), ReadError>
    {
        self.drive_scanner(cxt.scanner, cxt.queue, cxt.flags)
            .map_err(Into::into)
    }

    unsafe fn consume(&self, _bound: usize) -> Result<(), ReadError>
    {
        Ok(())
    }
}

impl Sealed for OwnedReader {}

#[derive(Debug)]
struct ReadHolder
{
    inner: UnsafeCell<Impl>,
}

impl ReadHolder
{
    pub fn new<T>(src: T) -> Self
    where
        T: io::Read + 'static,
    {
        let inner = Impl::new(src).into();

        Self { inner }
    }

    pub fn read_next_chunk(&self, read_to: Option<usize>) -> ReaderResult<()>
    {
        let inner: &mut Impl = unsafe { &mut *self.inner.get() };

        inner.refresh_buffer(read_to)
    }

    pub fn data(&self) -> &str
    {
        // SAFETY:
        //
        // We never drop the contents being referenced here.
        //
        // The whole point of this structure is to ensure every
        // chunk stays exactly where the arena placed it until
        // ReadHolder (ourselves) is dropped.
        //
        // This section REQUIRES the following invariants:
        //
        //  1. The arena's regions never move once bytes are
        //     stored in them (anonymous maps grow in place or
        //     not at all)
        //  2. Impl never releases the tag, trims the arena or
        //     resets it before ReadHolder is dropped
        let inner: &Impl = unsafe { &*self.inner.get() };

        inner.data()
    }

    fn is_exhausted(&self) -> bool
    {
        let inner: &Impl = unsafe { &*self.inner.get() };

        inner.exhausted
    }
}

struct Impl
{
    arena:   RegionArena,
    tag:     Tag,
    current: Option<MemRef>,
    chunks:  usize,

    source:    Box<dyn io::Read + 'static>,
    exhausted: bool,
}

impl Impl
{
    pub fn new<T>(src: T) -> Self
    where
        T: io::Read + 'static,
    {
        let source = Box::new(src);

        // Regions must be backed by maps; heap buffers may
        // move when the arena grows them
        let mut arena = RegionArena::new(ArenaConfig {
            backing: RegionBacking::MmapAnon,
            initial_region: DEFAULT_BUFFER_SIZE,
            minimum_region: DEFAULT_BUFFER_SIZE,
            ..ArenaConfig::default()
        });

        let tag = arena
            .acquire_tag()
            .expect("a fresh arena always has a tag available");

        Self {
            arena,
            tag,
            current: None,
            chunks: 0,

            source,
            exhausted: false,
        }
    }

    pub fn data(&self) -> &str
    {
        let bytes = match self.current.as_ref()
        {
            Some(chunk) => self
                .arena
                .resolve(chunk)
                .expect("the current chunk is always live"),
            None => return "",
        };

        // Chunk contents were validated before storage
        std::str::from_utf8(bytes).expect("chunks are always UTF8")
    }

    fn refresh_buffer(&mut self, copy_from: Option<usize>) -> ReaderResult<()>
    {
        // Calculate next allocation chunk
        let cap = (DEFAULT_BUFFER_SIZE * usize::max(self.chunks, 1) + copy_from.unwrap_or(0))
            .next_power_of_two();
        let mut new = Vec::new();

        // Copy any data that is marked as unread into the next
        // buffer
        if let Some(mark) = copy_from
        {
            new.extend_from_slice(&self.data().as_bytes()[mark..]);
        }

        // Fill the new buffer, checking if .src has been exhausted
        self.exhausted = read_fill(Take::new(&mut self.source, cap), &mut new)?;

        // Validate buffer is UTF8
        let new = String::from_utf8(new).map_err(|e| e.utf8_error())?;

        // Pin the chunk in the arena; the previous chunk stays
        // mapped until we drop, keeping older borrows alive
        let chunk = self.arena.store(self.tag, new.as_bytes())?;

        self.current = Some(chunk);
        self.chunks += 1;

        Ok(())
    }
}

impl fmt::Debug for Impl
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Impl")
            .field("arena", &self.arena)
            .field("current", &self.current)
            .field("chunks", &self.chunks)
            .field("source", &"dyn <std::io::Read>")
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

fn read_fill<T>(mut src: T, buf: &mut Vec<u8>) -> io::Result<bool>
where
    T: io::Read,
{
    let amt = src.read_to_end(buf)?;

    Ok(amt == 0)
}

struct Take<'a>
{
    limit: usize,
    inner: &'a mut dyn io::Read,
}

impl<'a> Take<'a>
{
    fn new(read: &'a mut dyn io::Read, limit: usize) -> Self
    {
        Self { inner: read, limit }
    }
}

impl<'a> io::Read for Take<'a>
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>
    {
        // Don't call into inner reader at all at EOF because it may
        // still block
        if self.limit == 0
        {
            return Ok(0);
        }

        let max = usize::min(buf.len(), self.limit);
        let n = self.inner.read(&mut buf[..max])?;
        self.limit -= n;

        Ok(n)
    }
}

impl fmt::Debug for Take<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Take")
            .field("limit", &self.limit)
            .field("inner", &"dyn <std::io::Read>")
            .finish()
    }
}

#[cfg(test)]
mod tests
{
    use std::io::Cursor;

    use super::*;
    use crate::reader::test_util::test_reader;

    fn str_to_owned_reader(data: &str) -> OwnedReader
    {
        let read = Cursor::new(data.as_bytes().to_vec());

        OwnedReader::new(read)
    }

    test_reader! {str_to_owned_reader}
}
