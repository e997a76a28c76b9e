/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! The module contains the adapters for converting plain
//! bytes to a representation that is useful for parsing.
//!
//! This behavior is defined by the [`Read`] trait, which is
//! sealed, and cannot be implemented outside of this
//! library.
//!
//! Five conversions are supported, each with a top level
//! function that handles the conversion:
//!
//! - `&str` => [`from_utf8()`]
//! - `&[u8]` => [`try_from_bytes()`]
//! - `T: std::io::Read` => [`from_read()`]
//! - a file path => [`from_file()`]
//! - a pull callback => [`from_callback()`]

pub mod borrow;
pub mod file;
pub mod owned;

pub(crate) mod error;

mod callback;

use std::path::Path;

use crate::{
    error::Error,
    queue::Queue,
    reader::{
        borrow::BorrowReader,
        callback::CallbackRead,
        error::{ReadError, ReaderResult},
        file::FileReader,
        owned::OwnedReader,
        private::Sealed,
    },
    scanner::{entry::TokenEntry, flag::Flags as ScannerFlags, Scanner},
    token::Marker,
};

/// Instantiate a new [`Read`]er from the given UTF8 string
/// slice
///
/// ## Examples
///
/// ```rust
/// use yarrow::reader::from_utf8;
///
/// let yaml = "{a yaml: mapping}";
///
/// let reader = from_utf8(yaml);
/// ```
pub fn from_utf8(utf8: &str) -> BorrowReader<'_>
{
    BorrowReader::new(utf8)
}

/// Instantiate a new [`Read`]er from the given
/// [`std::io::Read`] source.
///
/// ## Examples
///
/// ```no_run
/// use std::fs::File;
///
/// use yarrow::reader::from_read;
///
/// let file = File::open("config.yaml")?;
///
/// let reader = from_read(file);
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn from_read<R>(src: R) -> OwnedReader
where
    R: std::io::Read + 'static,
{
    OwnedReader::new(src)
}

/// Try instantiate a new [`Read`]er from the given byte
/// slice.
///
/// ## Errors
///
/// This function will error if the provided byte slice is
/// not valid UTF8
///
/// ## Examples
///
/// ```rust
/// use yarrow::reader::try_from_bytes;
///
/// let yaml = b"[some, valid, yaml]";
///
/// let reader = try_from_bytes(yaml);
/// assert!(reader.is_ok())
/// ```
pub fn try_from_bytes(slice: &[u8]) -> std::result::Result<BorrowReader<'_>, Error>
{
    BorrowReader::try_from_bytes(slice).map_err(Into::into)
}

/// Try instantiate a new [`Read`]er over the file at
/// .path, memory mapping it where the platform allows.
///
/// A `*.json` extension switches the scanner into JSON
/// compatibility mode; see
/// [`set_json`](file::FileReader#method.set_json) to
/// override the detection.
///
/// ## Errors
///
/// This function will error if the file cannot be opened,
/// read, or is not valid UTF8
pub fn from_file<P>(path: P) -> std::result::Result<FileReader, Error>
where
    P: AsRef<Path>,
{
    FileReader::open(path.as_ref()).map_err(Into::into)
}

/// Instantiate a new [`Read`]er pulling bytes from the
/// given .callback.
///
/// The callback contract follows C conventions: fill the
/// provided buffer, returning the byte count, `0` on end of
/// stream, or any negative value to signal an error.
///
/// ## Examples
///
/// ```rust
/// use yarrow::reader::from_callback;
///
/// let mut chunks = vec![&b"done: true"[..]];
///
/// let reader = from_callback(move |buf| match chunks.pop()
/// {
///     Some(chunk) =>
///     {
///         buf[..chunk.len()].copy_from_slice(chunk);
///         chunk.len() as isize
///     },
///     None => 0,
/// });
/// ```
pub fn from_callback<F>(callback: F) -> OwnedReader
where
    F: FnMut(&mut [u8]) -> isize + 'static,
{
    OwnedReader::new(CallbackRead::new(callback))
}

/// Sealed interface over the functionality that
/// transforms a byte stream into [Token][crate::token::
/// Token]s.
///
/// Note the key feature here is `&'de self`. Namely, an
/// immutable reference through which any internal mutation
/// must not be visible
pub trait Read: std::fmt::Debug + Sealed
{
    /// Drive the .scanner from the byte stream with the
    /// provided .options, placing output into the
    /// .queue
    fn drive<'de>(&'de self, cxt: ReadContext<'_, '_, 'de>) -> Result<(), ReadError>;

    /// Hint to the underlying implementation that no live
    /// references exist to any data read below
    /// the given .bound, and that it may unload the given
    /// memory.
    ///
    /// ## Safety
    ///
    /// It is only safe to call this function after the
    /// caller has ensured there cannot be any live
    /// references to content below the provided .bound.
    unsafe fn consume(&self, _bound: usize) -> Result<(), ReadError>
    {
        Ok(())
    }
}

/// An intentionally opaque type which hides the
/// implementation details of [`Read`] methods.
pub struct ReadContext<'a, 'b, 'de>
{
    scanner: &'a mut Scanner,
    queue:   &'b mut Queue<TokenEntry<'de>>,
    flags:   ScannerFlags,
}

impl<'a, 'b, 'de> ReadContext<'a, 'b, 'de>
{
    fn new(
        scanner: &'a mut Scanner,
        queue: &'b mut Queue<TokenEntry<'de>>,
        flags: ScannerFlags,
    ) -> Self
    {
        Self {
            scanner,
            queue,
            flags,
        }
    }
}

/// Responsible for driving a Read implementation,
/// tokenizing the byte stream in preparation for
/// for an Event stream
#[derive(Debug)]
pub(crate) struct Reader<'de, T: 'de>
{
    scanner: Scanner,
    queue:   Queue<TokenEntry<'de>>,

    options:   ScannerFlags,
    exhausted: bool,

    inner: &'de T,
}

impl<'de, T> Reader<'de, T>
where
    T: Read,
{
    pub fn new(read: &'de T, opts: ScannerFlags) -> Self
    {
        Self {
            scanner:   Scanner::new(),
            queue:     Queue::new(),
            options:   opts,
            exhausted: false,
            inner:     read,
        }
    }

    pub fn scan_tokens(&mut self) -> ReaderResult<&mut Queue<TokenEntry<'de>>>
    {
        let start = self.queue.len();

        self.inner.drive(ReadContext::new(
            &mut self.scanner,
            &mut self.queue,
            self.options,
        ))?;

        self.exhausted = start == self.queue.len();

        Ok(&mut self.queue)
    }

    pub fn is_exhausted(&self) -> bool
    {
        self.exhausted && self.queue.is_empty()
    }

    pub fn queue_mut(&mut self) -> &mut Queue<TokenEntry<'de>>
    {
        &mut self.queue
    }

    pub(crate) fn queue(&self) -> &Queue<TokenEntry<'de>>
    {
        &self.queue
    }

    pub(crate) fn from_parts(
        read: &'de T,
        options: ScannerFlags,
        queue: Queue<TokenEntry<'de>>,
        exhausted: bool,
    ) -> Self
    {
        Self {
            scanner: Scanner::new(),
            queue,
            options,
            exhausted,
            inner: read,
        }
    }
}

/// One token lookahead over a [`Reader`], which the parser
/// requires.
///
/// Comment tokens never surface here; the parser's grammar
/// has no place for them, so they are filtered at this
/// choke point.
#[derive(Debug)]
pub(crate) struct PeekReader<'de, T: 'de>
{
    peek:   Option<TokenEntry<'de>>,
    reader: Reader<'de, T>,
}

impl<'de, T> PeekReader<'de, T>
where
    T: Read,
{
    pub fn new(reader: Reader<'de, T>) -> Self
    {
        Self { peek: None, reader }
    }

    pub fn pop(&mut self) -> ReaderResult<Option<TokenEntry<'de>>>
    {
        match self.peek.take()
        {
            Some(entry) => Ok(Some(entry)),
            None if !self.reader.is_exhausted() =>
            {
                self.take_next()?;

                Ok(self.peek.take())
            },
            None => Ok(None),
        }
    }

    pub fn peek(&mut self) -> ReaderResult<Option<&mut TokenEntry<'de>>>
    {
        match self.peek
        {
            Some(ref mut entry) => Ok(Some(entry)),
            None if !self.reader.is_exhausted() =>
            {
                self.take_next()?;

                Ok(self.peek.as_mut())
            },
            None => Ok(None),
        }
    }

    pub fn consume(&mut self) -> bool
    {
        self.peek.take().is_some()
    }

    pub fn into_inner(self) -> (Reader<'de, T>, Option<TokenEntry<'de>>)
    {
        let Self { peek, reader } = self;

        (reader, peek)
    }

    pub(crate) fn queue(&self) -> &Queue<TokenEntry<'de>>
    {
        self.reader.queue()
    }

    fn take_next(&mut self) -> ReaderResult<()>
    {
        // Ensure we don't overwrite an existing entry
        if self.peek.is_some()
        {
            return Ok(());
        }

        loop
        {
            // If the queue is empty, make an attempt to retrieve more
            // tokens from the Reader
            if self.reader.queue_mut().is_empty()
            {
                if self.reader.is_exhausted()
                {
                    return Ok(());
                }

                self.reader.scan_tokens()?;
            }

            match self.reader.queue_mut().pop()
            {
                // Comments are token level trivia
                Some(entry) if entry.marker() == Marker::Comment => continue,
                entry =>
                {
                    self.peek = entry;

                    return Ok(());
                },
            }
        }
    }
}

impl<'de, T> From<Reader<'de, T>> for PeekReader<'de, T>
where
    T: Read,
{
    fn from(reader: Reader<'de, T>) -> Self
    {
        Self::new(reader)
    }
}

mod private
{
    pub trait Sealed {}
}
