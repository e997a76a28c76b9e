/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Adapter that turns a pull callback into a
//! [`std::io::Read`] source for the owned reader.
//!
//! The callback contract is the classic C one: fill the
//! buffer handed to you, returning the number of bytes
//! written, `0` at end of stream, or a negative value to
//! signal an error.

use std::{fmt, io};

/// Wraps a `FnMut(&mut [u8]) -> isize` pull function as an
/// [`io::Read`]
pub(crate) struct CallbackRead<F>
{
    callback: F,
}

impl<F> CallbackRead<F>
where
    F: FnMut(&mut [u8]) -> isize,
{
    pub fn new(callback: F) -> Self
    {
        Self { callback }
    }
}

impl<F> io::Read for CallbackRead<F>
where
    F: FnMut(&mut [u8]) -> isize,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>
    {
        match (self.callback)(buf)
        {
            n if n < 0 => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("read callback signaled failure ({})", n),
            )),
            n =>
            {
                let n = n as usize;

                // A lying callback must not corrupt the reader
                if n > buf.len()
                {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "read callback reported more bytes than the buffer holds",
                    ));
                }

                Ok(n)
            },
        }
    }
}

impl<F> fmt::Debug for CallbackRead<F>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("CallbackRead")
            .field("callback", &"FnMut(&mut [u8]) -> isize")
            .finish()
    }
}
