/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! This module exports function(s) for handling scalar
//! escapes in YAML documents.

use crate::scanner::error::{ScanError, ScanResult as Result};

/// Escape dialect accepted while unescaping double quoted
/// content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(in crate::scanner) enum EscapeStyle
{
    /// The YAML 1.2 escape set
    Yaml12,
    /// YAML 1.2 plus the 1.1 era \N \_ \L \P aliases
    Yaml11,
    /// JSON's escape set: \" \\ \/ \b \f \n \r \t and
    /// \uXXXX only
    Json,
}

/// Unescape a given YAML escape sequence as defined in
/// [Section 5.7][Link]. Specifically, YAML defines 18
/// 'special' escapes, and 3 methods of encoding 8, 16 and
/// 32 bit unicode points.
///
/// It writes the unescaped character to .scratch, returning
/// the length of .base advanced, or an error if the
/// escape sequence is invalid. It expects .base->0 is a
/// backslash (\\), as this is the only valid start of an
/// escape sequence.
///
/// [Link]: https://yaml.org/spec/1.2/spec.html#c-escape
pub(in crate::scanner) fn flow_unescape(
    base: &str,
    scratch: &mut Vec<u8>,
    style: EscapeStyle,
) -> Result<usize>
{
    let mut buffer = base;
    let mut escape_len: Option<u8> = None;

    // Not an escape sequence, early exit
    if !check!(~buffer => b'\\')
    {
        return Ok(0);
    }

    advance!(buffer, 1);

    if let EscapeStyle::Json = style
    {
        return json_unescape(base, buffer, scratch);
    }

    let legacy = matches!(style, EscapeStyle::Yaml11);

    // See 5.7: Escaped Characters
    // yaml.org/spec/1.2/spec.html#id2776092
    match buffer.as_bytes()
    {
        [b'0', ..] => scratch.push(b'\0'),
        [b'a', ..] => scratch.push(b'\x07'),
        [b'b', ..] => scratch.push(b'\x08'),
        [b't', ..] | [b'\t', ..] => scratch.push(b'\x09'),
        [b'n', ..] => scratch.push(b'\x0A'),
        [b'v', ..] => scratch.push(b'\x0B'),
        [b'f', ..] => scratch.push(b'\x0C'),
        [b'r', ..] => scratch.push(b'\x0D'),
        [b'e', ..] => scratch.push(b'\x1B'),
        [b' ', ..] => scratch.push(b'\x20'),
        [b'"', ..] => scratch.push(b'"'),
        // Forward slashes are not supported in the 1.1 spec
        [b'/', ..] if !legacy => scratch.push(b'/'),
        [b'\\', ..] => scratch.push(b'\\'),
        [b'N', ..] if legacy => scratch.extend_from_slice(&NEL),
        [b'_', ..] if legacy => scratch.extend_from_slice(&NBS),
        [b'L', ..] if legacy => scratch.extend_from_slice(&LS),
        [b'P', ..] if legacy => scratch.extend_from_slice(&PS),
        [b'x', ..] => escape_len = Some(2),
        [b'u', ..] => escape_len = Some(4),
        [b'U', ..] => escape_len = Some(8),
        [] => return Err(ScanError::UnexpectedEOF),
        _ => return Err(ScanError::UnknownEscape),
    }
    advance!(buffer, 1);

    if let Some(sequence) = escape_len
    {
        let amt = write_unicode_point(buffer, scratch, sequence)?;
        advance!(buffer, amt);
    }

    Ok(base.len() - buffer.len())
}

/// JSON's much smaller escape grammar, with surrogate pair
/// joining for codepoints beyond the BMP
fn json_unescape(base: &str, after_slash: &str, scratch: &mut Vec<u8>) -> Result<usize>
{
    let mut buffer = after_slash;

    match buffer.as_bytes()
    {
        [b'"', ..] => scratch.push(b'"'),
        [b'\\', ..] => scratch.push(b'\\'),
        [b'/', ..] => scratch.push(b'/'),
        [b'b', ..] => scratch.push(b'\x08'),
        [b'f', ..] => scratch.push(b'\x0C'),
        [b'n', ..] => scratch.push(b'\x0A'),
        [b'r', ..] => scratch.push(b'\x0D'),
        [b't', ..] => scratch.push(b'\x09'),
        [b'u', ..] =>
        {
            advance!(buffer, 1);

            let (value, amt) = read_hex(buffer, 4)?;
            advance!(buffer, amt);

            let value = match value
            {
                // A high surrogate must be joined with the
                // following escaped low surrogate
                0xD800..=0xDBFF =>
                {
                    if !check!(~buffer => [b'\\', b'u', ..])
                    {
                        return Err(ScanError::UnknownEscape);
                    }
                    advance!(buffer, 2);

                    let (low, amt) = read_hex(buffer, 4)?;
                    advance!(buffer, amt);

                    if !(0xDC00..=0xDFFF).contains(&low)
                    {
                        return Err(ScanError::UnknownEscape);
                    }

                    0x10000 + (value - 0xD800) * 0x400 + (low - 0xDC00)
                },
                // A lone low surrogate can never be valid
                0xDC00..=0xDFFF => return Err(ScanError::UnknownEscape),
                value => value,
            };

            push_codepoint(value, scratch);

            return Ok(base.len() - buffer.len());
        },
        [] => return Err(ScanError::UnexpectedEOF),
        _ => return Err(ScanError::UnknownEscape),
    }
    advance!(buffer, 1);

    Ok(base.len() - buffer.len())
}

/// Unescape a percent encoded UTF8 tag escape sequence as
/// defined in [Section 5.6][Link], writing the code point
/// to the scratch, returning the length of .base consumed.
///
/// [Link]: https://yaml.org/spec/1.2/spec.html#ns-uri-char
pub(in crate::scanner) fn tag_uri_unescape(
    base: &str,
    scratch: &mut Vec<u8>,
    _directive: bool,
) -> Result<usize>
{
    let mut buffer = base;
    let mut codepoint_len: i8 = 0;

    while {
        if buffer.len() < 3
        {
            return Err(ScanError::UnexpectedEOF);
        }

        if !(check!(~buffer => b'%') && isHex!(~buffer, 1) && isHex!(~buffer, 2))
        {
            return Err(ScanError::UnknownEscape);
        }

        // Safety: we just checked that there are at least three
        // bytes in the buffer
        let octet: u8 = (as_hex(buffer.as_bytes()[1]) << 4) + as_hex(buffer.as_bytes()[2]);

        match codepoint_len
        {
            // First time through, determine how many octets this codepoint has
            0 =>
            {
                codepoint_len = match octet
                {
                    o if (o & 0x80) == 0x00 => 1,
                    o if (o & 0xE0) == 0xC0 => 2,
                    o if (o & 0xF0) == 0xE0 => 3,
                    o if (o & 0xF8) == 0xF0 => 4,
                    _ => return Err(ScanError::UnknownEscape),
                }
            },
            // Else ensure that the trailing octet is valid
            _ =>
            {
                if (octet & 0xC0) != 0x80
                {
                    return Err(ScanError::UnknownEscape);
                }
            },
        }

        scratch.push(octet);
        codepoint_len -= 1;
        advance!(buffer, 3);

        codepoint_len > 0
    }
    {}

    Ok(base.len() - buffer.len())
}

/// Writes a UTF8 codepoint to the scratch space
fn write_unicode_point(base: &str, scratch: &mut Vec<u8>, codepoint_len: u8) -> Result<usize>
{
    let mut buffer = base;
    let mut i = 0;
    let mut value: u32 = 0;

    if codepoint_len < 1
    {
        return Ok(0);
    }

    while i < codepoint_len
    {
        match buffer.as_bytes().first()
        {
            None => return Err(ScanError::UnexpectedEOF),
            Some(c) if !c.is_ascii_hexdigit() => return Err(ScanError::UnknownEscape),

            Some(b) => value = (value << 4) + as_hex(*b) as u32,
        }
        advance!(buffer, 1, i);
    }

    // A surrogate half cannot be encoded directly
    if (0xD800..=0xDFFF).contains(&value) || value > 0x10FFFF
    {
        return Err(ScanError::UnknownEscape);
    }

    push_codepoint(value, scratch);

    Ok(codepoint_len as usize)
}

/// Bit shift the value into the correct byte configuration
/// for UTF8
fn push_codepoint(value: u32, scratch: &mut Vec<u8>)
{
    match value
    {
        // v <= 127 (ASCII)
        v if v <= 0x7F => scratch.push(v as u8),
        // v <= 2047
        v if v <= 0x7FF =>
        {
            scratch.extend_from_slice(&[0xC0 | (v >> 6) as u8, 0x80 | (v & 0x3F) as u8])
        },
        // v <= 65535
        v if v <= 0xFFFF => scratch.extend_from_slice(&[
            0xE0 | (v >> 12) as u8,
            0x80 | ((v >> 6) & 0x3F) as u8,
            0x80 | (v & 0x3F) as u8,
        ]),
        // Otherwise it must be a full 4 byte code point
        v => scratch.extend_from_slice(&[
            0xF0 | (v >> 18) as u8,
            0x80 | ((v >> 12) & 0x3F) as u8,
            0x80 | ((v >> 6) & 0x3F) as u8,
            0x80 | (v & 0x3F) as u8,
        ]),
    }
}

/// Read .digits hex digits from .base, returning the value
/// and bytes consumed
fn read_hex(base: &str, digits: usize) -> Result<(u32, usize)>
{
    let bytes = base.as_bytes();

    if bytes.len() < digits
    {
        return Err(ScanError::UnexpectedEOF);
    }

    let mut value = 0u32;

    for &b in &bytes[..digits]
    {
        if !b.is_ascii_hexdigit()
        {
            return Err(ScanError::UnknownEscape);
        }

        value = (value << 4) + as_hex(b) as u32;
    }

    Ok((value, digits))
}

/*
 * Inclusive range suggested by clippy here is 5-10%
 * slower than doing it by hand, see
 *
 * github.com/rust-lang/rust/issues/45222
 */
#[allow(clippy::manual_range_contains)]
#[inline]
fn as_hex(b: u8) -> u8
{
    if b >= b'A' && b <= b'F'
    {
        b - b'A' + 10
    }
    else if b >= b'a' && b <= b'f'
    {
        b - b'a' + 10
    }
    else
    {
        b - b'0'
    }
}

/// <Next Line> (U+0085)
const NEL: [u8; 2] = [b'\xC2', b'\x85'];
/// <No-Break Space> (U+00A0)
const NBS: [u8; 2] = [b'\xC2', b'\xA0'];
/// <Line Separator> (U+2028)
const LS: [u8; 3] = [b'\xE2', b'\x80', b'\xA8'];
/// <Paragraph Separator> (U+2029)
const PS: [u8; 3] = [b'\xE2', b'\x80', b'\xA9'];
