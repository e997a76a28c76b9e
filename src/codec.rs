/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Byte level UTF8 handling shared by the reader and
//! scanner.
//!
//! The hot path is the 256 entry classification table
//! below, which answers the single byte questions the
//! scanner asks most often (blank? break? flow indicator?).
//! Multi byte codepoints (NEL, LS, PS, BOM and friends)
//! take the slow path through [`decode`].

/// Outcome of decoding a single codepoint from a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decoded
{
    /// A valid codepoint and the number of bytes it spans
    Codepoint(u32, usize),
    /// The buffer was empty
    Empty,
    /// The buffer ended mid codepoint; more bytes may
    /// complete it
    Partial,
    /// The byte sequence can never form a valid codepoint
    Invalid,
}

/// Decode the codepoint starting at .buf->0
pub(crate) fn decode(buf: &[u8]) -> Decoded
{
    let first = match buf.first()
    {
        Some(&b) => b,
        None => return Decoded::Empty,
    };

    let width = width_of(first);

    if width == 0
    {
        return Decoded::Invalid;
    }

    if buf.len() < width
    {
        // Could still be completed by more bytes, unless a
        // trailing byte is already wrong
        for &b in &buf[1..]
        {
            if b & 0xC0 != 0x80
            {
                return Decoded::Invalid;
            }
        }

        return Decoded::Partial;
    }

    let mut cp: u32 = match width
    {
        1 => return Decoded::Codepoint(first as u32, 1),
        2 => (first & 0x1F) as u32,
        3 => (first & 0x0F) as u32,
        _ => (first & 0x07) as u32,
    };

    for &b in &buf[1..width]
    {
        if b & 0xC0 != 0x80
        {
            return Decoded::Invalid;
        }

        cp = (cp << 6) | (b & 0x3F) as u32;
    }

    // Overlong encodings, surrogate halves and out of range
    // values are all rejected
    let overlong = match width
    {
        2 => cp < 0x80,
        3 => cp < 0x800,
        _ => cp < 0x10000,
    };

    if overlong || (0xD800..=0xDFFF).contains(&cp) || cp > 0x10FFFF
    {
        return Decoded::Invalid;
    }

    Decoded::Codepoint(cp, width)
}

/// Decode the codepoint ending at .buf's final byte
pub(crate) fn decode_reverse(buf: &[u8]) -> Decoded
{
    if buf.is_empty()
    {
        return Decoded::Empty;
    }

    // Walk backwards over at most 3 continuation bytes to
    // the codepoint's first byte
    let mut start = buf.len() - 1;

    for _ in 0..3
    {
        if buf[start] & 0xC0 != 0x80
        {
            break;
        }

        match start.checked_sub(1)
        {
            Some(s) => start = s,
            None => return Decoded::Invalid,
        }
    }

    match decode(&buf[start..])
    {
        // The decoded width must land exactly on the buffer's
        // end, otherwise the tail is garbage
        Decoded::Codepoint(cp, width) if start + width == buf.len() =>
        {
            Decoded::Codepoint(cp, width)
        },
        Decoded::Empty => Decoded::Empty,
        _ => Decoded::Invalid,
    }
}

/// Returns the byte length of the codepoint starting with
/// .first, or 0 if .first can never start a codepoint
pub(crate) const fn width_of(first: u8) -> usize
{
    match first
    {
        b if b & 0x80 == 0x00 => 1,
        b if b & 0xE0 == 0xC0 => 2,
        b if b & 0xF0 == 0xE0 => 3,
        b if b & 0xF8 == 0xF0 => 4,
        _ => 0,
    }
}

/* === Byte classification === */

pub(crate) const C_BLANK: u8 = 0b0000_0001;
pub(crate) const C_BREAK: u8 = 0b0000_0010;
pub(crate) const C_FLOW: u8 = 0b0000_0100;
pub(crate) const C_DIGIT: u8 = 0b0000_1000;
pub(crate) const C_HEX: u8 = 0b0001_0000;
pub(crate) const C_URI: u8 = 0b0010_0000;
pub(crate) const C_JSON_UNESCAPED: u8 = 0b0100_0000;

/// One entry per byte value; answers the scanner's single
/// byte class queries in one load
pub(crate) const CLASS: [u8; 256] = build_class_table();

pub(crate) fn class_of(byte: u8) -> u8
{
    CLASS[byte as usize]
}

pub(crate) fn is_class(byte: u8, class: u8) -> bool
{
    CLASS[byte as usize] & class != 0
}

const fn build_class_table() -> [u8; 256]
{
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256
    {
        let b = i as u8;
        let mut class = 0u8;

        if b == b' ' || b == b'\t'
        {
            class |= C_BLANK;
        }

        if b == b'\r' || b == b'\n'
        {
            class |= C_BREAK;
        }

        if b == b',' || b == b'[' || b == b']' || b == b'{' || b == b'}'
        {
            class |= C_FLOW;
        }

        if b.is_ascii_digit()
        {
            class |= C_DIGIT;
        }

        if b.is_ascii_hexdigit()
        {
            class |= C_HEX;
        }

        if is_uri_byte(b)
        {
            class |= C_URI;
        }

        // Printable ASCII excluding '"' and '\' needs no
        // escaping inside a JSON string
        if b >= 0x20 && b < 0x7F && b != b'"' && b != b'\\'
        {
            class |= C_JSON_UNESCAPED;
        }

        table[i] = class;
        i += 1;
    }

    table
}

/// RFC 3986 character set, plus the '%' escape lead in
const fn is_uri_byte(b: u8) -> bool
{
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.'
                | b'_'
                | b'~'
                | b':'
                | b'/'
                | b'?'
                | b'#'
                | b'['
                | b']'
                | b'@'
                | b'!'
                | b'$'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b';'
                | b'='
                | b'%'
        )
}

/* === Escape formatting === */

/// Escape dialect to format against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscapeFlavor
{
    /// YAML 1.2 double quote escapes
    DoubleQuote,
    /// YAML 1.1 double quote escapes, which add the \N \_
    /// \L \P aliases
    DoubleQuoteLegacy,
    /// JSON strings, \uXXXX only (with surrogate pairs past
    /// the BMP)
    Json,
}

/// Produce the canonical escaped representation of .cp,
/// or None when the codepoint needs no escaping in the
/// given .flavor
pub(crate) fn format_escaped(cp: u32, flavor: EscapeFlavor) -> Option<String>
{
    let legacy = matches!(flavor, EscapeFlavor::DoubleQuoteLegacy);

    let text = match cp
    {
        0x00 => r#"\0"#.into(),
        0x07 => r#"\a"#.into(),
        0x08 => r#"\b"#.into(),
        0x09 => r#"\t"#.into(),
        0x0A => r#"\n"#.into(),
        0x0B => r#"\v"#.into(),
        0x0C => r#"\f"#.into(),
        0x0D => r#"\r"#.into(),
        0x1B => r#"\e"#.into(),
        0x22 => r#"\""#.into(),
        0x5C => r#"\\"#.into(),
        0x85 if legacy => r#"\N"#.into(),
        0xA0 if legacy => r#"\_"#.into(),
        0x2028 if legacy => r#"\L"#.into(),
        0x2029 if legacy => r#"\P"#.into(),
        cp => return format_escaped_numeric(cp, flavor),
    };

    match flavor
    {
        // JSON only understands a subset of the special escapes
        EscapeFlavor::Json if !matches!(cp, 0x08 | 0x09 | 0x0A | 0x0C | 0x0D | 0x22 | 0x5C) =>
        {
            format_escaped_numeric(cp, flavor)
        },
        _ => Some(text),
    }
}

fn format_escaped_numeric(cp: u32, flavor: EscapeFlavor) -> Option<String>
{
    let control = cp < 0x20 || (0x7F..=0x9F).contains(&cp);

    match flavor
    {
        EscapeFlavor::Json =>
        {
            if !control
            {
                return None;
            }

            // JSON has no \x or \U; everything goes through
            // \uXXXX, with surrogate pairs above the BMP
            match cp
            {
                cp if cp <= 0xFFFF => Some(format!(r#"\u{:04X}"#, cp)),
                cp =>
                {
                    let v = cp - 0x10000;
                    let hi = 0xD800 + (v >> 10);
                    let lo = 0xDC00 + (v & 0x3FF);

                    Some(format!(r#"\u{:04X}\u{:04X}"#, hi, lo))
                },
            }
        },
        _ =>
        {
            if !control
            {
                return None;
            }

            match cp
            {
                cp if cp <= 0xFF => Some(format!(r#"\x{:02X}"#, cp)),
                cp if cp <= 0xFFFF => Some(format!(r#"\u{:04X}"#, cp)),
                cp => Some(format!(r#"\U{:08X}"#, cp)),
            }
        },
    }
}

/// <Byte Order Mark> (U+FEFF), only significant at column 0
pub(crate) const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decode_ascii()
    {
        assert_eq!(decode(b"a"), Decoded::Codepoint(0x61, 1));
        assert_eq!(decode(b""), Decoded::Empty);
    }

    #[test]
    fn decode_multibyte()
    {
        // NEL, LS, a 4 byte emoji
        assert_eq!(decode("\u{0085}".as_bytes()), Decoded::Codepoint(0x85, 2));
        assert_eq!(decode("\u{2028}".as_bytes()), Decoded::Codepoint(0x2028, 3));
        assert_eq!(
            decode("\u{1F600}".as_bytes()),
            Decoded::Codepoint(0x1F600, 4)
        );
    }

    #[test]
    fn decode_partial()
    {
        let nel = "\u{0085}".as_bytes();

        assert_eq!(decode(&nel[..1]), Decoded::Partial);
    }

    #[test]
    fn decode_overlong()
    {
        // 2 byte encoding of '/' (must be >= 0x80)
        assert_eq!(decode(&[0xC0, 0xAF]), Decoded::Invalid);
        // 3 byte encoding of a codepoint < 0x800
        assert_eq!(decode(&[0xE0, 0x80, 0xAF]), Decoded::Invalid);
        // 4 byte encoding of a codepoint < 0x10000
        assert_eq!(decode(&[0xF0, 0x80, 0x80, 0xAF]), Decoded::Invalid);
    }

    #[test]
    fn decode_surrogate()
    {
        // U+D800 encoded directly
        assert_eq!(decode(&[0xED, 0xA0, 0x80]), Decoded::Invalid);
    }

    #[test]
    fn decode_out_of_range()
    {
        // 0x110000
        assert_eq!(decode(&[0xF4, 0x90, 0x80, 0x80]), Decoded::Invalid);
    }

    #[test]
    fn decode_backwards()
    {
        let data = "a\u{0085}".as_bytes();

        assert_eq!(decode_reverse(data), Decoded::Codepoint(0x85, 2));
        assert_eq!(decode_reverse(&data[..1]), Decoded::Codepoint(0x61, 1));
        assert_eq!(decode_reverse(b""), Decoded::Empty);

        // A bare continuation byte has no codepoint start
        assert_eq!(decode_reverse(&[0x85]), Decoded::Invalid);
    }

    #[test]
    fn classes()
    {
        assert!(is_class(b' ', C_BLANK));
        assert!(is_class(b'\t', C_BLANK));
        assert!(is_class(b'\n', C_BREAK));
        assert!(is_class(b'{', C_FLOW));
        assert!(is_class(b'f', C_HEX));
        assert!(!is_class(b'g', C_HEX));
        assert!(is_class(b'%', C_URI));
        assert!(is_class(b'a', C_JSON_UNESCAPED));
        assert!(!is_class(b'"', C_JSON_UNESCAPED));
        assert!(!is_class(b'\\', C_JSON_UNESCAPED));
    }

    #[test]
    fn escape_aliases()
    {
        use EscapeFlavor::*;

        assert_eq!(format_escaped(0x85, DoubleQuoteLegacy).unwrap(), r#"\N"#);
        assert_eq!(format_escaped(0xA0, DoubleQuoteLegacy).unwrap(), r#"\_"#);
        assert_eq!(format_escaped(0x2028, DoubleQuoteLegacy).unwrap(), r#"\L"#);
        assert_eq!(format_escaped(0x2029, DoubleQuoteLegacy).unwrap(), r#"\P"#);

        // 1.2 spells the C1 controls numerically instead,
        // and leaves LS/PS alone entirely
        assert_eq!(format_escaped(0x85, DoubleQuote).unwrap(), r#"\x85"#);
        assert_eq!(format_escaped(0x2028, DoubleQuote), None);
    }

    #[test]
    fn escape_controls()
    {
        use EscapeFlavor::*;

        assert_eq!(format_escaped(0x1B, DoubleQuote).unwrap(), r#"\e"#);
        assert_eq!(format_escaped(0x01, DoubleQuote).unwrap(), r#"\x01"#);
        assert_eq!(format_escaped(0x01, Json).unwrap(), r#"\u0001"#);
        assert_eq!(format_escaped(0x1B, Json).unwrap(), r#"\u001B"#);

        // Printable characters need no escape
        assert_eq!(format_escaped(0x61, DoubleQuote), None);
        assert_eq!(format_escaped(0x61, Json), None);
    }
}
