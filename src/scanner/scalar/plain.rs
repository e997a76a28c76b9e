/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use crate::{
    scanner::{
        context::Context,
        entry::MaybeToken,
        error::{ScanError, ScanResult as Result},
        flag::{Flags, O_EXTENDABLE, O_JSON, O_LAZY},
        scalar::as_maybe,
        stats::MStats,
    },
    token::{ScalarStyle, Token},
};

pub(in crate::scanner) fn scan_plain_scalar<'de>(
    opts: Flags,
    base: &'de str,
    stats: &mut MStats,
    cxt: &Context,
) -> Result<(MaybeToken<'de>, usize)>
{
    // Ensure the scalar is at least one column above the most
    // recent indentation level
    let indent = cxt.indent() + 1;
    let block_context = cxt.is_block();

    match opts.contains(O_LAZY)
    {
        true => scan_plain_scalar_lazy(opts, base, stats, indent, block_context).map(as_maybe),
        false => scan_plain_scalar_eager(opts, base, stats, indent, block_context).map(as_maybe),
    }
}

/// Scans a plain scalar, returning a Token, and the amount
/// read from .base. This function will attempt to borrow
/// from .base, however it may be required to copy into a
/// new allocation if line joining is required in the
/// scalar.
///
/// See:
///     YAML 1.2: Section 7.3.3
///     yaml.org/spec/1.2/spec.html#ns-plain-first(c)
pub(in crate::scanner) fn scan_plain_scalar_eager<'de>(
    opts: Flags,
    base: &'de str,
    stats: &mut MStats,
    indent: usize,
    block_context: bool,
) -> Result<(Token<'de>, usize)>
{
    // The JSON subset has a much simpler (and stricter)
    // production for unquoted content
    if opts.contains(O_JSON)
    {
        return scan_json_literal(opts, base, stats);
    }

    let mut buffer = base;
    let mut scratch = Vec::new();

    // Local copies of the given stats
    let mut local_stats = stats.clone();
    let mut scalar_stats = stats.clone();

    // Do we need to normalize and therefore allocate?
    let mut can_borrow = true;
    // Have we hit a lower indentation to our starting indent?
    let mut outdent = false;

    // Track whitespace, line breaks accumulated, these have two
    // uses:
    //
    // 1. In loop, for handling line joins
    // 2. Post loop for truncating trailing space
    let mut whitespace: usize = 0;
    let mut lines: usize = 0;

    // Are we in block/flow context?
    let flow_context = !block_context;

    // Inside flow contexts you *may not* start a plain scalar
    // with a ':', '?', or '-' followed by a flow indicator
    cache!(~buffer, 2, opts)?;
    if flow_context && check!(~buffer => b':' | b'?' | b'-') && isFlowIndicator!(~buffer, 1)
    {
        return Err(ScanError::InvalidPlainScalar);
    }

    'scalar: loop
    {
        // 4 is the largest character sequence we can encounter
        // (document indicators)
        cache!(~buffer, 4, opts)?;

        if buffer.is_empty()
        {
            break 'scalar;
        }

        if outdent
        {
            break 'scalar;
        }

        // A YAML document indicator or ' #' terminates a plain
        // scalar
        //
        // Note that due to how this function is setup, the _only_
        // times we will hit this guard is if:
        //
        // 1. We've just started the function, and thus we were
        // called on a non whitespace character
        //
        // 2. We've gone through the loop, exhausting any
        // whitespace, thus hitting this guard again
        //
        // Therefore just checking for '#' is okay
        if isDocumentIndicator!(~buffer, :local_stats) || check!(~buffer => b'#')
        {
            break 'scalar;
        }

        // Check for character sequences which end a plain scalar,
        // namely:
        //
        // ': '                         -> anywhere
        // ',' | '[' | ']' | '{' | '}'  -> flow context
        if (check!(~buffer => b':') && isWhiteSpaceZ!(~buffer, 1))
            || flow_context && isFlowIndicator!(~buffer)
        {
            break 'scalar;
        }

        // Reset whitespace counters for next char / whitespace
        // sequence. We do this here after all possible terminations
        // that could leave trailing whitespace, so we can
        // accurately truncate the trailing whitespace post
        // loop.
        whitespace = 0;
        lines = 0;

        // Handle non whitespace characters
        while !isWhiteSpaceZ!(~buffer)
        {
            cache!(~buffer, 2, opts)?;

            if (check!(~buffer => b':') && isWhiteSpaceZ!(~buffer, 1))
                || flow_context && isFlowIndicator!(~buffer)
            {
                break;
            }

            if !can_borrow
            {
                scratch.push(buffer.as_bytes()[0])
            }
            advance!(buffer, :local_stats, 1);
        }
        // Save last non whitespace character position
        scalar_stats = local_stats.clone();

        // Handle whitespace characters
        loop
        {
            cache!(~buffer, 1, opts)?;

            match (isBlank!(~buffer), isBreak!(~buffer))
            {
                // No more whitespace, exit loop
                (false, false) => break,
                // Handle non break space
                (true, _) =>
                {
                    if !can_borrow
                    {
                        scratch.push(buffer.as_bytes()[0])
                    }
                    whitespace += 1;
                    advance!(buffer, :local_stats, 1);
                },
                // Handle line breaks
                (false, _) =>
                {
                    set_no_borrow(&mut can_borrow, base, buffer, &mut scratch);

                    lines += 1;
                    advance!(buffer, :local_stats, @line);
                },
            }
        }

        // If the whitespace ended at a lower indent, then we're
        // done, and should exit on the next loop
        outdent = block_context && local_stats.column < indent;

        // Handle line joins as needed
        match lines
        {
            // No join needed, we're done
            0 =>
            {},
            // If a single line was recorded, we _cannot_ have seen a line wholly made of
            // whitespace, therefore join via a space
            1 =>
            {
                // Note that we reset whitespace to zero here, so that the
                // post loop truncate doesn't remove characters we've
                // already removed here
                scratch.truncate(scratch.len() - whitespace);
                whitespace = 0;

                scratch.push(SPACE);
            },
            // Else we need to append (n - 1) newlines, as we skip the origin line's break
            _ =>
            {
                // Similarly, we reset whitespace here, but we _also_ set
                // lines to the amount of lines we actually add to the
                // scratch space.
                scratch.truncate(scratch.len() - whitespace);
                whitespace = 0;
                lines -= 1;

                // Safety: we can only reach this branch if lines > 1
                for _ in 0..lines
                {
                    scratch.push(NEWLINE)
                }
            },
        }
    }

    // Trim any trailing whitespace that might be left after
    // exiting the loop
    if !can_borrow
    {
        scratch.truncate(scratch.len() - (whitespace + lines));
    }
    // Note we use the stats which point at the last word read
    let advance = scalar_stats.read - stats.read;

    let slice = match can_borrow
    {
        true => cow!(&base[..advance]),
        false =>
        {
            let utf8 = String::from_utf8(scratch).unwrap();

            cow!(utf8)
        },
    };

    // A plain scalar never keeps boundary whitespace
    if cfg!(debug_assertions)
    {
        let metrics = crate::scanner::scalar::ScalarMetrics::of(&slice, can_borrow);

        debug_assert!(!(metrics.starts_with_ws || metrics.starts_with_lb));
        debug_assert!(!(metrics.ends_with_ws || metrics.ends_with_lb));
    }

    let token = Token::Scalar(slice, ScalarStyle::Plain);
    *stats = scalar_stats;

    Ok((token, advance))
}

pub(in crate::scanner) fn scan_plain_scalar_lazy<'de>(
    opts: Flags,
    base: &'de str,
    stats: &mut MStats,
    indent: usize,
    block_context: bool,
) -> Result<(Deferred<'de>, usize)>
{
    let mut buffer = base;

    let mut local_stats = stats.clone();
    let mut scalar_stats = stats.clone();

    // Have we hit a lower indentation to our starting indent?
    let mut outdent = false;

    // Are we in block/flow context?
    let flow_context = !block_context;

    'scalar: loop
    {
        // 4 is the largest character sequence we can encounter
        // (document indicators)
        cache!(~buffer, 4, opts)?;

        if buffer.is_empty()
        {
            break 'scalar;
        }

        if outdent
        {
            break 'scalar;
        }

        if isDocumentIndicator!(~buffer, :local_stats) || check!(~buffer => b'#')
        {
            break 'scalar;
        }

        if (check!(~buffer => b':') && isWhiteSpaceZ!(~buffer, 1))
            || flow_context && isFlowIndicator!(~buffer)
        {
            break 'scalar;
        }

        // Handle non whitespace characters
        while !isWhiteSpaceZ!(~buffer)
        {
            cache!(~buffer, 2, opts)?;

            if (check!(~buffer => b':') && isWhiteSpaceZ!(~buffer, 1))
                || flow_context && isFlowIndicator!(~buffer)
            {
                break;
            }

            advance!(buffer, :local_stats, 1);
        }
        // Save last non whitespace character position
        scalar_stats = local_stats.clone();

        // Handle whitespace characters
        loop
        {
            cache!(~buffer, 1, opts)?;

            match (isBlank!(~buffer), isBreak!(~buffer))
            {
                // No more whitespace, exit loop
                (false, false) => break,
                // Handle non break space
                (true, _) =>
                {
                    advance!(buffer, :local_stats, 1);
                },
                // Handle line breaks
                (false, _) =>
                {
                    advance!(buffer, :local_stats, @line);
                },
            }
        }

        // If the whitespace ended at a lower indent, then we're
        // done, and should exit on the next loop
        outdent = block_context && local_stats.column < indent;
    }

    let advance = scalar_stats.read - stats.read;
    let slice = &base[..advance];

    // Note we remove O_EXTENDABLE as we've already located the
    // entire scalar
    let lazy = Deferred::new(
        opts & !O_EXTENDABLE,
        slice,
        stats.clone(),
        indent,
        block_context,
    );

    *stats = scalar_stats;

    Ok((lazy, advance))
}

/// JSON unquoted content must be exactly one of the
/// keyword literals or a number; anything else is an error
fn scan_json_literal<'de>(
    opts: Flags,
    base: &'de str,
    stats: &mut MStats,
) -> Result<(Token<'de>, usize)>
{
    let mut buffer = base;

    cache!(~buffer, 1, opts)?;

    while !(isWhiteSpaceZ!(~buffer) || isFlowIndicator!(~buffer) || check!(~buffer => b':'))
    {
        cache!(~buffer, 2, opts)?;
        advance!(buffer, :*stats, 1);
    }

    let advance = base.len() - buffer.len();
    let content = &base[..advance];

    if !is_json_literal(content)
    {
        return Err(ScanError::InvalidJson);
    }

    Ok((Token::Scalar(cow!(content), ScalarStyle::Plain), advance))
}

/// true, false, null, or a JSON number
fn is_json_literal(content: &str) -> bool
{
    matches!(content, "true" | "false" | "null") || is_json_number(content)
}

/// number := '-'? ('0' | [1-9][0-9]*) ('.' [0-9]+)?
///           ([eE] [+-]? [0-9]+)?
fn is_json_number(content: &str) -> bool
{
    let mut bytes = content.as_bytes();

    if let [b'-', rest @ ..] = bytes
    {
        bytes = rest;
    }

    // Integer part: a lone zero, or a non zero lead digit
    match bytes
    {
        [b'0', rest @ ..] => bytes = rest,
        [b'1'..=b'9', ..] =>
        {
            while let [b'0'..=b'9', rest @ ..] = bytes
            {
                bytes = rest;
            }
        },
        _ => return false,
    }

    // Fraction
    if let [b'.', rest @ ..] = bytes
    {
        bytes = rest;

        if !matches!(bytes, [b'0'..=b'9', ..])
        {
            return false;
        }

        while let [b'0'..=b'9', rest @ ..] = bytes
        {
            bytes = rest;
        }
    }

    // Exponent
    if let [b'e', rest @ ..] | [b'E', rest @ ..] = bytes
    {
        bytes = rest;

        if let [b'+', rest @ ..] | [b'-', rest @ ..] = bytes
        {
            bytes = rest;
        }

        if !matches!(bytes, [b'0'..=b'9', ..])
        {
            return false;
        }

        while let [b'0'..=b'9', rest @ ..] = bytes
        {
            bytes = rest;
        }
    }

    bytes.is_empty()
}

/// Handles the trap door from borrowing to copying
fn set_no_borrow(can_borrow: &mut bool, base: &str, buffer: &str, scratch: &mut Vec<u8>)
{
    if *can_borrow
    {
        scratch.extend_from_slice(base[0..base.len() - buffer.len()].as_bytes());
    }

    *can_borrow = false
}

#[derive(Debug, Clone)]
pub(in crate::scanner) struct Deferred<'de>
{
    opts:          Flags,
    slice:         &'de str,
    stats:         MStats,
    indent:        usize,
    block_context: bool,
}

impl<'de> Deferred<'de>
{
    pub fn new(
        opts: Flags,
        slice: &'de str,
        stats: MStats,
        indent: usize,
        block_context: bool,
    ) -> Self
    {
        Self {
            opts,
            slice,
            stats,
            indent,
            block_context,
        }
    }

    pub fn into_token(self) -> Result<Token<'de>>
    {
        let Deferred {
            opts,
            slice,
            mut stats,
            indent,
            block_context,
        } = self;

        scan_plain_scalar_eager(opts, slice, &mut stats, indent, block_context).map(|(t, _)| t)
    }
}

const SPACE: u8 = b' ';
const NEWLINE: u8 = b'\n';
