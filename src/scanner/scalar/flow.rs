/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! This module contains the functions responsible for
//! scanning quoted (flow) scalars into Tokens.
//!
//! It exports 3 functions:
//!
//! - scan_flow_scalar
//! - scan_flow_scalar_eager
//! - scan_flow_scalar_lazy
//!
//! The eager variant produces a scalar Token (or an error)
//! that may allocate, unescaping and line joining as the
//! YAML spec requires. The lazy variant only locates the
//! closing quote, deferring all processing (and error
//! detection!) until the caller requests the token.

use crate::{
    scanner::{
        entry::MaybeToken,
        error::{ScanError, ScanResult as Result},
        flag::{Flags, O_EXTENDABLE, O_JSON, O_LAZY},
        scalar::{as_maybe, escape::flow_unescape, escape::EscapeStyle, sizeCheck},
        stats::MStats,
    },
    token::{ScalarStyle, Token},
};

/// Scans a quoted scalar returning an opaque handle to a
/// byte slice that could be a valid scalar.
///
/// This function is a wrapper around
/// scan_flow_scalar_eager and scan_flow_scalar_lazy. See
/// the respective documentation for an explanation.
pub(in crate::scanner) fn scan_flow_scalar<'de>(
    opts: Flags,
    base: &'de str,
    stats: &mut MStats,
    single: bool,
    escapes: EscapeStyle,
) -> Result<(MaybeToken<'de>, usize)>
{
    match opts.contains(O_LAZY)
    {
        true => scan_flow_scalar_lazy(opts, base, stats, single, escapes).map(as_maybe),
        false => scan_flow_scalar_eager(opts, base, stats, single, escapes).map(as_maybe),
    }
}

/// Scans a quoted scalar, returning a Token and the amount
/// read from .base. This function will attempt to borrow
/// from .base, though it must copy if an escape sequence,
/// escaped quote or line join needs processing.
///
/// See:
///     YAML 1.2: Section 7.3.1 / 7.3.2
///     yaml.org/spec/1.2/spec.html#c-quoted(n,c)
pub(in crate::scanner) fn scan_flow_scalar_eager<'de>(
    opts: Flags,
    base: &'de str,
    stats: &mut MStats,
    single: bool,
    escapes: EscapeStyle,
) -> Result<(Token<'de>, usize)>
{
    let mut buffer = base;
    let mut scratch = Vec::new();
    let mut local_stats = stats.clone();

    let json = opts.contains(O_JSON);

    // Tracks if a borrow is possible from the underlying
    // .base
    let mut can_borrow = true;

    // Independently computed processed length, checked
    // against the materialized content in debug builds
    let mut hint: usize = 0;

    let style = match single
    {
        true => ScalarStyle::SingleQuote,
        false => ScalarStyle::DoubleQuote,
    };

    // Eat the left quote
    cache!(~buffer, 1, opts)?;
    advance!(buffer, :local_stats, 1);

    'scalar: loop
    {
        cache!(~buffer, 4, opts)?;

        // EOF without a closing quote is an error
        if buffer.is_empty()
        {
            return Err(ScanError::UnexpectedEOF);
        }

        // A document indicator at column 0 cannot be scalar
        // content
        if isDocumentIndicator!(~buffer, :local_stats)
        {
            return Err(ScanError::InvalidFlowScalar);
        }

        // Consume non whitespace characters
        while !(isBlank!(~buffer) || isBreakZ!(~buffer))
        {
            cache!(~buffer, 2, opts)?;

            // An escaped single quote ('')
            if single && check!(~buffer => [SINGLE, SINGLE, ..])
            {
                set_no_borrow(&mut can_borrow, base, buffer, &mut scratch);

                scratch.push(SINGLE);
                hint += 1;
                advance!(buffer, :local_stats, 2);

                continue;
            }

            // The closing quote
            if single && check!(~buffer => [SINGLE, ..])
            {
                break 'scalar;
            }

            if !single && check!(~buffer => [DOUBLE, ..])
            {
                break 'scalar;
            }

            // An escape sequence
            if !single && check!(~buffer => b'\\')
            {
                // An escaped line break joins lines without a
                // space; leading blanks of the next line are
                // not content
                if isBreak!(~buffer, 1)
                {
                    set_no_borrow(&mut can_borrow, base, buffer, &mut scratch);

                    advance!(buffer, :local_stats, 1);
                    advance!(buffer, :local_stats, @line);

                    cache!(~buffer, 1, opts)?;
                    while isBlank!(~buffer)
                    {
                        cache!(~buffer, 1, opts)?;
                        advance!(buffer, :local_stats, 1);
                    }

                    continue 'scalar;
                }

                set_no_borrow(&mut can_borrow, base, buffer, &mut scratch);

                let start = scratch.len();
                let amt = flow_unescape(buffer, &mut scratch, escapes)?;

                hint += scratch.len() - start;
                advance!(buffer, :local_stats, amt);

                continue;
            }

            // Unescaped control characters are never legal in
            // JSON strings
            if json && buffer.as_bytes()[0] < 0x20
            {
                return Err(ScanError::InvalidJson);
            }

            // Plain content, copy if we cannot borrow
            let width = widthOf!(~buffer);

            if !can_borrow
            {
                scratch.extend_from_slice(&buffer.as_bytes()[..width]);
            }
            hint += width;
            advance!(buffer, :local_stats, width);
        }

        // Track whitespace and line breaks for the fold
        let mut whitespace: usize = 0;
        let mut lines: usize = 0;

        loop
        {
            cache!(~buffer, 1, opts)?;

            match (isBlank!(~buffer), isBreak!(~buffer))
            {
                (false, false) => break,
                // Blanks are content until a break demotes them
                // to separation
                (true, _) =>
                {
                    // A raw tab is a control character to JSON
                    if json && check!(~buffer => b'\t')
                    {
                        return Err(ScanError::InvalidJson);
                    }

                    if !can_borrow
                    {
                        scratch.push(buffer.as_bytes()[0])
                    }
                    whitespace += 1;
                    hint += 1;
                    advance!(buffer, :local_stats, 1);
                },
                (false, _) =>
                {
                    // A quoted scalar cannot span lines in JSON
                    if json
                    {
                        return Err(ScanError::InvalidJson);
                    }

                    set_no_borrow(&mut can_borrow, base, buffer, &mut scratch);

                    lines += 1;
                    advance!(buffer, :local_stats, @line);
                },
            }
        }

        // Apply the fold: blanks around the breaks are
        // separation, a single break becomes a space, n
        // breaks become n-1 line breaks
        if lines > 0
        {
            scratch.truncate(scratch.len() - whitespace);
            hint -= whitespace;

            match lines
            {
                1 =>
                {
                    scratch.push(SPACE);
                    hint += 1;
                },
                n =>
                {
                    for _ in 0..n - 1
                    {
                        scratch.push(NEWLINE)
                    }
                    hint += n - 1;
                },
            }
        }
    }

    // Retrieve the token slice, either from the .base slice,
    // or if we couldn't borrow, the .scratch space
    let slice = match can_borrow
    {
        // Safety: we must be on a code point boundary, as:
        //
        // 1. .base->0 must be a quote
        // 2. .base->.base.len() - .buffer.len() must be a quote
        // 3. .base must be valid UTF8 (its a str)
        true => cow!(&base[1..base.len() - buffer.len()]),
        false =>
        {
            // Safety: characters added to scratch are either:
            //
            // A. added from a str (.base)
            // B. Unescaped into valid UTF8
            let utf8 = String::from_utf8(scratch).unwrap();

            cow!(utf8)
        },
    };

    sizeCheck!(slice, hint);

    // Eat the right quote
    advance!(buffer, :local_stats, 1);

    let advance = base.len() - buffer.len();
    let token = Token::Scalar(slice, style);

    *stats = local_stats;

    Ok((token, advance))
}

/// Locate the end of a quoted scalar without processing it,
/// returning a [`Deferred`] that will perform the eager
/// scan on demand.
pub(in crate::scanner) fn scan_flow_scalar_lazy<'de>(
    opts: Flags,
    base: &'de str,
    stats: &mut MStats,
    single: bool,
    escapes: EscapeStyle,
) -> Result<(Deferred<'de>, usize)>
{
    let mut buffer = base;
    let mut local_stats = stats.clone();

    // Eat the left quote
    cache!(~buffer, 1, opts)?;
    advance!(buffer, :local_stats, 1);

    loop
    {
        cache!(~buffer, 2, opts)?;

        match buffer.as_bytes()
        {
            [] => return Err(ScanError::UnexpectedEOF),

            // Escaped quote, not a terminus
            [SINGLE, SINGLE, ..] if single =>
            {
                advance!(buffer, :local_stats, 2);
            },
            [SINGLE, ..] if single => break,

            [DOUBLE, ..] if !single => break,
            // Skipping the escaped character is enough to
            // never mistake it for the terminus
            [b'\\', _, ..] if !single =>
            {
                advance!(buffer, :local_stats, 2);
            },

            _ if isBreak!(~buffer) =>
            {
                advance!(buffer, :local_stats, @line);
            },
            _ =>
            {
                advance!(buffer, :local_stats, 1);
            },
        }
    }

    // Eat the right quote
    advance!(buffer, :local_stats, 1);

    let advance = base.len() - buffer.len();
    let slice = &base[..advance];

    // Note we remove O_EXTENDABLE as we've already located
    // the entire scalar
    let lazy = Deferred::new(opts & !O_EXTENDABLE, slice, stats.clone(), single, escapes);

    *stats = local_stats;

    Ok((lazy, advance))
}

/// Handles the trap door from borrowing to copying.
///
/// Note the content starts behind the opening quote.
fn set_no_borrow(can_borrow: &mut bool, base: &str, buffer: &str, scratch: &mut Vec<u8>)
{
    if *can_borrow
    {
        scratch.extend_from_slice(base[1..base.len() - buffer.len()].as_bytes());
    }

    *can_borrow = false
}

#[derive(Debug, Clone)]
pub(in crate::scanner) struct Deferred<'de>
{
    opts:    Flags,
    slice:   &'de str,
    stats:   MStats,
    single:  bool,
    escapes: EscapeStyle,
}

impl<'de> Deferred<'de>
{
    pub fn new(
        opts: Flags,
        slice: &'de str,
        stats: MStats,
        single: bool,
        escapes: EscapeStyle,
    ) -> Self
    {
        Self {
            opts,
            slice,
            stats,
            single,
            escapes,
        }
    }

    pub fn into_token(self) -> Result<Token<'de>>
    {
        let Deferred {
            opts,
            slice,
            mut stats,
            single,
            escapes,
        } = self;

        scan_flow_scalar_eager(opts, slice, &mut stats, single, escapes).map(|(t, _)| t)
    }
}

const SINGLE: u8 = b'\'';
const DOUBLE: u8 = b'"';
const SPACE: u8 = b' ';
const NEWLINE: u8 = b'\n';

#[cfg(test)]
mod tests
{
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;
    use ScalarStyle::{DoubleQuote, SingleQuote};

    use super::*;
    use crate::scanner::scalar::test_utils::{normalize, TestResult, TEST_FLAGS};

    const YAML12: EscapeStyle = EscapeStyle::Yaml12;
    const SQ: bool = true;

    #[test]
    fn single_empty() -> TestResult
    {
        let data = "''";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!(""), SingleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, 2);
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn single_simple() -> TestResult
    {
        let data = "'hello world'";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("hello world"), SingleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, 13);
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn single_escaped_quote() -> TestResult
    {
        let data = "'it''s'";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("it's"), SingleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, data.len());
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn single_fold_lines() -> TestResult
    {
        let data = "'a
   b
   c
   d'";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("a b c d"), SingleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, data.len());
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn single_fold_blank_lines() -> TestResult
    {
        let data = "'a

   b'";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("a\nb"), SingleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, data.len());
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn single_interior_whitespace_kept() -> TestResult
    {
        let data = "'a  b   c '";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("a  b   c "), SingleQuote);

        let (token, _amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, SQ, YAML12).and_then(normalize)?;

        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn single_reject_document()
    {
        let data = ["'\n--- '", "'\n---\n'"];

        for (i, &t) in data.iter().enumerate()
        {
            let mut stats = MStats::new();

            let result =
                scan_flow_scalar(TEST_FLAGS, t, &mut stats, SQ, YAML12).and_then(normalize);

            assert!(
                matches!(result, Err(ScanError::InvalidFlowScalar)),
                "on iteration {}, got {:?}",
                i,
                result
            );
        }
    }

    #[test]
    fn single_reject_eof()
    {
        let data = ["'end space ", "'", "'end word"];

        for (i, &t) in data.iter().enumerate()
        {
            let mut stats = MStats::new();

            let result =
                scan_flow_scalar(TEST_FLAGS, t, &mut stats, SQ, YAML12).and_then(normalize);

            assert!(
                matches!(result, Err(ScanError::UnexpectedEOF)),
                "on iteration {}, got {:?}",
                i,
                result
            );
        }
    }

    #[test]
    fn double_simple() -> TestResult
    {
        let data = r#""hello world""#;
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("hello world"), DoubleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, !SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, data.len());
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn double_escapes() -> TestResult
    {
        let data = r#""tab\there \x41 newline\n""#;
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("tab\there A newline\n"), DoubleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, !SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, data.len());
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn double_fold_lines() -> TestResult
    {
        let data = "\"fold\n  me\n  please\"";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("fold me please"), DoubleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, !SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, data.len());
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn double_escaped_break_joins() -> TestResult
    {
        let data = "\"no \\\n  space\"";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("no space"), DoubleQuote);

        let (token, amt) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, !SQ, YAML12).and_then(normalize)?;

        assert_eq!(amt, data.len());
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn double_legacy_alias_flavor() -> TestResult
    {
        let data = r#""\N""#;
        let mut stats = MStats::new();

        // 1.1 flavor accepts the alias
        let (token, _) =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, !SQ, EscapeStyle::Yaml11)
                .and_then(normalize)?;

        assert_eq!(token, Token::Scalar(cow!("\u{0085}"), DoubleQuote));

        // 1.2 flavor does not
        let mut stats = MStats::new();
        let result =
            scan_flow_scalar(TEST_FLAGS, data, &mut stats, !SQ, YAML12).and_then(normalize);

        assert!(matches!(result, Err(ScanError::UnknownEscape)));

        Ok(())
    }

    #[test]
    fn json_reject_multiline()
    {
        let data = "\"two\nlines\"";
        let mut stats = MStats::new();

        let result = scan_flow_scalar(
            TEST_FLAGS | O_JSON,
            data,
            &mut stats,
            !SQ,
            EscapeStyle::Json,
        )
        .and_then(normalize);

        assert!(matches!(result, Err(ScanError::InvalidJson)));
    }

    #[test]
    fn json_reject_control()
    {
        let data = "\"ding\x07\"";
        let mut stats = MStats::new();

        let result = scan_flow_scalar(
            TEST_FLAGS | O_JSON,
            data,
            &mut stats,
            !SQ,
            EscapeStyle::Json,
        )
        .and_then(normalize);

        assert!(matches!(result, Err(ScanError::InvalidJson)));
    }

    #[test]
    fn json_unicode_escape() -> TestResult
    {
        let data = "\"smile \\uD83D\\uDE00\"";
        let mut stats = MStats::new();
        let expected = Token::Scalar(cow!("smile \u{1F600}"), DoubleQuote);

        let (token, amt) = scan_flow_scalar(
            TEST_FLAGS | O_JSON,
            data,
            &mut stats,
            !SQ,
            EscapeStyle::Json,
        )
        .and_then(normalize)?;

        assert_eq!(amt, data.len());
        assert_eq!(token, expected);

        Ok(())
    }

    #[test]
    fn lazy_defers_processing() -> TestResult
    {
        use crate::scanner::flag::O_LAZY;

        let data = "'later ''gator'''";
        let mut stats = MStats::new();

        let (maybe, amt) = scan_flow_scalar(TEST_FLAGS | O_LAZY, data, &mut stats, SQ, YAML12)
            .map_err(|e| anyhow!("unexpected error: {}", e))?;

        assert_eq!(amt, data.len());

        let token = maybe.into_token()?;

        assert_eq!(token, Token::Scalar(cow!("later 'gator'"), SingleQuote));

        Ok(())
    }
}
