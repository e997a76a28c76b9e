/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Test cases covering scalars in full token streams

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn plain_root_scalar()
{
    let data = "hello world";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | Scalar(cow!("hello world"), Plain),
        | StreamEnd,
        @ None
    );
}

#[test]
fn plain_multiline_joins()
{
    let data = "multi\n line\n scalar";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | Scalar(cow!("multi line scalar"), Plain),
        | StreamEnd,
        @ None
    );
}

#[test]
fn single_quoted_root_scalar()
{
    let data = "'quoted here'";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | Scalar(cow!("quoted here"), SingleQuote),
        | StreamEnd,
        @ None
    );
}

#[test]
fn double_quoted_escapes()
{
    let data = r#""tab:\t unicode:\x41""#;
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | Scalar(cow!("tab:\t unicode:A"), DoubleQuote),
        | StreamEnd,
        @ None
    );
}

#[test]
fn block_scalar_value()
{
    let data = "key: |\n  literal\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("key"), Plain),
        | Value,
        | Scalar(cow!("literal\n"), Literal),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn folded_keep_chomp_value()
{
    // The keep chomp preserves every trailing line break
    let data = "key: >+\n  one\n  two\n\n\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("key"), Plain),
        | Value,
        | Scalar(cow!("one two\n\n\n"), Folded),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn scalar_ends_at_comment()
{
    let data = "value # trailing noise\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | Scalar(cow!("value"), Plain),
        | StreamEnd,
        @ None
    );
}

#[test]
fn unclosed_quote_errors()
{
    let data = "'no terminus";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        > ScanError::UnexpectedEOF
    );
}

#[test]
fn version_switches_escape_dialect()
{
    // 1.1 documents accept the \N alias...
    let data = "%YAML 1.1\n---\n\"\\N\"";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | VersionDirective(1, 1),
        | DocumentStart,
        | Scalar(cow!("\u{0085}"), DoubleQuote),
        | StreamEnd,
        @ None
    );

    // ...1.2 documents do not
    let data = "\"\\N\"";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        > ScanError::UnknownEscape
    );
}
