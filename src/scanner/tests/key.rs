/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Test cases specific to mapping keys, implicit and
//! explicit

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn implicit_key()
{
    let data = "a: b\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("a"), Plain),
        | Value,
        | Scalar(cow!("b"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );

    assert_eq!(s.scan.stats, stats_of(data));
}

#[test]
fn explicit_key()
{
    let data = "? key\n: value\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("key"), Plain),
        | Value,
        | Scalar(cow!("value"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn quoted_key()
{
    let data = "\"a key\": value\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("a key"), DoubleQuote),
        | Value,
        | Scalar(cow!("value"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn nested_mappings()
{
    let data = "outer:\n  inner: leaf\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("outer"), Plain),
        | Value,
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("inner"), Plain),
        | Value,
        | Scalar(cow!("leaf"), Plain),
        | BlockEnd,
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn required_key_without_value_errors()
{
    // 'b' sits at the mapping's indent so it must be a key,
    // but the stream ends before any ':'
    let data = "a: 1\nb\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("a"), Plain),
        | Value,
        | Scalar(cow!("1"), Plain),
        | Scalar(cow!("b"), Plain),
        > ScanError::MissingValue
    );
}
