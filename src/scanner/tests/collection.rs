/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Test cases specific to block and flow collections

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn block_mapping_simple()
{
    let data = "foo: bar\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("foo"), Plain),
        | Value,
        | Scalar(cow!("bar"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );

    assert_eq!(s.scan.stats, stats_of(data));
}

#[test]
fn block_sequence_under_key()
{
    let data = "items:\n  - 1\n  - 2\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("items"), Plain),
        | Value,
        | BlockSequenceStart,
        | BlockEntry,
        | Scalar(cow!("1"), Plain),
        | BlockEntry,
        | Scalar(cow!("2"), Plain),
        | BlockEnd,
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn block_sequence_zero_indented()
{
    let data = "key:\n- a\n- b\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("key"), Plain),
        | Value,
        | BlockSequenceStart,
        | BlockEntry,
        | Scalar(cow!("a"), Plain),
        | BlockEntry,
        | Scalar(cow!("b"), Plain),
        | BlockEnd,
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn flow_sequence_simple()
{
    let data = "[a, b]";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | FlowSequenceStart,
        | Scalar(cow!("a"), Plain),
        | FlowEntry,
        | Scalar(cow!("b"), Plain),
        | FlowSequenceEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn flow_mapping_simple()
{
    let data = "{a: b}";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | FlowMappingStart,
        | Key,
        | Scalar(cow!("a"), Plain),
        | Value,
        | Scalar(cow!("b"), Plain),
        | FlowMappingEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn flow_nested()
{
    let data = "[ {x: 1}, [y] ]";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | FlowSequenceStart,
        | FlowMappingStart,
        | Key,
        | Scalar(cow!("x"), Plain),
        | Value,
        | Scalar(cow!("1"), Plain),
        | FlowMappingEnd,
        | FlowEntry,
        | FlowSequenceStart,
        | Scalar(cow!("y"), Plain),
        | FlowSequenceEnd,
        | FlowSequenceEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn flow_sequence_as_implicit_key()
{
    let data = "[a]: b\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | FlowSequenceStart,
        | Scalar(cow!("a"), Plain),
        | FlowSequenceEnd,
        | Value,
        | Scalar(cow!("b"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn flow_mismatched_closer()
{
    let data = "[a}";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | FlowSequenceStart,
        | Scalar(cow!("a"), Plain),
        > ScanError::MismatchedFlowCollection
    );
}

#[test]
fn flow_double_colon_quirk()
{
    // 'a::b' in flow is a plain scalar, the colons are
    // content until followed by whitespace
    let data = "{a::b: c}";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | FlowMappingStart,
        | Key,
        | Scalar(cow!("a::b"), Plain),
        | Value,
        | Scalar(cow!("c"), Plain),
        | FlowMappingEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn block_entry_requires_context()
{
    // A block entry cannot interrupt a flow collection
    let data = "[\n    - a]";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | FlowSequenceStart,
        > ScanError::InvalidBlockEntry
    );
}
