/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Test cases mixing productions across a whole document

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn kitchen_sink_document()
{
    let data = "---
name: yarrow
list:
  - one
  - {two: 2}
quote: 'yes'
...
";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | DocumentStart,
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("name"), Plain),
        | Value,
        | Scalar(cow!("yarrow"), Plain),
        | Key,
        | Scalar(cow!("list"), Plain),
        | Value,
        | BlockSequenceStart,
        | BlockEntry,
        | Scalar(cow!("one"), Plain),
        | BlockEntry,
        | FlowMappingStart,
        | Key,
        | Scalar(cow!("two"), Plain),
        | Value,
        | Scalar(cow!("2"), Plain),
        | FlowMappingEnd,
        | BlockEnd,
        | Key,
        | Scalar(cow!("quote"), Plain),
        | Value,
        | Scalar(cow!("yes"), SingleQuote),
        | BlockEnd,
        | DocumentEnd,
        | StreamEnd,
        @ None
    );

    assert_eq!(s.scan.stats, stats_of(data));
}

#[test]
fn multi_document_stream()
{
    let data = "---\nfirst: 1\n---\nsecond: 2\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | DocumentStart,
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("first"), Plain),
        | Value,
        | Scalar(cow!("1"), Plain),
        | BlockEnd,
        | DocumentStart,
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("second"), Plain),
        | Value,
        | Scalar(cow!("2"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn sequence_of_mappings()
{
    let data = "- name: a\n  kind: x\n- name: b\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockSequenceStart,
        | BlockEntry,
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("name"), Plain),
        | Value,
        | Scalar(cow!("a"), Plain),
        | Key,
        | Scalar(cow!("kind"), Plain),
        | Value,
        | Scalar(cow!("x"), Plain),
        | BlockEnd,
        | BlockEntry,
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("name"), Plain),
        | Value,
        | Scalar(cow!("b"), Plain),
        | BlockEnd,
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}
