/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Test cases specific to anchors and aliases

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn anchor_and_alias()
{
    let data = "- &a 42\n- *a\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockSequenceStart,
        | BlockEntry,
        | Anchor(cow!("a")),
        | Scalar(cow!("42"), Plain),
        | BlockEntry,
        | Alias(cow!("a")),
        | BlockEnd,
        | StreamEnd,
        @ None
    );

    assert_eq!(s.scan.stats, stats_of(data));
}

#[test]
fn anchor_with_tag()
{
    let data = "&x !!str val";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | Anchor(cow!("x")),
        | Tag(cow!("!!"), cow!("str")),
        | Scalar(cow!("val"), Plain),
        | StreamEnd,
        @ None
    );
}

#[test]
fn anchor_key_value()
{
    let data = "&anchor key: value\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Anchor(cow!("anchor")),
        | Scalar(cow!("key"), Plain),
        | Value,
        | Scalar(cow!("value"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn empty_anchor_name_rejected()
{
    let data = "& oops";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        > ScanError::InvalidAnchorName
    );
}
