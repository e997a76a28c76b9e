/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Test cases specific to whitespace, tabs and comments

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn comments_are_chomped()
{
    let data = "# leading comment\nkey: value # trailing\n# closing\n";
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

    assert_eq!(s.scan.stats, stats_of(data));
}

#[test]
fn comments_preserved_on_request()
{
    let data = "key: value # trailing\n";
    let mut s = ScanIter::with_flags(data, TEST_FLAGS | O_COMMENTS);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("key"), Plain),
        | Value,
        | Scalar(cow!("value"), Plain),
        | Comment(cow!("# trailing")),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn tab_indentation_rejected()
{
    let data = "a:\n\tb: c\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("a"), Plain),
        | Value,
        > ScanError::InvalidTab
    );
}

#[test]
fn tab_before_flow_opener_allowed()
{
    let data = "a:\n\t[1, 2]\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("a"), Plain),
        | Value,
        | FlowSequenceStart,
        | Scalar(cow!("1"), Plain),
        | FlowEntry,
        | Scalar(cow!("2"), Plain),
        | FlowSequenceEnd,
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn tab_after_block_entry_allowed()
{
    // Tabs are permitted after '-' in block sequences
    let data = "-\tone\n-\ttwo\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockSequenceStart,
        | BlockEntry,
        | Scalar(cow!("one"), Plain),
        | BlockEntry,
        | Scalar(cow!("two"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn configured_tabsize_accepts_tab_indent()
{
    let data = "a:\n\tb: c\n";

    let mut scanner = Scanner::with_tabsize(8);
    let mut tokens = Tokens::new();

    // With a tabsize, the tab indented line is legal
    let mut markers = Vec::new();

    loop
    {
        match scanner.scan_tokens(TEST_FLAGS, data, &mut tokens)
        {
            Ok(0) => break,
            Ok(_) =>
            {
                while let Some(entry) = tokens.pop()
                {
                    markers.push(entry.marker());
                }
            },
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(
        markers,
        vec![
            Marker::StreamStart,
            Marker::BlockMappingStart,
            Marker::Key,
            Marker::Scalar,
            Marker::Value,
            Marker::BlockMappingStart,
            Marker::Key,
            Marker::Scalar,
            Marker::Value,
            Marker::Scalar,
            Marker::BlockEnd,
            Marker::BlockEnd,
            Marker::StreamEnd,
        ]
    );
}
