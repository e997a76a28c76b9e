/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */


use pretty_assertions::assert_eq;

use super::*;
use crate::{
    event::flag::{O_NIL, O_RESOLVE_ALIASES},
    reader::{borrow::BorrowReader, Reader},
    token::{ScalarStyle::*, StreamEncoding, Token::*},
};

type TestResult<'a> = Result<Event<'a>>;

struct ParseIter<'de>
{
    tokens: Tokens<'de, BorrowReader<'de>>,
    parser: Parser,
}

impl<'de> ParseIter<'de>
{
    fn new(tokens: Tokens<'de, BorrowReader<'de>>) -> Self
    {
        Self::with_flags(tokens, O_NIL)
    }

    fn with_flags(tokens: Tokens<'de, BorrowReader<'de>>, flags: ParseFlags) -> Self
    {
        Self {
            tokens,
            parser: Parser::with_flags(flags),
        }
    }

    fn next_event(&mut self) -> Result<Option<Event<'de>>>
    {
        self.parser.get_next_event(&mut self.tokens)
    }
}

impl<'de> Iterator for ParseIter<'de>
{
    type Item = Result<Event<'de>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        self.next_event().transpose()
    }
}

#[test]
fn empty()
{
    let tokens = tokens![StreamStart(StreamEncoding::UTF8), StreamEnd];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    )
}

#[test]
fn empty_document()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        DocumentStart,
        DocumentEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart @explicit }),
        | event!({ DocumentEnd @explicit }),
        | event!({ StreamEnd}),
        @ None
    )
}

#[test]
fn simple_scalar()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        Scalar(cow!("Scalar only YAML document"), SingleQuote),
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ Scalar node!(scalar!("Scalar only YAML document", SingleQuote), @Root) }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn simple_sequence()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        BlockSequenceStart,
        BlockEntry,
        Scalar(cow!("Entry #1"), DoubleQuote),
        BlockEntry,
        Scalar(cow!("Entry #2"), DoubleQuote),
        BlockEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ SequenceStart @Root }),
        | event!({ Scalar node!(scalar!("Entry #1", DoubleQuote), @Entry) }),
        | event!({ Scalar node!(scalar!("Entry #2", DoubleQuote), @Entry) }),
        | event!({ SequenceEnd }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn simple_mapping()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        BlockMappingStart,
        Key,
        Scalar(cow!("a key"), Plain),
        Value,
        Scalar(cow!("a value"), Plain),
        BlockEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ MappingStart @Root }),
        | event!({ Scalar node!(scalar!("a key", Plain), @Key) }),
        | event!({ Scalar node!(scalar!("a value", Plain), @Value) }),
        | event!({ MappingEnd }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn tags()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        Tag(cow!("!!"), cow!("map")),
        BlockMappingStart,
        Key,
        Tag(cow!("!!"), cow!("str")),
        Scalar(cow!("a key"), Plain),
        Value,
        Tag(cow!("!!"), cow!("str")),
        Scalar(cow!("a value"), Plain),
        BlockEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ MappingStart @Root @"!!", "map" }),
        | event!({ Scalar node!(scalar!("a key", Plain), @Key @"!!", "str") }),
        | event!({ Scalar node!(scalar!("a value", Plain), @Value @"!!", "str") }),
        | event!({ MappingEnd }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn scalar_tag_non_resolvable()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        Tag(cow!("!"), cow!("")),
        Scalar(cow!("Scalar with non-resolvable tag"), DoubleQuote),
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        // Note the absence of a tag
        | event!({ Scalar node!(scalar!("Scalar with non-resolvable tag", DoubleQuote), @Root) }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn error_undefined_tag()
{
    use TestResult as T;

    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        Tag(cow!("!unknown!"), cow!("bad-tag-handle")),
        Scalar(cow!("Scalar with non-resolvable tag"), DoubleQuote),
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        > T::Err(Error::UndefinedTag)
    );
}

#[test]
fn flow_sequence_compact_mapping()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        FlowSequenceStart,
        /* FlowMappingStart */
        Key,
        Scalar(cow!("compact mapping key"), DoubleQuote),
        Value,
        Scalar(cow!("compact mapping value"), DoubleQuote),
        /* FlowMappingEnd */
        FlowSequenceEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ SequenceStart @Root }),
        | event!({ MappingStart @Entry }),
        | event!({ Scalar node!(scalar!("compact mapping key", DoubleQuote), @Key) }),
        | event!({ Scalar node!(scalar!("compact mapping value", DoubleQuote), @Value) }),
        | event!({ MappingEnd }),
        | event!({ SequenceEnd }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn block_mapping_value_implied()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        BlockMappingStart,
        Key,
        Scalar(cow!("key 1"), Plain),
        Value,
        /* Scalar, */
        Key,
        Scalar(cow!("key 2"), Plain),
        Value,
        Scalar(cow!("value 2"), Plain),
        BlockEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ MappingStart @Root }),
        | event!({ Scalar node!(scalar!("key 1", Plain), @Key) }),
        | event!({ Scalar node!(scalar!("", Plain), @Value) }),
        | event!({ Scalar node!(scalar!("key 2", Plain), @Key) }),
        | event!({ Scalar node!(scalar!("value 2", Plain), @Value) }),
        | event!({ MappingEnd }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn flow_mapping_bare_value_implies_key()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        FlowMappingStart,
        /* Key */
        Value,
        Scalar(cow!("a value"), Plain),
        FlowMappingEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ MappingStart @Root }),
        | event!({ Scalar node!(scalar!("", Plain), @Key) }),
        | event!({ Scalar node!(scalar!("a value", Plain), @Value) }),
        | event!({ MappingEnd }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn flow_mapping_key_singleton()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        FlowMappingStart,
        /* Key */
        Scalar(cow!("singleton key"), SingleQuote),
        /* Value */
        /* Scalar */
        FlowMappingEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ MappingStart @Root }),
        | event!({ Scalar node!(scalar!("singleton key", SingleQuote), @Key) }),
        | event!({ Scalar node!(scalar!("", Plain), @Value) }),
        | event!({ MappingEnd }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn node_anchor_implied()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        Anchor(cow!("empty")),
        /* Scalar */
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ Scalar node!(scalar!("", Plain), @Root &"empty") }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn multi_document_implied()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        DocumentStart,
        Scalar(cow!("Document 1"), SingleQuote),
        DocumentEnd,
        /* DocumentStart */
        Scalar(cow!("Document 2"), SingleQuote),
        /* DocumentEnd */
        DocumentStart,
        Scalar(cow!("Document 3"), SingleQuote),
        /* DocumentEnd */
        DocumentStart,
        Scalar(cow!("Document 4"), SingleQuote),
        DocumentEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart @explicit }),
        | event!({ Scalar node!(scalar!("Document 1", SingleQuote), @Root) }),
        | event!({ DocumentEnd @explicit }),
        | event!({ DocumentStart }),
        | event!({ Scalar node!(scalar!("Document 2", SingleQuote), @Root) }),
        | event!({ DocumentEnd }),
        | event!({ DocumentStart @explicit }),
        | event!({ Scalar node!(scalar!("Document 3", SingleQuote), @Root) }),
        | event!({ DocumentEnd }),
        | event!({ DocumentStart @explicit }),
        | event!({ Scalar node!(scalar!("Document 4", SingleQuote), @Root) }),
        | event!({ DocumentEnd @explicit }),
        | event!({ StreamEnd}),
        @ None
    )
}

#[test]
fn multi_document_directives()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        VersionDirective(1, 2),
        TagDirective(cow!("!test1!"), cow!("doc1.1")),
        DocumentStart,
        DocumentEnd,
        TagDirective(cow!("!test1!"), cow!("doc2.1")),
        VersionDirective(1, 1),
        TagDirective(cow!("!test2!"), cow!("doc2.2")),
        DocumentStart,
        DocumentEnd,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart @explicit 1,2 [{"!test1!", "doc1.1"}] }),
        | event!({ DocumentEnd @explicit }),
        | event!({ DocumentStart @explicit 1,1 [{"!test1!", "doc2.1"}, {"!test2!", "doc2.2"}] }),
        | event!({ DocumentEnd @explicit }),
        | event!({ StreamEnd}),
        @ None
    )
}

#[test]
fn error_duplicate_version()
{
    use TestResult as T;

    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        VersionDirective(1, 2),
        VersionDirective(1, 2),
        DocumentStart,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        > T::Err(Error::DuplicateVersion)
    )
}

#[test]
fn error_unsupported_version()
{
    use TestResult as T;

    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        VersionDirective(2, 0),
        DocumentStart,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        > T::Err(Error::UnsupportedVersion)
    )
}

#[test]
fn error_duplicate_tag_directive()
{
    use TestResult as T;

    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        TagDirective(cow!("!dup!"), cow!("one:")),
        TagDirective(cow!("!dup!"), cow!("two:")),
        DocumentStart,
        StreamEnd
    ];

    events!(tokens =>
        | event!({ StreamStart }),
        > T::Err(Error::DuplicateTagDirective)
    )
}

#[test]
fn alias_resolution_accepts_known()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        BlockSequenceStart,
        BlockEntry,
        Anchor(cow!("a")),
        Scalar(cow!("42"), Plain),
        BlockEntry,
        Alias(cow!("a")),
        BlockEnd,
        StreamEnd
    ];

    events!(@flags O_RESOLVE_ALIASES, tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ SequenceStart @Root }),
        | event!({ Scalar node!(scalar!("42", Plain), @Entry &"a") }),
        | event!({ Alias "a" }),
        | event!({ SequenceEnd }),
        | event!({ DocumentEnd }),
        | event!({ StreamEnd }),
        @ None
    );
}

#[test]
fn alias_resolution_rejects_unknown()
{
    use TestResult as T;

    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        BlockSequenceStart,
        BlockEntry,
        Anchor(cow!("a")),
        Scalar(cow!("42"), Plain),
        BlockEntry,
        Alias(cow!("missing")),
        BlockEnd,
        StreamEnd
    ];

    events!(@flags O_RESOLVE_ALIASES, tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart }),
        | event!({ SequenceStart @Root }),
        | event!({ Scalar node!(scalar!("42", Plain), @Entry &"a") }),
        > T::Err(Error::UndefinedAlias)
    );
}

#[test]
fn alias_resolution_is_per_document()
{
    use TestResult as T;

    // The anchor lives in document 1; document 2 cannot
    // alias it
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        DocumentStart,
        Anchor(cow!("a")),
        Scalar(cow!("one"), Plain),
        DocumentEnd,
        DocumentStart,
        Alias(cow!("a")),
        DocumentEnd,
        StreamEnd
    ];

    events!(@flags O_RESOLVE_ALIASES, tokens =>
        | event!({ StreamStart }),
        | event!({ DocumentStart @explicit }),
        | event!({ Scalar node!(scalar!("one", Plain), @Root &"a") }),
        | event!({ DocumentEnd @explicit }),
        | event!({ DocumentStart @explicit }),
        > T::Err(Error::UndefinedAlias)
    );
}

#[test]
fn depth_limit_bounds_nesting()
{
    use std::iter::FromIterator;

    use crate::{
        queue::Queue,
        reader::{PeekReader, Reader},
        scanner::{entry::TokenEntry, flag::O_ZEROED},
    };

    // Far deeper than the default limit allows
    let tokens = Queue::from_iter(
        std::iter::once(StreamStart(StreamEncoding::UTF8))
            .chain((0..2048).map(|_| FlowSequenceStart))
            .map(|token| TokenEntry::new(token, 0)),
    );

    let reader = BorrowReader::new("");
    let peek = PeekReader::new(Reader::from_parts(&reader, O_ZEROED, tokens, true));
    let mut iter = ParseIter::new(peek);

    let error = loop
    {
        match iter.next()
        {
            Some(Ok(_)) => continue,
            Some(Err(e)) => break e,
            None => panic!("expected DepthLimitExceeded, stream finished instead"),
        }
    };

    assert_eq!(error, Error::DepthLimitExceeded);

    // Errors latch; nothing more is produced
    assert!(iter.next().is_none());
}

#[test]
fn errors_are_sticky()
{
    let tokens = tokens![
        StreamStart(StreamEncoding::UTF8),
        Tag(cow!("!unknown!"), cow!("suffix")),
        Scalar(cow!("x"), Plain),
        StreamEnd
    ];

    let reader = BorrowReader::new("");
    let peek = PeekReader::new(Reader::from_parts(&reader, crate::scanner::flag::O_ZEROED, tokens, true));
    let mut iter = ParseIter::new(peek);

    // StreamStart, DocumentStart, then the failure
    assert!(matches!(iter.next(), Some(Ok(_))));
    assert!(matches!(iter.next(), Some(Ok(_))));
    assert!(matches!(iter.next(), Some(Err(Error::UndefinedTag))));

    // All further calls return nothing
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
}
