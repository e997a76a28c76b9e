/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! This module exposes methods for directly interacting
//! with YAML event streams.
//!
//! ## Understanding Events
//!
//! Each event produced represents an important semantic
//! change in the underlying YAML byte stream. Broadly,
//! these can be categorized into three spaces:
//!
//! 1. Virtual / Marker
//!     - [`StreamStart`]
//!     - [`StreamEnd`]
//!     - [`DocumentStart`]
//!     - [`DocumentEnd`]
//!
//! 2. Nesting change (+-)
//!     - [`MappingStart`]
//!     - [`MappingEnd`]
//!     - [`SequenceStart`]
//!     - [`SequenceEnd`]
//!
//! 3. Data / Alias
//!     - [`Scalar`]
//!     - [`Alias`]
//!
//! Together, these are used to produce the following
//! productions:
//!
//! ```text
//! stream          := StreamStart document+ StreamEnd
//! document        := DocumentStart content? DocumentEnd
//! content         := Scalar | collection
//! collection      := sequence | mapping
//! sequence        := SequenceStart node* SequenceEnd
//! mapping         := MappingStart (node node)* MappingEnd
//! node            := Alias | content
//!
//! ?               => 0 or 1 of prefix
//! *               => 0 or more of prefix
//! +               => 1 or more of prefix
//! ()              => production grouping
//! |               => production logical OR
//! ```
//!
//! In addition to the various [`Event`] types, every
//! [`Node`] also provides a hint as to its placement in the
//! stream via its [`NodeKind`]. Together, these should
//! allow users to maintain relatively little external state
//! regarding the [`Event`] stream, beyond anything they
//! wish to collect from the stream.
//!
//! ## Producing Events
//!
//! [`Events`] ties a [`Read`] source to a parser:
//!
//! ```rust
//! use yarrow::{event::{flag::O_NIL, Events}, reader::from_utf8};
//!
//! let source = from_utf8("lang: rust");
//! let mut events = Events::new(&source, O_NIL);
//!
//! while let Some(event) = events.next_event()
//! {
//!     let _event = event?;
//!     // consume the event
//! }
//! # Ok::<(), yarrow::Error>(())
//! ```
//!
//! [`StreamStart`]:    enum@types::EventData::StreamStart
//! [`StreamEnd`]:      enum@types::EventData::StreamEnd
//! [`DocumentStart`]:  enum@types::EventData::DocumentStart
//! [`DocumentEnd`]:    enum@types::EventData::DocumentEnd
//! [`MappingStart`]:   enum@types::EventData::MappingStart
//! [`MappingEnd`]:     enum@types::EventData::MappingEnd
//! [`SequenceStart`]:  enum@types::EventData::SequenceStart
//! [`SequenceEnd`]:    enum@types::EventData::SequenceEnd
//! [`Scalar`]:         enum@types::EventData::Scalar
//! [`Alias`]:          enum@types::EventData::Alias
//! [`Node`]:           struct@types::Node
//! [`NodeKind`]:       enum@types::NodeKind
//! [`Event`]:          struct@types::Event
//! [`Read`]:           trait@crate::reader::Read

mod parser;
mod state;

pub mod error;
pub mod flag;
pub mod types;

use crate::{
    error::Error,
    event::{flag::Flags, parser::Parser, types::Event},
    reader::{PeekReader, Read, Reader},
};

/// An event stream over a [`Read`] source.
///
/// This is the primary entry point of the library: it owns
/// the scanning and parsing state for one YAML stream and
/// yields [`Event`]s until the stream finishes or fails.
#[derive(Debug)]
pub struct Events<'de, T>
{
    parser: Parser,
    reader: PeekReader<'de, T>,
}

impl<'de, T> Events<'de, T>
where
    T: Read,
{
    /// Instantiate a new event stream over .source with the
    /// given .opts
    pub fn new(source: &'de T, opts: Flags) -> Self
    {
        let reader = Reader::new(source, flag::as_scanner(opts));

        Self {
            parser: Parser::with_flags(opts),
            reader: PeekReader::new(reader),
        }
    }

    /// Fetch the next [`Event`], or None once the stream
    /// has finished (or failed)
    #[allow(clippy::should_implement_trait)]
    pub fn next_event(&mut self) -> Option<Result<Event<'de>, Error>>
    {
        self.parser
            .next_event(&mut self.reader)
            .map(|result| result.map_err(Into::into))
    }
}

impl<'de, T> Iterator for Events<'de, T>
where
    T: Read,
{
    type Item = Result<Event<'de>, Error>;

    fn next(&mut self) -> Option<Self::Item>
    {
        self.next_event()
    }
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::{
        flag::{O_JSON_FORCE, O_NIL},
        types::{EventData, ScalarLike},
        Events,
    };
    use crate::{reader::from_utf8, Category};

    /// Flatten an event stream into comparable labels
    fn trace(source: &str) -> Vec<String>
    {
        let reader = from_utf8(source);
        let events = Events::new(&reader, O_NIL);

        events
            .map(|event| {
                let event = event.expect("a valid event stream");

                match event.data()
                {
                    EventData::StreamStart(_) => "+STR".into(),
                    EventData::StreamEnd => "-STR".into(),
                    EventData::DocumentStart(d) => match d.implicit
                    {
                        true => "+DOC".into(),
                        false => "+DOC ---".into(),
                    },
                    EventData::DocumentEnd(d) => match d.implicit
                    {
                        true => "-DOC".into(),
                        false => "-DOC ...".into(),
                    },
                    EventData::MappingStart(_) => "+MAP".into(),
                    EventData::MappingEnd => "-MAP".into(),
                    EventData::SequenceStart(_) => "+SEQ".into(),
                    EventData::SequenceEnd => "-SEQ".into(),
                    EventData::Alias(alias) => format!("*{}", alias.name),
                    EventData::Scalar(node) =>
                    {
                        let anchor = node
                            .anchor
                            .as_ref()
                            .map(|a| format!("&{} ", a))
                            .unwrap_or_default();

                        match node.content
                        {
                            ScalarLike::Eager(ref scalar) =>
                            {
                                format!("={}{:?}", anchor, scalar.data())
                            },
                            ScalarLike::Lazy(_) => "=<lazy>".into(),
                        }
                    },
                }
            })
            .collect()
    }

    #[test]
    fn flat_mapping()
    {
        assert_eq!(
            trace("foo: bar\n"),
            [
                "+STR",
                "+DOC",
                "+MAP",
                "=\"foo\"",
                "=\"bar\"",
                "-MAP",
                "-DOC",
                "-STR"
            ]
        );
    }

    #[test]
    fn block_sequence_under_key()
    {
        assert_eq!(
            trace("items:\n  - 1\n  - 2\n"),
            [
                "+STR",
                "+DOC",
                "+MAP",
                "=\"items\"",
                "+SEQ",
                "=\"1\"",
                "=\"2\"",
                "-SEQ",
                "-MAP",
                "-DOC",
                "-STR"
            ]
        );
    }

    #[test]
    fn anchor_and_alias()
    {
        assert_eq!(
            trace("- &a 42\n- *a\n"),
            [
                "+STR",
                "+DOC",
                "+SEQ",
                "=&a \"42\"",
                "*a",
                "-SEQ",
                "-DOC",
                "-STR"
            ]
        );
    }

    #[test]
    fn folded_block_scalar_keeps_breaks()
    {
        assert_eq!(
            trace("key: >+\n  one\n  two\n\n\n"),
            [
                "+STR",
                "+DOC",
                "+MAP",
                "=\"key\"",
                "=\"one two\\n\\n\\n\"",
                "-MAP",
                "-DOC",
                "-STR"
            ]
        );
    }

    #[test]
    fn empty_stream_still_frames_a_document()
    {
        assert_eq!(trace(""), ["+STR", "+DOC", "-DOC", "-STR"]);
    }

    #[test]
    fn bom_only_stream()
    {
        assert_eq!(trace("\u{FEFF}"), ["+STR", "+DOC", "-DOC", "-STR"]);
    }

    #[test]
    fn explicit_document_markers()
    {
        assert_eq!(
            trace("---\nvalue\n...\n"),
            ["+STR", "+DOC ---", "=\"value\"", "-DOC ...", "-STR"]
        );
    }

    #[test]
    fn document_marker_splits_documents()
    {
        assert_eq!(
            trace("one\n---\ntwo\n"),
            [
                "+STR",
                "+DOC",
                "=\"one\"",
                "-DOC",
                "+DOC ---",
                "=\"two\"",
                "-DOC",
                "-STR"
            ]
        );
    }

    #[test]
    fn json_force_rejects_single_quotes()
    {
        let reader = from_utf8("{'a': 1}");
        let mut events = Events::new(&reader, O_JSON_FORCE);

        let error = loop
        {
            match events.next_event()
            {
                Some(Ok(_)) => continue,
                Some(Err(e)) => break e,
                None => panic!("expected a syntax error"),
            }
        };

        assert_eq!(error.classify(), Category::Syntax);
    }

    #[test]
    fn event_stream_is_well_formed()
    {
        // Every start nests against its end, with the
        // stream/document framing around all content
        let source = "---\na: [1, {b: c}]\nd: |\n  text\n...\n";

        let reader = from_utf8(source);
        let events = Events::new(&reader, O_NIL);

        let mut depth = 0i32;
        let mut documents = 0;

        for (index, event) in events.enumerate()
        {
            let event = event.expect("a valid event stream");

            match event.data()
            {
                EventData::StreamStart(_) => assert_eq!(index, 0),
                EventData::DocumentStart(_) =>
                {
                    documents += 1;
                    assert_eq!(depth, 0);
                },
                EventData::MappingStart(_) | EventData::SequenceStart(_) => depth += 1,
                EventData::MappingEnd | EventData::SequenceEnd =>
                {
                    depth -= 1;
                    assert!(depth >= 0);
                },
                EventData::DocumentEnd(_) => assert_eq!(depth, 0),
                _ =>
                {},
            }
        }

        assert_eq!(depth, 0);
        assert_eq!(documents, 1);
    }
}

