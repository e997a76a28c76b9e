/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use std::ops::Add;

use crate::{
    scanner::error::{ScanError, ScanResult as Result},
    token::Marker,
};

/// Indent of a stream before any block context is opened
pub(in crate::scanner) const STARTING_INDENT: Indent = Indent(None);

/// Manages the current YAML context. Contexts are mutually
/// exclusive, that is, you cannot be in both a Flow and
/// Block context simultaneously. Furthermore, it is
/// possible to have deeper levels of Flow nested inside of
/// Flow or Block contexts, but you cannot have a Block
/// context nested inside a Flow context, and this structure
/// will ignore attempts to start a Block context while
/// inside a Flow context.
#[derive(Debug, Clone, Default)]
pub(in crate::scanner) struct Context
{
    // Flow context fields
    flow: Vec<FlowKind>,

    // Block context fields
    indents: Vec<IndentEntry>,
}

impl Context
{
    const MAX_RESERVE_AFTER_RESET: usize = 64;

    /// Instantiate a new Context
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Reset Context to starting state, typically this
    /// should be used when moving documents
    pub fn reset(&mut self)
    {
        self.flow.clear();
        self.indents.clear();

        self.flow.shrink_to(Self::MAX_RESERVE_AFTER_RESET);
        self.indents.shrink_to(Self::MAX_RESERVE_AFTER_RESET);
    }

    /// Get the current flow level
    pub fn flow(&self) -> usize
    {
        self.flow.len()
    }

    /// Check if we are currently in the flow context
    pub fn is_flow(&self) -> bool
    {
        !self.flow.is_empty()
    }

    /// Check if we are currently in the block context
    pub fn is_block(&self) -> bool
    {
        !self.is_flow()
    }

    /// The kind of the innermost flow collection, if any
    pub fn flow_kind(&self) -> Option<FlowKind>
    {
        self.flow.last().copied()
    }

    /// Open a flow collection of the given .kind, returning
    /// the new flow level
    pub fn flow_increment(&mut self, kind: FlowKind) -> Result<usize>
    {
        if self.flow.len() == usize::MAX
        {
            return Err(ScanError::IntOverflow);
        }

        self.flow.push(kind);

        Ok(self.flow.len())
    }

    /// Close the innermost flow collection, returning its
    /// kind
    pub fn flow_decrement(&mut self) -> Result<FlowKind>
    {
        self.flow.pop().ok_or(ScanError::IntOverflow)
    }

    /// Get the current indent level
    pub fn indent(&self) -> Indent
    {
        self.indents.last().map(|entry| entry.indent).into()
    }

    /// View the indent frame stack
    pub fn indents(&self) -> &[IndentEntry]
    {
        &self.indents
    }

    /// Mutably view the indent frame stack
    pub fn indents_mut(&mut self) -> &mut Vec<IndentEntry>
    {
        &mut self.indents
    }

    /// Push a new indent frame at .column, if not in the
    /// flow context and .column is deeper than the current
    /// indent
    pub fn indent_increment(&mut self, column: usize, line: usize, map: bool) -> Result<Indent>
    {
        if self.is_block() && self.indent() < column
        {
            let kind = match map
            {
                true => Marker::BlockMappingStart,
                false => Marker::BlockSequenceStart,
            };

            self.indents.push(IndentEntry {
                indent: column,
                line,
                kind,
                zero_indented: false,
            });
        }

        Ok(self.indent())
    }

    /// Pop indent frames calling .f for every level until
    /// .column >= current_indent, returning the number of
    /// levels popped
    pub fn indent_decrement<T, F>(&mut self, column: T, mut f: F) -> Result<usize>
    where
        T: Into<Indent>,
        F: FnMut(usize) -> Result<()>,
    {
        let column = column.into();
        let old = self.indents.len();

        if self.is_block()
        {
            while self.indent() > column
            {
                // Note the pop cannot fail while indent() is Some
                let entry = self.indents.pop().expect("indent stack empty");

                f(entry.indent)?;
            }
        }

        Ok(old - self.indents.len())
    }

    /// Pop a single indent frame, calling .f with its
    /// indent level
    pub fn pop_indent<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(usize) -> Result<()>,
    {
        if let Some(entry) = self.indents.pop()
        {
            f(entry.indent)?;
        }

        Ok(())
    }
}

/// A frame on the indent stack: one open block collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub(in crate::scanner) struct IndentEntry
{
    indent: usize,

    /// Line this frame was opened on, updated for zero
    /// indented sequences as entries are consumed
    pub line: usize,

    /// Which block collection opened this frame
    pub kind: Marker,

    /// Set when this frame belongs to a sequence opened at
    /// its parent mapping's indentation level
    pub zero_indented: bool,
}

impl IndentEntry
{
    pub fn indent(&self) -> usize
    {
        self.indent
    }
}

/// The two flavors of flow collection, tracked for closer
/// matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(in crate::scanner) enum FlowKind
{
    Sequence,
    Mapping,
}

/// A wrapper around usize, that allows it us to express the
/// "-1"nth indent without needing to use a signed type.
/// This occurs when we have not yet encountered the first
/// map node, and thus the entire document could be a scalar
/// (or sequence!), in which case we don't really have an
/// indent so to speak, hence the "-1"nth-ness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub(in crate::scanner) struct Indent(Option<usize>);

impl Indent
{
    /// Collapse to a usize, treating the pre-stream indent
    /// as column 0
    pub fn as_usize(&self) -> usize
    {
        self.0.unwrap_or(0)
    }
}

impl From<usize> for Indent
{
    fn from(indent: usize) -> Self
    {
        Self(Some(indent))
    }
}

impl From<Option<usize>> for Indent
{
    fn from(maybe: Option<usize>) -> Self
    {
        Self(maybe)
    }
}

impl PartialEq<usize> for Indent
{
    fn eq(&self, other: &usize) -> bool
    {
        match self.0
        {
            Some(ref indent) => indent == other,
            None => false,
        }
    }
}

impl PartialOrd<usize> for Indent
{
    fn partial_cmp(&self, other: &usize) -> Option<std::cmp::Ordering>
    {
        match self.0
        {
            Some(indent) => indent.partial_cmp(other),
            None => Some(std::cmp::Ordering::Less),
        }
    }
}

impl Add<usize> for Indent
{
    type Output = usize;

    fn add(self, rhs: usize) -> Self::Output
    {
        match self.0
        {
            Some(indent) => indent + rhs,
            None => rhs,
        }
    }
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn indent_tracks_frames()
    {
        let mut cxt = Context::new();

        assert_eq!(cxt.indent(), STARTING_INDENT);

        cxt.indent_increment(0, 0, true).unwrap();
        cxt.indent_increment(2, 0, false).unwrap();

        assert_eq!(cxt.indent(), 2);
        assert_eq!(cxt.indents().len(), 2);
    }

    #[test]
    fn indent_ignores_shallower()
    {
        let mut cxt = Context::new();

        cxt.indent_increment(4, 0, true).unwrap();
        cxt.indent_increment(2, 0, true).unwrap();

        assert_eq!(cxt.indent(), 4);
        assert_eq!(cxt.indents().len(), 1);
    }

    #[test]
    fn indent_decrement_pops_to_column()
    {
        let mut cxt = Context::new();

        cxt.indent_increment(0, 0, true).unwrap();
        cxt.indent_increment(2, 0, true).unwrap();
        cxt.indent_increment(4, 0, true).unwrap();

        let mut popped = 0;
        let count = cxt
            .indent_decrement(0, |_| {
                popped += 1;

                Ok(())
            })
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(popped, 2);
        assert_eq!(cxt.indent(), 0);
    }

    #[test]
    fn indent_decrement_to_start()
    {
        let mut cxt = Context::new();

        cxt.indent_increment(0, 0, true).unwrap();
        cxt.indent_increment(2, 0, false).unwrap();

        let count = cxt.indent_decrement(STARTING_INDENT, |_| Ok(())).unwrap();

        assert_eq!(count, 2);
        assert_eq!(cxt.indent(), STARTING_INDENT);
    }

    #[test]
    fn flow_suppresses_block()
    {
        let mut cxt = Context::new();

        cxt.flow_increment(FlowKind::Sequence).unwrap();
        cxt.indent_increment(2, 0, true).unwrap();

        assert!(cxt.is_flow());
        assert_eq!(cxt.indents().len(), 0);
    }

    #[test]
    fn flow_kinds_nest()
    {
        let mut cxt = Context::new();

        cxt.flow_increment(FlowKind::Sequence).unwrap();
        cxt.flow_increment(FlowKind::Mapping).unwrap();

        assert_eq!(cxt.flow_kind(), Some(FlowKind::Mapping));
        assert_eq!(cxt.flow_decrement().unwrap(), FlowKind::Mapping);
        assert_eq!(cxt.flow_decrement().unwrap(), FlowKind::Sequence);
        assert!(cxt.flow_decrement().is_err());
    }
}
