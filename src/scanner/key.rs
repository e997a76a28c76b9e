/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Tracking of simple key candidates.
//!
//! A simple key is any scalar, alias, anchor, tag or flow
//! opener that might retroactively turn out to be a mapping
//! key when a ':' follows. The scanner saves the position
//! (and whether a key is *required* there) so that the
//! synthetic Key / BlockMappingStart tokens can be spliced
//! in before the saved token when the ':' arrives.
//!
//! One candidate slot exists per flow level: a '[' may
//! itself be a candidate in its enclosing context while the
//! entries inside it produce and discard their own. Opening
//! a flow collection pushes a level, closing it pops back
//! to the opener's.

use crate::scanner::stats::MStats;

/// Per flow level holder of simple key candidates
#[derive(Debug, Clone)]
pub(in crate::scanner) struct Key
{
    levels: Vec<Option<SavedKey>>,
}

impl Key
{
    pub fn new() -> Self
    {
        Self {
            levels: vec![None],
        }
    }

    /// Record a key candidate at the position described by
    /// .stats, replacing the current level's candidate
    pub fn save(&mut self, stats: MStats, required: bool)
    {
        let possible = match required
        {
            true => KeyPossible::Required,
            false => KeyPossible::Yes,
        };

        *self.saved() = Some(SavedKey { possible, stats });
    }

    /// Access the current level's candidate slot
    pub fn saved(&mut self) -> &mut Option<SavedKey>
    {
        // A base level always exists
        self.levels.last_mut().unwrap()
    }

    /// Could a candidate at any level still become a key?
    ///
    /// The scanner must not hand tokens to the parser while
    /// this holds, as a later ':' may yet splice a Key in
    /// front of them -- including in front of a whole flow
    /// collection ('[a]: b')
    pub fn possible(&self) -> bool
    {
        self.levels
            .iter()
            .flatten()
            .any(|saved| saved.possible.allowed())
    }

    /// Enter a flow collection, giving it a fresh candidate
    /// slot
    pub fn push_level(&mut self)
    {
        self.levels.push(None);
    }

    /// Leave a flow collection, discarding its candidate
    /// and restoring the opener's slot.
    ///
    /// The base level is never popped.
    pub fn pop_level(&mut self) -> Option<SavedKey>
    {
        match self.levels.len()
        {
            0 | 1 => None,
            _ => self.levels.pop().flatten(),
        }
    }
}

impl Default for Key
{
    fn default() -> Self
    {
        Self::new()
    }
}

/// A potential mapping key's position and disposition
#[derive(Debug, Clone)]
pub(in crate::scanner) struct SavedKey
{
    possible: KeyPossible,
    stats:    MStats,
}

impl SavedKey
{
    pub fn key(&self) -> &KeyPossible
    {
        &self.possible
    }

    pub fn key_mut(&mut self) -> &mut KeyPossible
    {
        &mut self.possible
    }

    pub fn stats(&self) -> &MStats
    {
        &self.stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(in crate::scanner) enum KeyPossible
{
    No,
    Yes,
    Required,
}

impl KeyPossible
{
    pub fn allowed(&self) -> bool
    {
        matches!(self, Self::Yes | Self::Required)
    }

    pub fn required(&self) -> bool
    {
        matches!(self, Self::Required)
    }
}

impl Default for KeyPossible
{
    fn default() -> Self
    {
        Self::No
    }
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn saved_key_lifecycle()
    {
        let mut key = Key::new();

        assert!(!key.possible());

        let mut stats = MStats::new();
        stats.update(10, 1, 2);

        key.save(stats, true);

        assert!(key.possible());

        let saved = key.saved().take().expect("a saved key");

        assert!(saved.key().required());
        assert_eq!(saved.stats().read, 10);
        assert!(!key.possible());
    }

    #[test]
    fn expired_key_no_longer_possible()
    {
        let mut key = Key::new();

        key.save(MStats::new(), false);

        if let Some(saved) = key.saved()
        {
            *saved.key_mut() = KeyPossible::No;
        }

        assert!(!key.possible());
    }

    #[test]
    fn levels_shadow_outer_candidates()
    {
        let mut key = Key::new();

        // The '[' of an enclosing context...
        key.save(MStats::new(), false);
        key.push_level();

        // ...is untouched by inner candidates coming and going
        let mut inner = MStats::new();
        inner.update(5, 0, 5);

        key.save(inner, false);
        key.saved().take();

        // The current level is empty, but the buried opener
        // keeps a key possible
        assert!(key.saved().is_none());
        assert!(key.possible());

        key.pop_level();

        // Back at the opener's level, the candidate survives
        assert!(key.possible());
        assert_eq!(key.saved().as_ref().unwrap().stats().read, 0);
    }

    #[test]
    fn base_level_is_never_popped()
    {
        let mut key = Key::new();

        key.save(MStats::new(), false);

        assert!(key.pop_level().is_none());
        assert!(key.possible());
    }
}
