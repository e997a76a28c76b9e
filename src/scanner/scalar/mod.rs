/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use super::entry::MaybeToken;

pub mod block;
pub mod escape;
pub mod flow;
pub mod plain;

// Generic Into<MaybeToken> closure
fn as_maybe<'de, T>((token, amt): (T, usize)) -> (MaybeToken<'de>, usize)
where
    T: Into<MaybeToken<'de>>,
{
    (token.into(), amt)
}

/// Shape facts about a scalar's processed content.
///
/// The interesting field is .storage_hint, which every
/// scanning pass computes without materializing the scalar;
/// debug builds assert it against the materialized length
/// when a deferred token is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScalarMetrics
{
    /// Exact byte length of the processed (unescaped,
    /// joined, chomped) content
    pub storage_hint: usize,

    pub empty:          bool,
    pub has_ws:         bool,
    pub has_lb:         bool,
    pub starts_with_ws: bool,
    pub starts_with_lb: bool,
    pub ends_with_ws:   bool,
    pub ends_with_lb:   bool,
    pub trailing_lb:    bool,

    /// The bytes can be emitted verbatim, no escaping or
    /// joining was applied
    pub direct_output: bool,
}

impl ScalarMetrics
{
    /// Recompute the facts from processed content
    pub fn of(content: &str, direct_output: bool) -> Self
    {
        let bytes = content.as_bytes();

        let is_ws = |b: &u8| matches!(b, b' ' | b'\t');
        let is_lb = |b: &u8| matches!(b, b'\r' | b'\n');

        Self {
            storage_hint: bytes.len(),

            empty:          bytes.is_empty(),
            has_ws:         bytes.iter().any(is_ws),
            has_lb:         bytes.iter().any(is_lb),
            starts_with_ws: bytes.first().map_or(false, is_ws),
            starts_with_lb: bytes.first().map_or(false, is_lb),
            ends_with_ws:   bytes.last().map_or(false, is_ws),
            ends_with_lb:   bytes.last().map_or(false, is_lb),
            trailing_lb:    bytes.ends_with(b"\n"),

            direct_output,
        }
    }
}

/// Sanity check a scanned storage hint against the
/// materialized content, active in debug builds only
macro_rules! sizeCheck {
    ($content:expr, $hint:expr) => {
        debug_assert_eq!(
            $content.len(),
            $hint,
            "scalar storage hint diverged from materialized content"
        )
    };
}

pub(in crate::scanner) use sizeCheck;
