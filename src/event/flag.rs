/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Configuration flags used to control aspects of the Event
//! production pipeline.
//!
//! Read the documentation on each flag's `O_*` constant for
//! an explanation of it's purpose.
//!
//! ```
//! # use yarrow::event::flag::*;
//! // You can use bitwise operators
//! let bitwise = O_NIL | O_LAZY;
//!
//! // Or if you prefer, method chaining
//! let chaining = Flags::new().no_lazy().nil().lazy();
//!
//! assert_eq!(bitwise, chaining);
//! ```

use bitflags::bitflags;

use crate::scanner;

/// An empty, zeroed flag set. This is the default set,
/// with all other flags disabled.
pub const O_NIL: Flags = Flags::empty();

/// Set to lazily process the underlying byte stream.
///
/// In particular, scalars events will not be fully
/// processed, instead being returned as
/// [ScalarLike::Lazy] variants.
///
/// This means that any allocations, escape parsing
/// or line joins will be deferred until the caller
/// explicitly requests the token. This also applies to
/// errors in the scalar itself, which will not be
/// caught until the caller requests the token!
///
/// This option is useful if the caller is expecting to
/// care about only a small portion of the total scalars
/// in the stream, as it allows us to defer significant
/// portions of the computation, potentially forever if
/// the caller decides to never materialize the
/// underlying scalar.
///
/// [ScalarLike::Lazy]: super::types::ScalarLike::Lazy
pub const O_LAZY: Flags = Flags::LAZY;

/// Force the scanner into the JSON compatible subset of
/// YAML regardless of the input source.
///
/// Without this flag, JSON mode only engages when a
/// [file reader][crate::reader::from_file] detects a
/// `*.json` extension.
pub const O_JSON_FORCE: Flags = Flags::JSON_FORCE;

/// Retain comment tokens during scanning rather than
/// discarding them as whitespace. Comments never surface
/// as events; this flag exists for callers sharing a
/// token stream with comment aware tooling.
pub const O_COMMENTS: Flags = Flags::COMMENTS;

/// Relax indentation checks inside flow collections,
/// accepting content at any depth until the collection
/// closes.
pub const O_SLOPPY_FLOW: Flags = Flags::SLOPPY_FLOW;

/// Disable the nesting depth limit.
///
/// By setting this flag the caller vouches for the
/// input; deeply nested documents can otherwise exhaust
/// memory.
pub const O_NO_DEPTH_LIMIT: Flags = Flags::NO_DEPTH_LIMIT;

/// Track anchors per document and fail on aliases that
/// reference a name no anchor has introduced.
pub const O_RESOLVE_ALIASES: Flags = Flags::RESOLVE_ALIASES;

/// Treat streams without a %YAML directive as version 1.1,
/// which also enables the 1.1 era double quote escape
/// aliases.
pub const O_VERSION_1_1: Flags = Flags::VERSION_1_1;

/// Treat streams without a %YAML directive as version 1.3.
pub const O_VERSION_1_3: Flags = Flags::VERSION_1_3;

impl Flags
{
    /// Instantiates a new, empty flag set
    pub const fn new() -> Self
    {
        O_NIL
    }

    /// Nulls the flag set, resetting it to empty
    pub const fn nil(self) -> Self
    {
        O_NIL
    }

    /// Applies [`O_LAZY`] to this flag set
    pub const fn lazy(self) -> Self
    {
        self.union(O_LAZY)
    }

    /// Removes [`O_LAZY`] from this flag set
    pub const fn no_lazy(self) -> Self
    {
        self.difference(O_LAZY)
    }
}

/// Convert from public flags to Scanner specific flags
pub(crate) const fn as_scanner(f: Flags) -> scanner::flag::Flags
{
    use scanner::flag;

    let mut flags = flag::O_ZEROED;

    if f.contains(O_LAZY)
    {
        flags = flags.union(flag::O_LAZY);
    }

    if f.contains(O_JSON_FORCE)
    {
        flags = flags.union(flag::O_JSON);
    }

    if f.contains(O_COMMENTS)
    {
        flags = flags.union(flag::O_COMMENTS);
    }

    if f.contains(O_SLOPPY_FLOW)
    {
        flags = flags.union(flag::O_SLOPPY_FLOW);
    }

    flags
}

bitflags! {
    /// Controls aspects of [Events] behaviors, read each flag for more information.
    ///
    /// [Events]: super::Events
    #[derive(Default)]
    pub struct Flags: u32 {
        /// See [`O_LAZY`]
        const LAZY              = 0b00000001;
        /// See [`O_JSON_FORCE`]
        const JSON_FORCE        = 0b00000010;
        /// See [`O_COMMENTS`]
        const COMMENTS          = 0b00000100;
        /// See [`O_SLOPPY_FLOW`]
        const SLOPPY_FLOW       = 0b00001000;
        /// See [`O_NO_DEPTH_LIMIT`]
        const NO_DEPTH_LIMIT    = 0b00010000;
        /// See [`O_RESOLVE_ALIASES`]
        const RESOLVE_ALIASES   = 0b00100000;
        /// See [`O_VERSION_1_1`]
        const VERSION_1_1       = 0b01000000;
        /// See [`O_VERSION_1_3`]
        const VERSION_1_3       = 0b10000000;
    }
}
