/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! This module exposes the pluggable allocators that back
//! the streaming layers.
//!
//! Every allocator manages one or more *tags*: sub arenas
//! with independent lifetimes. A subsystem acquires a tag,
//! stores byte payloads against it receiving [`MemRef`]
//! handles back, and releases the whole tag at once when
//! its lifecycle boundary (typically a document end)
//! passes.
//!
//! Four implementations are provided:
//!
//! - [`LinearArena`], a bump allocator over one fixed
//!   buffer
//! - [`HeapArena`], individually boxed blocks with per tag
//!   bookkeeping
//! - [`RegionArena`], page aligned memory regions that grow
//!   in place where the platform allows
//! - [`DedupArena`], a content addressed layer over any of
//!   the above that returns the *same* handle for byte
//!   identical payloads
//!
//! Allocators are also reachable by name through
//! [`create`], backed by a process wide registry that user
//! code may extend via [`register`].

pub(crate) mod bitset;

mod dedup;
mod heap;
mod linear;
mod region;
mod stats;

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Mutex, OnceLock},
};

pub use self::{
    bitset::{align_up, IdBitSet, CACHE_LINE},
    dedup::{DedupArena, DedupConfig},
    heap::HeapArena,
    linear::LinearArena,
    region::RegionArena,
    stats::{ArenaStats, DedupStats},
};

/// Result typedef for allocator operations
pub type MemResult<T> = std::result::Result<T, MemError>;

/// Integer naming a sub arena within an allocator
pub type Tag = u32;

/// Failures an allocator can report.
///
/// These are deliberately tiny; they cross the scanner's
/// hot paths on the way up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemError
{
    /// A fixed capacity buffer cannot fit the request
    OutOfSpace,
    /// The allocator could not obtain more memory, or ran
    /// out of tags
    Exhausted,
    /// The tag is not live in this allocator
    UnknownTag,
    /// The handle does not name a live allocation
    UnknownRef,
    /// No allocator is registered under the requested name
    UnknownName,
}

impl std::fmt::Display for MemError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::OutOfSpace => f.write_str("allocator buffer space exhausted"),
            Self::Exhausted => f.write_str("allocator could not satisfy the request"),
            Self::UnknownTag => f.write_str("tag is not live in this allocator"),
            Self::UnknownRef => f.write_str("handle does not name a live allocation"),
            Self::UnknownName => f.write_str("no allocator registered under that name"),
        }
    }
}

impl std::error::Error for MemError {}

/// Opaque handle to bytes stored in an [`Arena`].
///
/// Handles compare equal exactly when they name the same
/// storage; the dedup allocator leans on this to expose
/// content sharing (two equal payloads produce equal
/// handles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemRef
{
    tag:  Tag,
    kind: RefKind,
    raw:  u64,
    len:  usize,
}

impl MemRef
{
    pub(in crate::mem) fn direct(tag: Tag, raw: u64, len: usize) -> Self
    {
        Self {
            tag,
            kind: RefKind::Direct,
            raw,
            len,
        }
    }

    pub(in crate::mem) fn entry(tag: Tag, raw: u64, len: usize) -> Self
    {
        Self {
            tag,
            kind: RefKind::Entry,
            raw,
            len,
        }
    }

    /// The tag this handle's storage belongs to
    pub fn tag(&self) -> Tag
    {
        self.tag
    }

    /// Byte length of the referenced payload
    pub fn len(&self) -> usize
    {
        self.len
    }

    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    pub(in crate::mem) fn raw(&self) -> u64
    {
        self.raw
    }

    pub(in crate::mem) fn is_entry(&self) -> bool
    {
        matches!(self.kind, RefKind::Entry)
    }

    /// Rebind this handle onto another tag, keeping the raw
    /// addressing
    pub(in crate::mem) fn retag(&self, tag: Tag) -> Self
    {
        Self { tag, ..*self }
    }
}

/// How a [`MemRef`]'s raw field is to be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RefKind
{
    /// Arena specific direct addressing (offset or slot)
    Direct,
    /// A dedup directory entry key
    Entry,
}

/// Interface of every allocator in this module.
///
/// All operations are `&mut self`; an allocator instance
/// belongs to exactly one parser and is never shared
/// between threads (separate parsers get separate
/// allocators).
pub trait Arena: Debug
{
    /// Claim a fresh tag
    fn acquire_tag(&mut self) -> MemResult<Tag>;

    /// Release .tag, freeing every allocation made against
    /// it
    fn release_tag(&mut self, tag: Tag) -> MemResult<()>;

    /// Reset .tag to its freshly acquired state, keeping
    /// the tag itself live
    fn reset_tag(&mut self, tag: Tag) -> MemResult<()>;

    /// Give unneeded reserve memory of .tag back to the
    /// system, where the implementation supports it
    fn trim_tag(&mut self, _tag: Tag) -> MemResult<()>
    {
        Ok(())
    }

    /// Reserve .size zeroed bytes, returning a handle to
    /// them
    fn alloc(&mut self, tag: Tag, size: usize) -> MemResult<MemRef>
    {
        self.store(tag, &vec![0u8; size])
    }

    /// Store a contiguous payload, returning a handle to it
    fn store(&mut self, tag: Tag, bytes: &[u8]) -> MemResult<MemRef>;

    /// Store a payload gathered from .parts, returning a
    /// handle to the joined bytes
    fn storev(&mut self, tag: Tag, parts: &[&[u8]]) -> MemResult<MemRef>;

    /// Release the allocation behind .handle
    fn release(&mut self, handle: MemRef) -> MemResult<()>;

    /// Borrow the bytes behind .handle
    fn resolve(&self, handle: &MemRef) -> MemResult<&[u8]>;

    /// Counters for .tag
    fn stats(&self, tag: Tag) -> MemResult<ArenaStats>;

    /// Fold child layer counters into parents, where the
    /// implementation layers allocators
    fn update_stats(&mut self) {}

    /// Short human readable description of the instance
    fn info(&self) -> String;
}

/// How region memory is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionBacking
{
    /// Plain heap allocations
    Heap,
    /// Anonymous memory maps; these can grow in place and
    /// never move once handed out
    MmapAnon,
}

/// Tunables understood by the built in allocators. Each
/// implementation reads the subset that concerns it.
#[derive(Debug, Clone)]
pub struct ArenaConfig
{
    /// Fixed buffer size of a [`LinearArena`]
    pub buf_size: usize,

    /// First region size of a [`RegionArena`] tag
    pub initial_region: usize,
    /// Growth multiplier applied when sizing the next
    /// region
    pub grow_ratio: usize,
    /// Balloon reserve, as a multiple of .initial_region
    /// (0 disables ballooning)
    pub balloon_ratio: usize,
    /// A region with fewer free bytes than this is marked
    /// full
    pub empty_threshold: usize,
    /// Lower clamp for computed region sizes
    pub minimum_region: usize,
    /// Where regions come from
    pub backing: RegionBacking,
    /// Allocations at or above this size get a dedicated
    /// region
    pub big_alloc_threshold: usize,

    /// Payloads below this size skip deduplication
    pub dedup_threshold: usize,
    /// log2 of the bloom filter size, 0 = derive from
    /// .estimated_content_size
    pub bloom_bits: u32,
    /// log2 of the bucket directory size, 0 = derive from
    /// .estimated_content_size
    pub bucket_bits: u32,
    /// Chain length that triggers a directory grow, 0 =
    /// size indexed default
    pub chain_length_grow_trigger: u32,
    /// Expected total content bytes, usize::MAX = unknown
    pub estimated_content_size: usize,
}

impl Default for ArenaConfig
{
    fn default() -> Self
    {
        Self {
            buf_size: 64 * 1024,

            initial_region:      64 * 1024,
            grow_ratio:          2,
            balloon_ratio:       0,
            empty_threshold:     64,
            minimum_region:      1024 * 1024,
            backing:             RegionBacking::MmapAnon,
            big_alloc_threshold: 512 * 1024,

            dedup_threshold:           8,
            bloom_bits:                0,
            bucket_bits:               0,
            chain_length_grow_trigger: 0,
            estimated_content_size:    usize::MAX,
        }
    }
}

/// Constructor signature stored in the allocator registry
pub type ArenaBuilder = fn(&ArenaConfig) -> MemResult<Box<dyn Arena>>;

/// Look up .name in the registry and build an allocator
/// from .config.
///
/// The built in names are `linear`, `malloc`, `mremap`,
/// `dedup` and `auto`.
pub fn create(name: &str, config: &ArenaConfig) -> MemResult<Box<dyn Arena>>
{
    let registry = registry().lock().expect("allocator registry poisoned");

    match registry.get(name)
    {
        Some(builder) => builder(config),
        None => Err(MemError::UnknownName),
    }
}

/// Add (or replace) a named allocator constructor.
///
/// Names registered here are visible process wide.
pub fn register(name: &str, builder: ArenaBuilder)
{
    registry()
        .lock()
        .expect("allocator registry poisoned")
        .insert(name.to_owned(), builder);
}

fn registry() -> &'static Mutex<HashMap<String, ArenaBuilder>>
{
    static REGISTRY: OnceLock<Mutex<HashMap<String, ArenaBuilder>>> = OnceLock::new();

    REGISTRY.get_or_init(|| {
        let mut map: HashMap<String, ArenaBuilder> = HashMap::new();

        map.insert("linear".into(), build_linear);
        map.insert("malloc".into(), build_malloc);
        map.insert("mremap".into(), build_mremap);
        map.insert("dedup".into(), build_dedup);
        map.insert("auto".into(), build_auto);

        Mutex::new(map)
    })
}

fn build_linear(config: &ArenaConfig) -> MemResult<Box<dyn Arena>>
{
    Ok(Box::new(LinearArena::new(config.buf_size)))
}

fn build_malloc(_config: &ArenaConfig) -> MemResult<Box<dyn Arena>>
{
    Ok(Box::new(HeapArena::new()))
}

fn build_mremap(config: &ArenaConfig) -> MemResult<Box<dyn Arena>>
{
    Ok(Box::new(RegionArena::new(config.clone())))
}

fn build_dedup(config: &ArenaConfig) -> MemResult<Box<dyn Arena>>
{
    let backing = build_mremap(config)?;

    Ok(Box::new(DedupArena::new(
        backing,
        DedupConfig::from(config),
    )))
}

/// Picks dedup over regions when the configuration shows
/// interest in content sharing, plain regions otherwise
fn build_auto(config: &ArenaConfig) -> MemResult<Box<dyn Arena>>
{
    let wants_dedup = config.bloom_bits != 0
        || config.bucket_bits != 0
        || config.estimated_content_size != usize::MAX;

    match wants_dedup
    {
        true => build_dedup(config),
        false => build_mremap(config),
    }
}
