/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Content deduplicating allocation.
//!
//! A [`DedupArena`] fronts a backing allocator with a per
//! tag directory keyed by xxHash64: a bloom filter for the
//! certainly-new fast path, and open addressed buckets of
//! chained entries for everything else. Byte identical
//! payloads at or above the dedup threshold share one
//! backing allocation and return *equal* handles; the
//! entry's refcount tracks the sharing.
//!
//! The bloom filter is monotonic under inserts. Releases
//! only record which bits went stale (false positives are
//! harmless, false negatives are not); the filter is
//! rebuilt from live entries when the directory next grows.

use slotmap::{new_key_type, Key, KeyData, SlotMap};
use xxhash_rust::xxh64::Xxh64;

use crate::mem::{
    bitset::IdBitSet,
    stats::{ArenaStats, DedupStats},
    Arena, ArenaConfig, MemError, MemRef, MemResult, Tag,
};

const MAX_TAGS: usize = 64;

/// Bit size bounds for both directory structures,
/// [log2(64), 31]
const MIN_BITS: u32 = 6;
const MAX_BITS: u32 = 31;

new_key_type! {
    struct EntryKey;
}

/// Tunables of a [`DedupArena`]
#[derive(Debug, Clone)]
pub struct DedupConfig
{
    /// Payloads below this size bypass deduplication
    pub dedup_threshold: usize,
    /// log2 of the bloom filter's bit count, 0 = derive
    /// from .estimated_content_size
    pub bloom_bits: u32,
    /// log2 of the bucket count, 0 = derive from
    /// .estimated_content_size
    pub bucket_bits: u32,
    /// Chain length that triggers a directory grow, 0 =
    /// use the size indexed default
    pub chain_length_grow_trigger: u32,
    /// Expected total content bytes, usize::MAX = unknown
    pub estimated_content_size: usize,
    /// Hash seed, fixed for the allocator's lifetime
    pub seed: u64,
}

impl Default for DedupConfig
{
    fn default() -> Self
    {
        Self {
            dedup_threshold:           8,
            bloom_bits:                0,
            bucket_bits:               0,
            chain_length_grow_trigger: 0,
            estimated_content_size:    usize::MAX,
            seed:                      0,
        }
    }
}

impl From<&ArenaConfig> for DedupConfig
{
    fn from(config: &ArenaConfig) -> Self
    {
        Self {
            dedup_threshold: config.dedup_threshold,
            bloom_bits: config.bloom_bits,
            bucket_bits: config.bucket_bits,
            chain_length_grow_trigger: config.chain_length_grow_trigger,
            estimated_content_size: config.estimated_content_size,
            seed: 0,
        }
    }
}

impl DedupConfig
{
    /// Resolve the starting (bloom_bits, bucket_bits) pair,
    /// deriving unset values from the content estimate
    fn initial_bits(&self) -> (u32, u32)
    {
        let bucket = match self.bucket_bits
        {
            0 => match self.estimated_content_size
            {
                usize::MAX => 10,
                est => ceil_log2(est / 1024),
            },
            bits => bits,
        }
        .clamp(MIN_BITS, MAX_BITS - 1);

        let bloom = match self.bloom_bits
        {
            0 => match self.estimated_content_size
            {
                usize::MAX => bucket + 3,
                est => (bucket + 3).max(ceil_log2(est / 128)),
            },
            bits => bits,
        }
        .clamp(bucket, MAX_BITS);

        (bloom, bucket)
    }

    fn chain_trigger(&self, bucket_bits: u32) -> u32
    {
        match self.chain_length_grow_trigger
        {
            0 => bit_to_chain_length(bucket_bits),
            n => n,
        }
    }
}

/// Grow tolerance by directory size: tiny tables rehash on
/// the first collision, huge ones put up with long chains
fn bit_to_chain_length(bucket_bits: u32) -> u32
{
    match bucket_bits
    {
        0..=8 => 1,
        9..=12 => 2,
        13..=16 => 4,
        17..=20 => 6,
        21..=24 => 8,
        _ => 10,
    }
}

fn ceil_log2(x: usize) -> u32
{
    match x
    {
        0 | 1 => 0,
        x => usize::BITS - (x - 1).leading_zeros(),
    }
}

/// One interned payload
#[derive(Debug)]
struct Entry
{
    hash:     u64,
    refcount: u32,
    payload:  MemRef,
    bucket:   u32,
    next:     Option<EntryKey>,
    prev:     Option<EntryKey>,
}

/// The lookup structures of one tag. Two of these exist
/// conceptually (active and shadow); the shadow only
/// materializes while a grow is rebuilding
#[derive(Debug)]
struct Directory
{
    bloom_bits:  u32,
    bucket_bits: u32,

    bloom:   Vec<u64>,
    buckets: Vec<Option<EntryKey>>,

    /// Occupied buckets
    in_use:    IdBitSet,
    /// Buckets that have chained two or more entries
    collision: IdBitSet,
    /// Bloom positions stale after releases; cleared by the
    /// next adjust
    update:    IdBitSet,
}

impl Directory
{
    fn with_bits(bloom_bits: u32, bucket_bits: u32) -> Self
    {
        let bloom_len = 1usize << bloom_bits;
        let bucket_len = 1usize << bucket_bits;

        Self {
            bloom_bits,
            bucket_bits,
            bloom: vec![0; (bloom_len + 63) / 64],
            buckets: vec![None; bucket_len],
            in_use: IdBitSet::with_capacity(bucket_len),
            collision: IdBitSet::with_capacity(bucket_len),
            update: IdBitSet::with_capacity(bloom_len),
        }
    }

    fn bloom_pos(&self, hash: u64) -> usize
    {
        (hash & ((1u64 << self.bloom_bits) - 1)) as usize
    }

    fn bucket_pos(&self, hash: u64) -> usize
    {
        (hash & ((1u64 << self.bucket_bits) - 1)) as usize
    }

    fn bloom_get(&self, pos: usize) -> bool
    {
        self.bloom[pos / 64] & (1 << (pos % 64)) != 0
    }

    fn bloom_set(&mut self, pos: usize)
    {
        self.bloom[pos / 64] |= 1 << (pos % 64);
    }
}

/// State of one live dedup tag
#[derive(Debug)]
struct TagState
{
    backing_tag: Tag,
    entries:     SlotMap<EntryKey, Entry>,
    dir:         Directory,
    stats:       DedupStats,
    arena_stats: ArenaStats,
}

/// A content deduplicating allocator layered over a backing
/// [`Arena`]
#[derive(Debug)]
pub struct DedupArena
{
    backing: Box<dyn Arena>,
    config:  DedupConfig,
    tag_ids: IdBitSet,
    tags:    Vec<Option<TagState>>,
}

impl DedupArena
{
    pub fn new(backing: Box<dyn Arena>, config: DedupConfig) -> Self
    {
        Self {
            backing,
            config,
            tag_ids: IdBitSet::with_capacity(MAX_TAGS),
            tags: Vec::new(),
        }
    }

    /// The dedup specific counters of .tag
    pub fn dedup_stats(&self, tag: Tag) -> MemResult<DedupStats>
    {
        self.tag_state(tag).map(|state| state.stats)
    }

    fn tag_state(&self, tag: Tag) -> MemResult<&TagState>
    {
        self.tags
            .get(tag as usize)
            .and_then(Option::as_ref)
            .ok_or(MemError::UnknownTag)
    }

    fn tag_state_mut(&mut self, tag: Tag) -> MemResult<&mut TagState>
    {
        self.tags
            .get_mut(tag as usize)
            .and_then(Option::as_mut)
            .ok_or(MemError::UnknownTag)
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> u64
    {
        let mut hasher = Xxh64::new(self.config.seed);

        for part in parts
        {
            hasher.update(part);
        }

        hasher.digest()
    }

    /// Rebuild .tag's directory at the given sizes, out of
    /// place, then swap it in
    fn adjust(&mut self, tag: Tag, bloom_bits: u32, bucket_bits: u32) -> MemResult<()>
    {
        let state = self.tag_state_mut(tag)?;

        let bucket_bits = bucket_bits.clamp(MIN_BITS, MAX_BITS - 1);
        let bloom_bits = bloom_bits.clamp(bucket_bits, MAX_BITS);

        let mut shadow = Directory::with_bits(bloom_bits, bucket_bits);

        // Every live entry is re-seated by its recorded hash;
        // stale bloom bits simply never make it across
        let keys: Vec<EntryKey> = state.entries.keys().collect();

        for key in keys
        {
            let hash = state.entries[key].hash;
            let bucket = shadow.bucket_pos(hash);
            let bloom = shadow.bloom_pos(hash);

            let head = shadow.buckets[bucket];

            if let Some(head) = head
            {
                state.entries[head].prev = Some(key);
                shadow.collision.set(bucket);
            }

            {
                let entry = &mut state.entries[key];
                entry.bucket = bucket as u32;
                entry.next = head;
                entry.prev = None;
            }

            shadow.buckets[bucket] = Some(key);
            shadow.in_use.set(bucket);
            shadow.bloom_set(bloom);
        }

        state.dir = shadow;

        Ok(())
    }

    #[cfg(test)]
    fn live_entries(&self, tag: Tag) -> usize
    {
        self.tag_state(tag).map(|s| s.entries.len()).unwrap_or(0)
    }

    #[cfg(test)]
    fn refcount_total(&self, tag: Tag) -> u64
    {
        self.tag_state(tag)
            .map(|s| s.entries.values().map(|e| e.refcount as u64).sum())
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn bloom_contains(&self, tag: Tag, hash: u64) -> bool
    {
        self.tag_state(tag)
            .map(|s| s.dir.bloom_get(s.dir.bloom_pos(hash)))
            .unwrap_or(false)
    }
}

impl Arena for DedupArena
{
    fn acquire_tag(&mut self) -> MemResult<Tag>
    {
        let backing_tag = self.backing.acquire_tag()?;
        let (bloom_bits, bucket_bits) = self.config.initial_bits();

        let state = TagState {
            backing_tag,
            entries: SlotMap::with_key(),
            dir: Directory::with_bits(bloom_bits, bucket_bits),
            stats: DedupStats::default(),
            arena_stats: ArenaStats::default(),
        };

        let id = match self.tag_ids.alloc()
        {
            Some(id) => id,
            None =>
            {
                self.backing.release_tag(backing_tag)?;

                return Err(MemError::Exhausted);
            },
        };

        if self.tags.len() <= id
        {
            self.tags.resize_with(id + 1, || None);
        }

        self.tags[id] = Some(state);

        Ok(id as Tag)
    }

    fn release_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        match self.tags.get_mut(tag as usize).and_then(Option::take)
        {
            Some(state) =>
            {
                self.tag_ids.free(tag as usize);
                self.backing.release_tag(state.backing_tag)
            },
            None => Err(MemError::UnknownTag),
        }
    }

    fn reset_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        let (bloom_bits, bucket_bits) = self.config.initial_bits();
        let state = self.tag_state_mut(tag)?;
        let backing_tag = state.backing_tag;

        state.entries = SlotMap::with_key();
        state.dir = Directory::with_bits(bloom_bits, bucket_bits);
        state.stats = DedupStats::default();
        state.arena_stats = ArenaStats::default();

        self.backing.reset_tag(backing_tag)
    }

    fn trim_tag(&mut self, tag: Tag) -> MemResult<()>
    {
        let backing_tag = self.tag_state(tag)?.backing_tag;

        self.backing.trim_tag(backing_tag)
    }

    fn store(&mut self, tag: Tag, bytes: &[u8]) -> MemResult<MemRef>
    {
        self.storev(tag, &[bytes])
    }

    fn storev(&mut self, tag: Tag, parts: &[&[u8]]) -> MemResult<MemRef>
    {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let threshold = self.config.dedup_threshold;

        let backing_tag = {
            let state = self.tag_state_mut(tag)?;

            state.stats.stores += 1;
            state.stats.stored_bytes += total as u64;

            state.backing_tag
        };

        // Small payloads aren't worth the directory walk
        if total < threshold
        {
            let payload = self.backing.storev(backing_tag, parts)?;

            let state = self.tag_state_mut(tag)?;
            state.arena_stats.record_alloc(total);

            return Ok(payload.retag(tag));
        }

        let hash = self.hash_parts(parts);

        // Lookup is merged into insert: walk the chain only
        // when the bloom filter cannot rule the payload out
        let mut chain_len = 0u32;

        {
            let state = self.tag_state(tag)?;
            let dir = &state.dir;

            if dir.bloom_get(dir.bloom_pos(hash))
            {
                let bucket = dir.bucket_pos(hash);

                let mut cursor = match dir.in_use.is_used(bucket)
                {
                    true => dir.buckets[bucket],
                    false => None,
                };

                while let Some(key) = cursor
                {
                    let entry = &state.entries[key];
                    chain_len += 1;

                    if entry.hash == hash
                        && iov_eq(self.backing.resolve(&entry.payload)?, parts)
                    {
                        let key_raw = key.data().as_ffi();

                        let state = self.tag_state_mut(tag)?;
                        state.entries[key].refcount += 1;
                        state.stats.dup_stores += 1;
                        state.stats.dup_saved_bytes += total as u64;

                        return Ok(MemRef::entry(tag, key_raw, total));
                    }

                    cursor = entry.next;
                }
            }
        }

        // Certainly new: copy into the backing and link a
        // fresh entry in
        let payload = self.backing.storev(backing_tag, parts)?;

        let chain_limit = {
            let state = self.tag_state(tag)?;

            self.config.chain_trigger(state.dir.bucket_bits)
        };

        let trigger = {
            let state = self.tag_state_mut(tag)?;
            let bucket = state.dir.bucket_pos(hash);
            let bloom = state.dir.bloom_pos(hash);

            let head = state.dir.buckets[bucket];

            let key = state.entries.insert(Entry {
                hash,
                refcount: 1,
                payload,
                bucket: bucket as u32,
                next: head,
                prev: None,
            });

            if let Some(head) = head
            {
                state.entries[head].prev = Some(key);
                state.dir.collision.set(bucket);
            }

            state.dir.buckets[bucket] = Some(key);
            state.dir.in_use.set(bucket);
            state.dir.bloom_set(bloom);

            state.arena_stats.record_alloc(total);

            let over_trigger = chain_len + 1 > chain_limit;

            (key.data().as_ffi(), over_trigger)
        };

        let (key_raw, over_trigger) = trigger;

        if over_trigger
        {
            let (bloom_bits, bucket_bits) = {
                let dir = &self.tag_state(tag)?.dir;

                (dir.bloom_bits + 1, dir.bucket_bits + 1)
            };

            self.adjust(tag, bloom_bits, bucket_bits)?;
        }

        Ok(MemRef::entry(tag, key_raw, total))
    }

    fn release(&mut self, handle: MemRef) -> MemResult<()>
    {
        let tag = handle.tag();

        // Bypass allocations route straight through
        if !handle.is_entry()
        {
            let backing_tag = self.tag_state(tag)?.backing_tag;

            self.backing.release(handle.retag(backing_tag))?;

            let state = self.tag_state_mut(tag)?;
            state.stats.releases += 1;
            state.stats.released_bytes += handle.len() as u64;
            state.arena_stats.record_free(handle.len());

            return Ok(());
        }

        let key = EntryKey::from(KeyData::from_ffi(handle.raw()));

        let payload = {
            let state = self.tag_state_mut(tag)?;

            let entry = state.entries.get_mut(key).ok_or(MemError::UnknownRef)?;

            state.stats.releases += 1;
            state.stats.released_bytes += handle.len() as u64;

            entry.refcount -= 1;

            if entry.refcount > 0
            {
                return Ok(());
            }

            // Last reference: unlink from the chain, mark the
            // bloom bit stale and drop the entry
            let (payload, bucket, next, prev, hash) =
                (entry.payload, entry.bucket as usize, entry.next, entry.prev, entry.hash);

            match prev
            {
                Some(prev) => state.entries[prev].next = next,
                None => state.dir.buckets[bucket] = next,
            }

            if let Some(next) = next
            {
                state.entries[next].prev = prev;
            }

            if state.dir.buckets[bucket].is_none()
            {
                state.dir.in_use.free(bucket);
            }

            let bloom_pos = state.dir.bloom_pos(hash);
            state.dir.update.set(bloom_pos);

            state.entries.remove(key);
            state.arena_stats.record_free(handle.len());

            payload
        };

        self.backing.release(payload)
    }

    fn resolve(&self, handle: &MemRef) -> MemResult<&[u8]>
    {
        let state = self.tag_state(handle.tag())?;

        if !handle.is_entry()
        {
            return self.backing.resolve(&handle.retag(state.backing_tag));
        }

        let key = EntryKey::from(KeyData::from_ffi(handle.raw()));
        let entry = state.entries.get(key).ok_or(MemError::UnknownRef)?;

        self.backing.resolve(&entry.payload)
    }

    fn stats(&self, tag: Tag) -> MemResult<ArenaStats>
    {
        self.tag_state(tag).map(|state| state.arena_stats)
    }

    fn update_stats(&mut self)
    {
        self.backing.update_stats()
    }

    fn info(&self) -> String
    {
        format!(
            "dedup(tags: {}, over: {})",
            self.tag_ids.count_used(),
            self.backing.info()
        )
    }
}

/// Compare a contiguous payload against a gathered one
fn iov_eq(payload: &[u8], parts: &[&[u8]]) -> bool
{
    let total: usize = parts.iter().map(|p| p.len()).sum();

    if payload.len() != total
    {
        return false;
    }

    let mut at = 0;

    for part in parts
    {
        if &payload[at..at + part.len()] != *part
        {
            return false;
        }

        at += part.len();
    }

    true
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mem::HeapArena;

    fn arena_with(threshold: usize) -> DedupArena
    {
        let config = DedupConfig {
            dedup_threshold: threshold,
            bloom_bits: 8,
            bucket_bits: 6,
            ..DedupConfig::default()
        };

        DedupArena::new(Box::new(HeapArena::new()), config)
    }

    #[test]
    fn equal_payloads_share_storage()
    {
        let mut arena = arena_with(8);
        let tag = arena.acquire_tag().unwrap();

        let p1 = arena.storev(tag, &[b"hello world"]).unwrap();
        let p2 = arena.storev(tag, &[b"hel", b"lo world"]).unwrap();

        assert_eq!(p1, p2);
        assert_eq!(arena.resolve(&p1).unwrap(), b"hello world");

        let stats = arena.dedup_stats(tag).unwrap();

        assert_eq!(stats.dup_stores, 1);
        assert_eq!(stats.dup_saved_bytes, 11);
    }

    #[test]
    fn below_threshold_bypasses()
    {
        let mut arena = arena_with(8);
        let tag = arena.acquire_tag().unwrap();

        let p1 = arena.store(tag, b"tiny").unwrap();
        let p2 = arena.store(tag, b"tiny").unwrap();

        // No sharing under the threshold
        assert_ne!(p1, p2);
        assert_eq!(arena.resolve(&p1).unwrap(), b"tiny");
        assert_eq!(arena.resolve(&p2).unwrap(), b"tiny");
        assert_eq!(arena.dedup_stats(tag).unwrap().dup_stores, 0);
    }

    #[test]
    fn refcounts_match_store_release_balance()
    {
        let mut arena = arena_with(4);
        let tag = arena.acquire_tag().unwrap();

        let a = arena.store(tag, b"payload-a").unwrap();
        let _ = arena.store(tag, b"payload-a").unwrap();
        let b = arena.store(tag, b"payload-b").unwrap();

        // 3 stores, 0 releases
        assert_eq!(arena.refcount_total(tag), 3);

        arena.release(a).unwrap();
        arena.release(b).unwrap();

        // 3 stores, 2 releases
        assert_eq!(arena.refcount_total(tag), 1);
    }

    #[test]
    fn bloom_bit_set_after_insert()
    {
        let mut arena = arena_with(4);
        let tag = arena.acquire_tag().unwrap();

        arena.store(tag, b"bloom visible").unwrap();

        let hash = arena.hash_parts(&[b"bloom visible"]);

        assert!(arena.bloom_contains(tag, hash));
    }

    #[test]
    fn release_to_zero_frees_entry()
    {
        let mut arena = arena_with(4);
        let tag = arena.acquire_tag().unwrap();

        let p1 = arena.store(tag, b"shared payload").unwrap();
        let p2 = arena.store(tag, b"shared payload").unwrap();

        assert_eq!(p1, p2);
        assert_eq!(arena.live_entries(tag), 1);

        arena.release(p1).unwrap();
        assert_eq!(arena.live_entries(tag), 1);

        arena.release(p2).unwrap();
        assert_eq!(arena.live_entries(tag), 0);

        // The handle is dead now
        assert_eq!(arena.resolve(&p1), Err(MemError::UnknownRef));
    }

    #[test]
    fn adjust_keeps_entries_reachable()
    {
        let mut arena = arena_with(4);
        let tag = arena.acquire_tag().unwrap();

        // Enough distinct payloads to force several grows at
        // 64 buckets with a chain tolerance of 1
        let mut handles = Vec::new();

        for i in 0..512
        {
            let payload = format!("unique payload number {}", i);
            handles.push((arena.store(tag, payload.as_bytes()).unwrap(), payload));
        }

        // Every payload must remain reachable through the
        // rebuilt directory, and re-storing must hit
        for (handle, payload) in &handles
        {
            assert_eq!(arena.resolve(handle).unwrap(), payload.as_bytes());

            let again = arena.store(tag, payload.as_bytes()).unwrap();

            assert_eq!(&again, handle);
        }
    }

    #[test]
    fn tags_do_not_share_content()
    {
        let mut arena = arena_with(4);

        let one = arena.acquire_tag().unwrap();
        let two = arena.acquire_tag().unwrap();

        let p1 = arena.store(one, b"same bytes here").unwrap();
        let p2 = arena.store(two, b"same bytes here").unwrap();

        // Dedup is per tag
        assert_ne!(p1, p2);
        assert_eq!(arena.dedup_stats(one).unwrap().dup_stores, 0);
        assert_eq!(arena.dedup_stats(two).unwrap().dup_stores, 0);
    }

    #[test]
    fn release_tag_releases_backing()
    {
        let mut arena = arena_with(4);
        let tag = arena.acquire_tag().unwrap();

        let handle = arena.store(tag, b"short lived").unwrap();

        arena.release_tag(tag).unwrap();

        assert_eq!(arena.resolve(&handle), Err(MemError::UnknownTag));
    }

    #[test]
    fn sizing_heuristics()
    {
        let config = DedupConfig {
            estimated_content_size: 1024 * 1024,
            ..DedupConfig::default()
        };

        let (bloom, bucket) = config.initial_bits();

        // 1 MiB / 1024 = 1024 buckets -> 10 bits;
        // bloom = max(13, log2(8192)) = 13
        assert_eq!(bucket, 10);
        assert_eq!(bloom, 13);
    }

    #[test]
    fn chain_tolerance_scales_with_size()
    {
        assert_eq!(bit_to_chain_length(6), 1);
        assert_eq!(bit_to_chain_length(10), 2);
        assert_eq!(bit_to_chain_length(14), 4);
        assert_eq!(bit_to_chain_length(26), 10);
    }
}
