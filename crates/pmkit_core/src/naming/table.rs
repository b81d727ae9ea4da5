//! The chained hash table.

use crate::error::{CoreError, CoreResult};
use crate::naming::hash::bucket_of;
use crate::naming::layout::{
    self, bucket_slot, is_seed, read_u64, seed_id, slot_count, slots_end, write_u64, BUMP,
    FREE_HEAD, LINK_SIZE, SEED_ADDR, SEED_MAX_LEN, SEED_NEXT, SEED_SIZE, TABLE_BYTES, TABLE_SIZE,
};
use crate::types::PmAddr;
use pmkit_region::{Persist, Region, RegionResult, VolatilePersist};
use tracing::{debug, warn};

/// Persistent map from string ids to region offsets.
///
/// Ids are shorter than [`SEED_MAX_LEN`] bytes and contain no NUL byte.
/// Invalid ids behave like unknown ones: lookups miss and updates return
/// `None`.
///
/// `register` and `deregister` only touch memory. Their `*_durable`
/// counterparts persist every step in an order that keeps the table
/// consistent across a crash; [`crate::PmStore`] uses them when
/// `sync_names` is set.
#[derive(Debug)]
pub struct NamingTable<R: Region> {
    region: R,
}

impl<R: Region> NamingTable<R> {
    /// Opens the table stored at the start of `region`.
    ///
    /// A zeroed region is an empty table.
    ///
    /// # Errors
    ///
    /// Returns `NamingCorruption` if the region cannot hold the table header
    /// or the allocator state is out of range.
    pub fn open(region: R) -> CoreResult<Self> {
        let len = region.len();
        if len < TABLE_BYTES {
            return Err(CoreError::naming_corruption(format!(
                "region of {len} bytes cannot hold the {TABLE_BYTES}-byte table header"
            )));
        }

        let bytes = region.bytes();
        let bump = layout::bump(bytes);
        let in_slots = usize::try_from(bump).is_ok_and(|bump| {
            bump >= TABLE_BYTES && (bump - TABLE_BYTES) % SEED_SIZE == 0 && bump <= slots_end(len)
        });
        if !in_slots {
            return Err(CoreError::naming_corruption(format!(
                "allocation pointer {bump:#x} is outside the seed area"
            )));
        }
        let free = read_u64(bytes, FREE_HEAD);
        if free != 0 && !(is_seed(free, len) && free < bump) {
            return Err(CoreError::naming_corruption(format!(
                "free list head {free:#x} is not an allocated slot"
            )));
        }

        let table = Self { region };
        debug!(
            seeds = table.len(),
            capacity = table.capacity(),
            "opened naming table"
        );
        Ok(table)
    }

    /// Looks up the address registered under `id`.
    pub fn retrieve(&self, id: &str) -> Option<PmAddr> {
        lookup(self.region.bytes(), id)
    }

    /// Registers `addr` under `id`.
    ///
    /// If `id` is already registered its address is overwritten in place
    /// and the previous address is returned. Otherwise a new seed is
    /// allocated and `addr` itself is returned.
    ///
    /// Returns `None` if `id` is invalid or no seed slot is left. Nothing is
    /// persisted; see [`NamingTable::register_durable`].
    pub fn register(&mut self, id: &str, addr: PmAddr) -> Option<PmAddr> {
        // VolatilePersist never fails.
        self.register_durable(id, addr, &mut VolatilePersist)
            .ok()
            .flatten()
    }

    /// Registers `addr` under `id`, persisting each step before the next one
    /// can make it reachable.
    ///
    /// A new seed goes through three persisted writes: the allocator word,
    /// the seed slot, then the bucket head. A crash between any two of them
    /// leaves every earlier name intact and at worst leaks the new slot.
    ///
    /// # Errors
    ///
    /// Returns the first failed persist. The in-memory table is consistent
    /// but may already hold the change, and a slot taken for a new seed may
    /// be leaked.
    pub fn register_durable<P: Persist + ?Sized>(
        &mut self,
        id: &str,
        addr: PmAddr,
        persist: &mut P,
    ) -> CoreResult<Option<PmAddr>> {
        let Some(key) = valid_id(id) else {
            return Ok(None);
        };

        if let Some((_, seed)) = find(self.region.bytes(), key) {
            let bytes = self.region.bytes_mut();
            let old = PmAddr::new(read_u64(bytes, seed + SEED_ADDR));
            write_u64(bytes, seed + SEED_ADDR, addr.as_u64());
            persist.persist(&self.region, seed + SEED_ADDR, LINK_SIZE)?;
            debug!(id, %old, new = %addr, "updated seed");
            return Ok(Some(old));
        }

        let Some((seed, allocator)) = self.allocate() else {
            return Ok(None);
        };
        persist.persist(&self.region, allocator, LINK_SIZE)?;

        let head_slot = bucket_slot(bucket_of(key));
        let bytes = self.region.bytes_mut();
        let head = read_u64(bytes, head_slot);
        layout::write_seed(bytes, seed, key, addr.as_u64(), head);
        persist.persist(&self.region, seed, SEED_SIZE)?;

        write_u64(self.region.bytes_mut(), head_slot, seed as u64);
        persist.persist(&self.region, head_slot, LINK_SIZE)?;
        debug!(id, %addr, seed, "registered seed");
        Ok(Some(addr))
    }

    /// Removes `id` and returns the address it held.
    ///
    /// The seed slot is zeroed and returned to the free list. Nothing is
    /// persisted; see [`NamingTable::deregister_durable`].
    pub fn deregister(&mut self, id: &str) -> Option<PmAddr> {
        // VolatilePersist never fails.
        self.deregister_durable(id, &mut VolatilePersist)
            .ok()
            .flatten()
    }

    /// Removes `id`, persisting the unlink before the slot is recycled.
    ///
    /// The link that pointed at the seed is persisted first, then the zeroed
    /// slot, then the free list head. A crash in between leaks the slot but
    /// never leaves it both chained and free.
    ///
    /// # Errors
    ///
    /// Returns the first failed persist.
    pub fn deregister_durable<P: Persist + ?Sized>(
        &mut self,
        id: &str,
        persist: &mut P,
    ) -> CoreResult<Option<PmAddr>> {
        let Some(key) = valid_id(id) else {
            return Ok(None);
        };
        let Some((link_slot, seed)) = find(self.region.bytes(), key) else {
            return Ok(None);
        };

        let bytes = self.region.bytes_mut();
        let addr = PmAddr::new(read_u64(bytes, seed + SEED_ADDR));
        let next = read_u64(bytes, seed + SEED_NEXT);
        write_u64(bytes, link_slot, next);
        persist.persist(&self.region, link_slot, LINK_SIZE)?;

        let bytes = self.region.bytes_mut();
        let free = read_u64(bytes, FREE_HEAD);
        bytes[seed..seed + SEED_NEXT].fill(0);
        write_u64(bytes, seed + SEED_NEXT, free);
        persist.persist(&self.region, seed, SEED_SIZE)?;

        write_u64(self.region.bytes_mut(), FREE_HEAD, seed as u64);
        persist.persist(&self.region, FREE_HEAD, LINK_SIZE)?;

        debug!(id, %addr, seed, "deregistered seed");
        Ok(Some(addr))
    }

    /// Iterates over all registered `(id, address)` pairs, bucket by bucket.
    pub fn iter(&self) -> Seeds<'_> {
        Seeds::new(self.region.bytes())
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no id is registered.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Maximum number of seeds the region can hold.
    pub fn capacity(&self) -> usize {
        slot_count(self.region.len())
    }

    /// Flushes the header and every slot handed out so far.
    ///
    /// This is one unordered write-back. It does not give the crash ordering
    /// of the `*_durable` methods.
    ///
    /// # Errors
    ///
    /// Returns the region's flush error.
    pub fn flush(&self) -> RegionResult<()> {
        let used = usize::try_from(layout::bump(self.region.bytes())).unwrap_or(TABLE_BYTES);
        self.region.flush_range(0, used.min(self.region.len()))
    }

    /// Returns the underlying region.
    pub fn region(&self) -> &R {
        &self.region
    }

    /// Consumes the table and returns its region.
    pub fn into_region(self) -> R {
        self.region
    }

    /// Takes a seed slot. Returns it with the offset of the allocator word
    /// that changed.
    fn allocate(&mut self) -> Option<(usize, usize)> {
        let len = self.region.len();
        let bytes = self.region.bytes_mut();

        let free = read_u64(bytes, FREE_HEAD);
        if free != 0 {
            if !is_seed(free, len) {
                warn!(link = free, "free list head is not a seed slot");
                return None;
            }
            let seed = free as usize;
            write_u64(bytes, FREE_HEAD, read_u64(bytes, seed + SEED_NEXT));
            return Some((seed, FREE_HEAD));
        }

        let seed = usize::try_from(layout::bump(bytes)).ok()?;
        if seed + SEED_SIZE > slots_end(len) {
            warn!(capacity = slot_count(len), "naming table is full");
            return None;
        }
        write_u64(bytes, BUMP, (seed + SEED_SIZE) as u64);
        Some((seed, BUMP))
    }
}

/// Looks up `id` in the table stored at the start of `bytes`.
pub(crate) fn lookup(bytes: &[u8], id: &str) -> Option<PmAddr> {
    let key = valid_id(id)?;
    let (_, seed) = find(bytes, key)?;
    Some(PmAddr::new(read_u64(bytes, seed + SEED_ADDR)))
}

fn valid_id(id: &str) -> Option<&[u8]> {
    let key = id.as_bytes();
    if key.len() >= SEED_MAX_LEN || key.contains(&0) {
        debug!(len = key.len(), "rejected seed id");
        return None;
    }
    Some(key)
}

/// Finds the seed holding `key` and the offset of the link pointing at it.
fn find(bytes: &[u8], key: &[u8]) -> Option<(usize, usize)> {
    let mut link_slot = bucket_slot(bucket_of(key));
    for seed in Chain::new(bytes, read_u64(bytes, link_slot)) {
        if seed_id(bytes, seed) == key {
            return Some((link_slot, seed));
        }
        link_slot = seed + SEED_NEXT;
    }
    None
}

/// Walks one bucket chain, yielding seed offsets.
///
/// Stops at a link that does not name a slot, or after visiting as many
/// seeds as the region can hold (a cycle).
#[derive(Debug)]
struct Chain<'a> {
    bytes: &'a [u8],
    next: u64,
    remaining: usize,
}

impl<'a> Chain<'a> {
    fn new(bytes: &'a [u8], head: u64) -> Self {
        Self {
            bytes,
            next: head,
            remaining: slot_count(bytes.len()),
        }
    }
}

impl Iterator for Chain<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next == 0 {
            return None;
        }
        if self.remaining == 0 || !is_seed(self.next, self.bytes.len()) {
            warn!(link = self.next, "broken seed chain");
            self.next = 0;
            return None;
        }
        self.remaining -= 1;
        let seed = self.next as usize;
        self.next = read_u64(self.bytes, seed + SEED_NEXT);
        Some(seed)
    }
}

/// Iterator over registered `(id, address)` pairs.
///
/// Created by [`NamingTable::iter`].
#[derive(Debug)]
pub struct Seeds<'a> {
    bytes: &'a [u8],
    bucket: usize,
    chain: Chain<'a>,
}

impl<'a> Seeds<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            bucket: 0,
            chain: Chain::new(bytes, read_u64(bytes, bucket_slot(0))),
        }
    }
}

impl Iterator for Seeds<'_> {
    type Item = (String, PmAddr);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(seed) = self.chain.next() {
                let id = String::from_utf8_lossy(seed_id(self.bytes, seed)).into_owned();
                let addr = PmAddr::new(read_u64(self.bytes, seed + SEED_ADDR));
                return Some((id, addr));
            }
            self.bucket += 1;
            if self.bucket >= TABLE_SIZE {
                return None;
            }
            self.chain = Chain::new(self.bytes, read_u64(self.bytes, bucket_slot(self.bucket)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmkit_region::{InMemoryRegion, RegionError};
    use std::collections::HashMap;

    /// Records the range of every persist call.
    #[derive(Debug, Default)]
    struct CallLog {
        calls: Vec<(usize, usize)>,
    }

    impl Persist for CallLog {
        fn persist(&mut self, region: &dyn Region, offset: usize, len: usize) -> RegionResult<()> {
            region.check_range(offset, len)?;
            self.calls.push((offset, len));
            Ok(())
        }
    }

    fn create_table(slots: usize) -> NamingTable<InMemoryRegion> {
        NamingTable::open(InMemoryRegion::new(TABLE_BYTES + slots * SEED_SIZE)).unwrap()
    }

    /// Finds an id other than `id` that lands in the same bucket.
    fn colliding_id(id: &str) -> String {
        let bucket = bucket_of(id.as_bytes());
        (0..)
            .map(|i| format!("other-{i}"))
            .find(|candidate| bucket_of(candidate.as_bytes()) == bucket)
            .unwrap()
    }

    #[test]
    fn register_update_deregister() {
        let mut table = create_table(4);
        assert_eq!(table.register("Seed", PmAddr::new(0xcafe)), Some(PmAddr::new(0xcafe)));
        assert_eq!(table.register("Seed", PmAddr::new(0xc0ffee)), Some(PmAddr::new(0xcafe)));
        assert_eq!(table.retrieve("Seed"), Some(PmAddr::new(0xc0ffee)));
        assert_eq!(table.deregister("Seed"), Some(PmAddr::new(0xc0ffee)));
        assert_eq!(table.retrieve("Seed"), None);
        assert_eq!(table.deregister("Seed"), None);
    }

    #[test]
    fn zeroed_region_is_empty_table() {
        let table = create_table(4);
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert_eq!(table.capacity(), 4);
        assert_eq!(table.retrieve("missing"), None);
    }

    #[test]
    fn ids_must_fit_the_slot() {
        let mut table = create_table(4);
        let longest = "x".repeat(SEED_MAX_LEN - 1);
        let too_long = "x".repeat(SEED_MAX_LEN);

        assert_eq!(table.register(&longest, PmAddr::new(1)), Some(PmAddr::new(1)));
        assert_eq!(table.retrieve(&longest), Some(PmAddr::new(1)));

        assert_eq!(table.register(&too_long, PmAddr::new(2)), None);
        assert_eq!(table.retrieve(&too_long), None);
        assert_eq!(table.deregister(&too_long), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn ids_with_nul_are_rejected() {
        let mut table = create_table(4);
        assert_eq!(table.register("a\0b", PmAddr::new(1)), None);
        assert_eq!(table.retrieve("a"), None);
    }

    #[test]
    fn empty_id_is_a_valid_key() {
        let mut table = create_table(4);
        assert_eq!(table.register("", PmAddr::new(9)), Some(PmAddr::new(9)));
        assert_eq!(table.retrieve(""), Some(PmAddr::new(9)));
    }

    #[test]
    fn colliding_ids_share_a_chain() {
        let mut table = create_table(4);
        let other = colliding_id("Seed");
        table.register("Seed", PmAddr::new(1)).unwrap();
        table.register(&other, PmAddr::new(2)).unwrap();

        assert_eq!(table.retrieve("Seed"), Some(PmAddr::new(1)));
        assert_eq!(table.retrieve(&other), Some(PmAddr::new(2)));

        // Unlink the tail of the chain, then the head.
        assert_eq!(table.deregister("Seed"), Some(PmAddr::new(1)));
        assert_eq!(table.retrieve(&other), Some(PmAddr::new(2)));
        assert_eq!(table.deregister(&other), Some(PmAddr::new(2)));
        assert!(table.is_empty());
    }

    #[test]
    fn full_table_rejects_new_ids() {
        let mut table = create_table(2);
        table.register("a", PmAddr::new(1)).unwrap();
        table.register("b", PmAddr::new(2)).unwrap();
        assert_eq!(table.register("c", PmAddr::new(3)), None);

        // Updates need no new slot.
        assert_eq!(table.register("a", PmAddr::new(4)), Some(PmAddr::new(1)));

        table.deregister("b").unwrap();
        assert_eq!(table.register("c", PmAddr::new(3)), Some(PmAddr::new(3)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut table = create_table(8);
        table.register("a", PmAddr::new(1)).unwrap();
        table.register("b", PmAddr::new(2)).unwrap();
        let bump = layout::bump(table.region().bytes());

        table.deregister("a").unwrap();
        table.register("c", PmAddr::new(3)).unwrap();
        assert_eq!(layout::bump(table.region().bytes()), bump);
        assert_eq!(read_u64(table.region().bytes(), FREE_HEAD), 0);
    }

    #[test]
    fn many_ids_round_trip() {
        let mut table = create_table(200);
        let mut expected = HashMap::new();
        for i in 0..200u64 {
            let id = format!("object/{i}");
            table.register(&id, PmAddr::new(i * 64)).unwrap();
            expected.insert(id, PmAddr::new(i * 64));
        }
        for i in (0..200u64).step_by(3) {
            let id = format!("object/{i}");
            assert_eq!(table.deregister(&id), expected.remove(&id));
        }

        let listed: HashMap<_, _> = table.iter().collect();
        assert_eq!(listed, expected);
        for (id, addr) in &expected {
            assert_eq!(table.retrieve(id), Some(*addr));
        }
    }

    #[test]
    fn table_survives_reopen() {
        let mut table = create_table(4);
        table.register("Seed", PmAddr::new(0xcafe)).unwrap();
        table.register("Other", PmAddr::new(0xbeef)).unwrap();
        table.deregister("Other").unwrap();
        table.flush().unwrap();

        let mut reopened = NamingTable::open(table.into_region()).unwrap();
        assert_eq!(reopened.retrieve("Seed"), Some(PmAddr::new(0xcafe)));
        assert_eq!(reopened.len(), 1);
        reopened.register("Third", PmAddr::new(1)).unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn open_rejects_small_region() {
        let result = NamingTable::open(InMemoryRegion::new(TABLE_BYTES - 1));
        assert!(matches!(result, Err(CoreError::NamingCorruption { .. })));
    }

    #[test]
    fn open_rejects_bad_allocator_state() {
        let mut region = InMemoryRegion::new(TABLE_BYTES + 2 * SEED_SIZE);
        write_u64(region.bytes_mut(), BUMP, (TABLE_BYTES + 3 * SEED_SIZE) as u64);
        let result = NamingTable::open(region);
        assert!(matches!(result, Err(CoreError::NamingCorruption { .. })));

        let mut region = InMemoryRegion::new(TABLE_BYTES + 2 * SEED_SIZE);
        write_u64(region.bytes_mut(), FREE_HEAD, (TABLE_BYTES + 1) as u64);
        let result = NamingTable::open(region);
        assert!(matches!(result, Err(CoreError::NamingCorruption { .. })));
    }

    #[test]
    fn cyclic_chain_terminates() {
        let mut table = create_table(4);
        table.register("Seed", PmAddr::new(1)).unwrap();
        let seed = read_u64(table.region().bytes(), bucket_slot(bucket_of(b"Seed")));

        let mut region = table.into_region();
        write_u64(region.bytes_mut(), seed as usize + SEED_NEXT, seed);
        let table = NamingTable::open(region).unwrap();

        assert_eq!(table.retrieve("Seed"), Some(PmAddr::new(1)));
        assert_eq!(table.retrieve(&colliding_id("Seed")), None);
    }

    #[test]
    fn durable_register_publishes_head_last() {
        let mut table = create_table(4);
        let mut persist = CallLog::default();
        let head = bucket_slot(bucket_of(b"Seed"));

        let result = table.register_durable("Seed", PmAddr::new(0xcafe), &mut persist);
        assert_eq!(result.unwrap(), Some(PmAddr::new(0xcafe)));
        assert_eq!(
            persist.calls,
            vec![(BUMP, LINK_SIZE), (TABLE_BYTES, SEED_SIZE), (head, LINK_SIZE)]
        );

        persist.calls.clear();
        table
            .register_durable("Seed", PmAddr::new(1), &mut persist)
            .unwrap();
        assert_eq!(persist.calls, vec![(TABLE_BYTES + SEED_ADDR, LINK_SIZE)]);
    }

    #[test]
    fn durable_deregister_unlinks_before_freeing() {
        let mut table = create_table(4);
        let other = colliding_id("Seed");
        table.register("Seed", PmAddr::new(1)).unwrap();
        table.register(&other, PmAddr::new(2)).unwrap();

        // "Seed" is the chain tail, linked from the head seed's next field.
        let mut persist = CallLog::default();
        let removed = table.deregister_durable("Seed", &mut persist).unwrap();
        assert_eq!(removed, Some(PmAddr::new(1)));
        assert_eq!(
            persist.calls,
            vec![
                (TABLE_BYTES + SEED_SIZE + SEED_NEXT, LINK_SIZE),
                (TABLE_BYTES, SEED_SIZE),
                (FREE_HEAD, LINK_SIZE),
            ]
        );
        assert_eq!(read_u64(table.region().bytes(), FREE_HEAD), TABLE_BYTES as u64);
    }

    #[test]
    fn reused_slot_is_popped_before_it_is_rewritten() {
        let mut table = create_table(4);
        table.register("a", PmAddr::new(1)).unwrap();
        table.deregister("a").unwrap();

        let mut persist = CallLog::default();
        table
            .register_durable("b", PmAddr::new(2), &mut persist)
            .unwrap();
        assert_eq!(persist.calls[0], (FREE_HEAD, LINK_SIZE));
        assert_eq!(persist.calls[1], (TABLE_BYTES, SEED_SIZE));
    }

    #[test]
    fn durable_misses_persist_nothing() {
        let mut table = create_table(1);
        let mut persist = CallLog::default();
        assert_eq!(table.deregister_durable("missing", &mut persist).unwrap(), None);
        assert_eq!(table.register_durable("a\0b", PmAddr::new(1), &mut persist).unwrap(), None);

        table.register("full", PmAddr::new(1)).unwrap();
        assert_eq!(table.register_durable("more", PmAddr::new(2), &mut persist).unwrap(), None);
        assert!(persist.calls.is_empty());
    }

    #[test]
    fn durable_register_reports_persist_failure() {
        struct Broken;
        impl Persist for Broken {
            fn persist(&mut self, _region: &dyn Region, offset: usize, len: usize) -> RegionResult<()> {
                Err(RegionError::persist_failed(offset, len, -1))
            }
        }

        let mut table = create_table(2);
        let result = table.register_durable("Seed", PmAddr::new(1), &mut Broken);
        assert!(matches!(
            result,
            Err(CoreError::Region(RegionError::PersistFailed { .. }))
        ));
        // The allocator moved before the failure, so the slot is leaked.
        assert_eq!(table.retrieve("Seed"), None);
        assert_eq!(table.register("Seed", PmAddr::new(1)), Some(PmAddr::new(1)));
    }
}
