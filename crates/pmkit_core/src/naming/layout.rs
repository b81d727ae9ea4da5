//! Byte layout of the naming table.

pub(crate) const LINK_SIZE: usize = 8;

pub(crate) const TABLE_SHIFT: u32 = 4;

/// Number of hash buckets.
pub const TABLE_SIZE: usize = 1 << TABLE_SHIFT;

pub(crate) const TABLE_MASK: u32 = (1 << TABLE_SHIFT) - 1;

pub(crate) const FREE_HEAD: usize = TABLE_SIZE * LINK_SIZE;
pub(crate) const BUMP: usize = FREE_HEAD + LINK_SIZE;

/// Bytes taken by the table header; seed slots start here.
pub const TABLE_BYTES: usize = BUMP + LINK_SIZE;

/// Size of one seed slot.
pub const SEED_SIZE: usize = 256;

/// Bytes reserved for an id, terminator included. Ids must be shorter.
pub const SEED_MAX_LEN: usize = 240;

pub(crate) const SEED_ADDR: usize = SEED_MAX_LEN;
pub(crate) const SEED_NEXT: usize = SEED_ADDR + LINK_SIZE;

pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; LINK_SIZE];
    raw.copy_from_slice(&bytes[offset..offset + LINK_SIZE]);
    u64::from_le_bytes(raw)
}

pub(crate) fn write_u64(bytes: &mut [u8], offset: usize, value: u64) {
    bytes[offset..offset + LINK_SIZE].copy_from_slice(&value.to_le_bytes());
}

pub(crate) const fn bucket_slot(bucket: usize) -> usize {
    bucket * LINK_SIZE
}

/// Number of seed slots a region of `len` bytes holds.
pub(crate) const fn slot_count(len: usize) -> usize {
    len.saturating_sub(TABLE_BYTES) / SEED_SIZE
}

/// End of the last whole seed slot.
pub(crate) const fn slots_end(len: usize) -> usize {
    TABLE_BYTES + slot_count(len) * SEED_SIZE
}

/// Whether `link` names a seed slot inside a region of `len` bytes.
pub(crate) fn is_seed(link: u64, len: usize) -> bool {
    usize::try_from(link).is_ok_and(|offset| {
        offset >= TABLE_BYTES
            && (offset - TABLE_BYTES) % SEED_SIZE == 0
            && offset + SEED_SIZE <= slots_end(len)
    })
}

/// Offset of the next never-used slot.
pub(crate) fn bump(bytes: &[u8]) -> u64 {
    match read_u64(bytes, BUMP) {
        0 => TABLE_BYTES as u64,
        bump => bump,
    }
}

/// The stored id of `seed`, without its NUL padding.
pub(crate) fn seed_id(bytes: &[u8], seed: usize) -> &[u8] {
    let raw = &bytes[seed..seed + SEED_MAX_LEN];
    let len = raw.iter().position(|&b| b == 0).unwrap_or(SEED_MAX_LEN);
    &raw[..len]
}

pub(crate) fn write_seed(bytes: &mut [u8], seed: usize, id: &[u8], addr: u64, next: u64) {
    let slot = &mut bytes[seed..seed + SEED_MAX_LEN];
    slot[..id.len()].copy_from_slice(id);
    slot[id.len()..].fill(0);
    write_u64(bytes, seed + SEED_ADDR, addr);
    write_u64(bytes, seed + SEED_NEXT, next);
}
