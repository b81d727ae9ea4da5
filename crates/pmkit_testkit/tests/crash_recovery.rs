//! Crash recovery tests for the synchronous persistent log.
//!
//! Every test drives a log whose `persist` calls are recorded into a shadow
//! durable image, then recovers a fresh log from that image as a restarted
//! process would.

use pmkit_core::{
    BatchState, CoreError, EntryHeader, Metadata, RecordMeta, SyncPersistentLog, HEADER_SIZE,
};
use pmkit_region::{FlushPersist, InMemoryRegion, Persist, Region, RegionError};
use pmkit_testkit::prelude::*;

const REGION: usize = 1000;

fn batch() -> Vec<(RecordMeta, Vec<u8>)> {
    vec![
        (RecordMeta { home: 0x100, len: 5 }, b"hello".to_vec()),
        (RecordMeta { home: 0x200, len: 0 }, Vec::new()),
        (RecordMeta { home: 0x300, len: 3 }, b"abc".to_vec()),
    ]
}

fn batch_size(records: &[(RecordMeta, Vec<u8>)]) -> usize {
    records
        .iter()
        .map(|(_, data)| RecordMeta::SIZE + data.len())
        .sum()
}

fn append_all<P: Persist>(
    log: &mut SyncPersistentLog<InMemoryRegion, P>,
    records: &[(RecordMeta, Vec<u8>)],
) {
    for (meta, data) in records {
        log.append(meta, Some(data)).unwrap();
    }
}

fn read_back<P: Persist>(log: &SyncPersistentLog<InMemoryRegion, P>) -> Vec<(RecordMeta, Vec<u8>)> {
    log.records::<RecordMeta>()
        .map(|(meta, data)| (meta, data.to_vec()))
        .collect()
}

#[test]
fn committed_batch_is_one_entry_after_crash() {
    let persist = RecordingPersist::new(REGION);
    let mut log = staging_log(REGION, persist.clone());
    let records = batch();
    append_all(&mut log, &records);
    log.commit().unwrap();

    let recovered = crash_image(persist.image()).unwrap();
    let entries: Vec<_> = recovered.entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        recovered.header(entries[0]),
        EntryHeader::Valid(batch_size(&records))
    );

    let recovered = crash_sync_log(persist.image()).unwrap();
    assert_eq!(read_back(&recovered), records);
}

#[test]
fn uncommitted_batch_is_lost() {
    let persist = RecordingPersist::new(REGION);
    let mut log = staging_log(REGION, persist.clone());
    append_all(&mut log, &batch());

    // Only the sentinel at the batch start was persisted.
    assert_eq!(persist.calls(), vec![(0, HEADER_SIZE)]);
    let recovered = crash_image(persist.image()).unwrap();
    assert!(recovered.is_empty());
    assert_eq!(recovered.end().offset(), 0);
}

#[test]
fn commit_persists_in_two_phases() {
    let persist = RecordingPersist::new(REGION);
    let mut log = staging_log(REGION, persist.clone());
    let records = batch();
    append_all(&mut log, &records);
    log.commit().unwrap();

    let size = batch_size(&records);
    assert_eq!(
        persist.calls(),
        vec![
            (0, HEADER_SIZE),
            (HEADER_SIZE, size + HEADER_SIZE),
            (0, HEADER_SIZE),
        ]
    );
}

#[test]
fn failed_payload_persist_leaves_batch_untouched() {
    let recorder = RecordingPersist::new(REGION);
    // Call 0 is the sentinel, call 1 the payload.
    let mut log = staging_log(REGION, FailingPersist::new(recorder.clone(), 1, -5));
    let records = batch();
    append_all(&mut log, &records);
    let before = log.log().region().bytes().to_vec();

    let err = log.commit().unwrap_err();
    assert!(matches!(
        err,
        CoreError::Region(RegionError::PersistFailed { status: -5, .. })
    ));
    assert_eq!(log.log().region().bytes(), &before[..]);
    assert!(matches!(log.state(), BatchState::Open { .. }));
    assert!(crash_image(recorder.image()).unwrap().is_empty());

    log.commit().unwrap();
    let recovered = crash_sync_log(recorder.image()).unwrap();
    assert_eq!(read_back(&recovered), records);
}

#[test]
fn failed_header_persist_hides_the_batch() {
    let recorder = RecordingPersist::new(REGION);
    // Call 2 is the header; the payload is already durable by then.
    let mut log = staging_log(
        REGION,
        FailingPersist::new(recorder.clone(), 2, 1).sticky(),
    );
    append_all(&mut log, &batch());
    assert!(log.commit().is_err());

    let recovered = crash_image(recorder.image()).unwrap();
    assert!(recovered.is_empty());
}

#[test]
fn failed_sentinel_persist_rejects_append() {
    let recorder = RecordingPersist::new(REGION);
    let mut log = staging_log(REGION, FailingPersist::new(recorder.clone(), 0, 9));
    let records = batch();
    let (meta, data) = &records[0];
    assert!(log.append(meta, Some(data)).is_err());
    assert!(log.is_empty());

    log.append(meta, Some(data)).unwrap();
    assert!(matches!(log.state(), BatchState::Open { .. }));
}

#[test]
fn recovered_batch_can_be_recommitted() {
    let persist = RecordingPersist::new(REGION);
    let mut log = staging_log(REGION, persist.clone());
    let records = batch();
    append_all(&mut log, &records);
    log.commit().unwrap();

    // Retiring the batch is not persisted, so recovery replays it.
    let mut recovered = crash_sync_log(persist.image()).unwrap();
    assert_eq!(read_back(&recovered), records);
    recovered.commit().unwrap();
    assert!(recovered.is_empty());

    // Starting the next batch durably retires the old one.
    let (meta, data) = &records[0];
    recovered.append(meta, Some(data)).unwrap();
    let image = recovered.persist().image();
    assert!(crash_image(image).unwrap().is_empty());
}

#[test]
fn second_batch_replaces_first() {
    let persist = RecordingPersist::new(REGION);
    let mut log = staging_log(REGION, persist.clone());
    let first = batch();
    append_all(&mut log, &first);
    log.commit().unwrap();

    let second = vec![(RecordMeta { home: 0x900, len: 1 }, vec![0xaa])];
    append_all(&mut log, &second);
    assert!(crash_image(persist.image()).unwrap().is_empty());

    log.commit().unwrap();
    let recovered = crash_sync_log(persist.image()).unwrap();
    assert_eq!(read_back(&recovered), second);
}

#[test]
fn full_batches_commit_and_recover() {
    let persist = RecordingPersist::new(REGION);
    let mut log = staging_log(REGION, persist.clone());
    let mut pending = Vec::new();
    let mut commits = 0;

    for i in 0..500u64 {
        let data = vec![i as u8; (i % 40) as usize];
        let meta = RecordMeta {
            home: i,
            len: data.len() as u64,
        };
        if let Err(err) = log.append(&meta, Some(&data)) {
            assert!(err.is_no_space());
            log.commit().unwrap();
            commits += 1;
            pending.clear();
            log.append(&meta, Some(&data)).unwrap();
        }
        pending.push((meta, data));
    }
    assert!(commits > 1);

    // The open batch is not durable yet.
    assert!(crash_image(persist.image()).unwrap().is_empty());

    log.commit().unwrap();
    let recovered = crash_sync_log(persist.image()).unwrap();
    assert_eq!(read_back(&recovered), pending);
}

#[test]
fn clean_close_keeps_log_state() {
    let mut test = TestStore::new();
    let records = batch();
    {
        let mut log = test.open_sync_log(FlushPersist).unwrap();
        for (meta, data) in &records {
            log.append(meta, Some(data)).unwrap();
        }
    }

    let mut test = test.reopen();
    {
        let mut log = test.open_sync_log(FlushPersist).unwrap();
        let recovered: Vec<_> = log
            .records::<RecordMeta>()
            .map(|(meta, data)| (meta, data.to_vec()))
            .collect();
        assert_eq!(recovered, records);
        log.commit().unwrap();
    }

    let mut test = test.reopen();
    assert!(test.open_sync_log(FlushPersist).unwrap().is_empty());
}
