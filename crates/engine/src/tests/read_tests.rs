use crate::*;
use anyhow::Result;
use sstable::write_from_memtable;
use tempfile::tempdir;

#[test]
fn get_missing_key() {
    let state = LsmStorageState::default();
    assert!(state.get(b"nope").is_none());
}

#[test]
fn current_shadows_immutable() -> Result<()> {
    let state = LsmStorageState::default();
    state.put(b"k", b"x")?;
    state.freeze_current_memtable();
    state.put(b"k", b"y")?;
    assert_eq!(state.get(b"k").unwrap().as_ref(), b"y");
    Ok(())
}

#[test]
fn newer_immutable_shadows_older() -> Result<()> {
    let state = LsmStorageState::default();
    state.put(b"k", b"oldest")?;
    state.freeze_current_memtable();
    state.put(b"k", b"newer")?;
    state.freeze_current_memtable();
    state.put(b"other", b"z")?;

    assert_eq!(state.immutable_count(), 2);
    assert_eq!(state.get(b"k").unwrap().as_ref(), b"newer");
    Ok(())
}

#[test]
fn key_only_in_oldest_generation_is_found() -> Result<()> {
    let state = LsmStorageState::default();
    state.put(b"ancient", b"1")?;
    for i in 0..3 {
        state.freeze_current_memtable();
        state.put(format!("k{}", i).as_bytes(), b"v")?;
    }
    assert_eq!(state.get(b"ancient").unwrap().as_ref(), b"1");
    Ok(())
}

#[test]
fn tombstone_shadows_older_value() -> Result<()> {
    let state = LsmStorageState::default();
    state.put(b"k", b"v")?;
    state.freeze_current_memtable();
    state.delete(b"k")?;
    assert!(state.get(b"k").unwrap().is_empty());

    state.freeze_current_memtable();
    state.put(b"k", b"again")?;
    assert_eq!(state.get(b"k").unwrap().as_ref(), b"again");
    Ok(())
}

#[test]
fn memtables_are_newest_first() {
    let state = LsmStorageState::default();
    state.freeze_current_memtable();
    state.freeze_current_memtable();
    let ids: Vec<usize> = state.memtables().iter().map(|m| m.id()).collect();
    assert_eq!(ids, vec![2, 1, 0]);
}

#[test]
fn frozen_memtable_drains_to_sstable() -> Result<()> {
    let dir = tempdir()?;
    let state = LsmStorageState::default();
    for i in 0..100 {
        state.put(format!("key{:03}", i).as_bytes(), b"value")?;
    }
    state.delete(b"key050")?;
    state.freeze_current_memtable();

    // Drain outside the state lock, holding only the Arc.
    let frozen = state.immutable_memtables()[0].clone();
    let table = write_from_memtable(dir.path().join("000.sst"), &frozen, 256)?;

    assert!(table.num_blocks() > 1);
    assert_eq!(table.first_key(), b"key000");
    assert_eq!(table.last_key(), b"key099");

    let mut found = None;
    for i in 0..table.num_blocks() {
        let meta = &table.block_meta()[i];
        if meta.first_key.as_ref() <= b"key050".as_slice()
            && b"key050".as_slice() <= meta.last_key.as_ref()
        {
            let mut it = table.iter_block(i)?;
            it.seek(b"key050");
            assert!(it.is_valid());
            found = Some(it.value().to_vec());
        }
    }
    assert_eq!(found, Some(Vec::new()), "tombstone must be persisted");
    Ok(())
}
