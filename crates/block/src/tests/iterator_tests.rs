use crate::*;

fn sample_block() -> Block {
    let mut b = BlockBuilder::new(4096);
    assert!(b.add(b"apple", b"red"));
    assert!(b.add(b"banana", b"yellow"));
    assert!(b.add(b"cherry", b""));
    assert!(b.add(b"damson", b"purple"));
    b.build()
}

fn collect(it: &mut BlockIterator) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    while it.is_valid() {
        out.push((it.key().to_vec(), it.value().to_vec()));
        it.next();
    }
    out
}

// -------------------- Sequential iteration --------------------

#[test]
fn iterates_all_records_in_order() {
    let block = sample_block();
    let mut it = BlockIterator::new(&block);
    let entries = collect(&mut it);

    assert_eq!(
        entries,
        vec![
            (b"apple".to_vec(), b"red".to_vec()),
            (b"banana".to_vec(), b"yellow".to_vec()),
            (b"cherry".to_vec(), b"".to_vec()),
            (b"damson".to_vec(), b"purple".to_vec()),
        ]
    );
    assert!(!it.is_valid());
    assert!(it.error().is_none(), "running off the end is not an error");
}

#[test]
fn yields_exactly_k_valid_positions() {
    let block = sample_block();
    let mut it = BlockIterator::new(&block);
    let mut valid = 0;
    while it.is_valid() {
        valid += 1;
        it.next();
    }
    assert_eq!(valid, block.len());

    // next() after exhaustion is a no-op
    it.next();
    assert!(!it.is_valid());
    assert_eq!(it.index(), block.len());
}

#[test]
fn empty_block_is_immediately_invalid() {
    let it = BlockIterator::new(&Block::default());
    assert!(!it.is_valid());
    assert!(it.error().is_none());
}

#[test]
fn snapshot_survives_source_drop() {
    let block = sample_block();
    let mut it = BlockIterator::new(&block);
    drop(block);
    it.next();
    assert_eq!(it.key(), b"banana");
    let value = it.value_bytes();
    it.next();
    assert_eq!(value.as_ref(), b"yellow");
}

#[test]
fn set_block_resets_position() {
    let mut it = BlockIterator::new(&sample_block());
    it.next();
    it.next();

    let mut b = BlockBuilder::new(64);
    assert!(b.add(b"zebra", b"stripes"));
    it.set_block(&b.build());

    assert!(it.is_valid());
    assert_eq!(it.index(), 0);
    assert_eq!(it.key(), b"zebra");
    it.next();
    assert!(!it.is_valid());
}

// -------------------- Seek --------------------

#[test]
fn seek_finds_exact_key() {
    let mut it = BlockIterator::new(&sample_block());
    it.seek(b"cherry");
    assert!(it.is_valid());
    assert_eq!(it.index(), 2);
    assert_eq!(it.key(), b"cherry");
    assert_eq!(it.value(), b"");

    it.next();
    assert_eq!(it.key(), b"damson");
}

#[test]
fn seek_restarts_from_the_beginning() {
    let mut it = BlockIterator::new(&sample_block());
    it.seek(b"damson");
    assert!(it.is_valid());
    it.seek(b"apple");
    assert!(it.is_valid());
    assert_eq!(it.value(), b"red");
}

#[test]
fn seek_missing_key_leaves_iterator_invalid() {
    let mut it = BlockIterator::new(&sample_block());
    it.seek(b"blueberry");
    assert!(!it.is_valid());
    assert!(it.error().is_none());

    it.seek_to_first();
    assert_eq!(it.key(), b"apple");
}

// -------------------- Corruption --------------------

fn corrupt_block() -> Block {
    // Second record declares a 5-byte value but only 1 byte follows.
    let bytes = vec![0, 1, b'a', 0, 0, 0, 1, b'b', 0, 5, b'x', 0, 0, 0, 5, 0, 2];
    Block::decode(&bytes).unwrap()
}

#[test]
fn truncated_record_invalidates_iterator() {
    let mut it = BlockIterator::new(&corrupt_block());
    assert!(it.is_valid());
    assert_eq!(it.key(), b"a");

    it.next();
    assert!(!it.is_valid());
    assert!(matches!(
        it.error(),
        Some(BlockError::Truncated { offset: 5, what: "value" })
    ));

    // Stays put once invalid.
    it.next();
    assert_eq!(it.index(), 1);
}

#[test]
#[should_panic(expected = "failed to decode record 1")]
fn seek_through_corrupt_record_panics() {
    let mut it = BlockIterator::new(&corrupt_block());
    it.seek(b"zzz");
}
