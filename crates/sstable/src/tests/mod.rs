
use crate::SsTableBuilder;

/// Builds a table of `n` records `key-NNNNN -> value-NNNNN-xxxxxxxxxx`.
pub(crate) fn build_sample(path: &std::path::Path, n: usize, block_size: usize) -> crate::SsTable {
    let mut b = SsTableBuilder::new(block_size);
    for (k, v) in sample_records(n) {
        b.add(&k, &v);
    }
    b.build(path).unwrap()
}

pub(crate) fn sample_records(n: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..n)
        .map(|i| {
            (
                format!("key-{:05}", i).into_bytes(),
                format!("value-{:05}-xxxxxxxxxx", i).into_bytes(),
            )
        })
        .collect()
}
