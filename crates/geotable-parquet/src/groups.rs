//! Row grouping for partitioned dataset writes.
//!
//! A grouped write splits the table into independent row groups by key,
//! encodes each group on its own, and reassembles the results preserving the
//! original row order. Bucketing here is pure and stable: groups appear in
//! first-seen order and rows keep their relative order within a group.

use std::collections::HashMap;

use arrow_array::ArrayRef;
use datafusion::common::ScalarValue;

use crate::error::Result;

/// Bucket row indices by the values of the given key columns.
///
/// Returns one index list per distinct key, in first-seen order. Null key
/// values form their own group, matching hive partitioning semantics.
///
/// # Errors
///
/// Returns an error if a key value cannot be extracted from its array.
pub fn partition_indices(key_columns: &[ArrayRef], num_rows: usize) -> Result<Vec<Vec<u64>>> {
    let mut seen: HashMap<Vec<ScalarValue>, usize> = HashMap::new();
    let mut groups: Vec<Vec<u64>> = Vec::new();

    for row in 0..num_rows {
        let key = key_columns
            .iter()
            .map(|column| ScalarValue::try_from_array(column, row).map_err(Into::into))
            .collect::<Result<Vec<ScalarValue>>>()?;

        let slot = *seen.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row as u64);
    }

    Ok(groups)
}
