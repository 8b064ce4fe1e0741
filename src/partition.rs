//! Splits a canonical table into Material Group partitions.

use tracing::debug;

use crate::columns::MATERIAL_GROUP;
use crate::error::{PipelineError, Result};
use crate::table::Table;

/// Rows of one table sharing a single Material Group value.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// String cast of the group value; `10` and `"10"` share a key.
    pub key: String,
    pub table: Table,
}

/// Which partitions the pipeline analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionPolicy {
    /// Only the first group encountered; the remaining groups are ignored.
    #[default]
    FirstOnly,
    /// Every group, in encounter order.
    All,
}

impl PartitionPolicy {
    pub fn from_flag(process_all_partitions: bool) -> Self {
        if process_all_partitions {
            PartitionPolicy::All
        } else {
            PartitionPolicy::FirstOnly
        }
    }
}

/// Splits `table` into one [`Partition`] per distinct Material Group, in
/// the order each group first appears.
///
/// # Errors
///
/// [`PipelineError::NoPartitionColumn`] if the table has no Material Group
/// column.
pub fn partition(table: &Table, policy: PartitionPolicy) -> Result<Vec<Partition>> {
    let mut groups = table
        .group_by(&[MATERIAL_GROUP])
        .ok_or(PipelineError::NoPartitionColumn)?;

    debug!(groups = groups.len(), ?policy, "Material groups found");

    if policy == PartitionPolicy::FirstOnly {
        groups.truncate(1);
    }

    Ok(groups
        .into_iter()
        .map(|group| Partition {
            table: table.select_rows(&group.rows),
            key: group.key.concat(),
        })
        .collect())
}
