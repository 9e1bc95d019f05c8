//! Copy engine orchestration.

mod chunk;
mod engine;
mod worker;

pub use chunk::ChunkPlan;
pub use engine::{map_key, CopyEngine};

use crate::storage::{ObjectKey, ObjectMetadata};

/// One object scheduled for transfer.
///
/// Created by the checker stage once the destination is known to need the
/// object, consumed by a transfer worker, dropped on a terminal outcome.
#[derive(Debug, Clone)]
pub struct TransferTask {
    /// Key in the source store.
    pub src_key: ObjectKey,
    /// Key to write in the destination store.
    pub dest_key: ObjectKey,
    /// Source metadata at decision time; the chunk plan is built from its
    /// size.
    pub meta: ObjectMetadata,
}
