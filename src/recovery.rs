//! The orphan recoverer (spec.md C6): enumerates in-flight entries older
//! than a threshold and moves them back to queued. The recovery cadence
//! (how often this runs) is a collaborator concern — an external scheduler
//! — not part of the core (spec.md §4.6).

use crate::backend::Backend;
use crate::error::Result;
use crate::queue::Queue;

/// Batch size cap per recovery cycle (spec.md §4.6 "e.g., 100").
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Runs one orphan-recovery pass over `queue`: scans for in-flight entries
/// whose original enqueue time plus `threshold` has elapsed, and moves each
/// back to the queued store. Returns the number of messages recovered.
///
/// No-op (returns `Ok(0)`) on backends without an ephemeral store, since
/// there's nothing to recover.
pub fn recover_orphans<B: Backend>(queue: &Queue<B>, threshold: chrono::Duration) -> Result<usize> {
    let Some(orphans) = queue.get_orphan_messages(threshold)? else {
        return Ok(0);
    };

    let mut recovered = 0;
    for msg in orphans.iter().take(DEFAULT_BATCH_SIZE) {
        if queue.move_from_ephemeral_to_queue_storage(msg)? {
            recovered += 1;
        }
    }

    if recovered > 0 {
        log::debug!("orphan recovery moved {recovered} message(s) back to queued");
    }

    Ok(recovered)
}
