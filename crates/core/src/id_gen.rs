//! Identifier generation
//!
//! nanoid for opaque random ids and an atomic counter for the integer
//! client order indices venues ask for.

use nanoid::nanoid;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::timing::nanos;

static GLOBAL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Client order indices must fit in 48 bits.
pub const CLIENT_ORDER_INDEX_MAX: i64 = (1 << 48) - 1;

/// Random URL-safe id of `length` characters
pub fn generate_id_with_length(length: usize) -> String {
    nanoid!(length)
}

/// Sequential process-wide id
pub fn idgen_next_id() -> u64 {
    GLOBAL_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Client order index: millisecond clock in the high bits, counter in the low 8.
///
/// Unique within a process for up to 256 orders per millisecond and unlikely
/// to collide across restarts.
pub fn next_client_order_index() -> i64 {
    let millis = (nanos() / 1_000_000) as i64;
    let counter = (idgen_next_id() & 0xff) as i64;
    ((millis << 8) | counter) & CLIENT_ORDER_INDEX_MAX
}
