//! Snowflake ID Generator
//!
//! Time-ordered 63-bit IDs used as primary keys for every table.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Custom epoch (2024-01-01T00:00:00.000Z)
pub const EPOCH_MS: u64 = 1_704_067_200_000;

const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

struct State {
    last_timestamp: u64,
    sequence: u64,
}

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    state: Mutex<State>,
}

impl SnowflakeGenerator {
    /// Create a new generator; `machine_id` is truncated to 10 bits.
    pub fn new(machine_id: u64) -> Self {
        Self {
            machine_id: machine_id & ((1 << MACHINE_BITS) - 1),
            state: Mutex::new(State {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();
        let mut timestamp = current_millis().max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond, borrow the next one.
                timestamp += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = ((timestamp - EPOCH_MS) << (MACHINE_BITS + SEQUENCE_BITS))
            | (self.machine_id << SEQUENCE_BITS)
            | state.sequence;

        id as i64
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH_MS)
}

/// Extract the creation timestamp (ms since Unix epoch) from a snowflake ID
pub fn extract_timestamp(snowflake: i64) -> u64 {
    ((snowflake as u64) >> (MACHINE_BITS + SEQUENCE_BITS)) + EPOCH_MS
}
