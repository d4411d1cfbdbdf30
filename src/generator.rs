// ABOUTME: Thread-safe generator for ObjectIds and Timestamps.
// ABOUTME: Holds a process-unique value and two atomic counters, seeded once per process.

use crate::oid::ObjectId;
use crate::timestamp::{unix_seconds, Timestamp};
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

const OBJECT_ID_COUNTER_MASK: u32 = 0x00ff_ffff;

/// Initial state of an [`IdGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Seed {
    pub process_unique: [u8; 5],
    pub object_id_counter: u32,
    pub timestamp_counter: u32,
}

impl Seed {
    /// A seed drawn from the operating system's random source.
    #[must_use]
    pub fn random() -> Self {
        let mut process_unique = [0u8; 5];
        OsRng.fill_bytes(&mut process_unique);
        Self {
            process_unique,
            object_id_counter: OsRng.next_u32(),
            timestamp_counter: OsRng.next_u32(),
        }
    }
}

/// Produces ObjectIds and Timestamps.
///
/// Both counters advance atomically, so concurrent callers always receive
/// distinct counter values. The ObjectId counter keeps its low 24 bits; the
/// timestamp counter wraps at 2^32.
#[derive(Debug)]
pub struct IdGenerator {
    process_unique: [u8; 5],
    object_id_counter: AtomicU32,
    timestamp_counter: AtomicU32,
}

impl IdGenerator {
    #[must_use]
    pub fn new(seed: Seed) -> Self {
        Self {
            process_unique: seed.process_unique,
            object_id_counter: AtomicU32::new(seed.object_id_counter),
            timestamp_counter: AtomicU32::new(seed.timestamp_counter),
        }
    }

    /// The process-wide generator, randomly seeded on first use.
    pub fn global() -> &'static IdGenerator {
        static GLOBAL: OnceLock<IdGenerator> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let seed = Seed::random();
            tracing::debug!(
                process_unique = %hex::encode(seed.process_unique),
                "seeded global id generator"
            );
            IdGenerator::new(seed)
        })
    }

    #[must_use]
    pub fn process_unique(&self) -> [u8; 5] {
        self.process_unique
    }

    fn next_object_id_counter(&self) -> u32 {
        self.object_id_counter
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
            & OBJECT_ID_COUNTER_MASK
    }

    fn next_timestamp_counter(&self) -> u32 {
        self.timestamp_counter
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    /// A new ObjectId for the current second.
    pub fn object_id(&self) -> ObjectId {
        self.object_id_at(Utc::now())
    }

    /// A new ObjectId for `time`, truncated to whole seconds. Seconds
    /// outside the u32 range saturate to 0 or `u32::MAX`.
    pub fn object_id_at<Tz: TimeZone>(&self, time: DateTime<Tz>) -> ObjectId {
        ObjectId::from_parts(
            unix_seconds(&time),
            self.process_unique,
            self.next_object_id_counter(),
        )
    }

    /// A new Timestamp for the current second.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp_at(Utc::now())
    }

    /// A new Timestamp for `time`, truncated to whole seconds. Seconds
    /// saturate the same way as [`object_id_at`](Self::object_id_at).
    pub fn timestamp_at<Tz: TimeZone>(&self, time: DateTime<Tz>) -> Timestamp {
        Timestamp::from_parts(unix_seconds(&time), self.next_timestamp_counter())
    }
}
