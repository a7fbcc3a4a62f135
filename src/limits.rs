//! Hard caps that keep one misbehaving client from exhausting the process.

use crate::model::Ms;

/// Earliest timestamp a slot may reference (the unix epoch).
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;

/// Latest timestamp a slot may reference (2100-01-01T00:00:00Z).
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// A single bathroom slot never spans more than a day.
pub const MAX_SLOT_DURATION_MS: Ms = 24 * 3_600_000;

/// Upper bound on committed bookings for the one shared resource.
pub const MAX_BOOKINGS: usize = 10_000;

pub const MAX_USER_ID_LEN: usize = 128;

pub const MAX_PURPOSE_LEN: usize = 64;

/// How far ahead of a slot's start the reminder job looks.
pub const REMINDER_LEAD_MS: Ms = 10 * 60_000;
