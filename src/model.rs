use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Half-open interval `[start, end)` of exclusive bathroom occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: Ms,
    pub end: Ms,
}

impl Slot {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// What the slot is for. Descriptive only, never part of a validity decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purpose {
    Shower,
    Bath,
    Toilet,
    Other(String),
}

impl Purpose {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "shower" => Purpose::Shower,
            "bath" => Purpose::Bath,
            "toilet" => Purpose::Toilet,
            other => Purpose::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Purpose::Shower => write!(f, "shower"),
            Purpose::Bath => write!(f, "bath"),
            Purpose::Toilet => write!(f, "toilet"),
            Purpose::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A committed reservation on the shared bathroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    /// Opaque identifier of the owning household member. Immutable after create.
    pub user_id: String,
    pub slot: Slot,
    pub purpose: Purpose,
    /// Set once by the reminder job after a successful delivery.
    pub reminder_sent: bool,
    pub created_at: Ms,
}

/// The authoritative booking set for the one shared bathroom.
/// Kept sorted by `slot.start`; mutated only through the engine.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    bookings: Vec<Booking>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Insert maintaining sort order by slot.start.
    pub fn insert(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.slot.start, |b| b.slot.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn remove(&mut self, id: Ulid) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    pub fn get(&self, id: &Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == *id)
    }

    /// Flip the reminder flag in place. Returns false if the id is unknown.
    pub fn mark_reminder(&mut self, id: Ulid) -> bool {
        match self.bookings.iter_mut().find(|b| b.id == id) {
            Some(b) => {
                b.reminder_sent = true;
                true
            }
            None => false,
        }
    }

    /// All bookings, ordered by slot start.
    pub fn iter(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter()
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        id: Ulid,
        user_id: String,
        slot: Slot,
        purpose: Purpose,
        created_at: Ms,
    },
    BookingUpdated {
        id: Ulid,
        slot: Slot,
        purpose: Purpose,
    },
    BookingCancelled {
        id: Ulid,
    },
    ReminderMarked {
        id: Ulid,
    },
}
