use ulid::Ulid;

use crate::model::*;

use super::Engine;

impl Engine {
    /// Every committed booking, ordered by slot start.
    pub async fn all_bookings(&self) -> Vec<Booking> {
        self.schedule().read().await.iter().cloned().collect()
    }

    pub async fn get_booking(&self, id: &Ulid) -> Option<Booking> {
        self.schedule().read().await.get(id).cloned()
    }

    pub async fn booking_count(&self) -> usize {
        self.schedule().read().await.len()
    }

    pub async fn bookings_for_user(&self, user_id: &str) -> Vec<Booking> {
        self.schedule()
            .read()
            .await
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Bookings whose slot starts inside `[start, end)`. The wire layer maps
    /// a calendar-day filter onto this window using the one configured UTC
    /// offset — the engine itself has no notion of days.
    pub async fn bookings_between(&self, start: Ms, end: Ms) -> Vec<Booking> {
        self.schedule()
            .read()
            .await
            .iter()
            .filter(|b| b.slot.start >= start && b.slot.start < end)
            .cloned()
            .collect()
    }

    /// Bookings with no reminder sent whose start lies in `(now, now + lead]`.
    /// Already-started slots are skipped; their window has passed.
    pub async fn due_reminders(&self, now: Ms, lead: Ms) -> Vec<Booking> {
        self.schedule()
            .read()
            .await
            .iter()
            .filter(|b| !b.reminder_sent && b.slot.start > now && b.slot.start <= now + lead)
            .cloned()
            .collect()
    }
}
