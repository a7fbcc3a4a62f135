use tokio::sync::oneshot;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, now_ms, validate_slot};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Commit a new booking. The conflict check runs against the authoritative
    /// set under the write lock — never against whatever snapshot the caller
    /// may have looked at earlier.
    pub async fn create_booking(
        &self,
        user_id: &str,
        start: Ms,
        end: Ms,
        purpose: Purpose,
    ) -> Result<Booking, EngineError> {
        if user_id.is_empty() {
            return Err(EngineError::InvalidSlot("empty user id"));
        }
        if user_id.len() > MAX_USER_ID_LEN {
            return Err(EngineError::LimitExceeded("user id too long"));
        }
        if let Purpose::Other(ref label) = purpose
            && label.len() > MAX_PURPOSE_LEN
        {
            return Err(EngineError::LimitExceeded("purpose too long"));
        }
        let slot = validate_slot(start, end)?;

        let mut guard = self.schedule().write().await;
        if guard.len() >= MAX_BOOKINGS {
            return Err(EngineError::LimitExceeded("too many bookings"));
        }
        check_no_conflict(&guard, &slot, None)?;

        let booking = Booking {
            id: Ulid::new(),
            user_id: user_id.to_string(),
            slot,
            purpose,
            reminder_sent: false,
            created_at: now_ms(),
        };
        let event = Event::BookingCreated {
            id: booking.id,
            user_id: booking.user_id.clone(),
            slot: booking.slot,
            purpose: booking.purpose.clone(),
            created_at: booking.created_at,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(booking)
    }

    /// Edit an existing booking's slot and purpose in place. The conflict
    /// check excludes the booking itself, so re-saving the same interval
    /// always succeeds. On any rejection the stored booking is untouched.
    pub async fn update_booking(
        &self,
        id: Ulid,
        start: Ms,
        end: Ms,
        purpose: Purpose,
    ) -> Result<Booking, EngineError> {
        if let Purpose::Other(ref label) = purpose
            && label.len() > MAX_PURPOSE_LEN
        {
            return Err(EngineError::LimitExceeded("purpose too long"));
        }
        let slot = validate_slot(start, end)?;

        let mut guard = self.schedule().write().await;
        if guard.get(&id).is_none() {
            return Err(EngineError::NotFound(id));
        }
        check_no_conflict(&guard, &slot, Some(id))?;

        let event = Event::BookingUpdated { id, slot, purpose };
        self.persist_and_apply(&mut guard, &event).await?;
        guard.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    pub async fn cancel_booking(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.schedule().write().await;
        if guard.get(&id).is_none() {
            return Err(EngineError::NotFound(id));
        }
        let event = Event::BookingCancelled { id };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Record that a pre-start reminder went out. Called by the reminder job
    /// after a successful delivery; a repeat call is a no-op so a failed
    /// flag write followed by a retry never double-journals.
    pub async fn mark_reminder_sent(&self, id: Ulid) -> Result<(), EngineError> {
        let mut guard = self.schedule().write().await;
        match guard.get(&id) {
            None => Err(EngineError::NotFound(id)),
            Some(b) if b.reminder_sent => Ok(()),
            Some(_) => {
                let event = Event::ReminderMarked { id };
                self.persist_and_apply(&mut guard, &event).await
            }
        }
    }

    /// Rewrite the WAL with only the events needed to recreate the current
    /// schedule. Holding the read guard across the swap keeps mutations (and
    /// therefore new appends) out until the rewrite lands.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let guard = self.schedule().read().await;
        let mut events = Vec::with_capacity(guard.len() * 2);
        for b in guard.iter() {
            events.push(Event::BookingCreated {
                id: b.id,
                user_id: b.user_id.clone(),
                slot: b.slot,
                purpose: b.purpose.clone(),
                created_at: b.created_at,
            });
            if b.reminder_sent {
                events.push(Event::ReminderMarked { id: b.id });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
