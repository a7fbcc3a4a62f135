use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// Validate a raw candidate interval, producing a `Slot` only when it is sane.
/// `start < end` is checked before anything else — an inverted interval never
/// reaches the conflict rules.
pub(crate) fn validate_slot(start: Ms, end: Ms) -> Result<Slot, EngineError> {
    use crate::limits::*;
    if start >= end {
        return Err(EngineError::InvalidSlot("start must be before end"));
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::InvalidSlot("timestamp out of range"));
    }
    if end - start > MAX_SLOT_DURATION_MS {
        return Err(EngineError::InvalidSlot("slot too long"));
    }
    Ok(Slot::new(start, end))
}

/// The five-rule conflict predicate. A candidate conflicts with an existing
/// slot if any of:
///   1. candidate.start strictly inside (e.start, e.end)
///   2. candidate.end strictly inside (e.start, e.end)
///   3. candidate strictly contains e
///   4. candidate.start == e.start
///   5. candidate.end == e.end
///
/// Rules 4–5 reject any shared boundary instant on the same field, while
/// back-to-back slots (one's end equal to the other's start) pass freely.
/// That asymmetry is long-standing behavior that clients depend on; keep it
/// as is pending product review.
pub fn slots_conflict(candidate: &Slot, existing: &Slot) -> bool {
    let inside = |t: Ms, s: &Slot| t > s.start && t < s.end;
    inside(candidate.start, existing)
        || inside(candidate.end, existing)
        || (candidate.start < existing.start && candidate.end > existing.end)
        || candidate.start == existing.start
        || candidate.end == existing.end
}

/// Check a candidate against every committed booking, optionally skipping the
/// one being edited. Pure and deterministic; iteration order only affects
/// which booking a rejection cites, never the accept/reject outcome.
pub fn check_no_conflict(
    schedule: &Schedule,
    candidate: &Slot,
    exclude: Option<ulid::Ulid>,
) -> Result<(), EngineError> {
    for booking in schedule.iter() {
        if exclude == Some(booking.id) {
            continue;
        }
        if slots_conflict(candidate, &booking.slot) {
            return Err(EngineError::Conflict(booking.id));
        }
    }
    Ok(())
}
