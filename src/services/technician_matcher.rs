//! First-fit technician assignment

use chrono::{DateTime, Utc};

use crate::models::{Booking, BookingStatus, Technician};

/// Returns the first available technician, in the order given, with no
/// `confirmed` or `in_progress` booking overlapping `[slot_start, slot_end)`.
///
/// Callers pass technicians ordered by `tech_id` so the pick is stable for a
/// fixed store state.
pub fn match_technician<'a>(
    technicians: &'a [Technician],
    bookings: &[Booking],
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
) -> Option<&'a Technician> {
    technicians.iter().filter(|t| t.is_available).find(|tech| {
        !bookings.iter().any(|b| {
            b.tech_id.as_deref() == Some(tech.tech_id.as_str())
                && BookingStatus::TECHNICIAN_BUSY.contains(&b.status)
                && b.overlaps(slot_start, slot_end)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::seed::{sample_booking, sample_technician};
    use chrono::{Duration, TimeZone};

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 4, 9, 0, 0).unwrap()
    }

    fn assigned(tech_id: &str, start: DateTime<Utc>, status: BookingStatus) -> Booking {
        let mut booking = sample_booking("BKG-T", "SC-1", start, status);
        booking.tech_id = Some(tech_id.to_string());
        booking
    }

    #[test]
    fn test_first_free_technician_wins() {
        let techs = vec![sample_technician("T001", "SC-1"), sample_technician("T002", "SC-1")];
        let busy = vec![assigned("T001", nine(), BookingStatus::Confirmed)];
        let picked = match_technician(&techs, &busy, nine(), nine() + Duration::hours(1));
        assert_eq!(picked.map(|t| t.tech_id.as_str()), Some("T002"));
    }

    #[test]
    fn test_provisional_bookings_do_not_block() {
        let techs = vec![sample_technician("T001", "SC-1")];
        let busy = vec![assigned("T001", nine(), BookingStatus::Provisional)];
        let picked = match_technician(&techs, &busy, nine(), nine() + Duration::hours(1));
        assert_eq!(picked.map(|t| t.tech_id.as_str()), Some("T001"));
    }

    #[test]
    fn test_touching_intervals_do_not_conflict() {
        let techs = vec![sample_technician("T001", "SC-1")];
        let busy = vec![assigned("T001", nine() - Duration::hours(1), BookingStatus::InProgress)];
        let picked = match_technician(&techs, &busy, nine(), nine() + Duration::hours(1));
        assert!(picked.is_some());
    }

    #[test]
    fn test_none_when_everyone_is_busy_or_off() {
        let mut off = sample_technician("T002", "SC-1");
        off.is_available = false;
        let techs = vec![sample_technician("T001", "SC-1"), off];
        let busy = vec![assigned("T001", nine() + Duration::minutes(30), BookingStatus::InProgress)];
        assert!(match_technician(&techs, &busy, nine(), nine() + Duration::hours(1)).is_none());
    }
}
