//! Slot discovery
//!
//! Walks a window at fixed slot steps, keeping to the center's opening
//! hours, and admits every start whose slot still has a free bay.
//! Operating hours are read as UTC times of day.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::models::{Booking, ServiceCenter};

#[derive(Debug, Clone, Copy)]
pub struct SlotAllocator {
    slot_duration: Duration,
}

impl SlotAllocator {
    pub fn new(slot_duration: Duration) -> Self {
        Self { slot_duration }
    }

    pub fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    /// Candidate starts in `[window_start, window_end)`, ascending.
    ///
    /// `existing` must hold the center's bay-occupying bookings overlapping
    /// `[window_start, window_end + slot_duration)`; other bookings are
    /// ignored.
    pub fn available_slots(
        &self,
        center: &ServiceCenter,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        existing: &[Booking],
    ) -> Vec<DateTime<Utc>> {
        self.open_slots(center, window_start, window_end, existing).collect()
    }

    /// Earliest admissible start; stops walking the window at the first hit
    pub fn first_available_slot(
        &self,
        center: &ServiceCenter,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        existing: &[Booking],
    ) -> Option<DateTime<Utc>> {
        self.open_slots(center, window_start, window_end, existing).next()
    }

    fn open_slots<'a>(
        &self,
        center: &'a ServiceCenter,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        existing: &'a [Booking],
    ) -> impl Iterator<Item = DateTime<Utc>> + 'a {
        let hours = match center.operating_hours() {
            Some(hours) if center.capacity_bays > 0 && self.slot_duration > Duration::zero() => Some(hours),
            Some(_) => None,
            None => {
                warn!(
                    "Center {} has unusable operating hours {}-{}",
                    center.center_id, center.operating_hours_start, center.operating_hours_end
                );
                None
            }
        };
        let relevant: Vec<&'a Booking> = existing
            .iter()
            .filter(|b| b.center_id == center.center_id && b.status.occupies_bay())
            .collect();
        let capacity = center.capacity_bays.max(0) as usize;
        let step = self.slot_duration;
        let mut cursor = window_start;

        std::iter::from_fn(move || {
            let hours = hours?;
            while cursor < window_end {
                let time = cursor.time();
                if time < hours.opens {
                    cursor = at_time(cursor.date_naive(), hours.opens);
                    continue;
                }
                if time >= hours.closes {
                    cursor = next_opening(cursor.date_naive(), hours.opens);
                    continue;
                }

                let candidate = cursor;
                cursor += step;
                if peak_occupancy(&relevant, candidate, candidate + step) < capacity {
                    return Some(candidate);
                }
                debug!("Slot {} full at {}", candidate, center.center_id);
            }
            None
        })
    }

    /// Whether one more booking fits in `[slot_start, slot_start + duration)`
    pub fn has_capacity(&self, center: &ServiceCenter, slot_start: DateTime<Utc>, existing: &[Booking]) -> bool {
        let relevant: Vec<&Booking> = existing
            .iter()
            .filter(|b| b.center_id == center.center_id && b.status.occupies_bay())
            .collect();
        center.capacity_bays > 0
            && peak_occupancy(&relevant, slot_start, slot_start + self.slot_duration)
                < center.capacity_bays as usize
    }
}

/// Highest number of bookings covering any instant of `[start, end)`.
///
/// Occupancy only rises at a booking start, so checking `start` and every
/// booking start inside the interval is enough.
fn peak_occupancy(bookings: &[&Booking], start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
    let occupancy_at = |instant: DateTime<Utc>| bookings.iter().filter(|b| b.covers(instant)).count();
    bookings
        .iter()
        .map(|b| b.slot_start)
        .filter(|s| *s > start && *s < end)
        .map(occupancy_at)
        .chain(std::iter::once(occupancy_at(start)))
        .max()
        .unwrap_or(0)
}

fn at_time(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}

fn next_opening(date: NaiveDate, opens: NaiveTime) -> DateTime<Utc> {
    match date.succ_opt() {
        Some(next) => at_time(next, opens),
        None => DateTime::<Utc>::MAX_UTC,
    }
}
