//! Demo data
//!
//! Reference rows for the in-memory backend, and the row builders the test
//! suites share.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::models::{Booking, BookingStatus, ServiceCenter, SeverityLevel, Technician, Vehicle};
use crate::repositories::MemoryStore;

/// A vehicle with plausible owner details
pub fn sample_vehicle(vehicle_id: &str, customer_type: &str) -> Vehicle {
    let digits: String = vehicle_id.chars().filter(|c| c.is_ascii_digit()).collect();
    Vehicle {
        vehicle_id: vehicle_id.to_string(),
        vin: format!("1FLEET{:0>11}", digits),
        model: "Transit Connect".to_string(),
        year: Some(2021),
        owner_name: format!("Owner of {}", vehicle_id),
        owner_contact: "+1-555-0100".to_string(),
        owner_email: Some(format!("{}@fleet.example", vehicle_id.to_lowercase())),
        mileage: 42_000,
        last_service_date: None,
        customer_type: customer_type.to_string(),
        created_at: Utc::now(),
    }
}

/// An active center open 08:00-18:00
pub fn sample_center(center_id: &str, region: &str, capacity_bays: i32) -> ServiceCenter {
    ServiceCenter {
        center_id: center_id.to_string(),
        name: format!("{} Service Center", region),
        region: region.to_string(),
        location: format!("{} depot", region),
        capacity_bays,
        operating_hours_start: "08:00".to_string(),
        operating_hours_end: "18:00".to_string(),
        contact_phone: Some("+1-555-0199".to_string()),
        is_active: true,
    }
}

pub fn sample_technician(tech_id: &str, center_id: &str) -> Technician {
    Technician {
        tech_id: tech_id.to_string(),
        name: format!("Technician {}", tech_id),
        skill_level: "senior".to_string(),
        center_id: center_id.to_string(),
        specialization: Some("general".to_string()),
        is_available: true,
    }
}

/// A one-hour booking for vehicle `V001`
pub fn sample_booking(
    booking_id: &str,
    center_id: &str,
    slot_start: DateTime<Utc>,
    status: BookingStatus,
) -> Booking {
    Booking {
        booking_id: booking_id.to_string(),
        vehicle_id: "V001".to_string(),
        center_id: center_id.to_string(),
        tech_id: None,
        slot_start,
        slot_end: slot_start + Duration::minutes(60),
        status,
        priority_score: 50.0,
        severity_level: SeverityLevel::Medium,
        service_type: "general_inspection".to_string(),
        estimated_duration_minutes: 60,
        notes: None,
        created_at: Utc::now(),
        confirmed_at: None,
        completed_at: None,
    }
}

/// Populate an empty store with a small fleet across three regions
pub fn seed_demo_data(store: &MemoryStore) {
    let centers = [
        ("SC001", "North", 6, "08:00", "20:00"),
        ("SC002", "South", 4, "09:00", "19:00"),
        ("SC003", "East", 8, "08:30", "18:30"),
    ];
    for (center_id, region, bays, opens, closes) in centers {
        let mut center = sample_center(center_id, region, bays);
        center.operating_hours_start = opens.to_string();
        center.operating_hours_end = closes.to_string();
        store.add_center(center);
    }

    let technicians = [
        ("T001", "SC001", "expert", "engine"),
        ("T002", "SC001", "senior", "brakes"),
        ("T003", "SC001", "junior", "general"),
        ("T004", "SC002", "expert", "electrical"),
        ("T005", "SC002", "senior", "general"),
        ("T006", "SC003", "senior", "engine"),
        ("T007", "SC003", "junior", "brakes"),
    ];
    for (tech_id, center_id, skill, specialization) in technicians {
        let mut technician = sample_technician(tech_id, center_id);
        technician.skill_level = skill.to_string();
        technician.specialization = Some(specialization.to_string());
        store.add_technician(technician);
    }

    let tiers = ["fleet", "premium", "standard"];
    for n in 1..=12 {
        let vehicle_id = format!("V{:03}", n);
        let mut vehicle = sample_vehicle(&vehicle_id, tiers[n % tiers.len()]);
        vehicle.mileage = 18_000 + (n as i64) * 3_500;
        store.add_vehicle(vehicle);
    }

    info!("🌱 Seeded demo data: {} centers, {} technicians, 12 vehicles", centers.len(), technicians.len());
}
