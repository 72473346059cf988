//! Owner notifications
//!
//! Renders the message for a booking, hands it to the dispatcher and keeps
//! an audit record whatever the delivery outcome.

use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::clients::{NotificationDispatcher, OutboundMessage};
use crate::models::{
    Booking, DeliveryStatus, NewNotification, Notification, NotificationTemplate, ServiceCenter,
    Technician, Vehicle,
};
use crate::repositories::FleetStore;
use crate::utils::errors::{not_found_error, AppResult};

const CHANNEL: &str = "both";

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn FleetStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn FleetStore>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Send one message about a booking and record it
    pub async fn send(&self, booking_id: &str, template: NotificationTemplate) -> AppResult<Notification> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| not_found_error("Booking", booking_id))?;
        let vehicle = self
            .store
            .get_vehicle(&booking.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &booking.vehicle_id))?;
        let center = self
            .store
            .get_center(&booking.center_id)
            .await?
            .ok_or_else(|| not_found_error("Service center", &booking.center_id))?;
        let technician = match &booking.tech_id {
            Some(tech_id) => self.store.get_technician(tech_id).await?,
            None => None,
        };

        let message = OutboundMessage {
            booking_id: booking.booking_id.clone(),
            recipient_name: vehicle.owner_name.clone(),
            recipient_contact: vehicle.owner_contact.clone(),
            recipient_email: vehicle.owner_email.clone(),
            template,
            content: render_message(template, &booking, &vehicle, &center, technician.as_ref()),
        };

        let status = match self.dispatcher.dispatch(&message).await {
            Ok(()) => DeliveryStatus::Sent,
            Err(e) => {
                warn!("❌ Error sending notification for {}: {}", booking_id, e);
                DeliveryStatus::Failed
            }
        };

        self.store
            .insert_notification(NewNotification {
                booking_id: message.booking_id,
                recipient_name: message.recipient_name,
                recipient_contact: message.recipient_contact,
                recipient_email: message.recipient_email,
                channel: CHANNEL.to_string(),
                template,
                message_content: message.content,
                status,
                sent_at: Utc::now(),
            })
            .await
    }

    pub async fn list(&self, booking_id: Option<&str>, limit: i64) -> AppResult<Vec<Notification>> {
        self.store.list_notifications(booking_id, limit).await
    }
}

pub fn render_message(
    template: NotificationTemplate,
    booking: &Booking,
    vehicle: &Vehicle,
    center: &ServiceCenter,
    technician: Option<&Technician>,
) -> String {
    match template {
        NotificationTemplate::BookingConfirmation => format!(
            "Dear {owner},\n\n\
             Your vehicle maintenance appointment has been confirmed!\n\n\
             Vehicle: {model} ({vin})\n\
             Date & Time: {when}\n\
             Service Center: {center}\n\
             Location: {location}\n\
             Technician: {tech}\n\n\
             Booking ID: {id}\n\n\
             Please arrive 10 minutes early. For any changes, contact us at {phone}.\n",
            owner = vehicle.owner_name,
            model = vehicle.model,
            vin = vehicle.vin,
            when = booking.slot_start.format("%B %d, %Y at %I:%M %p"),
            center = center.name,
            location = center.location,
            tech = technician.map_or("TBA", |t| t.name.as_str()),
            id = booking.booking_id,
            phone = center.contact_phone.as_deref().unwrap_or("the service center"),
        ),
        NotificationTemplate::Reminder => format!(
            "Reminder: Your maintenance appointment is on {} at {}.\nBooking ID: {}\n",
            booking.slot_start.format("%B %d"),
            booking.slot_start.format("%I:%M %p"),
            booking.booking_id
        ),
        NotificationTemplate::Completion => format!(
            "Dear {}, the maintenance of your {} is complete.\nBooking ID: {}\n",
            vehicle.owner_name, vehicle.model, booking.booking_id
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::LoggingDispatcher;
    use crate::database::seed::{sample_booking, sample_center, sample_technician, sample_vehicle};
    use crate::models::BookingStatus;
    use crate::repositories::MemoryStore;
    use crate::utils::errors::AppError;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct DownDispatcher;

    #[async_trait]
    impl NotificationDispatcher for DownDispatcher {
        async fn dispatch(&self, _message: &OutboundMessage) -> AppResult<()> {
            Err(AppError::DependencyUnavailable("sms gateway down".to_string()))
        }
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_vehicle(sample_vehicle("V001", "fleet"));
        store.add_center(sample_center("SC-1", "North", 2));
        let slot = Utc.with_ymd_and_hms(2030, 3, 4, 14, 0, 0).unwrap();
        store.add_booking(sample_booking("BKG-1", "SC-1", slot, BookingStatus::Confirmed));
        store
    }

    #[test]
    fn test_confirmation_message() {
        let mut booking = sample_booking(
            "BKG-1",
            "SC-1",
            Utc.with_ymd_and_hms(2030, 3, 4, 14, 0, 0).unwrap(),
            BookingStatus::Confirmed,
        );
        let vehicle = sample_vehicle("V001", "fleet");
        let center = sample_center("SC-1", "North", 2);

        let text = render_message(NotificationTemplate::BookingConfirmation, &booking, &vehicle, &center, None);
        assert!(text.contains("Date & Time: March 04, 2030 at 02:00 PM"));
        assert!(text.contains("Technician: TBA"));
        assert!(text.contains("Booking ID: BKG-1"));

        booking.tech_id = Some("T001".to_string());
        let tech = sample_technician("T001", "SC-1");
        let text = render_message(NotificationTemplate::BookingConfirmation, &booking, &vehicle, &center, Some(&tech));
        assert!(text.contains("Technician: Technician T001"));
    }

    #[tokio::test]
    async fn test_send_records_audit_trail() {
        let store = store();
        let service = NotificationService::new(Arc::new(store.clone()), Arc::new(LoggingDispatcher));

        let sent = service.send("BKG-1", NotificationTemplate::Reminder).await.unwrap();
        assert_eq!(sent.status, "sent");
        assert_eq!(sent.template, "reminder");
        assert_eq!(sent.channel, "both");
        assert_eq!(service.list(Some("BKG-1"), 50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_still_recorded() {
        let store = store();
        let service = NotificationService::new(Arc::new(store.clone()), Arc::new(DownDispatcher));

        let record = service.send("BKG-1", NotificationTemplate::BookingConfirmation).await.unwrap();
        assert_eq!(record.status, "failed");
        assert_eq!(service.list(None, 50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_booking() {
        let service = NotificationService::new(Arc::new(store()), Arc::new(LoggingDispatcher));
        assert!(matches!(
            service.send("BKG-404", NotificationTemplate::Reminder).await,
            Err(AppError::NotFound(_))
        ));
    }
}
