use validator::Validate;

use crate::dto::scheduling_dto::{
    BookingListResponse, BookingResponse, BookingsQuery, ConfirmBookingRequest,
    ScheduleBatchRequest, ScheduleBatchResponse, SlotsQuery, SlotsResponse,
};
use crate::dto::ApiResponse;
use crate::models::BookingTransition;
use crate::services::SchedulingService;
use crate::utils::errors::AppError;
use crate::utils::validation::{parse_date, require_non_empty, start_of_day};

pub struct SchedulingController {
    service: SchedulingService,
}

impl SchedulingController {
    pub fn new(service: SchedulingService) -> Self {
        Self { service }
    }

    pub async fn get_slots(&self, query: SlotsQuery) -> Result<SlotsResponse, AppError> {
        query.validate()?;
        let center_id = query.center_id.unwrap_or_default();
        let date = query.date.unwrap_or_default();
        require_non_empty("center_id", &center_id)?;
        let day = parse_date(&date)?;

        let slots = self.service.slots_for_day(&center_id, start_of_day(day)).await?;
        Ok(SlotsResponse {
            center_id,
            date,
            total_slots: slots.len(),
            available_slots: slots,
        })
    }

    pub async fn schedule_batch(
        &self,
        request: ScheduleBatchRequest,
    ) -> Result<ApiResponse<ScheduleBatchResponse>, AppError> {
        request.validate()?;
        let (start, end) = request.preferred_date_range.window()?;
        let outcome = self.service.schedule_batch(&request.vehicles, start, end).await?;
        Ok(ApiResponse::success(outcome.into()))
    }

    pub async fn confirm_booking(
        &self,
        request: ConfirmBookingRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        request.validate()?;
        let booking_id = request.booking_id.unwrap_or_default();
        require_non_empty("booking_id", &booking_id)?;
        self.transition(&booking_id, BookingTransition::Confirm).await
    }

    pub async fn list_bookings(&self, query: BookingsQuery) -> Result<BookingListResponse, AppError> {
        query.validate()?;
        let bookings = self.service.bookings().list(&query.into_filter()?).await?;
        Ok(BookingListResponse {
            count: bookings.len(),
            bookings,
        })
    }

    pub async fn get_booking(&self, booking_id: &str) -> Result<BookingResponse, AppError> {
        let booking = self.service.bookings().get(booking_id).await?;
        Ok(BookingResponse { booking })
    }

    pub async fn transition(
        &self,
        booking_id: &str,
        transition: BookingTransition,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let bookings = self.service.bookings();
        let (booking, message) = match transition {
            BookingTransition::Confirm => (bookings.confirm(booking_id).await?, "Booking confirmed successfully"),
            BookingTransition::Start => (bookings.start(booking_id).await?, "Service started"),
            BookingTransition::Complete => (bookings.complete(booking_id).await?, "Service completed"),
            BookingTransition::Cancel => (bookings.cancel(booking_id).await?, "Booking cancelled"),
        };
        Ok(ApiResponse::success_with_message(BookingResponse { booking }, message))
    }
}
