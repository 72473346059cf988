//! Outbound owner notifications
//!
//! Delivery is simulated: the logging dispatcher writes the message to the
//! service log through the `log` facade and reports success.

use async_trait::async_trait;
use log::info;

use crate::models::NotificationTemplate;
use crate::utils::errors::AppResult;

/// A rendered message ready for delivery
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub booking_id: String,
    pub recipient_name: String,
    pub recipient_contact: String,
    pub recipient_email: Option<String>,
    pub template: NotificationTemplate,
    pub content: String,
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, message: &OutboundMessage) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(&self, message: &OutboundMessage) -> AppResult<()> {
        let preview: String = message.content.trim().chars().take(100).collect();
        info!("📧 NOTIFICATION SENT to {}", message.recipient_contact);
        info!("   Type: {}", message.template.as_str());
        info!("   Message: {}...", preview);
        Ok(())
    }
}
