//! Clients for external collaborators
//!
//! The predictor and the report generator are reached over HTTP; owner
//! notifications go through a dispatcher that only logs.

pub mod notification_dispatcher;
pub mod predictor;
pub mod report_generator;

pub use notification_dispatcher::{LoggingDispatcher, NotificationDispatcher, OutboundMessage};
pub use predictor::{HttpPredictor, Prediction, Predictor};
pub use report_generator::{HttpReportGenerator, ReportGenerator};
