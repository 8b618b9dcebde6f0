//! Payment orders driven through a small state machine by gateways and their webhooks.

pub mod gateway;
pub mod service;
pub mod webhook;

pub use gateway::{GatewayCharge, GatewayError, GatewayRegistry, MockGateway, PaymentGateway};
pub use service::{PaymentService, SubmitOutcome, TransitionOutcome};
pub use webhook::{WebhookEvent, WebhookOutcome, WebhookProcessor, SIGNATURE_HEADER};
