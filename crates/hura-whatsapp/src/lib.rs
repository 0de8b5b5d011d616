//! hura-whatsapp: WhatsApp channel for the Hura tourism assistant
//!
//! Receives Twilio webhooks, walks each user through the menu flow and
//! replies with TwiML.

pub mod error;
pub mod menus;
pub mod service;
pub mod session;
pub mod twilio;
pub mod twiml;
pub mod webhook;

pub use error::{Result, WhatsAppError};
pub use service::WhatsAppService;
pub use session::{ConversationState, InMemorySessionStore, Session, SessionStore};
pub use twilio::{SignatureVerifier, TwilioClient};
pub use webhook::{router, WebhookState, WEBHOOK_PATH};
