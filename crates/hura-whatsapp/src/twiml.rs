//! TwiML replies for the messaging webhook

use quick_xml::escape::escape;

/// Content type of a TwiML response
pub const CONTENT_TYPE: &str = "application/xml";

/// Wrap `text` in a single `<Message>` reply
pub fn message_response(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape(text)
    )
}
