//! Twilio webhook endpoint for inbound WhatsApp messages

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::menus;
use crate::service::WhatsAppService;
use crate::twilio::{strip_whatsapp_prefix, SignatureVerifier};
use crate::twiml;

pub const WEBHOOK_PATH: &str = "/whatsapp/webhook";
const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// Webhook state
#[derive(Clone, Default)]
pub struct WebhookState {
    pub service: Option<Arc<WhatsAppService>>,
    /// Present when inbound requests must carry a valid Twilio signature
    pub verifier: Option<SignatureVerifier>,
}

/// Routes for the WhatsApp webhook, ready to merge into the main app
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(handle_webhook))
        .with_state(Arc::new(state))
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn twiml_reply(text: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, twiml::CONTENT_TYPE)],
        twiml::message_response(text),
    )
        .into_response()
}

async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response {
    let params = match form {
        Ok(Form(params)) => params,
        Err(rejection) => return detail(rejection.status(), &rejection.body_text()),
    };

    let (Some(from), Some(body), Some(_to)) = (params.get("From"), params.get("Body"), params.get("To")) else {
        return detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Form fields From, Body and To are required.",
        );
    };

    let Some(service) = state.service.clone() else {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "WhatsApp service not available.");
    };

    if let Some(verifier) = &state.verifier {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verifier.verify(&params, signature) {
            warn!("Rejected WhatsApp webhook with invalid signature");
            return detail(StatusCode::FORBIDDEN, "Invalid Twilio signature.");
        }
    }

    let phone = strip_whatsapp_prefix(from).to_string();
    let message = body.clone();
    info!("Received WhatsApp message from {}: {}", phone, message);

    let task = tokio::spawn(async move { service.process_message(&message, &phone).await });
    let reply = match task.await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Error processing WhatsApp message: {}", e);
            menus::GENERIC_ERROR.to_string()
        }
    };

    twiml_reply(&reply)
}
