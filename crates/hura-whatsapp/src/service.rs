//! Menu-driven conversation handling for WhatsApp users

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use hura_core::{Backends, Direction};

use crate::menus;
use crate::session::{ConversationState, Session, SessionStore, DIRECTION_KEY};
use crate::twilio::TwilioClient;

/// Google Maps search link for the first line of a location answer
pub fn maps_search_url(response: &str) -> String {
    let first_line = response.lines().next().unwrap_or(response);
    let place = first_line.trim_matches(|c: char| c == '*' || c == '📍' || c.is_whitespace());
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        urlencoding::encode(place)
    )
}

/// Conversation state machine plus the outbound Twilio channel
pub struct WhatsAppService {
    backends: Backends,
    sessions: Arc<dyn SessionStore>,
    twilio: TwilioClient,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WhatsAppService {
    pub fn new(backends: Backends, sessions: Arc<dyn SessionStore>, twilio: TwilioClient) -> Self {
        if twilio.is_configured() {
            info!("WhatsApp service initialized successfully");
        } else {
            warn!("Twilio credentials not configured - outbound WhatsApp messages are disabled");
        }

        Self {
            backends,
            sessions,
            twilio,
            user_locks: DashMap::new(),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Handle one inbound message and return the reply.
    ///
    /// Messages from the same number are processed one at a time.
    pub async fn process_message(&self, message: &str, phone: &str) -> String {
        let lock = self.user_locks.entry(phone.to_string()).or_default().clone();
        let reply = {
            let _guard = lock.lock().await;

            let mut session = self.sessions.get_or_create(phone);
            info!(
                "Processing message from {}: '{}' (state: {:?})",
                phone, message, session.state
            );

            let reply = self.handle(message, phone, &mut session).await;
            self.sessions.save(phone, session);
            reply
        };

        drop(lock);
        self.user_locks.remove_if(phone, |_, l| Arc::strong_count(l) == 1);
        reply
    }

    async fn handle(&self, message: &str, phone: &str, session: &mut Session) -> String {
        let command = message.trim().to_lowercase();

        // Global commands
        if command == "quit" {
            *session = self.sessions.reset(phone);
            return menus::WELCOME.to_string();
        }
        if command == "menu" {
            session.transition(ConversationState::MainMenu);
            return menus::MAIN_MENU.to_string();
        }

        session.touch();
        match session.state {
            ConversationState::Welcome => match command.as_str() {
                "help" | "start" => {
                    session.transition(ConversationState::MainMenu);
                    menus::MAIN_MENU.to_string()
                }
                _ => menus::WELCOME.to_string(),
            },
            ConversationState::MainMenu => Self::handle_main_menu(&command, session),
            ConversationState::TranslationMenu => Self::handle_translation_menu(&command, session),
            ConversationState::TranslationInput => {
                let direction = session
                    .data
                    .get(DIRECTION_KEY)
                    .and_then(|d| Direction::parse(d))
                    .unwrap_or(Direction::EnToRw);
                let result = self.translate(message, direction).await;
                format!("{}\n\n{}", result, menus::TRANSLATION_SUFFIX)
            }
            ConversationState::QaInput => {
                let result = self.answer_question(message).await;
                format!("{}\n\n{}", result, menus::QA_SUFFIX)
            }
            ConversationState::LocationInput => {
                let result = self.locate(message).await;
                format!("{}\n\n{}", result, menus::LOCATION_SUFFIX)
            }
            ConversationState::WeatherInput => {
                let result = self.weather(message).await;
                format!("{}\n\n{}", result, menus::WEATHER_SUFFIX)
            }
        }
    }

    fn handle_main_menu(command: &str, session: &mut Session) -> String {
        let (state, text) = match command {
            "1" | "1." | "one" => (ConversationState::QaInput, menus::QA_MENU),
            "2" | "2." | "two" => (ConversationState::TranslationMenu, menus::TRANSLATION_MENU),
            "3" | "3." | "three" => (ConversationState::LocationInput, menus::LOCATION_MENU),
            "4" | "4." | "four" => (ConversationState::WeatherInput, menus::WEATHER_MENU),
            _ => return menus::INVALID_MAIN_OPTION.to_string(),
        };
        session.transition(state);
        text.to_string()
    }

    fn handle_translation_menu(command: &str, session: &mut Session) -> String {
        let (direction, text) = match command {
            "a" | "a." | "english to kinyarwanda" => (Direction::EnToRw, menus::EN_TO_RW_PROMPT),
            "b" | "b." | "kinyarwanda to english" => (Direction::RwToEn, menus::RW_TO_EN_PROMPT),
            _ => return menus::INVALID_TRANSLATION_OPTION.to_string(),
        };
        session
            .data
            .insert(DIRECTION_KEY.to_string(), direction.as_str().to_string());
        session.transition(ConversationState::TranslationInput);
        text.to_string()
    }

    async fn answer_question(&self, question: &str) -> String {
        let Some(rag) = &self.backends.rag else {
            return menus::QA_UNAVAILABLE.to_string();
        };

        match rag.answer(question).await {
            Ok(answer) => format!("🤖 *Answer:*\n{}", answer),
            Err(e) => {
                error!("Q&A processing error: {}", e);
                menus::QA_FAILED.to_string()
            }
        }
    }

    async fn translate(&self, text: &str, direction: Direction) -> String {
        let Some(translation) = &self.backends.translation else {
            return menus::TRANSLATION_UNAVAILABLE.to_string();
        };
        if text.trim().is_empty() {
            return menus::TRANSLATION_EMPTY.to_string();
        }

        match translation.translate(text, direction).await {
            Ok(result) => format!(
                "🔄 *Translation ({} → {}):*\n\n*Original:* {}\n*Translation:* {}",
                direction.source_language(),
                direction.target_language(),
                text,
                result.text
            ),
            Err(e) => {
                error!("Translation processing error: {}", e);
                menus::TRANSLATION_FAILED.to_string()
            }
        }
    }

    async fn locate(&self, query: &str) -> String {
        let Some(maps) = &self.backends.maps else {
            return menus::LOCATION_UNAVAILABLE.to_string();
        };

        match maps.process_query(query).await {
            Ok(response) => format!(
                "🗺️ *Location Information:*\n{}\n\n🌐 [Open in Google Maps]({})",
                response,
                maps_search_url(&response)
            ),
            Err(e) => {
                error!("Maps processing error: {}", e);
                menus::LOCATION_UNAVAILABLE.to_string()
            }
        }
    }

    async fn weather(&self, query: &str) -> String {
        let Some(weather) = &self.backends.weather else {
            return menus::WEATHER_UNAVAILABLE.to_string();
        };

        match weather.process_query(query).await {
            Ok(response) => format!("🌤️ *Weather Information:*\n{}", response),
            Err(e) => {
                error!("Weather processing error: {}", e);
                menus::WEATHER_UNAVAILABLE.to_string()
            }
        }
    }

    /// Proactively message a user. Returns `false` when credentials are
    /// missing or Twilio rejects the request.
    pub async fn send_message(&self, to: &str, body: &str) -> bool {
        match self.twilio.send_message(to, body).await {
            Ok(_) => true,
            Err(e) => {
                error!("Error sending WhatsApp message: {}", e);
                false
            }
        }
    }
}
