//! Fixed texts of the WhatsApp menu flow

pub const WELCOME: &str = "🌍 *Welcome to Hura Tourism Chatbot!*

I'm your AI assistant for exploring Kigali, Rwanda. I can help you with:

• Tourism information and recommendations
• English ↔ Kinyarwanda translation
• Location and directions help
• Weather information

*How to get started:*
Type *menu* to see all available services and start exploring!

🇷🇼 Ready to explore Rwanda? Type *menu* to begin!";

pub const MAIN_MENU: &str = "📋 *Main Menu*

Please select a service:

1️⃣ *Ask Questions*
Get information about Kigali, attractions, culture, and tourism.

2️⃣ *Translation*
Translate between English and Kinyarwanda.

3️⃣ *Location Help*
Find places, get directions, and discover nearby locations.

4️⃣ *Weather*
Get current weather and forecasts for Kigali.

---
*Commands:*
• Type a number (1-4) to select a service
• Type *menu* to see this menu again
• Type *quit* to reset and start over";

pub const TRANSLATION_MENU: &str = "🔄 *Translation Service*

Choose a translation direction:

a) *English to Kinyarwanda*
Translate English text to Kinyarwanda.

b) *Kinyarwanda to English*
Translate Kinyarwanda text to English.

---
*Commands:*
• Type 'a' or 'b' to select direction
• Type *menu* to go back to main menu
• Type *quit* to reset and start over";

pub const LOCATION_MENU: &str = "🗺️ *Location Service*

I can help you find places and get directions in Kigali.

*Examples of what you can ask:*
• \"Where is Kimironko market?\"
• \"How do I get to Kigali Genocide Memorial?\"
• \"Find restaurants near me\"
• \"Directions to Kigali International Airport\"

Please type your location question:

---
*Commands:*
• Type *menu* to go back to main menu
• Type *quit* to reset and start over";

pub const WEATHER_MENU: &str = "🌤️ *Weather Service*

I can provide weather information for Kigali.

*Examples of what you can ask:*
• \"What's the weather today?\"
• \"Weather forecast for this week\"
• \"Is it going to rain tomorrow?\"
• \"Temperature in Kigali\"

Please type your weather question:

---
*Commands:*
• Type *menu* to go back to main menu
• Type *quit* to reset and start over";

pub const QA_MENU: &str = "🤖 *Question & Answer Service*

I can answer questions about Kigali, Rwanda, tourism, culture, and attractions.

*Examples of what you can ask:*
• \"Tell me about Kigali Genocide Memorial\"
• \"What are the best restaurants in Kigali?\"
• \"How safe is Kigali for tourists?\"
• \"What's the best time to visit Rwanda?\"
• \"Tell me about Rwandan culture\"

Please type your question:

---
*Commands:*
• Type *menu* to go back to main menu
• Type *quit* to reset and start over";

pub const INVALID_MAIN_OPTION: &str = "❌ Please select a valid option (1-4).

📋 *Main Menu*

1️⃣ Ask Questions
2️⃣ Translation  
3️⃣ Location Help
4️⃣ Weather

Type a number to continue, or type *menu* to see the full menu again.";

pub const EN_TO_RW_PROMPT: &str = "🔄 *English to Kinyarwanda Translation*

Please type the English text you want to translate:

*Example:* Hello, how are you?

---
Type *menu* to go back to main menu";

pub const RW_TO_EN_PROMPT: &str = "🔄 *Kinyarwanda to English Translation*

Please type the Kinyarwanda text you want to translate:

*Example:* Muraho, amakuru?

---
Type *menu* to go back to main menu";

pub const INVALID_TRANSLATION_OPTION: &str = "❌ Please select a valid option (a or b).

🔄 *Translation Service*

a) English to Kinyarwanda
b) Kinyarwanda to English

Type 'a' or 'b' to continue, or type *menu* to go back.";

// Suffixes appended while a user stays in an input state
pub const TRANSLATION_SUFFIX: &str = "📋 Type *menu* to see other services, or send another sentence to translate.";
pub const QA_SUFFIX: &str = "📋 Type *menu* to see other services, or ask another question.";
pub const LOCATION_SUFFIX: &str = "📋 Type *menu* to see other services, or ask another location question.";
pub const WEATHER_SUFFIX: &str = "📋 Type *menu* to see other services, or ask another weather question.";

// Apologies
pub const GENERIC_ERROR: &str = "❌ Sorry, I encountered an error. Please try again or type 'menu' for help.";
pub const QA_UNAVAILABLE: &str = "❌ Q&A service is not available at the moment. Please try again later.";
pub const QA_FAILED: &str = "❌ Sorry, I couldn't process your question. Please try again.";
pub const TRANSLATION_UNAVAILABLE: &str = "❌ Translation service is not available at the moment. Please try again later.";
pub const TRANSLATION_EMPTY: &str = "❌ Please provide text to translate.";
pub const TRANSLATION_FAILED: &str = "❌ Translation failed. Please try again.";
pub const LOCATION_UNAVAILABLE: &str = "❌ Location service is not available at the moment. \
Please check with your hotel or local information center.";
pub const WEATHER_UNAVAILABLE: &str = "❌ Weather service is not available at the moment. \
Please check a weather app or website.";
