//! Prompt builders for the advisory features
//!
//! The gateway takes plain text; everything request-specific is folded into
//! the prompt here.

/// Shown on the farmer dashboard when the browser sent no coordinates.
pub const ENABLE_LOCATION_ADVICE: &str = "<p>Enable location for personalized advice.</p>";

/// Buyer dashboard placeholder.
pub const ENABLE_LOCATION_INTEL: &str = "Enable location for intel.";

/// Consumer dashboard placeholder.
pub const ENABLE_LOCATION_MEAL_PLAN: &str = "Enable location for a meal plan.";

/// Chat assistant prompt wrapping the user's message.
pub fn chatbot(message: &str) -> String {
    format!(
        "You are 'Millet AI Assistant', a helpful chatbot for the MaaS platform in India. \
         Answer the user's query concisely and using Markdown: \"{message}\""
    )
}

/// Location-aware advisory prompt for the farmer dashboard.
pub fn farm_advisor(latitude: &str, longitude: &str) -> String {
    format!(
        "Act as an Agri-AI assistant for a millet farmer at lat {latitude}, lon {longitude} in India. \
         Provide a bulleted list of actionable advice. Include: 1. A crop health tip. \
         2. A market price alert. 3. A government scheme reminder."
    )
}

/// Simulated pest/disease analysis for an uploaded plant image.
pub fn plant_pathologist() -> String {
    "Act as a plant pathologist AI. A farmer has uploaded an image of a millet plant. \
     Provide a simulated analysis. Identify a common potential issue (e.g., stem borer, \
     downy mildew) and give a confidence score and a brief, actionable recommendation."
        .to_string()
}
