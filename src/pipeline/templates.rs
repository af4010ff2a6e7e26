//! Canonical-language reply templates, keyed by intent.

use crate::intent::Intent;

pub const GREETING_REPLY: &str = "Hello! Welcome to HealthBridge AI. How can I help you today? \
You can ask to book an appointment, or ask a health-related question.";

pub const BOOKING_REPLY: &str = "I can help with that. To book an appointment, I need to know \
the reason for your visit and your preferred date and time.";

pub const UNCLEAR_REPLY: &str = "I'm sorry, I didn't understand that. Could you please rephrase? \
You can ask to book an appointment or ask a health question.";

/// Reply text in the canonical language for `intent`.
///
/// Intents without a dedicated template get a generic acknowledgement
/// naming the intent.
pub fn reply_for(intent: Intent) -> String {
    match intent {
        Intent::Greeting => GREETING_REPLY.to_string(),
        Intent::BookAppointment => BOOKING_REPLY.to_string(),
        Intent::Unclear => UNCLEAR_REPLY.to_string(),
        other => format!(
            "Intent identified: {other}. The '{other}' agent will assist you shortly."
        ),
    }
}
