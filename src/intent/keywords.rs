//! Keyword fallback used when no classification model is configured.

use crate::intent::Intent;

const BOOKING_KEYWORDS: &[&str] = &["book", "appointment"];

/// Greeting tokens in English and Swahili.
const GREETING_KEYWORDS: &[&str] = &["hello", "habari", "hi", "hey", "jambo"];

/// Case-insensitive. Booking keywords match anywhere, greetings only as
/// whole words. Booking wins over greeting.
pub fn keyword_intent(text: &str) -> Intent {
    let lowered = text.to_lowercase();

    if BOOKING_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Intent::BookAppointment;
    }
    if lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETING_KEYWORDS.contains(&word))
    {
        return Intent::Greeting;
    }
    Intent::Unclear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_keywords() {
        assert_eq!(keyword_intent("I want to BOOK a visit"), Intent::BookAppointment);
        assert_eq!(keyword_intent("Appointment tomorrow?"), Intent::BookAppointment);
        assert_eq!(keyword_intent("hello, can I book?"), Intent::BookAppointment);
    }

    #[test]
    fn greeting_keywords() {
        assert_eq!(keyword_intent("Hello"), Intent::Greeting);
        assert_eq!(keyword_intent("habari yako"), Intent::Greeting);
        assert_eq!(keyword_intent("Hi!"), Intent::Greeting);
    }

    #[test]
    fn short_greetings_match_whole_words_only() {
        // "hi" inside "this" is not a greeting
        assert_eq!(keyword_intent("this is odd"), Intent::Unclear);
    }

    #[test]
    fn everything_else_is_unclear() {
        assert_eq!(keyword_intent("what are your hours"), Intent::Unclear);
        assert_eq!(keyword_intent(""), Intent::Unclear);
    }
}
