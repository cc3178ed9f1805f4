//! Keyword responder
//!
//! Maps an utterance to a canned reply using an ordered rule table.
//! Rules are checked top to bottom and the first rule with any keyword
//! contained in the lower-cased input wins, so table order is the tie-break.

use chrono::{DateTime, Local};

/// Reply produced by a matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Fixed text
    Fixed(&'static str),
    /// "The current time is ..." rendered from the clock
    CurrentTime,
}

/// A keyword rule: any keyword match selects the reply
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub keywords: &'static [&'static str],
    pub reply: Reply,
}

/// Default rule table, in priority order
pub const RULES: &[Rule] = &[
    Rule {
        keywords: &["hello", "hi", "hey"],
        reply: Reply::Fixed("Hello! How can I help you today?"),
    },
    Rule {
        keywords: &["how are you", "how do you do"],
        reply: Reply::Fixed("I'm doing well, thank you for asking. How can I assist you?"),
    },
    Rule {
        keywords: &["time", "what time"],
        reply: Reply::CurrentTime,
    },
    Rule {
        keywords: &["weather", "temperature"],
        reply: Reply::Fixed(
            "I'm sorry, I don't have access to real-time weather data. Would you like me to connect to a weather service?",
        ),
    },
    Rule {
        keywords: &["refresh", "reload", "update"],
        reply: Reply::Fixed(
            "To refresh the application, you can either click the refresh button in your browser or press F5. If you're having specific issues, could you tell me what exactly you're trying to refresh?",
        ),
    },
    Rule {
        keywords: &["bye", "goodbye", "see you"],
        reply: Reply::Fixed("Goodbye! Have a great day!"),
    },
    Rule {
        keywords: &["thank you", "thanks", "appreciate it"],
        reply: Reply::Fixed(
            "You're very welcome! Let me know if there's anything else I can do for you.",
        ),
    },
];

/// Ordered keyword responder
#[derive(Debug, Clone, Copy)]
pub struct Responder {
    rules: &'static [Rule],
}

impl Default for Responder {
    fn default() -> Self {
        Self { rules: RULES }
    }
}

impl Responder {
    /// Create a responder over a custom rule table
    #[must_use]
    pub const fn with_rules(rules: &'static [Rule]) -> Self {
        Self { rules }
    }

    /// Find the first rule matching `text`, if any
    #[must_use]
    pub fn matching_rule(&self, text: &str) -> Option<&'static Rule> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k)))
    }

    /// Generate a reply using the local clock
    #[must_use]
    pub fn generate(&self, text: &str) -> String {
        self.generate_at(text, Local::now())
    }

    /// Generate a reply with an explicit clock reading
    #[must_use]
    pub fn generate_at(&self, text: &str, now: DateTime<Local>) -> String {
        match self.matching_rule(text).map(|rule| rule.reply) {
            Some(Reply::Fixed(reply)) => reply.to_string(),
            Some(Reply::CurrentTime) => {
                format!("The current time is {}", now.format("%-I:%M:%S %p"))
            }
            None => fallback(text),
        }
    }
}

/// Generate a reply with the default rule table
#[must_use]
pub fn generate(text: &str) -> String {
    Responder::default().generate(text)
}

/// Clarification reply for unmatched input
#[must_use]
pub fn fallback(text: &str) -> String {
    format!(
        "I understand you asked about '{text}'. Could you provide more details about what you'd like to know?"
    )
}
