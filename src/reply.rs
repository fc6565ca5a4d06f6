//! Deterministic reply generation from transcripts
//!
//! Matching is a case-insensitive substring scan over an ordered rule table;
//! the first rule with any matching trigger wins. Unmatched transcripts fall
//! through to an echo template, so every transcript gets a reply.

/// One reply rule: a set of trigger substrings and the fixed response
#[derive(Debug, Clone)]
pub struct ReplyRule {
    triggers: Vec<String>,
    response: String,
}

impl ReplyRule {
    /// Create a rule; triggers are normalized to lowercase
    #[must_use]
    pub fn new(triggers: &[&str], response: &str) -> Self {
        Self {
            triggers: triggers.iter().map(|t| t.to_lowercase()).collect(),
            response: response.to_string(),
        }
    }
}

/// Ordered rule table mapping transcripts to replies
#[derive(Debug, Clone)]
pub struct ReplyRules {
    rules: Vec<ReplyRule>,
}

impl Default for ReplyRules {
    fn default() -> Self {
        Self::new(vec![
            ReplyRule::new(&["hello", "hi"], "Hello! How can I assist you today?"),
            ReplyRule::new(
                &["weather"],
                "I'm not sure about the weather, but you can check a weather app for updates!",
            ),
            ReplyRule::new(
                &["thank you", "thanks"],
                "You're welcome! Let me know if you need anything else.",
            ),
            ReplyRule::new(
                &["time"],
                "I'm not equipped to tell the time, but you can easily check your device's clock!",
            ),
            ReplyRule::new(
                &["your name", "who are you"],
                "I'm your friendly chatbot here to assist with your queries!",
            ),
            ReplyRule::new(&["bye", "goodbye"], "Goodbye! Have a great day!"),
            ReplyRule::new(
                &["joke"],
                "Why don't scientists trust atoms? Because they make up everything!",
            ),
            ReplyRule::new(
                &["food"],
                "I'm a chatbot, so I don't eat, but I hear pizza is always a great choice!",
            ),
            ReplyRule::new(
                &["movie"],
                "I enjoy hearing about movies, but I'm not equipped to watch them. Have you seen anything interesting lately?",
            ),
        ])
    }
}

impl ReplyRules {
    /// Create a table from an ordered rule list
    #[must_use]
    pub const fn new(rules: Vec<ReplyRule>) -> Self {
        Self { rules }
    }

    /// Empty table: every transcript gets the echo template
    #[must_use]
    pub const fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Derive the reply for a transcript
    ///
    /// Total: always returns a reply, falling back to the echo template
    /// when no rule matches (including for the empty transcript).
    #[must_use]
    pub fn reply(&self, transcript: &str) -> String {
        let lowered = transcript.to_lowercase();

        for rule in &self.rules {
            if rule.triggers.iter().any(|t| lowered.contains(t.as_str())) {
                return rule.response.clone();
            }
        }

        format!("You said: \"{transcript}\". How can I assist you further?")
    }
}
