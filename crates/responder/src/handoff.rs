//! Handoff detection: does a message ask for a human agent?

/// Built-in escalation phrases. Matching is case-insensitive containment.
pub const HANDOFF_PHRASES: &[&str] = &[
    "speak to a human",
    "talk to a person",
    "human agent",
    "real person",
    "customer service representative",
    "live agent",
    "human help",
    "speak with someone",
    "talk to someone",
    "representative",
];

/// Pure text predicate deciding whether a client message requests a human.
///
/// Evaluated by the router only while the session is automated; a match
/// triggers the escalation transition.
pub struct HandoffDetector {
    phrases: Vec<String>,
}

impl HandoffDetector {
    /// Build a detector from the built-in phrases plus `extra` from config.
    pub fn new(extra: &[String]) -> Self {
        let mut phrases: Vec<String> = HANDOFF_PHRASES.iter().map(|p| p.to_string()).collect();
        phrases.extend(
            extra
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty()),
        );
        Self { phrases }
    }

    /// The first phrase contained in `message`, if any.
    pub fn detect(&self, message: &str) -> Option<&str> {
        let lower = message.to_lowercase();
        self.phrases
            .iter()
            .find(|p| lower.contains(p.as_str()))
            .map(|p| p.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_builtin_phrase_case_insensitive() {
        let det = HandoffDetector::new(&[]);
        assert_eq!(
            det.detect("Please, I want to SPEAK TO A HUMAN now"),
            Some("speak to a human")
        );
    }

    #[test]
    fn plain_question_does_not_escalate() {
        let det = HandoffDetector::new(&[]);
        assert!(det.detect("What are your opening hours?").is_none());
    }

    #[test]
    fn extra_phrases_from_config_match() {
        let det = HandoffDetector::new(&["Cancel My Subscription".into()]);
        assert_eq!(
            det.detect("hi, cancel my subscription please"),
            Some("cancel my subscription")
        );
    }

    #[test]
    fn blank_extra_phrases_are_dropped() {
        let det = HandoffDetector::new(&["  ".into()]);
        assert!(det.detect("   ").is_none());
    }
}
