//! Automated responder for Switchboard.
//!
//! The router only talks to the [`Responder`] trait; the shipped
//! implementation is [`GeminiResponder`] over the Gemini `generateContent`
//! REST API. Generation never fails from the router's point of view —
//! internal errors produce [`FALLBACK_REPLY`].

pub mod gemini;
pub mod handoff;
pub mod prompt;

pub use gemini::GeminiResponder;
pub use handoff::HandoffDetector;

use sb_domain::types::MessageRecord;

/// Canned reply returned whenever generation fails, nudging the client
/// toward a human agent.
pub const FALLBACK_REPLY: &str = "I apologize, but I'm having trouble processing your request right now. Would you like to speak with a human agent?";

/// Produces automated replies to client messages.
#[async_trait::async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply to `message` given the recent transcript.
    ///
    /// `knowledge` is optional extra context appended to the system prompt.
    /// Must not fail: implementations return [`FALLBACK_REPLY`] on any
    /// internal error.
    async fn generate(
        &self,
        message: &str,
        history: &[MessageRecord],
        knowledge: Option<&str>,
    ) -> String;
}
