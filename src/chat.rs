//! UI-agnostic chat state
//!
//! The transcript, its messages and the small enums that drive it. Nothing in
//! here knows about the terminal or the network.

use chrono::{DateTime, Local};

/// Shown in place of the assistant's answer while a request is outstanding.
pub const PLACEHOLDER_TEXT: &str = "Analyzing your query...";

/// Used when the backend answers without a usable `response` field.
pub const FALLBACK_REPLY: &str = "I received your query but couldn't generate a response.";

/// Replaces the placeholder when the backend cannot be reached.
pub const CONNECTION_ERROR_REPLY: &str = "Sorry, I'm having trouble connecting to the server. \
Please make sure the backend is running on localhost:8000.";

const GREETING_HINDI: &str = "नमस्कार! मैं आरोग्य मित्र हूं। आपके स्वास्थ्य की जानकारी में आपकी सहायता करूंगा। \
कृपया अपने लक्षण या स्वास्थ्य संबंधी प्रश्न बताएं।";
const GREETING_ENGLISH: &str =
    "Hello! I'm Arogya Mitra, your health assistant. How can I help you with your health concerns today?";

pub type MessageId = u64;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// One utterance in the transcript
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Local>,
    /// Set only on the assistant placeholder awaiting a reply
    pub pending: bool,
}

impl Message {
    pub fn is_placeholder(&self) -> bool {
        self.pending
    }
}

/// What happened to an exchange. Applied to the transcript by [`Transcript::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Success(String),
    Failure(String),
}

/// Gates every submission entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight { placeholder: MessageId },
}

impl RequestState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RequestState::InFlight { .. })
    }
}

/// A canned one-tap question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickQuestion {
    pub text: &'static str,
    pub hindi: &'static str,
}

pub const QUICK_QUESTIONS: [QuickQuestion; 4] = [
    QuickQuestion {
        text: "I have chest pain",
        hindi: "मुझे सीने में दर्द है",
    },
    QuickQuestion {
        text: "I have fever",
        hindi: "मुझे बुखार है",
    },
    QuickQuestion {
        text: "Check my symptoms",
        hindi: "मेरे लक्षण जांचें",
    },
    QuickQuestion {
        text: "Medicine interaction",
        hindi: "दवा का सेवन",
    },
];

/// Ordered, append-only list of messages held for the lifetime of a view.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: MessageId,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    /// A transcript opened with the bilingual welcome messages.
    pub fn with_greeting() -> Self {
        let mut transcript = Self::new();
        transcript.push(GREETING_HINDI.to_string(), Sender::Assistant, false);
        transcript.push(GREETING_ENGLISH.to_string(), Sender::Assistant, false);
        transcript
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn placeholder(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.pending)
    }

    pub fn push_user(&mut self, text: String) -> MessageId {
        self.push(text, Sender::User, false)
    }

    /// Appends the assistant placeholder. Returns `None` if one is already
    /// outstanding.
    pub fn push_placeholder(&mut self) -> Option<MessageId> {
        if self.placeholder().is_some() {
            return None;
        }
        Some(self.push(PLACEHOLDER_TEXT.to_string(), Sender::Assistant, true))
    }

    /// Reduces an outcome into the placeholder identified by `id`, replacing
    /// it in place. Returns false if `id` is not an outstanding placeholder.
    pub fn apply(&mut self, id: MessageId, outcome: Outcome) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id && m.pending) else {
            return false;
        };

        let text = match outcome {
            Outcome::Pending => return true,
            Outcome::Success(text) => text,
            Outcome::Failure(_) => CONNECTION_ERROR_REPLY.to_string(),
        };

        message.text = text;
        message.pending = false;
        message.timestamp = Local::now();
        true
    }

    fn push(&mut self, text: String, sender: Sender, pending: bool) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(Message {
            id,
            text,
            sender,
            timestamp: Local::now(),
            pending,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_seeds_two_assistant_messages() {
        let transcript = Transcript::with_greeting();
        assert_eq!(transcript.len(), 2);
        assert!(transcript.messages().iter().all(|m| m.sender == Sender::Assistant));
        assert!(transcript.placeholder().is_none());
    }

    #[test]
    fn test_ids_increase_monotonically() {
        let mut transcript = Transcript::with_greeting();
        let a = transcript.push_user("one".into());
        let b = transcript.push_placeholder().unwrap();
        assert_eq!(a, 3);
        assert_eq!(b, 4);
    }

    #[test]
    fn test_only_one_placeholder_at_a_time() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi".into());
        assert!(transcript.push_placeholder().is_some());
        assert!(transcript.push_placeholder().is_none());
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_success_replaces_placeholder_in_place() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi".into());
        let id = transcript.push_placeholder().unwrap();

        assert!(transcript.apply(id, Outcome::Success("hello".into())));

        assert_eq!(transcript.len(), 2);
        let last = transcript.last().unwrap();
        assert_eq!(last.id, id);
        assert_eq!(last.text, "hello");
        assert!(!last.pending);
    }

    #[test]
    fn test_failure_uses_connection_error_text() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi".into());
        let id = transcript.push_placeholder().unwrap();

        transcript.apply(id, Outcome::Failure("connection refused".into()));

        assert_eq!(transcript.last().unwrap().text, CONNECTION_ERROR_REPLY);
    }

    #[test]
    fn test_pending_outcome_keeps_placeholder() {
        let mut transcript = Transcript::new();
        let id = transcript.push_placeholder().unwrap();
        transcript.apply(id, Outcome::Pending);
        assert_eq!(transcript.placeholder().map(|m| m.id), Some(id));
    }

    #[test]
    fn test_resolved_message_cannot_be_rewritten() {
        let mut transcript = Transcript::new();
        let id = transcript.push_placeholder().unwrap();
        transcript.apply(id, Outcome::Success("first".into()));
        assert!(!transcript.apply(id, Outcome::Success("second".into())));
        assert_eq!(transcript.last().unwrap().text, "first");
    }
}
