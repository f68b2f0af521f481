use crate::cli::chat::html;
use crate::qa_client::{Answer, AskResponse, SimilarQuestion, SuggestionId};

/// Fixed reply strings, kept byte-for-byte from the deployed bot.
pub const SUGGESTION_HEADER_TEXT: &str = ":هل تقصد";
pub const NO_ANSWER_TEXT: &str = "آسف، لم أتمكن من العثور على الإجابة.";
pub const REQUEST_FAILED_TEXT: &str = "حدث خطأ أثناء معالجة سؤالك. يرجى المحاولة مرة أخرى.";

/// Avatar shown on regular bot replies.
pub const ANSWER_ICON: &str = "https://i.postimg.cc/YSzf3QQx/chatbot-1.png";
/// Avatar shown on fallback replies.
pub const FALLBACK_ICON: &str = "https://i.postimg.cc/wB80F6Z9/chatbot.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// One renderable record in the log. `is_button` marks a clickable
/// suggestion (its `id` re-resolves the question text on pick); `is_html`
/// marks text that is markup rather than prose.
#[derive(Debug, Clone)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    pub is_html: bool,
    pub is_button: bool,
    pub id: Option<SuggestionId>,
    pub icon: Option<&'static str>,
}

impl Message {
    fn user(text: &str) -> Self {
        Self {
            text: text.to_string(),
            sender: Sender::User,
            is_html: false,
            is_button: false,
            id: None,
            icon: None,
        }
    }

    fn bot_html(text: String) -> Self {
        Self {
            text,
            sender: Sender::Bot,
            is_html: true,
            is_button: false,
            id: None,
            icon: Some(ANSWER_ICON),
        }
    }

    fn fallback(text: &'static str) -> Self {
        Self {
            text: text.to_string(),
            sender: Sender::Bot,
            is_html: false,
            is_button: false,
            id: None,
            icon: Some(FALLBACK_ICON),
        }
    }

    fn suggestion_header() -> Self {
        Self {
            text: SUGGESTION_HEADER_TEXT.to_string(),
            sender: Sender::Bot,
            is_html: false,
            is_button: false,
            id: None,
            icon: Some(ANSWER_ICON),
        }
    }

    fn suggestion(question: SimilarQuestion) -> Self {
        Self {
            text: question.question,
            sender: Sender::Bot,
            is_html: false,
            is_button: true,
            id: Some(question.id),
            icon: None,
        }
    }
}

/// The message log plus the suggestion bookkeeping that drives the reply
/// decision table. The log only ever grows within a session; `clear` is the
/// sole exception and models starting a fresh session.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    suggestions_open: bool,
    suppress_repeat_suggestions: bool,
}

impl Conversation {
    pub fn new(suppress_repeat_suggestions: bool) -> Self {
        Self {
            messages: Vec::new(),
            suggestions_open: false,
            suppress_repeat_suggestions,
        }
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

    pub fn clear(&mut self) {
        self.messages.clear();
        self.suggestions_open = false;
    }

    pub fn push_user(&mut self, text: &str) {
        self.messages.push(Message::user(text));
    }

    /// Map a decoded response into reply messages. First matching rule
    /// wins, and every path appends at least one bot message:
    ///
    /// 1. non-empty `similar_questions` (unless suppressed) — header plus
    ///    one button per item, in response order;
    /// 2. non-empty prose `answer` — one HTML reply with anchors rewritten
    ///    to open in a new tab;
    /// 3. non-empty news `answer` — one HTML card per item;
    /// 4. otherwise — the fixed no-answer reply.
    pub fn apply_response(&mut self, response: AskResponse) {
        let AskResponse {
            answer,
            similar_questions,
        } = response;

        if !similar_questions.is_empty() && !self.suggestions_suppressed() {
            self.messages.push(Message::suggestion_header());
            for question in similar_questions {
                self.messages.push(Message::suggestion(question));
            }
            self.suggestions_open = true;
            return;
        }

        match answer {
            Some(Answer::Text(text)) if !text.trim().is_empty() => {
                self.messages
                    .push(Message::bot_html(html::rewrite_anchor_targets(&text)));
            }
            Some(Answer::News(items)) if !items.is_empty() => {
                for item in &items {
                    self.messages.push(Message::bot_html(html::news_card(item)));
                }
            }
            _ => self.messages.push(Message::fallback(NO_ANSWER_TEXT)),
        }
    }

    /// Terminal failure of a turn's request. The user message already in
    /// the log stays; exactly one fallback reply is appended.
    pub fn apply_failure(&mut self) {
        self.messages.push(Message::fallback(REQUEST_FAILED_TEXT));
    }

    /// Original question text of a previously shown suggestion button.
    pub fn find_suggestion(&self, id: &SuggestionId) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.is_button && m.id.as_ref() == Some(id))
            .map(|m| m.text.as_str())
    }

    /// The user acted on the outstanding suggestion set; a later response
    /// may show a fresh one even under the suppression policy.
    pub fn resolve_suggestions(&mut self) {
        self.suggestions_open = false;
    }

    pub fn suggestions_open(&self) -> bool {
        self.suggestions_open
    }

    fn suggestions_suppressed(&self) -> bool {
        self.suppress_repeat_suggestions && self.suggestions_open
    }
}
