pub mod conversation;
pub mod html;
pub mod prompt;
pub mod speech;

use std::io::Write;
use std::process::ExitCode;

use crossterm::style::Stylize;
use eyre::Result;
use tracing::{debug, error};

use crate::cli::chat::conversation::{Conversation, Message, Sender};
use crate::cli::chat::html::SanitizePolicy;
use crate::cli::chat::speech::SpeechInput;
use crate::qa_client::{AnswerService, Endpoint, SuggestionId};

const WELCOME_TEXT: &str = "
UNA BOOT — مساعدك الشخصي بالذكاء الإصطناعي

Ask a question and I will answer it, or suggest close matches you can
pick with /pick <id>.

/help         Show the help dialogue
/quit         Quit the application
";

const HELP_TEXT: &str = "
UNA Chat CLI

/clear        Clear the conversation history
/news         Toggle between the answers API and the UNA news API
/pick <id>    Ask one of the suggested questions
/dictate      Capture a question by voice (set UNA_DICTATION_CMD)
/help         Show this help dialogue
/quit         Quit the application
";

pub struct ChatOptions {
    pub input: Option<String>,
    pub interactive: bool,
    pub news_mode: bool,
    pub suppress_repeat_suggestions: bool,
    pub sanitize: SanitizePolicy,
}

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    conversation: Conversation,
    service: Box<dyn AnswerService>,
    speech: Box<dyn SpeechInput>,
    endpoint: Endpoint,
    sanitize: SanitizePolicy,
    rendered: usize,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        service: Box<dyn AnswerService>,
        speech: Box<dyn SpeechInput>,
        options: ChatOptions,
    ) -> Self {
        Self {
            output,
            input: options.input,
            interactive: options.interactive,
            conversation: Conversation::new(options.suppress_repeat_suggestions),
            service,
            speech,
            endpoint: if options.news_mode {
                Endpoint::News
            } else {
                Endpoint::Questions
            },
            sanitize: options.sanitize,
            rendered: 0,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        if self.interactive {
            self.print_welcome()?;
        }

        // Non-interactive mode: a single turn, then exit.
        if let Some(input) = self.input.take() {
            self.handle_input(&input).await?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = prompt::generate_prompt(self.endpoint == Endpoint::News);
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if line.trim() == "/quit" {
                        break;
                    }

                    if let Err(e) = self.handle_input(&line).await {
                        writeln!(self.output, "Error: {}", e)?;
                    }
                }
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<()> {
        match input.trim() {
            "/help" => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            "/clear" => {
                self.conversation.clear();
                self.rendered = 0;
                writeln!(self.output, "Conversation cleared.")?;
            }
            "/news" => {
                self.toggle_mode()?;
            }
            "/dictate" => {
                self.dictate().await?;
            }
            other => {
                if let Some(rest) = other.strip_prefix("/pick") {
                    let rest = rest.trim();
                    if rest.is_empty() {
                        writeln!(self.output, "Usage: /pick <id>")?;
                    } else {
                        self.resolve_suggestion(&SuggestionId::parse(rest)).await?;
                    }
                } else {
                    self.submit(other).await?;
                }
            }
        }

        Ok(())
    }

    /// One user turn: append the user message, ask the active API, append
    /// the mapped reply. Empty input is ignored without comment.
    pub async fn submit(&mut self, raw: &str) -> Result<()> {
        let question = raw.trim();
        if question.is_empty() {
            debug!("ignoring empty input");
            return Ok(());
        }

        self.conversation.push_user(question);
        self.complete_turn(self.endpoint, question.to_string()).await
    }

    /// Ask a previously suggested question by its id. An unknown id is a
    /// no-op, same as the widget ignoring a stale button.
    pub async fn resolve_suggestion(&mut self, id: &SuggestionId) -> Result<()> {
        let Some(question) = self.conversation.find_suggestion(id) else {
            debug!("no suggestion with id {}", id);
            return Ok(());
        };
        let question = question.to_string();

        self.conversation.resolve_suggestions();
        self.conversation.push_user(&question);
        // Suggestion follow-ups always go to the questions API, whichever
        // mode is active.
        self.complete_turn(Endpoint::Questions, question).await
    }

    /// Flip between the two APIs. Local only; applies from the next turn.
    pub fn toggle_mode(&mut self) -> Result<()> {
        self.endpoint = match self.endpoint {
            Endpoint::Questions => Endpoint::News,
            Endpoint::News => Endpoint::Questions,
        };
        let label = match self.endpoint {
            Endpoint::Questions => "answers",
            Endpoint::News => "UNA news",
        };
        writeln!(self.output, "Now asking the {} API.", label)?;
        Ok(())
    }

    async fn complete_turn(&mut self, endpoint: Endpoint, question: String) -> Result<()> {
        // Show the user line before waiting on the network.
        self.render_new()?;

        match self.service.ask(endpoint, &question).await {
            Ok(response) => self.conversation.apply_response(response),
            Err(e) => {
                error!("request failed: {}", e);
                self.conversation.apply_failure();
            }
        }

        self.render_new()
    }

    async fn dictate(&mut self) -> Result<()> {
        match self.speech.transcribe().await {
            Ok(Some(transcript)) => self.submit(&transcript).await?,
            Ok(None) => {
                writeln!(
                    self.output,
                    "Dictation is not configured; set UNA_DICTATION_CMD."
                )?;
            }
            // Dictation failures are logged and otherwise ignored; the
            // conversation gets no message for them.
            Err(e) => error!("dictation failed: {}", e),
        }

        Ok(())
    }

    fn render_new(&mut self) -> Result<()> {
        while self.rendered < self.conversation.len() {
            let line = render_message(&self.conversation.messages()[self.rendered], self.sanitize);
            writeln!(self.output, "{}", line)?;
            self.rendered += 1;
        }
        self.output.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

fn render_message(message: &Message, sanitize: SanitizePolicy) -> String {
    match message.sender {
        Sender::User => format!("{} {}", "you:".dark_green().bold(), message.text),
        Sender::Bot if message.is_button => {
            let id = message
                .id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default();
            format!("  {} {}", format!("[{}]", id).dark_yellow(), message.text)
        }
        Sender::Bot => {
            let text = if message.is_html {
                sanitize.apply(&message.text)
            } else {
                message.text.clone()
            };
            format!("{} {}", "bot:".dark_cyan().bold(), text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::cli::chat::conversation::{
        NO_ANSWER_TEXT, REQUEST_FAILED_TEXT, SUGGESTION_HEADER_TEXT,
    };
    use crate::qa_client::{Answer, AskResponse, QaError, SimilarQuestion};

    struct ScriptedService {
        replies: Mutex<Vec<Result<AskResponse, QaError>>>,
    }

    impl ScriptedService {
        fn new(replies: Vec<Result<AskResponse, QaError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl AnswerService for ScriptedService {
        async fn ask(&self, _endpoint: Endpoint, _question: &str) -> Result<AskResponse, QaError> {
            let mut replies = self.replies.lock().unwrap();
            assert!(!replies.is_empty(), "unexpected request");
            replies.remove(0)
        }
    }

    struct NoDictation;

    #[async_trait]
    impl SpeechInput for NoDictation {
        async fn transcribe(&mut self) -> eyre::Result<Option<String>> {
            Ok(None)
        }
    }

    fn context(replies: Vec<Result<AskResponse, QaError>>) -> ChatContext {
        ChatContext::new(
            Box::new(io::sink()),
            Box::new(ScriptedService::new(replies)),
            Box::new(NoDictation),
            ChatOptions {
                input: None,
                interactive: false,
                news_mode: false,
                suppress_repeat_suggestions: false,
                sanitize: SanitizePolicy::Raw,
            },
        )
    }

    fn suggestions_reply() -> AskResponse {
        AskResponse {
            answer: None,
            similar_questions: vec![
                SimilarQuestion {
                    id: SuggestionId::from(1),
                    question: "A".to_string(),
                },
                SimilarQuestion {
                    id: SuggestionId::from(2),
                    question: "B".to_string(),
                },
            ],
        }
    }

    fn answer_reply(text: &str) -> AskResponse {
        AskResponse {
            answer: Some(Answer::Text(text.to_string())),
            similar_questions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn whitespace_submit_is_a_no_op() {
        let mut chat = context(Vec::new());
        chat.submit("   \t ").await.unwrap();
        assert!(chat.conversation().is_empty());
    }

    #[tokio::test]
    async fn failed_request_degrades_to_error_bubble() {
        let mut chat = context(vec![Err(QaError::Status(
            StatusCode::INTERNAL_SERVER_ERROR,
        ))]);
        chat.submit("hello").await.unwrap();

        let messages = chat.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].text, REQUEST_FAILED_TEXT);
    }

    #[tokio::test]
    async fn suggestion_turn_then_pick_runs_a_full_follow_up() {
        let mut chat = context(vec![
            Ok(suggestions_reply()),
            Ok(answer_reply("the answer")),
        ]);

        chat.submit("question").await.unwrap();
        assert_eq!(chat.conversation().len(), 4);
        assert_eq!(
            chat.conversation().messages()[1].text,
            SUGGESTION_HEADER_TEXT
        );

        chat.resolve_suggestion(&SuggestionId::from(2)).await.unwrap();
        let messages = chat.conversation().messages();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[4].text, "B");
        assert_eq!(messages[4].sender, Sender::User);
        assert_eq!(messages[5].text, "the answer");
        assert!(!chat.conversation().suggestions_open());
    }

    #[tokio::test]
    async fn unknown_suggestion_id_changes_nothing() {
        let mut chat = context(vec![Ok(suggestions_reply())]);
        chat.submit("question").await.unwrap();

        let before = chat.conversation().len();
        chat.resolve_suggestion(&SuggestionId::from(42)).await.unwrap();
        assert_eq!(chat.conversation().len(), before);
    }

    #[tokio::test]
    async fn no_answer_turn_still_gets_a_reply() {
        let mut chat = context(vec![Ok(AskResponse::default())]);
        chat.submit("question").await.unwrap();

        let messages = chat.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, NO_ANSWER_TEXT);
    }

    #[tokio::test]
    async fn mode_toggle_is_local_and_flips_endpoint() {
        let mut chat = context(Vec::new());
        assert_eq!(chat.endpoint, Endpoint::Questions);

        chat.handle_input("/news").await.unwrap();
        assert_eq!(chat.endpoint, Endpoint::News);
        assert!(chat.conversation().is_empty());

        chat.handle_input("/news").await.unwrap();
        assert_eq!(chat.endpoint, Endpoint::Questions);
    }

    #[tokio::test]
    async fn pick_command_parses_the_id() {
        let mut chat = context(vec![Ok(suggestions_reply()), Ok(answer_reply("ok"))]);
        chat.submit("question").await.unwrap();

        chat.handle_input("/pick 1").await.unwrap();
        let messages = chat.conversation().messages();
        assert_eq!(messages[4].text, "A");
        assert_eq!(messages[5].text, "ok");
    }

    #[test]
    fn button_rows_render_with_their_id() {
        let message = Message {
            text: "A".to_string(),
            sender: Sender::Bot,
            is_html: false,
            is_button: true,
            id: Some(SuggestionId::from(1)),
            icon: None,
        };
        let line = render_message(&message, SanitizePolicy::Raw);
        assert!(line.contains("[1]"));
        assert!(line.contains("A"));
    }
}
