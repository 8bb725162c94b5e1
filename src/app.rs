use std::time::Instant;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::{AskClient, AskError, AskReply, Backend};
use crate::chat::{Outcome, QUICK_QUESTIONS};
use crate::config::Config;
use crate::exchange::{ChatExchange, PendingRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    QuickQuestions,
    Transcript,
    Input,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Chat state
    pub exchange: ChatExchange,
    pub input_cursor: usize, // cursor position in the draft, in chars
    pub query_task: Option<JoinHandle<Result<AskReply, AskError>>>,

    // Transcript viewport
    pub transcript_scroll: u16,
    pub transcript_height: u16, // inner height, for scroll calculations
    pub transcript_width: u16,  // inner width, for wrap calculations

    // Quick question sidebar
    pub quick_state: ListState,
    pub show_hindi: bool,

    // Attachment path prompt
    pub show_attach_prompt: bool,
    pub attach_input: String,
    pub attach_cursor: usize,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub transcript_area: Option<Rect>,
    pub sidebar_area: Option<Rect>,

    pub client: AskClient,
}

impl App {
    pub fn new(config: &Config, backend_url: &str) -> Self {
        let mut quick_state = ListState::default();
        quick_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            exchange: ChatExchange::new(),
            input_cursor: 0,
            query_task: None,

            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,

            quick_state,
            show_hindi: config.show_hindi,

            show_attach_prompt: false,
            attach_input: String::new(),
            attach_cursor: 0,

            animation_frame: 0,

            transcript_area: None,
            sidebar_area: None,

            client: AskClient::new(backend_url),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.exchange.is_busy()
    }

    /// Submit the draft and any attachment.
    pub fn submit_draft(&mut self) {
        if let Ok(request) = self.exchange.begin_draft() {
            self.dispatch(request);
        }
    }

    /// Submit the quick question at `index` in the sidebar.
    pub fn submit_quick(&mut self, index: usize) {
        let Some(preset) = QUICK_QUESTIONS.get(index) else {
            return;
        };
        if let Ok(request) = self.exchange.begin_quick(preset) {
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: PendingRequest) {
        debug!(placeholder = request.placeholder, "dispatching ask request");
        self.input_mode = InputMode::Normal;
        self.scroll_transcript_to_bottom();

        let client = self.client.clone();
        self.query_task = Some(tokio::spawn(async move { client.ask(&request).await }));
    }

    /// Resolve the transcript if the background request has finished.
    pub async fn poll_query_task(&mut self) {
        let finished = self.query_task.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.query_task.take() {
            let outcome = match task.await {
                Ok(result) => Outcome::from(result),
                Err(err) => {
                    warn!(error = %err, "ask task did not complete");
                    Outcome::Failure(err.to_string())
                }
            };
            self.exchange.resolve(outcome);
            self.input_cursor = 0;
            self.input_mode = InputMode::Editing;
            self.focus = FocusPane::Input;
            self.scroll_transcript_to_bottom();
        }
    }

    /// Abandon an outstanding request. The server is not told.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.query_task.take() {
            debug!("abandoning in-flight ask request");
            task.abort();
        }
    }

    /// Tick animation frame and expire old notices (called by Tick event)
    pub fn tick(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.exchange.notices_mut().expire(Instant::now());
    }

    /// Accept the path typed into the attachment prompt.
    pub fn confirm_attach_prompt(&mut self) {
        let path = self.attach_input.trim().trim_matches(|c| c == '\'' || c == '"').to_string();
        if !path.is_empty() {
            if let Err(err) = self.exchange.attach_path(&path) {
                // Already reported to the user as a notice
                debug!(error = %err, "attachment not added");
            }
        }
        self.close_attach_prompt();
    }

    pub fn open_attach_prompt(&mut self) {
        self.show_attach_prompt = true;
        self.attach_input.clear();
        self.attach_cursor = 0;
    }

    pub fn close_attach_prompt(&mut self) {
        self.show_attach_prompt = false;
        self.attach_input.clear();
        self.attach_cursor = 0;
    }

    // Quick question navigation
    pub fn quick_nav_down(&mut self) {
        let i = self.quick_state.selected().unwrap_or(0);
        self.quick_state.select(Some((i + 1).min(QUICK_QUESTIONS.len() - 1)));
    }

    pub fn quick_nav_up(&mut self) {
        let i = self.quick_state.selected().unwrap_or(0);
        self.quick_state.select(Some(i.saturating_sub(1)));
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.transcript_lines().saturating_sub(self.visible_height());
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    /// Scroll so the newest message (or the placeholder) is visible
    pub fn scroll_transcript_to_bottom(&mut self) {
        let total_lines = self.transcript_lines();
        let visible_height = self.visible_height();
        self.transcript_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_height(&self) -> u16 {
        if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        }
    }

    /// Rendered line count of the transcript, matching the layout in `ui`
    fn transcript_lines(&self) -> u16 {
        // Use actual width for wrap calculation, default to 60 if not set
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            60
        };

        let mut total_lines: u16 = 0;
        for msg in self.exchange.transcript().messages() {
            total_lines = total_lines.saturating_add(1); // Sender line
            for line in msg.text.lines() {
                let rows = wrapped_rows(line, wrap_width);
                total_lines = total_lines.saturating_add(rows.try_into().unwrap_or(u16::MAX));
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }
        total_lines
    }
}

/// Rows a line takes once word-wrapped to `width` columns, the way the
/// transcript paragraph wraps it: words move whole to the next row, and a
/// word wider than the row is broken across rows. Counts chars as columns,
/// which never undercounts Devanagari combining marks.
fn wrapped_rows(line: &str, width: usize) -> usize {
    let width = width.max(1);
    let mut rows = 1;
    let mut used = 0;
    let mut gap = 0;

    for (i, word) in line.split(char::is_whitespace).enumerate() {
        if i > 0 {
            gap += 1;
        }
        let len = word.chars().count();
        if len == 0 {
            continue;
        }

        if used + gap + len <= width {
            used += gap + len;
        } else {
            if used > 0 {
                rows += 1;
            }
            rows += (len - 1) / width;
            used = (len - 1) % width + 1;
        }
        gap = 0;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::chat::CONNECTION_ERROR_REPLY;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> App {
        App::new(&Config::new(), "http://127.0.0.1:1")
    }

    async fn wait_for_query_task(app: &App) {
        for _ in 0..500 {
            if app.query_task.as_ref().is_some_and(|task| task.is_finished()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("ask task did not finish");
    }

    #[test]
    fn test_wrapped_rows_moves_words_whole() {
        assert_eq!(wrapped_rows("", 10), 1);
        assert_eq!(wrapped_rows("short", 10), 1);
        // Split at char boundaries this is 2 rows; moving words whole needs 3
        assert_eq!(wrapped_rows("aaaa bbbb cc", 6), 3);
        assert_eq!(wrapped_rows("aaaaaaaaaaaaa", 5), 3);
        assert_eq!(wrapped_rows("ab aaaaaaaaaaaaa", 5), 4);
    }

    #[test]
    fn test_quick_nav_is_clamped() {
        let mut app = app();
        app.quick_nav_up();
        assert_eq!(app.quick_state.selected(), Some(0));
        for _ in 0..10 {
            app.quick_nav_down();
        }
        assert_eq!(app.quick_state.selected(), Some(QUICK_QUESTIONS.len() - 1));
    }

    #[test]
    fn test_scroll_to_bottom_on_long_transcript() {
        let mut app = app();
        app.transcript_height = 3;
        app.transcript_width = 20;
        app.scroll_transcript_to_bottom();
        assert!(app.transcript_scroll > 0);

        app.scroll_up(u16::MAX);
        assert_eq!(app.transcript_scroll, 0);
    }

    #[test]
    fn test_attach_prompt_rejects_non_pdf() {
        let mut app = app();
        app.open_attach_prompt();
        app.attach_input = "/tmp/notes.txt".into();
        app.confirm_attach_prompt();

        assert!(!app.show_attach_prompt);
        assert!(app.exchange.attachment().is_none());
        assert_eq!(app.exchange.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_quick_dispatches_once() {
        let mut app = app();
        let before = app.exchange.transcript().len();

        app.submit_quick(1);
        app.submit_quick(2);

        assert!(app.is_busy());
        assert!(app.query_task.is_some());
        assert_eq!(app.exchange.transcript().len(), before + 2);
        app.shutdown();
    }

    #[tokio::test]
    async fn test_poll_resolves_finished_task() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "Stay hydrated and monitor temperature."})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut app = App::new(&Config::new(), &mock_server.uri());
        app.submit_quick(1);
        assert_eq!(app.input_mode, InputMode::Normal);

        wait_for_query_task(&app).await;
        app.poll_query_task().await;

        assert!(app.query_task.is_none());
        assert!(!app.is_busy());
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.focus, FocusPane::Input);
        let last = app.exchange.transcript().last().unwrap();
        assert_eq!(last.text, "Stay hydrated and monitor temperature.");
        assert!(!last.pending);
    }

    #[tokio::test]
    async fn test_poll_leaves_running_task_alone() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&mock_server)
            .await;

        let mut app = App::new(&Config::new(), &mock_server.uri());
        app.submit_quick(0);
        app.poll_query_task().await;

        assert!(app.is_busy());
        assert!(app.query_task.is_some());
        assert!(app.exchange.transcript().placeholder().is_some());
        app.shutdown();
    }

    #[tokio::test]
    async fn test_aborted_task_replaces_placeholder() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&mock_server)
            .await;

        let mut app = App::new(&Config::new(), &mock_server.uri());
        app.submit_quick(0);
        if let Some(task) = app.query_task.as_ref() {
            task.abort();
        }

        wait_for_query_task(&app).await;
        app.poll_query_task().await;

        assert!(!app.is_busy());
        assert!(app.exchange.transcript().placeholder().is_none());
        assert_eq!(app.exchange.transcript().last().unwrap().text, CONNECTION_ERROR_REPLY);
        assert!(app
            .exchange
            .notices()
            .latest()
            .unwrap()
            .text
            .starts_with("Connection failed"));
    }
}
