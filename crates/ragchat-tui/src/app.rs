use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ragchat_core::{
    ConversationStore, HealthStatus, HttpAnswerClient, InFlight, Orchestrator, Transcript,
    EMPTY_EXPORT_NOTICE,
};
use tokio::task::JoinHandle;

/// How many ticks a notice stays on screen
const NOTICE_TICKS: u8 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Online { version: Option<String> },
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Transient one-line message in the footer
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    pub ticks_left: u8,
}

pub struct App {
    pub should_quit: bool,

    // Conversation
    pub store: ConversationStore,
    pub orchestrator: Orchestrator,
    pub in_flight: Option<InFlight>,

    // Input buffer; cursor is a char index, not a byte index
    pub input: String,
    pub cursor: usize,

    // Chat pane
    pub scroll: u16,
    pub chat_height: u16, // Inner height, updated during render
    pub chat_width: u16,  // Inner width, updated during render
    log_changed: Arc<AtomicBool>,

    // Popups and status
    pub show_clear_confirm: bool,
    pub notice: Option<Notice>,
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub backend: BackendStatus,
    health_task: Option<JoinHandle<anyhow::Result<HealthStatus>>>,

    pub api_url: String,
    pub export_dir: PathBuf,
}

impl App {
    pub fn new(
        orchestrator: Orchestrator,
        api_url: impl Into<String>,
        export_dir: PathBuf,
    ) -> Self {
        let log_changed = Arc::new(AtomicBool::new(false));
        let mut store = ConversationStore::new();
        let flag = Arc::clone(&log_changed);
        store.subscribe(move |_| flag.store(true, Ordering::Relaxed));

        Self {
            should_quit: false,
            store,
            orchestrator,
            in_flight: None,
            input: String::new(),
            cursor: 0,
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            log_changed,
            show_clear_confirm: false,
            notice: None,
            animation_frame: 0,
            backend: BackendStatus::Checking,
            health_task: None,
            api_url: api_url.into(),
            export_dir,
        }
    }

    /// Probe `/health` in the background; the result lands in `backend`
    pub fn start_health_check(&mut self, client: HttpAnswerClient) {
        self.backend = BackendStatus::Checking;
        self.health_task = Some(tokio::spawn(async move { client.health().await }));
    }

    pub fn is_awaiting(&self) -> bool {
        self.store.is_awaiting()
    }

    /// Submit the input buffer. Blank input or an outstanding request leaves everything as is.
    pub fn submit(&mut self) {
        if let Some(in_flight) = self.orchestrator.submit(&mut self.store, &mut self.input) {
            self.in_flight = Some(in_flight);
            self.cursor = 0;
            self.animation_frame = 0;
        }
    }

    /// Settle finished background work. Called once per loop iteration.
    pub async fn poll_tasks(&mut self) {
        if self.in_flight.as_ref().is_some_and(InFlight::is_finished) {
            if let Some(in_flight) = self.in_flight.take() {
                let outcome = in_flight.outcome().await;
                self.orchestrator.settle(&mut self.store, outcome);
            }
        }

        if self.health_task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = self.health_task.take() {
                self.backend = match task.await {
                    Ok(Ok(health)) if health.is_healthy() => BackendStatus::Online {
                        version: health.version,
                    },
                    Ok(Ok(health)) => {
                        tracing::warn!("Backend reported status {}", health.status);
                        BackendStatus::Offline
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("Health check failed: {}", e);
                        BackendStatus::Offline
                    }
                    Err(e) => {
                        tracing::error!("Health check task failed: {}", e);
                        BackendStatus::Offline
                    }
                };
            }
        }
    }

    // Clear with confirmation
    pub fn request_clear(&mut self) {
        if self.store.can_clear() {
            self.show_clear_confirm = true;
        }
    }

    pub fn confirm_clear(&mut self) {
        self.show_clear_confirm = false;
        if self.store.clear() {
            self.scroll = 0;
            tracing::info!("Conversation cleared");
        }
    }

    pub fn cancel_clear(&mut self) {
        self.show_clear_confirm = false;
    }

    pub fn export(&mut self) {
        let Some(transcript) = Transcript::from_store(&self.store) else {
            self.set_notice(EMPTY_EXPORT_NOTICE, NoticeKind::Info);
            return;
        };

        match transcript.write_to(&self.export_dir) {
            Ok(path) => {
                self.set_notice(format!("Exported to {}", path.display()), NoticeKind::Info)
            }
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                self.set_notice(format!("Export failed: {}", e), NoticeKind::Error);
            }
        }
    }

    pub fn set_notice(&mut self, text: impl Into<String>, kind: NoticeKind) {
        self.notice = Some(Notice {
            text: text.into(),
            kind,
            ticks_left: NOTICE_TICKS,
        });
    }

    /// Tick animation frame and expire notices (called by Tick event)
    pub fn tick(&mut self) {
        if self.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        if let Some(notice) = &mut self.notice {
            notice.ticks_left = notice.ticks_left.saturating_sub(1);
            if notice.ticks_left == 0 {
                self.notice = None;
            }
        }
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        // Terminals send pasted line breaks as \r
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert_str(byte_pos, &normalized);
        self.cursor += normalized.chars().count();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Chat scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
    }

    /// Jump to the tail if the log changed since the last call
    pub fn follow_tail(&mut self) {
        if self.log_changed.swap(false, Ordering::Relaxed) {
            self.scroll = self.max_scroll();
        }
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_line_count().saturating_sub(visible_height)
    }

    /// Rendered height of the chat pane content at the current width
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        let mut total_lines: usize = 0;
        for msg in self.store.messages() {
            total_lines += 1; // Role and time line
            for line in msg.content().lines() {
                let char_count = line.chars().count();
                total_lines += if char_count == 0 { 1 } else { char_count.div_ceil(wrap_width) };
            }
            // An empty message still renders one blank content row
            if msg.content().is_empty() {
                total_lines += 1;
            }
            total_lines += 1; // Blank line after message
        }

        if self.is_awaiting() {
            total_lines += 1;
        }

        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragchat_core::{AnswerService, AskError, AskRequest, Role};

    pub(crate) struct EchoService;

    #[async_trait]
    impl AnswerService for EchoService {
        async fn ask(&self, request: AskRequest) -> Result<String, AskError> {
            if request.question == "fail" {
                return Err(AskError::server(500, Some("overloaded".to_string())));
            }
            Ok(format!("echo: {}", request.question))
        }
    }

    pub(crate) fn test_app(export_dir: PathBuf) -> App {
        App::new(Orchestrator::new(Arc::new(EchoService)), "http://127.0.0.1:8000", export_dir)
    }

    async fn settle(app: &mut App) {
        while app.in_flight.as_ref().is_some_and(|f| !f.is_finished()) {
            tokio::task::yield_now().await;
        }
        app.poll_tasks().await;
    }

    #[tokio::test]
    async fn test_editing_is_utf8_safe() {
        let mut app = test_app(PathBuf::from("."));
        for c in "héllo".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input, "hélo");
        assert_eq!(app.cursor, 2);

        app.cursor_home();
        app.delete();
        assert_eq!(app.input, "élo");

        app.cursor_end();
        app.insert_str("\r\nnext");
        assert_eq!(app.input, "élo\nnext");
        assert_eq!(app.cursor, 8);
    }

    #[tokio::test]
    async fn test_submit_then_poll_settles() {
        let mut app = test_app(PathBuf::from("."));
        app.insert_str("hi");

        app.submit();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.is_awaiting());
        assert_eq!(app.store.len(), 1);

        // A second submit while waiting is ignored
        app.insert_str("again");
        app.submit();
        assert_eq!(app.input, "again");
        assert_eq!(app.store.len(), 1);

        settle(&mut app).await;
        assert!(!app.is_awaiting());
        assert!(app.in_flight.is_none());
        let last = app.store.last().unwrap();
        assert_eq!(last.role(), Role::Assistant);
        assert_eq!(last.content(), "echo: hi");
    }

    #[tokio::test]
    async fn test_server_error_shown_in_log() {
        let mut app = test_app(PathBuf::from("."));
        app.insert_str("fail");
        app.submit();
        settle(&mut app).await;

        let last = app.store.last().unwrap();
        assert_eq!(last.role(), Role::Error);
        assert_eq!(last.content(), "overloaded");
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let mut app = test_app(PathBuf::from("."));
        app.request_clear();
        assert!(!app.show_clear_confirm, "nothing to clear");

        app.insert_str("hi");
        app.submit();
        settle(&mut app).await;

        app.request_clear();
        assert!(app.show_clear_confirm);
        app.cancel_clear();
        assert_eq!(app.store.len(), 2);

        app.request_clear();
        app.confirm_clear();
        assert!(!app.show_clear_confirm);
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn test_export_empty_shows_notice() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path().to_path_buf());

        app.export();

        assert_eq!(app.notice.as_ref().map(|n| n.text.as_str()), Some(EMPTY_EXPORT_NOTICE));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_export_writes_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path().to_path_buf());
        app.insert_str("hi");
        app.submit();
        settle(&mut app).await;

        app.export();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let body = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert!(body.contains("] You: hi"));
        assert!(body.contains("] Bot: echo: hi"));
        assert_eq!(app.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Info));
    }

    #[tokio::test]
    async fn test_notice_expires() {
        let mut app = test_app(PathBuf::from("."));
        app.set_notice("hello", NoticeKind::Info);
        for _ in 0..NOTICE_TICKS {
            assert!(app.notice.is_some());
            app.tick();
        }
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn test_follow_tail_after_new_messages() {
        let mut app = test_app(PathBuf::from("."));
        app.chat_height = 3;
        app.chat_width = 40;

        for question in ["one", "two", "three"] {
            app.insert_str(question);
            app.submit();
            settle(&mut app).await;
        }
        app.follow_tail();

        // 6 messages, 3 lines each, 3 visible
        assert_eq!(app.chat_line_count(), 18);
        assert_eq!(app.scroll, 15);

        app.scroll_up(5);
        app.follow_tail();
        assert_eq!(app.scroll, 10, "no new messages, no jump");
    }

    #[tokio::test]
    async fn test_empty_answer_counts_one_content_row() {
        let mut app = test_app(PathBuf::from("."));
        app.chat_height = 2;
        app.chat_width = 40;

        app.store.append_message(Role::Assistant, "");
        assert_eq!(app.chat_line_count(), 3);

        // Typing indicator stays reachable below the empty answer
        app.store.set_awaiting(true);
        app.follow_tail();
        assert_eq!(app.chat_line_count(), 4);
        assert_eq!(app.scroll, 2);
    }
}
