use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::info;

use crate::chat::Conversation;
use crate::error::ChatError;
use crate::export::write_transcript;
use crate::llm::{LlmClient, Role};
use crate::markdown::MarkdownFormatter;
use crate::notify::{Notification, Notifications};
use crate::speech::{ListeningState, PlaybackState, VoiceInput, VoicePlayback, VoiceUpdate};
use crate::tui::ui::render_ui;

const SCROLL_STEP: usize = 5;

/// Input mode for the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Editing,
}

/// TUI Application state
pub struct ChatApp {
    client: Arc<dyn LlmClient>,
    formatter: MarkdownFormatter,
    conversation: Conversation,

    // Voice I/O
    voice_input: VoiceInput,
    playback: VoicePlayback,
    speaking: bool,
    // Model reply chosen for reading aloud; `None` follows the newest one.
    picked_reply: Option<usize>,

    notifications: Notifications,
    export_path: PathBuf,

    // Replies from the background request task
    response_tx: UnboundedSender<Result<String, ChatError>>,
    response_rx: UnboundedReceiver<Result<String, ChatError>>,
}

impl ChatApp {
    pub fn new(
        client: Arc<dyn LlmClient>,
        voice_input: VoiceInput,
        playback: VoicePlayback,
        export_path: PathBuf,
    ) -> Self {
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        Self {
            client,
            formatter: MarkdownFormatter::default(),
            conversation: Conversation::new(),
            voice_input,
            playback,
            speaking: false,
            picked_reply: None,
            notifications: Notifications::default(),
            export_path,
            response_tx,
            response_rx,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub fn is_listening(&self) -> bool {
        self.voice_input.is_listening()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Index of the reply Ctrl+S reads: the picked one, else the newest.
    pub fn reply_to_read(&self) -> Option<usize> {
        self.picked_reply.or_else(|| self.reply_indices().last().copied())
    }

    fn reply_indices(&self) -> Vec<usize> {
        self.conversation
            .messages()
            .iter()
            .enumerate()
            .filter(|(_, msg)| msg.role == Role::Model)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Moves the read-aloud pick to an older or newer reply.
    fn pick_reply(&mut self, older: bool) {
        let replies = self.reply_indices();
        let Some(current) = self.reply_to_read() else {
            return;
        };
        let pos = replies.iter().position(|&idx| idx == current).unwrap_or(0);
        let next = if older {
            pos.saturating_sub(1)
        } else {
            (pos + 1).min(replies.len() - 1)
        };
        self.picked_reply = Some(replies[next]);
    }

    /// Sends the current input. The request runs on its own task so the
    /// input stays editable while the reply is pending.
    fn send(&mut self) {
        let Some(history) = self.conversation.begin_submit() else {
            return;
        };
        self.voice_input.stop();
        self.picked_reply = None;

        let client = Arc::clone(&self.client);
        let tx = self.response_tx.clone();
        tokio::spawn(async move {
            let result = client.generate_response(&history).await;
            // The receiver only goes away when the app is shutting down.
            let _ = tx.send(result);
        });
    }

    /// Picks up finished requests, live transcripts and expired notifications.
    fn poll_background(&mut self) {
        while let Ok(result) = self.response_rx.try_recv() {
            if let Err(err) = self.conversation.finish_submit(result) {
                self.notifications.push(Notification::from_error(&err));
            }
        }

        match self.voice_input.poll() {
            Some(VoiceUpdate::Transcript(text)) => self.conversation.set_input(text),
            Some(VoiceUpdate::Failed(error)) => self.notifications.push(Notification::error(
                "Speech Recognition Error",
                &format!("Error: {error}"),
            )),
            None => {}
        }

        self.speaking = self.playback.is_speaking();
        self.notifications.expire(Instant::now());
    }

    fn toggle_listening(&mut self) {
        match self.voice_input.toggle() {
            Ok(ListeningState::Listening) => self
                .notifications
                .push(Notification::info("Listening", "Speak now...")),
            Ok(ListeningState::Stopped) => {}
            Err(err) => self.notifications.push(Notification::from_error(&err)),
        }
    }

    /// Reads the picked reply aloud, or stops the current reading.
    fn toggle_speaking(&mut self) {
        let Some(content) = self
            .reply_to_read()
            .and_then(|idx| self.conversation.messages().get(idx))
            .map(|msg| msg.content.clone())
        else {
            return;
        };

        match self.playback.toggle(&content) {
            Ok(state) => self.speaking = state == PlaybackState::Speaking,
            Err(err) => self.notifications.push(Notification::from_error(&err)),
        }
    }

    fn export(&mut self) {
        match write_transcript(&self.export_path, &self.formatter, self.conversation.messages()) {
            Ok(()) => self.notifications.push(Notification::info(
                "Transcript saved",
                &self.export_path.display().to_string(),
            )),
            Err(err) => self
                .notifications
                .push(Notification::error("Export failed", &format!("{err:#}"))),
        }
    }

    /// Stops every speech resource the app owns.
    fn shutdown(&mut self) {
        self.voice_input.stop();
        self.playback.cancel();
        self.speaking = false;
    }

    /// Handles a key press. Returns `true` when the app should quit.
    fn handle_key(&mut self, state: &mut TuiState, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return true,
                KeyCode::Char('r') => self.toggle_listening(),
                KeyCode::Char('s') => self.toggle_speaking(),
                KeyCode::Char('e') => self.export(),
                _ => {}
            }
            return false;
        }

        match state.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('e') | KeyCode::Char('i') => {
                    state.input_mode = InputMode::Editing;
                }
                KeyCode::Char('q') => {
                    return true;
                }
                KeyCode::Char('k') | KeyCode::Up => self.conversation.scroll_up(1),
                KeyCode::Char('j') | KeyCode::Down => self.conversation.scroll_down(1),
                KeyCode::Char('G') | KeyCode::End => self.conversation.scroll_to_latest(),
                KeyCode::PageUp => self.conversation.scroll_up(SCROLL_STEP),
                KeyCode::PageDown => self.conversation.scroll_down(SCROLL_STEP),
                KeyCode::Char('[') => self.pick_reply(true),
                KeyCode::Char(']') => self.pick_reply(false),
                _ => {}
            },
            InputMode::Editing => match key.code {
                KeyCode::Enter => self.send(),
                KeyCode::Esc => {
                    state.input_mode = InputMode::Normal;
                }
                KeyCode::Char(c) => self.conversation.handle_input(c),
                KeyCode::Backspace => self.conversation.backspace(),
                KeyCode::Up => self.conversation.previous_input(),
                KeyCode::Down => self.conversation.next_input(),
                KeyCode::PageUp => self.conversation.scroll_up(SCROLL_STEP),
                KeyCode::PageDown => self.conversation.scroll_down(SCROLL_STEP),
                _ => {}
            },
        }
        false
    }
}

/// TUI-specific state
struct TuiState {
    input_mode: InputMode,
    last_tick: Instant,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            input_mode: InputMode::Editing, // Start in editing mode
            last_tick: Instant::now(),
        }
    }
}

/// Run the TUI application
pub async fn run(client: Arc<dyn LlmClient>, playback: VoicePlayback, export_path: PathBuf) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // No speech recognition is available in a terminal.
    let mut app = ChatApp::new(client, VoiceInput::unsupported(), playback, export_path);
    let mut state = TuiState::default();
    info!(model = %app.model_name(), "chat session started");

    let tick_rate = Duration::from_millis(100);
    let result = run_app(&mut terminal, &mut app, &mut state, tick_rate).await;

    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut ChatApp,
    state: &mut TuiState,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(state.last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(state, key) {
                    return Ok(());
                }
            }
        }

        app.poll_background();

        if state.last_tick.elapsed() >= tick_rate {
            state.last_tick = Instant::now();
        }

        // Lets the request task make progress between polls.
        tokio::task::yield_now().await;
    }
}
