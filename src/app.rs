use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::DefaultTerminal;

use crate::api::types::{CompletionRequest, CompletionResponse, ModelsResponse};
use crate::api::{AskClient, ClassifiedError};
use crate::clipboard;
use crate::command::{self, Command};
use crate::config::AppConfig;
use crate::event::{ApiResult, AppEvent, Event, EventHandler};
use crate::ui;

// ---------------------------------------------------------------------------
// App mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Editing,
    Command,
}

/// Panels drawn on top of the main layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Help,
    ModelPicker,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    pub running: bool,
    pub events: EventHandler,
    pub config: AppConfig,

    pub mode: AppMode,
    pub overlay: Option<Overlay>,

    // Request state
    pub question: String,
    pub model: String,
    pub last_request: Option<CompletionRequest>,

    // Results
    pub response: Option<CompletionResponse>,
    pub error: Option<ClassifiedError>,
    pub answer_scroll: u16,

    // Model catalog
    pub models: ModelsResponse,
    pub models_fallback: bool,
    pub picker_index: usize,

    // Input state
    pub command_input: String,

    pub api_client: Option<AskClient>,

    // Status
    pub status_message: Option<String>,
    pub loading: bool,
    pub spinner_frame: usize,
}

impl App {
    pub fn new(config: AppConfig, api_client: Option<AskClient>) -> Self {
        let events = EventHandler::new(config.tick_rate_fps);
        Self::with_events(config, api_client, events)
    }

    fn with_events(config: AppConfig, api_client: Option<AskClient>, events: EventHandler) -> Self {
        Self {
            running: true,
            events,
            model: config.default_model.clone(),
            config,
            mode: AppMode::Editing,
            overlay: None,
            question: String::new(),
            last_request: None,
            response: None,
            error: None,
            answer_scroll: 0,
            models: ModelsResponse::default(),
            models_fallback: false,
            picker_index: 0,
            command_input: String::new(),
            api_client,
            status_message: None,
            loading: false,
            spinner_frame: 0,
        }
    }

    // -- Main event loop ----------------------------------------------------

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> color_eyre::Result<()> {
        self.events.send(AppEvent::FetchModels);

        while self.running {
            terminal.draw(|frame| self.draw(frame))?;
            match self.events.next().await? {
                Event::Tick => self.tick(),
                Event::Crossterm(event) => {
                    if let crossterm::event::Event::Key(key) = event
                        && key.kind == crossterm::event::KeyEventKind::Press
                    {
                        self.handle_key_event(key);
                    }
                }
                Event::App(app_event) => self.handle_app_event(*app_event),
            }
        }
        Ok(())
    }

    fn draw(&self, frame: &mut ratatui::Frame) {
        ui::draw(frame, self);
    }

    fn tick(&mut self) {
        if self.loading {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
    }

    /// Display name of the selected model.
    pub fn model_display_name(&self) -> &str {
        self.models.display_name(&self.model)
    }

    // -- Key event routing --------------------------------------------------

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Ctrl-C always quits.
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c' | 'C'))
        {
            self.events.send(AppEvent::Quit);
            return;
        }

        // The error popup swallows keys until dismissed.
        if self.error.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.error = None;
            }
            return;
        }

        match self.overlay {
            Some(Overlay::Help) => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('q' | '?')) {
                    self.overlay = None;
                }
                return;
            }
            Some(Overlay::ModelPicker) => {
                self.handle_picker_key(key);
                return;
            }
            None => {}
        }

        match self.mode {
            AppMode::Normal => self.handle_normal_key(key),
            AppMode::Editing => self.handle_editing_key(key),
            AppMode::Command => self.handle_command_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.events.send(AppEvent::Quit);
            }
            KeyCode::Char('i') | KeyCode::Enter => {
                self.mode = AppMode::Editing;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.answer_scroll = self.answer_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.answer_scroll = self.answer_scroll.saturating_sub(1);
            }
            KeyCode::Char('g') => {
                self.answer_scroll = 0;
            }
            KeyCode::Char('m') => {
                self.open_model_picker();
            }
            KeyCode::Char('r') => {
                self.retry_last();
            }
            KeyCode::Char('y') => {
                self.copy_answer();
            }
            KeyCode::Char(':') => {
                self.mode = AppMode::Command;
                self.command_input.clear();
            }
            KeyCode::Char('?') => {
                self.overlay = Some(Overlay::Help);
            }
            _ => {}
        }
    }

    fn handle_editing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = AppMode::Normal;
            }
            KeyCode::Enter => {
                self.events.send(AppEvent::Submit);
                self.mode = AppMode::Normal;
            }
            KeyCode::Backspace => {
                self.question.pop();
            }
            KeyCode::Char(c) => {
                self.question.push(c);
            }
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = AppMode::Normal;
                self.command_input.clear();
            }
            KeyCode::Enter => {
                self.mode = AppMode::Normal;
                self.execute_command();
            }
            KeyCode::Backspace => {
                self.command_input.pop();
            }
            KeyCode::Char(c) => {
                self.command_input.push(c);
            }
            _ => {}
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let count = self.models.models.len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.overlay = None;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.picker_index + 1 < count {
                    self.picker_index += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.picker_index = self.picker_index.saturating_sub(1);
            }
            KeyCode::Enter => {
                if let Some(model) = self.models.models.get(self.picker_index) {
                    self.model = model.id.clone();
                    self.status_message = Some(format!("Model: {}", self.model_display_name()));
                }
                self.overlay = None;
            }
            _ => {}
        }
    }

    // -- Command execution --------------------------------------------------

    fn execute_command(&mut self) {
        let input = std::mem::take(&mut self.command_input);
        match command::parse_command(&input) {
            Some(Command::Model(id)) => {
                self.model = id;
                self.status_message = Some(format!("Model: {}", self.model_display_name()));
            }
            Some(Command::Models) => {
                self.open_model_picker();
            }
            Some(Command::Open(id)) => {
                self.events.send(AppEvent::FetchCompletion { id });
            }
            Some(Command::Clear) => {
                self.clear();
            }
            Some(Command::Copy) => {
                self.copy_answer();
            }
            Some(Command::Health) => {
                self.events.send(AppEvent::CheckHealth);
            }
            Some(Command::Help) => {
                self.overlay = Some(Overlay::Help);
            }
            Some(Command::Quit) => {
                self.events.send(AppEvent::Quit);
            }
            None => {
                self.status_message = Some(format!("Unknown command: {input}"));
            }
        }
    }

    // -- Actions ------------------------------------------------------------

    fn open_model_picker(&mut self) {
        if self.models.models.is_empty() {
            self.models = ModelsResponse::fallback();
            self.models_fallback = true;
        }
        self.picker_index = self
            .models
            .models
            .iter()
            .position(|m| m.id == self.model)
            .unwrap_or(0);
        self.overlay = Some(Overlay::ModelPicker);
    }

    fn retry_last(&mut self) {
        if self.refuse_if_busy() {
            return;
        }
        match self.last_request.clone() {
            Some(request) => {
                self.question = request.prompt;
                self.model = request.model;
                self.events.send(AppEvent::Submit);
            }
            None => {
                self.status_message = Some("Nothing to retry".to_string());
            }
        }
    }

    fn copy_answer(&mut self) {
        let Some(answer) = self
            .response
            .as_ref()
            .map(CompletionResponse::answer)
            .filter(|a| !a.is_empty())
        else {
            self.status_message = Some("No answer to copy".to_string());
            return;
        };

        self.status_message = Some(match clipboard::copy_to_clipboard(answer) {
            Ok(()) => "Answer copied to clipboard".to_string(),
            Err(e) => format!("Copy failed: {e}"),
        });
    }

    fn clear(&mut self) {
        self.question.clear();
        self.response = None;
        self.error = None;
        self.answer_scroll = 0;
        self.status_message = None;
    }

    // -- App event handling -------------------------------------------------

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => {
                self.running = false;
            }

            AppEvent::Submit => {
                if self.refuse_if_busy() {
                    return;
                }
                let request = CompletionRequest::new(self.question.trim(), self.model.clone());
                self.last_request = Some(request.clone());
                self.response = None;
                self.error = None;
                self.answer_scroll = 0;
                self.status_message = None;
                self.dispatch(AppEvent::Submit, Some(request));
            }
            AppEvent::FetchCompletion { id } => {
                if self.refuse_if_busy() {
                    return;
                }
                self.response = None;
                self.error = None;
                self.answer_scroll = 0;
                self.dispatch(AppEvent::FetchCompletion { id }, None);
            }
            ref evt @ (AppEvent::FetchModels | AppEvent::CheckHealth) => {
                self.dispatch(evt.clone(), None);
            }

            AppEvent::CompletionLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(resp) => {
                        self.response = Some(resp);
                    }
                    Err(e) => {
                        self.error = Some(e);
                    }
                }
            }
            AppEvent::ModelsLoaded(result) => self.apply_models(result),
            AppEvent::HealthChecked(result) => {
                self.status_message = Some(match result {
                    Ok(payload) => format!("Backend healthy: {payload}"),
                    Err(e) => format!("Health check failed: {e}"),
                });
            }
        }
    }

    /// Only one completion request may be in flight at a time.
    fn refuse_if_busy(&mut self) -> bool {
        if self.loading {
            self.status_message = Some("A request is already in progress".to_string());
        }
        self.loading
    }

    fn apply_models(&mut self, result: ApiResult<ModelsResponse>) {
        match result {
            Ok(resp) if !resp.models.is_empty() => {
                self.models = resp;
                self.models_fallback = false;
            }
            Ok(_) => {
                self.models = ModelsResponse::fallback();
                self.models_fallback = true;
            }
            Err(e) => {
                tracing::warn!("using built-in model catalog: {e}");
                self.models = ModelsResponse::fallback();
                self.models_fallback = true;
                self.status_message = Some("Model catalog unavailable; using built-in list".into());
            }
        }
    }

    // -- API dispatch -------------------------------------------------------

    fn dispatch(&mut self, event: AppEvent, request: Option<CompletionRequest>) {
        let Some(client) = self.api_client.clone() else {
            match event {
                // Without a backend the picker still needs something to show.
                AppEvent::FetchModels => self.apply_models(Ok(ModelsResponse::default())),
                _ => {
                    self.status_message = Some("No API client configured".to_string());
                }
            }
            return;
        };
        let sender = self.events.sender();

        let completes_request = matches!(
            event,
            AppEvent::Submit | AppEvent::FetchCompletion { .. }
        );
        if completes_request {
            self.loading = true;
        }

        tokio::spawn(async move {
            let reply = match event {
                AppEvent::Submit => {
                    let Some(request) = request else { return };
                    AppEvent::CompletionLoaded(client.submit(&request).await)
                }
                AppEvent::FetchCompletion { id } => {
                    AppEvent::CompletionLoaded(client.get_completion(id).await)
                }
                AppEvent::FetchModels => AppEvent::ModelsLoaded(client.list_models().await),
                AppEvent::CheckHealth => AppEvent::HealthChecked(client.health_check().await),
                _ => return,
            };
            let _ = sender.send(Event::App(Box::new(reply)));
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;
    use crate::api::types::{ChatMessage, Choice, ModelInfo, UsageStats};

    fn app() -> App {
        App::with_events(AppConfig::default(), None, EventHandler::detached())
    }

    fn response(content: &str) -> CompletionResponse {
        CompletionResponse {
            id: "r1".into(),
            object: "chat.completion".into(),
            created: 1_700_000_000,
            model: "gpt2".into(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage {
                    role: "assistant".into(),
                    content: content.into(),
                },
                finish_reason: "stop".into(),
                logprobs: None,
            }],
            usage: UsageStats::default(),
            system_fingerprint: String::new(),
            service_tier: String::new(),
        }
    }

    fn server_error() -> ClassifiedError {
        ClassifiedError {
            kind: ErrorKind::ServerError,
            message: "Internal server error. Please try again later.".into(),
            status_code: 500,
            raw_cause: None,
        }
    }

    #[test]
    fn completion_clears_loading_and_stores_response() {
        let mut app = app();
        app.loading = true;
        app.handle_app_event(AppEvent::CompletionLoaded(Ok(response("hello"))));
        assert!(!app.loading);
        assert_eq!(app.response.as_ref().unwrap().answer(), "hello");
        assert!(app.error.is_none());
    }

    #[test]
    fn failed_completion_shows_error() {
        let mut app = app();
        app.loading = true;
        app.handle_app_event(AppEvent::CompletionLoaded(Err(server_error())));
        assert!(!app.loading);
        assert_eq!(app.error.as_ref().unwrap().status_code, 500);
    }

    #[test]
    fn submit_is_refused_while_loading() {
        let mut app = app();
        app.loading = true;
        app.question = "second question".into();
        app.handle_app_event(AppEvent::Submit);
        assert!(app.last_request.is_none());
        assert_eq!(
            app.status_message.as_deref(),
            Some("A request is already in progress")
        );
    }

    #[test]
    fn submit_records_trimmed_request() {
        let mut app = app();
        app.question = "  what is rust?  ".into();
        app.handle_app_event(AppEvent::Submit);
        let request = app.last_request.as_ref().unwrap();
        assert_eq!(request.prompt, "what is rust?");
        assert_eq!(request.model, "google/gemma-2-9b-it");
    }

    #[test]
    fn models_failure_uses_fallback_catalog() {
        let mut app = app();
        let err = ClassifiedError {
            kind: ErrorKind::NetworkError,
            message: "offline".into(),
            status_code: 0,
            raw_cause: None,
        };
        app.handle_app_event(AppEvent::ModelsLoaded(Err(err)));
        assert!(app.models_fallback);
        assert_eq!(app.models, ModelsResponse::fallback());
        assert_eq!(app.model_display_name(), "Google Gemma 2 9B");
    }

    #[test]
    fn models_success_replaces_catalog() {
        let mut app = app();
        let catalog = ModelsResponse {
            models: vec![ModelInfo {
                id: "google/gemma-2-9b-it".into(),
                name: "Gemma".into(),
                provider: "Groq".into(),
            }],
        };
        app.handle_app_event(AppEvent::ModelsLoaded(Ok(catalog)));
        assert!(!app.models_fallback);
        assert_eq!(app.model_display_name(), "Gemma");
    }

    #[test]
    fn picker_selects_model() {
        let mut app = app();
        app.open_model_picker();
        assert_eq!(app.overlay, Some(Overlay::ModelPicker));
        app.handle_key_event(KeyEvent::from(KeyCode::Down));
        app.handle_key_event(KeyEvent::from(KeyCode::Enter));
        assert_eq!(app.model, "deepset/roberta-base-squad2");
        assert!(app.overlay.is_none());
    }

    #[test]
    fn error_popup_dismissed_with_esc() {
        let mut app = app();
        app.error = Some(server_error());
        app.mode = AppMode::Normal;
        app.handle_key_event(KeyEvent::from(KeyCode::Char('q')));
        assert!(app.error.is_some());
        assert!(app.running);
        app.handle_key_event(KeyEvent::from(KeyCode::Esc));
        assert!(app.error.is_none());
    }

    #[test]
    fn clear_command_resets_state() {
        let mut app = app();
        app.question = "q".into();
        app.response = Some(response("a"));
        app.command_input = "clear".into();
        app.execute_command();
        assert!(app.question.is_empty());
        assert!(app.response.is_none());
    }

    #[test]
    fn model_command_sets_model() {
        let mut app = app();
        app.command_input = "model gpt2".into();
        app.execute_command();
        assert_eq!(app.model, "gpt2");
    }

    #[test]
    fn editing_keys_build_question() {
        let mut app = app();
        for c in "hi!".chars() {
            app.handle_key_event(KeyEvent::from(KeyCode::Char(c)));
        }
        app.handle_key_event(KeyEvent::from(KeyCode::Backspace));
        assert_eq!(app.question, "hi");
        app.handle_key_event(KeyEvent::from(KeyCode::Esc));
        assert_eq!(app.mode, AppMode::Normal);
    }

    #[test]
    fn open_is_refused_while_loading() {
        let mut app = app();
        app.loading = true;
        app.response = Some(response("first"));
        app.handle_app_event(AppEvent::FetchCompletion { id: 5 });
        assert!(app.loading);
        assert_eq!(app.response.as_ref().unwrap().answer(), "first");
        assert_eq!(
            app.status_message.as_deref(),
            Some("A request is already in progress")
        );
    }

    #[test]
    fn retry_while_loading_keeps_typed_question() {
        let mut app = app();
        app.mode = AppMode::Normal;
        app.loading = true;
        app.last_request = Some(CompletionRequest::new("old question", "gpt2"));
        app.question = "new question".into();
        app.handle_key_event(KeyEvent::from(KeyCode::Char('r')));
        assert_eq!(app.question, "new question");
        assert_eq!(app.model, "google/gemma-2-9b-it");
        assert_eq!(
            app.status_message.as_deref(),
            Some("A request is already in progress")
        );
    }
}
