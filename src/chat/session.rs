//! Core chat session management.
//!
//! `ChatSession` owns the current conversation, the bounded history, and the
//! pending attachments. It runs one send cycle at a time: a send issued while
//! another is in flight is ignored, and every cycle returns the session to
//! [`SessionState::Idle`], whether the reply arrived, failed, or the cycle was
//! dropped part way through.
//!
//! The session is single-threaded. Its methods take `&self` so that a UI can
//! keep issuing commands while a send is suspended; state-changing commands
//! issued during a send fail with [`Error::Busy`].

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::chat::config::ChatConfig;
use crate::chat::title::derive_title;
use crate::client::ChatEndpoint;
use crate::error::{Error, ErrorKind, Result};
use crate::observability::{
    SESSION_RESET_FAILURES, SESSION_SENDS, SESSION_SENDS_FAILED, SESSION_SENDS_IGNORED,
};
use crate::render::{Renderer, Reveal, RevealMode, render_message};
use crate::store::{ConversationStore, KeyValueStore, load_theme, save_theme};
use crate::types::{
    Attachment, ChatRequest, Conversation, MessageRole, Theme, default_attachment_prompt,
    export_file_name, uploaded_files_note,
};

/// Shown at the top of every fresh conversation; never recorded.
pub const WELCOME_MESSAGE: &str = "👋 Welcome to Phoenix AI! How can I help you today?";

/// Shown in place of a reply when a send fails for any reason.
pub const FAILURE_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again.";

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 64;

/// Whether a send is in flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to send; input is enabled.
    Idle,
    /// Waiting for or revealing a reply; input is disabled.
    Sending,
}

/// Notifications for whatever drives the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session entered a new state.
    StateChanged(SessionState),
    /// A different conversation is now current.
    ConversationChanged {
        /// Id of the new current conversation.
        id: String,
    },
    /// The stored history changed.
    HistoryChanged,
    /// The pending attachments changed.
    AttachmentsChanged {
        /// Number of pending attachments.
        count: usize,
    },
    /// The theme preference changed.
    ThemeChanged(Theme),
}

/// How a call to [`ChatSession::send`] ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply was revealed and recorded.
    Replied,
    /// The failure message was shown instead of a reply.
    Failed(ErrorKind),
    /// Nothing happened: another send was in flight or there was nothing to send.
    Ignored,
}

struct Inner {
    store: ConversationStore,
    current: Conversation,
    attachments: Vec<Attachment>,
    theme: Theme,
}

/// A chat session bound to one endpoint and one key-value store.
pub struct ChatSession<E: ChatEndpoint + 'static> {
    endpoint: Arc<E>,
    kv: Arc<dyn KeyValueStore>,
    config: ChatConfig,
    state: Cell<SessionState>,
    inner: RefCell<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl<E: ChatEndpoint + 'static> ChatSession<E> {
    /// Creates a session, loading history and theme from `kv`.
    pub fn new(endpoint: E, kv: Arc<dyn KeyValueStore>, config: ChatConfig) -> Self {
        let store = ConversationStore::with_capacity(kv.clone(), config.history_capacity);
        let theme = load_theme(kv.as_ref());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            endpoint: Arc::new(endpoint),
            kv,
            config,
            state: Cell::new(SessionState::Idle),
            inner: RefCell::new(Inner {
                store,
                current: Conversation::new(),
                attachments: Vec::new(),
                theme,
            }),
            events,
        }
    }

    /// Subscribes to session notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Returns true while a send is in flight.
    pub fn is_sending(&self) -> bool {
        self.state.get() == SessionState::Sending
    }

    /// A snapshot of the current conversation.
    pub fn current(&self) -> Conversation {
        self.inner.borrow().current.clone()
    }

    /// Stored conversations, most recently updated first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.inner.borrow().store.list().to_vec()
    }

    /// Pending attachments, in the order they were added.
    pub fn attachments(&self) -> Vec<Attachment> {
        self.inner.borrow().attachments.clone()
    }

    /// Renders the welcome message for the current conversation.
    pub fn welcome(&self, renderer: &mut dyn Renderer) {
        render_now(
            renderer,
            Reveal::new(MessageRole::Assistant, WELCOME_MESSAGE, RevealMode::Immediate),
        );
    }

    /// Sends `text` with the pending attachments and reveals the reply.
    ///
    /// The user message is shown before the request goes out. On success the
    /// reply is revealed (progressively unless configured otherwise) and only
    /// then is the exchange recorded and the conversation saved. On failure
    /// the generic failure message is shown and nothing is recorded. Pending
    /// attachments are consumed by the request in either case.
    pub async fn send(&self, text: &str, renderer: &mut dyn Renderer) -> SendOutcome {
        if self.is_sending() {
            SESSION_SENDS_IGNORED.click();
            debug!("ignoring send while another is in flight");
            return SendOutcome::Ignored;
        }
        let text = text.trim();
        if text.is_empty() && self.inner.borrow().attachments.is_empty() {
            SESSION_SENDS_IGNORED.click();
            return SendOutcome::Ignored;
        }

        let _guard = SendingGuard::enter(self);
        let (request, display) = self.take_request(text);
        render_now(
            renderer,
            Reveal::new(MessageRole::User, &display, RevealMode::Immediate),
        );

        SESSION_SENDS.click();
        renderer.show_typing(true);
        let result = self.endpoint.send(request.clone()).await;
        renderer.show_typing(false);

        let reply = match result {
            Ok(reply) => {
                let text = reply.text().map(str::to_string);
                text.ok_or_else(|| {
                    Error::empty_reply(
                        reply
                            .error
                            .unwrap_or_else(|| "Empty response from server".to_string()),
                    )
                })
            }
            Err(err) => Err(err),
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                SESSION_SENDS_FAILED.click();
                warn!(error = %err, "send failed");
                render_now(renderer, Reveal::error(FAILURE_MESSAGE));
                return SendOutcome::Failed(err.kind());
            }
        };

        let reveal = Reveal::new(MessageRole::Assistant, &reply, self.config.reply_mode());
        render_message(renderer, reveal, self.config.reveal_delay).await;

        self.record_exchange(&request.message, display, reply);
        SendOutcome::Replied
    }

    /// Saves the current conversation (if it has messages) and starts a fresh one.
    pub fn new_chat(&self, renderer: &mut dyn Renderer) -> Result<()> {
        self.ensure_idle("start a new chat")?;
        self.save_current();
        self.start_fresh(renderer);
        Ok(())
    }

    /// Makes a stored conversation current and shows its history at once.
    pub fn load_conversation(&self, id: &str, renderer: &mut dyn Renderer) -> Result<()> {
        self.ensure_idle("load a conversation")?;
        let loaded = self
            .inner
            .borrow()
            .store
            .find(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no conversation with id {id}"), id))?;
        if self.inner.borrow().current.id != loaded.id {
            self.save_current();
        }
        renderer.clear_transcript();
        for message in &loaded.messages {
            render_now(
                renderer,
                Reveal::new(message.role, &message.content, RevealMode::Immediate),
            );
        }
        info!(id = %loaded.id, title = %loaded.title, "loaded conversation");
        self.inner.borrow_mut().current = loaded;
        self.reset_remote_history();
        self.emit(SessionEvent::ConversationChanged { id: id.to_string() });
        Ok(())
    }

    /// Deletes a stored conversation; unknown ids are ignored.
    ///
    /// Deleting the current conversation starts a fresh one without saving.
    pub fn delete_conversation(&self, id: &str, renderer: &mut dyn Renderer) -> Result<()> {
        self.ensure_idle("delete a conversation")?;
        let removed = self.inner.borrow_mut().store.delete(id);
        match removed {
            Ok(true) => self.emit(SessionEvent::HistoryChanged),
            Ok(false) => debug!(id, "delete of unknown conversation ignored"),
            Err(err) => {
                warn!(id, error = %err, "failed to persist conversation history");
                self.emit(SessionEvent::HistoryChanged);
            }
        }
        if self.inner.borrow().current.id == id {
            self.start_fresh(renderer);
        }
        Ok(())
    }

    /// Forgets every stored conversation and starts a fresh one without saving.
    pub fn clear_history(&self, renderer: &mut dyn Renderer) -> Result<()> {
        self.ensure_idle("clear the history")?;
        if let Err(err) = self.inner.borrow_mut().store.clear() {
            warn!(error = %err, "failed to persist conversation history");
        }
        self.emit(SessionEvent::HistoryChanged);
        self.start_fresh(renderer);
        Ok(())
    }

    /// Adds a file to the next send, replacing one with the same name.
    pub fn attach(&self, attachment: Attachment) -> Result<()> {
        self.ensure_idle("attach a file")?;
        let count = {
            let mut inner = self.inner.borrow_mut();
            inner
                .attachments
                .retain(|existing| existing.name != attachment.name);
            inner.attachments.push(attachment);
            inner.attachments.len()
        };
        self.emit(SessionEvent::AttachmentsChanged { count });
        Ok(())
    }

    /// Drops a pending attachment by name; returns whether one was removed.
    pub fn remove_attachment(&self, name: &str) -> bool {
        let (removed, count) = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.attachments.len();
            inner.attachments.retain(|attachment| attachment.name != name);
            (inner.attachments.len() != before, inner.attachments.len())
        };
        if removed {
            self.emit(SessionEvent::AttachmentsChanged { count });
        }
        removed
    }

    /// Drops every pending attachment.
    pub fn clear_attachments(&self) {
        let had_any = {
            let mut inner = self.inner.borrow_mut();
            let had_any = !inner.attachments.is_empty();
            inner.attachments.clear();
            had_any
        };
        if had_any {
            self.emit(SessionEvent::AttachmentsChanged { count: 0 });
        }
    }

    /// The theme preference.
    pub fn theme(&self) -> Theme {
        self.inner.borrow().theme
    }

    /// Changes and persists the theme preference.
    pub fn set_theme(&self, theme: Theme) {
        self.inner.borrow_mut().theme = theme;
        if let Err(err) = save_theme(self.kv.as_ref(), theme) {
            warn!(%theme, error = %err, "failed to persist theme");
        }
        self.emit(SessionEvent::ThemeChanged(theme));
    }

    /// The current conversation as `ROLE: content` blocks.
    pub fn export(&self) -> String {
        self.inner.borrow().current.export()
    }

    /// File name offered for today's export.
    pub fn export_file_name(&self) -> String {
        export_file_name(OffsetDateTime::now_utc().date())
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        if self.is_sending() {
            return Err(Error::busy(format!(
                "cannot {action} while a message is being sent"
            )));
        }
        Ok(())
    }

    fn set_state(&self, state: SessionState) {
        if self.state.replace(state) != state {
            self.emit(SessionEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Builds the outbound request, consuming the pending attachments.
    ///
    /// Returns the request and the text shown (and later recorded) for the user.
    fn take_request(&self, text: &str) -> (ChatRequest, String) {
        let files = std::mem::take(&mut self.inner.borrow_mut().attachments);
        if !files.is_empty() {
            self.emit(SessionEvent::AttachmentsChanged { count: 0 });
        }
        let message = if text.is_empty() {
            default_attachment_prompt(files.len())
        } else {
            text.to_string()
        };
        let mut display = message.clone();
        if let Some(note) = uploaded_files_note(&files) {
            display.push_str(&note);
        }
        (ChatRequest::new(message).with_files(files), display)
    }

    fn record_exchange(&self, message: &str, display: String, reply: String) {
        let snapshot = {
            let mut inner = self.inner.borrow_mut();
            inner.current.push_exchange(display, reply);
            if inner.current.has_default_title() {
                inner.current.title = derive_title(message);
            }
            inner.current.clone()
        };
        self.persist(snapshot);
    }

    fn save_current(&self) {
        let current = self.inner.borrow().current.clone();
        if !current.is_empty() {
            self.persist(current);
        }
    }

    fn persist(&self, conversation: Conversation) {
        let id = conversation.id.clone();
        if let Err(err) = self.inner.borrow_mut().store.upsert(conversation) {
            warn!(%id, error = %err, "failed to persist conversation history");
        }
        self.emit(SessionEvent::HistoryChanged);
    }

    fn start_fresh(&self, renderer: &mut dyn Renderer) {
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.current = Conversation::new();
            inner.attachments.clear();
            inner.current.id.clone()
        };
        renderer.clear_transcript();
        self.welcome(renderer);
        self.reset_remote_history();
        self.emit(SessionEvent::AttachmentsChanged { count: 0 });
        self.emit(SessionEvent::ConversationChanged { id });
    }

    /// Tells the server to drop its context, without waiting for the answer.
    fn reset_remote_history(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime; skipping history reset");
            return;
        };
        let endpoint = Arc::clone(&self.endpoint);
        handle.spawn(async move {
            if let Err(err) = endpoint.reset_history().await {
                SESSION_RESET_FAILURES.click();
                warn!(error = %err, "failed to reset server history");
            }
        });
    }
}

/// Holds the session in `Sending` and restores `Idle` when dropped.
struct SendingGuard<'a, E: ChatEndpoint + 'static> {
    session: &'a ChatSession<E>,
}

impl<'a, E: ChatEndpoint + 'static> SendingGuard<'a, E> {
    fn enter(session: &'a ChatSession<E>) -> Self {
        session.set_state(SessionState::Sending);
        Self { session }
    }
}

impl<E: ChatEndpoint + 'static> Drop for SendingGuard<'_, E> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.session.inner.try_borrow_mut()
            && !inner.attachments.is_empty()
        {
            inner.attachments.clear();
            drop(inner);
            self.session
                .emit(SessionEvent::AttachmentsChanged { count: 0 });
        }
        self.session.set_state(SessionState::Idle);
    }
}

fn render_now(renderer: &mut dyn Renderer, reveal: Reveal) {
    for update in reveal {
        renderer.apply(&update);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::render::{Block, MarkupDocument};
    use crate::store::{CONVERSATIONS_KEY, MemoryStore};
    use crate::types::ChatReply;

    #[derive(Default)]
    struct ScriptedEndpoint {
        replies: Mutex<Vec<Result<ChatReply>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedEndpoint {
        fn replying(replies: Vec<Result<ChatReply>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatEndpoint for ScriptedEndpoint {
        async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
            self.requests.lock().unwrap().push(request);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(ChatReply::new("ok"))
            } else {
                replies.remove(0)
            }
        }

        async fn reset_history(&self) -> Result<()> {
            Ok(())
        }
    }

    fn session(endpoint: ScriptedEndpoint) -> (MemoryStore, ChatSession<ScriptedEndpoint>) {
        let kv = MemoryStore::new();
        let config = ChatConfig::new().with_reveal_delay(Duration::ZERO);
        let session = ChatSession::new(endpoint, Arc::new(kv.clone()), config);
        (kv, session)
    }

    #[tokio::test]
    async fn successful_send_records_and_titles() {
        let (kv, session) = session(ScriptedEndpoint::replying(vec![Ok(ChatReply::new(
            "Because **reasons**.",
        ))]));
        let mut document = MarkupDocument::new();
        let outcome = session.send("  Why does this fail?  ", &mut document).await;
        assert_eq!(outcome, SendOutcome::Replied);
        assert_eq!(session.state(), SessionState::Idle);

        let current = session.current();
        assert_eq!(current.title, "Why does this fail?");
        assert_eq!(current.messages.len(), 2);
        assert_eq!(current.messages[0].content, "Why does this fail?");
        assert!(kv.get(CONVERSATIONS_KEY).unwrap().is_some());

        let messages = document.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(
            messages[1].blocks,
            vec![Block::Prose {
                markup: "Because <strong>reasons</strong>.".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn title_is_set_only_once() {
        let (_, session) = session(ScriptedEndpoint::default());
        let mut document = MarkupDocument::new();
        session.send("Tell me a story", &mut document).await;
        session.send("Why not?", &mut document).await;
        assert_eq!(session.current().title, "Tell me a story");
        assert_eq!(session.conversations().len(), 1);
    }

    #[tokio::test]
    async fn blank_text_without_files_is_ignored() {
        let (_, session) = session(ScriptedEndpoint::default());
        let mut document = MarkupDocument::new();
        assert_eq!(session.send("   ", &mut document).await, SendOutcome::Ignored);
        assert!(document.messages().is_empty());
    }

    #[tokio::test]
    async fn empty_reply_is_a_failure() {
        let (_, session) = session(ScriptedEndpoint::replying(vec![Ok(ChatReply::default())]));
        let mut document = MarkupDocument::new();
        let outcome = session.send("hello", &mut document).await;
        assert_eq!(outcome, SendOutcome::Failed(ErrorKind::EmptyReply));
        let last = document.last().unwrap();
        assert!(last.error);
        assert_eq!(
            last.blocks,
            vec![Block::Prose {
                markup: FAILURE_MESSAGE.to_string()
            }]
        );
        assert!(session.current().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn attachments_ride_along_and_are_consumed() {
        let endpoint = ScriptedEndpoint::default();
        let (_, session) = session(endpoint);
        session
            .attach(Attachment::new("notes.txt", "hello").unwrap())
            .unwrap();
        session
            .attach(Attachment::new("main.py", "print(1)").unwrap())
            .unwrap();
        let mut document = MarkupDocument::new();
        session.send("", &mut document).await;
        assert!(session.attachments().is_empty());

        let requests = session.endpoint.requests.lock().unwrap();
        assert_eq!(
            requests[0].message,
            "I have uploaded 2 files. Please analyze them."
        );
        assert_eq!(requests[0].files.len(), 2);
        assert_eq!(
            session.current().messages[0].content,
            "I have uploaded 2 files. Please analyze them.\n\nUploaded files: notes.txt, main.py"
        );
    }

    #[tokio::test]
    async fn events_track_state() {
        let (_, session) = session(ScriptedEndpoint::default());
        let mut events = session.subscribe();
        let mut document = MarkupDocument::new();
        session.send("hi", &mut document).await;
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::StateChanged(SessionState::Sending)
        );
        assert_eq!(events.try_recv().unwrap(), SessionEvent::HistoryChanged);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::StateChanged(SessionState::Idle)
        );
    }

    #[tokio::test]
    async fn theme_is_persisted() {
        let (kv, session) = session(ScriptedEndpoint::default());
        assert_eq!(session.theme(), Theme::Light);
        session.set_theme(Theme::Dark);
        let reloaded = ChatSession::new(
            ScriptedEndpoint::default(),
            Arc::new(kv),
            ChatConfig::new(),
        );
        assert_eq!(reloaded.theme(), Theme::Dark);
    }

    #[test]
    fn load_unknown_conversation_is_not_found() {
        let (_, session) = session(ScriptedEndpoint::default());
        let mut document = MarkupDocument::new();
        let err = session
            .load_conversation("missing", &mut document)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
