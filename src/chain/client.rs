//! Chainable session client
//!
//! `Wraith` is the top-level handle to one agent session: every chainable
//! method appends an operation to the session's ordered queue and returns
//! the same client, so long command sequences compose without manual
//! future bookkeeping. Awaiting the client (or calling [`Wraith::settle`])
//! waits for the most recently enqueued operation.

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use super::op::{Operation, Queued};
use super::worker::spawn_worker;
use crate::config::Options;
use crate::events::{Callback, EventRelay};
use crate::proc::{ProcessHandle, Transport};
use crate::session::SessionRegistry;
use crate::{Error, Result};

/// Client for one agent session
///
/// Construction always starts a brand-new agent process; independent
/// clients never share a session. Operations queued here execute strictly
/// in enqueue order, one at a time, while page events are relayed to
/// subscribers on an independent timeline.
///
/// ```rust,no_run
/// use wraith::{Options, Wraith};
///
/// # async fn example() -> wraith::Result<()> {
/// let mut session = Wraith::spawn(Options::default()).await?;
/// let title = session
///     .open("http://localhost:3000")
///     .click("#link")
///     .wait()
///     .title()
///     .await?;
/// println!("landed on: {}", title);
/// session.exit().await?;
/// # Ok(())
/// # }
/// ```
pub struct Wraith {
    transport: Arc<dyn Transport>,
    relay: Arc<EventRelay>,
    queue_tx: mpsc::UnboundedSender<Queued>,
    /// Settlement of the most recently enqueued operation
    tail: Option<oneshot::Receiver<Result<Value>>>,
    session_id: Uuid,
    registry: Option<SessionRegistry>,
}

impl Wraith {
    /// Spawn a fresh agent process and wrap it in a client
    pub async fn spawn(options: Options) -> Result<Self> {
        let transport: Arc<dyn Transport> = ProcessHandle::spawn(&options).await?;
        Self::with_transport(transport, options)
    }

    /// Build a client over an existing transport
    ///
    /// This is the seam tests use to substitute a mock transport.
    pub fn with_transport(transport: Arc<dyn Transport>, options: Options) -> Result<Self> {
        let session_id = Uuid::new_v4();

        if let Some(registry) = &options.registry {
            registry.register(session_id, &transport)?;
        }

        let relay = Arc::new(EventRelay::new());
        let _pump = Arc::clone(&relay).spawn_pump(transport.notifications());

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let _worker = spawn_worker(
            Arc::clone(&transport),
            Duration::from_millis(options.timeout),
            queue_rx,
        );

        info!(
            "Session {} ready on pid {} (timeout {}ms)",
            session_id,
            transport.pid(),
            options.timeout
        );

        Ok(Self {
            transport,
            relay,
            queue_tx,
            tail: None,
            session_id,
            registry: options.registry,
        })
    }

    /// Append an operation to the queue; its settlement becomes the tail
    fn enqueue(&mut self, op: Operation) -> &mut Self {
        let (settle_tx, settle_rx) = oneshot::channel();
        if self
            .queue_tx
            .send(Queued {
                op,
                settle: settle_tx,
            })
            .is_err()
        {
            // Worker is gone; the dropped sender settles the tail as a
            // communication failure at the next await
            warn!("Command queue for session {} is closed", self.session_id);
        }
        self.tail = Some(settle_rx);
        self
    }

    /// Await the settlement of the most recently enqueued operation
    ///
    /// Awaiting consumes the tail: a second call without further enqueues
    /// settles with `Value::Null`.
    pub async fn settle(&mut self) -> Result<Value> {
        match self.tail.take() {
            Some(settle_rx) => settle_rx
                .await
                .map_err(|_| Error::communication("command queue dropped before settlement"))?,
            None => Ok(Value::Null),
        }
    }

    // ---- chainable operations -------------------------------------------

    /// Navigate to a URL; settles with `"success"` or rejects with a
    /// navigation failure carrying status `"fail"`
    pub fn open<S: Into<String>>(&mut self, url: S) -> &mut Self {
        self.enqueue(Operation::Open { url: url.into() })
    }

    /// Read the page title
    pub fn title(&mut self) -> &mut Self {
        self.enqueue(Operation::Title)
    }

    /// Read the current URL
    pub fn url(&mut self) -> &mut Self {
        self.enqueue(Operation::Url)
    }

    /// Click the first element matching the selector
    pub fn click<S: Into<String>>(&mut self, selector: S) -> &mut Self {
        self.enqueue(Operation::Click {
            selector: selector.into(),
        })
    }

    /// Type text into the element matching the selector
    pub fn type_text<S: Into<String>, T: Into<String>>(&mut self, selector: S, text: T) -> &mut Self {
        self.enqueue(Operation::TypeText {
            selector: selector.into(),
            text: text.into(),
        })
    }

    /// Set the value of the element matching the selector
    pub fn value<S: Into<String>, T: Into<String>>(&mut self, selector: S, text: T) -> &mut Self {
        self.enqueue(Operation::SetValue {
            selector: selector.into(),
            text: text.into(),
        })
    }

    /// Choose an option of the select element matching the selector
    pub fn select<S: Into<String>, T: Into<String>>(&mut self, selector: S, value: T) -> &mut Self {
        self.enqueue(Operation::Select {
            selector: selector.into(),
            value: value.into(),
        })
    }

    /// Capture the page to a file
    pub fn screenshot<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.enqueue(Operation::Screenshot { path: path.into() })
    }

    /// Capture one element to a file
    pub fn screenshot_dom_element<S: Into<String>, P: Into<PathBuf>>(
        &mut self,
        selector: S,
        path: P,
    ) -> &mut Self {
        self.enqueue(Operation::ScreenshotDomElement {
            selector: selector.into(),
            path: path.into(),
        })
    }

    /// Go back in history
    pub fn back(&mut self) -> &mut Self {
        self.enqueue(Operation::Back)
    }

    /// Go forward in history
    pub fn forward(&mut self) -> &mut Self {
        self.enqueue(Operation::Forward)
    }

    /// Reload the current page
    pub fn refresh(&mut self) -> &mut Self {
        self.enqueue(Operation::Refresh)
    }

    /// Focus the element matching the selector
    pub fn focus<S: Into<String>>(&mut self, selector: S) -> &mut Self {
        self.enqueue(Operation::Focus {
            selector: selector.into(),
        })
    }

    /// Read a local JavaScript file and inject it into the page
    pub fn inject_js<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.enqueue(Operation::InjectJs { path: path.into() })
    }

    /// Inject CSS source into the page
    pub fn inject_css<S: Into<String>>(&mut self, css: S) -> &mut Self {
        self.enqueue(Operation::InjectCss { css: css.into() })
    }

    /// Read the page content as a full document
    pub fn content(&mut self) -> &mut Self {
        self.enqueue(Operation::Content)
    }

    /// Replace the page content
    pub fn set_content<S: Into<String>>(&mut self, html: S) -> &mut Self {
        self.enqueue(Operation::SetContent { html: html.into() })
    }

    /// Evaluate a script in the page; settles with its result
    pub fn evaluate<S: Into<String>>(&mut self, script: S) -> &mut Self {
        self.enqueue(Operation::Evaluate {
            script: script.into(),
        })
    }

    /// Block the queue until the next load finishes
    pub fn wait(&mut self) -> &mut Self {
        self.enqueue(Operation::Wait)
    }

    /// Block the queue for a fixed duration
    pub fn delay(&mut self, ms: u64) -> &mut Self {
        self.enqueue(Operation::Delay { ms })
    }

    // ---- event subscription ---------------------------------------------

    /// Register a persistent listener for a page event
    pub fn on<E: AsRef<str>>(&mut self, event: E, callback: Callback) -> &mut Self {
        self.relay.on(event, callback);
        self
    }

    /// Register a listener removed after its first invocation
    pub fn once<E: AsRef<str>>(&mut self, event: E, callback: Callback) -> &mut Self {
        self.relay.once(event, callback);
        self
    }

    /// Remove one specific listener registration
    pub fn remove_listener<E: AsRef<str>>(&mut self, event: E, callback: &Callback) -> &mut Self {
        self.relay.remove_listener(event, callback);
        self
    }

    // ---- identity and lifecycle -----------------------------------------

    /// Process identifier of the backing session; stable across operations
    pub fn pid(&self) -> u32 {
        self.transport.pid()
    }

    /// Logical session id
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// True while the session's channel is open
    pub fn is_active(&self) -> bool {
        self.transport.is_active()
    }

    /// Stop the agent process and drop the registry entry
    ///
    /// Safe to call multiple times. Operations enqueued afterwards settle
    /// rejected with a communication failure.
    pub async fn exit(&mut self) -> Result<()> {
        if let Some(registry) = &self.registry {
            registry.remove(self.transport.pid())?;
        }
        self.transport.stop().await
    }
}

impl<'a> IntoFuture for &'a mut Wraith {
    type Output = Result<Value>;
    type IntoFuture = BoxFuture<'a, Result<Value>>;

    /// Awaiting the client awaits the current tail
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.settle())
    }
}

impl std::fmt::Debug for Wraith {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wraith")
            .field("session_id", &self.session_id)
            .field("pid", &self.transport.pid())
            .field("active", &self.transport.is_active())
            .finish()
    }
}
