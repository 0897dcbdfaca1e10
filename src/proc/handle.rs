//! Agent process handle implementation
//!
//! This module owns the lifecycle and stdio channel of one agent process.

use super::traits::Transport;
use super::types::{Notification, Request, RpcResponse};
use crate::config::Options;
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{debug, error, info, warn};

/// Capacity of the notification broadcast channel
const NOTIFY_CHANNEL_CAPACITY: usize = 256;

/// Handle to one agent process
///
/// Owns the child process, pairs requests with responses by id, and
/// broadcasts unsolicited notifications to subscribers in arrival order.
#[derive(Debug)]
pub struct ProcessHandle {
    /// OS process identifier
    pid: u32,
    /// Agent stdin, guarded for exclusive writes
    stdin: Mutex<ChildStdin>,
    /// Child process; taken on stop
    child: Mutex<Option<Child>>,
    /// Next request ID
    next_id: AtomicU64,
    /// Pending requests (ID -> response sender)
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<RpcResponse>>>>,
    /// Notification fan-out
    notify_tx: broadcast::Sender<Notification>,
    /// Is the channel open
    is_active: Arc<AtomicBool>,
}

impl ProcessHandle {
    /// Spawn a fresh agent process and wait for it to report ready
    ///
    /// Fails with a startup error if the executable cannot be spawned or no
    /// `ready` notification arrives within `options.startup_timeout`.
    pub async fn spawn(options: &Options) -> Result<Arc<Self>, Error> {
        info!("Spawning agent process: {}", options.executable);

        let mut child = Command::new(&options.executable)
            .args(&options.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::startup(format!("Failed to spawn {}: {}", options.executable, e))
            })?;

        let pid = child
            .id()
            .ok_or_else(|| Error::startup("Agent exited before reporting a pid"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::startup("Agent stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::startup("Agent stdout was not captured"))?;

        let (notify_tx, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        let pending = Arc::new(Mutex::new(HashMap::new()));
        let is_active = Arc::new(AtomicBool::new(true));

        // Subscribe before the reader starts so the ready line cannot be missed
        let mut ready_rx = notify_tx.subscribe();

        tokio::spawn(Self::read_loop(
            stdout,
            Arc::clone(&pending),
            notify_tx.clone(),
            Arc::clone(&is_active),
        ));

        let startup = std::time::Duration::from_millis(options.startup_timeout);
        let handshake = async {
            loop {
                match ready_rx.recv().await {
                    Ok(notification) if notification.event == "ready" => break Ok(()),
                    Ok(_) => continue,
                    Err(_) => break Err(Error::startup("Agent channel closed before ready")),
                }
            }
        };

        tokio::time::timeout(startup, handshake)
            .await
            .map_err(|_| {
                Error::startup(format!("Agent {} not ready within {:?}", pid, startup))
            })??;

        info!("Agent process {} ready", pid);

        Ok(Arc::new(Self {
            pid,
            stdin: Mutex::new(stdin),
            child: Mutex::new(Some(child)),
            next_id: AtomicU64::new(1),
            pending,
            notify_tx,
            is_active,
        }))
    }

    /// Stdout processing loop
    ///
    /// Routes response lines to pending requests and broadcasts notification
    /// lines. On exit the handle deactivates and the pending map is drained so
    /// in-flight requests settle instead of hanging.
    async fn read_loop(
        stdout: ChildStdout,
        pending: Arc<Mutex<HashMap<u64, oneshot::Sender<RpcResponse>>>>,
        notify_tx: broadcast::Sender<Notification>,
        is_active: Arc<AtomicBool>,
    ) {
        let mut lines = BufReader::new(stdout).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    // Responses carry an id, notifications an event name
                    if let Ok(response) = serde_json::from_str::<RpcResponse>(line) {
                        let mut pending = pending.lock().await;
                        match pending.remove(&response.id) {
                            Some(sender) => {
                                debug!("Received response for request {}", response.id);
                                let _ = sender.send(response);
                            }
                            None => {
                                warn!("Response for unknown request ID: {}", response.id);
                            }
                        }
                        continue;
                    }

                    if let Ok(notification) = serde_json::from_str::<Notification>(line) {
                        debug!("Received notification: {}", notification.event);
                        // Send only fails with no subscribers, which is fine
                        let _ = notify_tx.send(notification);
                        continue;
                    }

                    warn!("Unknown message format: {}", line);
                }
                Ok(None) => {
                    info!("Agent stdout closed");
                    break;
                }
                Err(e) => {
                    error!("Agent read error: {}", e);
                    break;
                }
            }
        }

        is_active.store(false, Ordering::SeqCst);
        // Dropping the senders settles every in-flight request as failed
        pending.lock().await.clear();
    }
}

#[async_trait]
impl Transport for ProcessHandle {
    /// Send a command line and wait for the paired response
    async fn request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::communication("Agent channel is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = Request {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };

        let mut json = serde_json::to_string(&request)?;
        json.push('\n');

        debug!("Sending request {}: {}", id, method);

        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, sender);
        }

        {
            let mut stdin = self.stdin.lock().await;
            if let Err(e) = stdin.write_all(json.as_bytes()).await {
                self.pending.lock().await.remove(&id);
                return Err(Error::communication(format!(
                    "Failed to write request {}: {}",
                    id, e
                )));
            }
            if let Err(e) = stdin.flush().await {
                self.pending.lock().await.remove(&id);
                return Err(Error::communication(format!(
                    "Failed to flush request {}: {}",
                    id, e
                )));
            }
        }

        match receiver.await {
            Ok(response) => {
                if let Some(error) = response.error {
                    return Err(Error::protocol(format!("{}: {}", method, error.message)));
                }
                Ok(response.result)
            }
            Err(_) => Err(Error::communication(format!(
                "Channel closed while request {} was pending",
                id
            ))),
        }
    }

    fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    /// Terminate the agent process; calling twice is a no-op
    async fn stop(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::SeqCst);

        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            info!("Stopping agent process {}", self.pid);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill agent {}: {}", self.pid, e);
            }
        }

        self.pending.lock().await.clear();
        Ok(())
    }

    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
