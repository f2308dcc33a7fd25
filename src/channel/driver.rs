//! Runs one session view against a push channel.
//!
//! A single task owns the [`SessionViewModel`]. Inbound events, local actions
//! and shutdown are serialised through `tokio::select!`, and every change is
//! published to observers as a cloned view model over a `watch` channel.
//! Commands are posted from a `JoinSet` so a slow request never blocks the
//! loop; the set is aborted on shutdown.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};

use super::{ConnectionStatus, PushChannel, SessionEventStream};
use crate::config::Config;
use crate::errors::{ClientError, ClientResult};
use crate::poker::{ActionError, ApplyOutcome, SessionCommand, SessionEvent, SessionViewModel};

/// Queue depth for local actions waiting on the driver.
const ACTION_QUEUE: usize = 16;

/// Something the local user asked for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalAction {
    Vote(f64),
    Reveal,
    Finalize(f64),
    ResetRound,
}

/// Reconnect behaviour for the driver.
#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    pub reconnect_delay: Duration,
    pub reconnect_attempts: u32,
}

impl DriverOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay,
            reconnect_attempts: config.reconnect_attempts,
        }
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

struct ActionRequest {
    action: LocalAction,
    reply: oneshot::Sender<Result<(), ActionError>>,
}

/// Handle to a running session.
///
/// Dropping the handle shuts the session down as well.
pub struct SessionHandle {
    actions: mpsc::Sender<ActionRequest>,
    updates: watch::Receiver<SessionViewModel>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<SessionViewModel>,
}

impl SessionHandle {
    /// Validate `action` against the current state and send it upstream.
    ///
    /// Returns as soon as the view model accepted or refused the action; the
    /// server's confirmation arrives later as an event.
    pub async fn act(&self, action: LocalAction) -> Result<(), ActionError> {
        let (reply, response) = oneshot::channel();
        self.actions
            .send(ActionRequest { action, reply })
            .await
            .map_err(|_| ActionError::Disposed)?;
        response.await.map_err(|_| ActionError::Disposed)?
    }

    /// Subscribe to state changes.
    pub fn updates(&self) -> watch::Receiver<SessionViewModel> {
        self.updates.clone()
    }

    /// Latest published state.
    pub fn current(&self) -> SessionViewModel {
        self.updates.borrow().clone()
    }

    /// Tear the session down and return the final, disposed view model.
    pub async fn close(mut self) -> ClientResult<SessionViewModel> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        (&mut self.task)
            .await
            .map_err(|e| ClientError::Channel(format!("session task failed: {e}")))
    }
}

/// Owns the view model and the channel for the lifetime of one session view.
pub struct SessionDriver<C> {
    channel: Arc<C>,
    sends: JoinSet<()>,
    view: SessionViewModel,
    options: DriverOptions,
    updates: watch::Sender<SessionViewModel>,
}

impl<C: PushChannel + 'static> SessionDriver<C> {
    /// Start driving `view` over `channel` on the current tokio runtime.
    pub fn spawn(channel: C, view: SessionViewModel, options: DriverOptions) -> SessionHandle {
        let (updates, updates_rx) = watch::channel(view.clone());
        let (actions_tx, actions_rx) = mpsc::channel(ACTION_QUEUE);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let driver = SessionDriver {
            channel: Arc::new(channel),
            sends: JoinSet::new(),
            view,
            options,
            updates,
        };
        let task = tokio::spawn(driver.run(actions_rx, shutdown_rx));

        SessionHandle {
            actions: actions_tx,
            updates: updates_rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(
        mut self,
        mut actions: mpsc::Receiver<ActionRequest>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> SessionViewModel {
        let mut failures: u32 = 0;

        'session: loop {
            self.set_status(ConnectionStatus::Connecting);
            self.view.resync();

            let connected = tokio::select! {
                _ = &mut shutdown => break 'session,
                result = self.connect() => result,
            };

            match connected {
                Ok(mut events) => {
                    failures = 0;
                    self.set_status(ConnectionStatus::Connected);

                    loop {
                        tokio::select! {
                            _ = &mut shutdown => break 'session,
                            Some(request) = actions.recv() => self.handle_action(request),
                            Some(_) = self.sends.join_next() => {}
                            item = events.next() => match item {
                                Some(Ok(event)) => self.handle_event(event),
                                Some(Err(e)) => {
                                    tracing::warn!("Session event stream failed: {}", e);
                                    break;
                                }
                                None => {
                                    tracing::info!("Session event stream closed by server");
                                    break;
                                }
                            },
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to connect session channel: {}", e);
                }
            }

            self.set_status(ConnectionStatus::Disconnected);
            failures += 1;
            if failures > self.options.reconnect_attempts {
                tracing::warn!(
                    attempts = self.options.reconnect_attempts,
                    "Giving up on session channel"
                );
                break;
            }

            tokio::select! {
                _ = &mut shutdown => break 'session,
                _ = tokio::time::sleep(self.options.reconnect_delay) => {}
            }
        }

        // Nothing may touch the view after this point.
        self.view.dispose();
        self.sends.abort_all();
        self.publish();
        actions.close();
        tracing::info!(session_id = %self.view.state().session_id(), "Session closed");
        self.view
    }

    /// Subscribe, then join so the server answers with a fresh `full-state`.
    async fn connect(&self) -> ClientResult<SessionEventStream> {
        let events = self.channel.subscribe().await?;
        let join = self
            .view
            .join()
            .map_err(|e| ClientError::Channel(e.to_string()))?;
        self.channel.send(&join).await?;
        Ok(events)
    }

    fn handle_event(&mut self, event: SessionEvent) {
        if self.view.apply(event) == ApplyOutcome::Applied {
            self.publish();
        }
    }

    fn handle_action(&mut self, request: ActionRequest) {
        let result = match request.action {
            LocalAction::Vote(value) => self.view.submit_vote(value),
            LocalAction::Reveal => self.view.reveal(),
            LocalAction::Finalize(value) => self.view.set_final_value(value),
            LocalAction::ResetRound => self.view.reset_round(),
        };

        match result {
            Ok(command) => {
                self.publish();
                let _ = request.reply.send(Ok(()));
                self.send(command);
            }
            Err(e) => {
                tracing::debug!(action = ?request.action, "Rejected local action: {}", e);
                let _ = request.reply.send(Err(e));
            }
        }
    }

    /// Post `command` in the background. A failed post leaves the stream and
    /// the connection status alone; the pending action stays until the next
    /// resync rolls it back.
    fn send(&mut self, command: SessionCommand) {
        let channel = Arc::clone(&self.channel);
        self.sends.spawn(async move {
            if let Err(e) = channel.send(&command).await {
                tracing::warn!(action = command.action(), "Failed to send session command: {}", e);
            }
        });
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.view.connection_status() != status {
            self.view.set_connection_status(status);
            self.publish();
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.view.clone());
    }
}
