//! # Scan Session
//!
//! The resource-owning state machine at the heart of the station.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     ScanSession Run Loop                                │
//! │                                                                         │
//! │  ┌──────┐  Start   ┌──────────────┐  camera + engine up  ┌────────┐    │
//! │  │ Idle │ ───────► │ Initializing │ ───────────────────► │ Active │    │
//! │  └──────┘          └──────┬───────┘                      └───┬────┘    │
//! │                           │                                  │          │
//! │      PermissionDenied /   │            accepted code / Stop /│          │
//! │      busy after retry /   │            hidden page / Shutdown│          │
//! │      engine start failure │                                  ▼          │
//! │                           ▼                            ┌─────────┐     │
//! │                      ┌───────┐        Start            │ Stopped │     │
//! │                      │ Error │ ◄──────────────────────►└─────────┘     │
//! │                      └───────┘       (explicit restart)                │
//! │                                                                         │
//! │  TEARDOWN RULE                                                          │
//! │  ─────────────                                                          │
//! │  Entering Stopped or Error stops the engine and releases the camera    │
//! │  inside the same transition — never deferred to a later tick.          │
//! │                                                                         │
//! │  LATE CALLBACKS                                                         │
//! │  ──────────────                                                         │
//! │  Decode deliveries carry the generation they were registered under.    │
//! │  Stale generation, or any non-Active state, makes the delivery a       │
//! │  logged no-op. Unsubscription is never relied upon.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use scanpoint_core::{ScanEvent, SessionState};

use crate::camera::{CameraDriver, CameraResource};
use crate::config::ScannerConfig;
use crate::decode::{DecodeEngine, DecodeSender};
use crate::error::{CameraError, SessionError, SessionResult};

// =============================================================================
// Session Status
// =============================================================================

/// Snapshot of the session for external observers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Current state machine position.
    pub state: SessionState,

    /// Monotonic start counter. Bumped on every transition into
    /// Initializing; decode deliveries and lookup results registered under
    /// an older generation are discarded.
    pub generation: u64,

    /// Message of the failure that moved the session to `Error`, if any.
    pub last_error: Option<String>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus {
            state: SessionState::Idle,
            generation: 0,
            last_error: None,
        }
    }
}

// =============================================================================
// Session Commands
// =============================================================================

enum SessionCommand {
    /// Begin (or restart) scanning.
    Start,
    /// Stop scanning and release the camera. Acked once released.
    Stop { ack: Option<oneshot::Sender<()>> },
    /// Unconditional teardown; the task exits afterwards. Acked once the
    /// camera is released.
    Shutdown { ack: Option<oneshot::Sender<()>> },
}

// =============================================================================
// Session Handle
// =============================================================================

/// Handle for interacting with the session from other components.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// Requests a session start. Only acted on from Idle, Stopped, or
    /// Error; ignored while Initializing or Active.
    pub async fn start(&self) -> SessionResult<()> {
        self.commands
            .send(SessionCommand::Start)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Stops scanning. Returns once the camera has been released.
    pub async fn stop(&self) -> SessionResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Stop { ack: Some(ack_tx) })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        ack_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Tears the session down from any state, including mid-initialization.
    /// Returns once the camera has been released; the task exits after.
    pub async fn shutdown(&self) -> SessionResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Shutdown { ack: Some(ack_tx) })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        ack_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Current status snapshot.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Current state machine position.
    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    /// Current session generation.
    pub fn generation(&self) -> u64 {
        self.status.borrow().generation
    }

    /// Subscribes to status changes.
    pub fn watch(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Whether the session task has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

// =============================================================================
// Scan Session
// =============================================================================

/// Outcome of racing initialization against the command channel.
enum InitOutcome {
    Done(SessionResult<()>),
    Interrupted(Option<SessionCommand>),
}

/// The scanning session state machine.
///
/// ## Usage
/// ```rust,ignore
/// let (handle, mut scans) = ScanSession::spawn(driver, engine, ScannerConfig::default());
///
/// handle.start().await?;
/// if let Some(event) = scans.recv().await {
///     dispatcher.dispatch(event).await;
/// }
/// handle.shutdown().await?;
/// ```
pub struct ScanSession {
    id: Uuid,
    config: ScannerConfig,
    camera: CameraResource,
    engine: Arc<dyn DecodeEngine>,
    commands: mpsc::Receiver<SessionCommand>,
    status_tx: watch::Sender<SessionStatus>,
    scan_tx: mpsc::Sender<ScanEvent>,
    decoded_tx: mpsc::UnboundedSender<(u64, ScanEvent)>,
    decoded_rx: mpsc::UnboundedReceiver<(u64, ScanEvent)>,
    generation: u64,
    preflight_done: bool,
}

impl ScanSession {
    /// Creates a session and spawns its task.
    ///
    /// Returns a handle for commands/observation and the receiver the
    /// accepted scan events arrive on.
    pub fn spawn(
        driver: Arc<dyn CameraDriver>,
        engine: Arc<dyn DecodeEngine>,
        config: ScannerConfig,
    ) -> (SessionHandle, mpsc::Receiver<ScanEvent>) {
        let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(16);
        let (scan_tx, scan_rx) = mpsc::channel::<ScanEvent>(16);
        let (decoded_tx, decoded_rx) = mpsc::unbounded_channel::<(u64, ScanEvent)>();
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());

        let camera = CameraResource::new(driver, config.camera_retry_delay);

        let session = ScanSession {
            id: Uuid::new_v4(),
            config,
            camera,
            engine,
            commands: command_rx,
            status_tx,
            scan_tx,
            decoded_tx,
            decoded_rx,
            generation: 0,
            preflight_done: false,
        };

        // Spawn background task
        tokio::spawn(session.run());

        let handle = SessionHandle {
            commands: command_tx,
            status: status_rx,
        };

        (handle, scan_rx)
    }

    /// Main session loop.
    async fn run(mut self) {
        info!(session = %self.id, "Scan session task starting");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                // The session keeps its own sender clone, so this channel
                // never closes while the task lives.
                Some((generation, event)) = self.decoded_rx.recv() => {
                    self.on_decoded(generation, event).await;
                }
            }
        }

        info!(session = %self.id, "Scan session task stopped");
    }

    /// Acts on one command. Returns false when the task should exit.
    async fn handle_command(&mut self, cmd: Option<SessionCommand>) -> bool {
        match cmd {
            Some(SessionCommand::Start) => {
                let state = self.state();
                match state {
                    SessionState::Idle | SessionState::Stopped | SessionState::Error => {
                        self.start_session().await
                    }
                    SessionState::Initializing | SessionState::Active => {
                        debug!(%state, "Start request ignored");
                        true
                    }
                }
            }
            Some(SessionCommand::Stop { ack }) => {
                self.teardown(SessionState::Stopped, None).await;
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                true
            }
            Some(SessionCommand::Shutdown { ack }) => {
                self.teardown(SessionState::Stopped, None).await;
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                false
            }
            // Every handle dropped: unconditional teardown.
            None => {
                self.teardown(SessionState::Stopped, None).await;
                false
            }
        }
    }

    /// Runs the initialization sequence, staying responsive to Stop and
    /// Shutdown the whole time (the permission prompt may block
    /// indefinitely). Returns false when a shutdown interrupted it.
    async fn start_session(&mut self) -> bool {
        if self.camera.is_held() {
            // Start is only legal with no open handle; a held handle here
            // means a teardown was skipped somewhere.
            warn!("Start requested with a camera handle still open, ignoring");
            return true;
        }

        self.generation += 1;
        self.publish(SessionState::Initializing, None);
        info!(session = %self.id, generation = self.generation, "Session initializing");

        let generation = self.generation;

        // The init future borrows the camera and engine while the command
        // channel is polled alongside it; the block scopes those borrows so
        // teardown can take `self` again afterwards.
        let outcome = {
            let ScanSession {
                camera,
                engine,
                config,
                commands,
                decoded_tx,
                preflight_done,
                ..
            } = self;

            let init = async {
                if config.permission_preflight && !*preflight_done {
                    match camera.preflight(&config.constraints).await {
                        Ok(()) => {}
                        Err(CameraError::PermissionDenied) => {
                            return Err(SessionError::Camera(CameraError::PermissionDenied));
                        }
                        Err(CameraError::DeviceUnavailable(reason)) => {
                            // A busy device says nothing about permission;
                            // the acquisition below carries the retry policy.
                            warn!(%reason, "Permission preflight hit a busy device, continuing");
                        }
                    }
                    *preflight_done = true;
                }

                // Tolerance for a video target whose layout has not
                // committed yet. Correctness never depends on the exact
                // duration.
                tokio::time::sleep(config.attach_delay).await;

                let handle = camera.acquire(&config.constraints).await?;
                let output = DecodeSender::new(generation, decoded_tx.clone());
                engine
                    .start(handle, &config.decoder, output)
                    .await
                    .map_err(SessionError::from)?;
                Ok(())
            };
            tokio::pin!(init);

            loop {
                tokio::select! {
                    result = &mut init => break InitOutcome::Done(result),
                    cmd = commands.recv() => match cmd {
                        Some(SessionCommand::Start) => {
                            debug!("Start request ignored while initializing");
                        }
                        other => break InitOutcome::Interrupted(other),
                    },
                }
            }
        };

        match outcome {
            InitOutcome::Done(Ok(())) => {
                info!(session = %self.id, generation, "Scan session active");
                self.publish(SessionState::Active, None);
                true
            }
            InitOutcome::Done(Err(err)) => {
                error!(session = %self.id, %err, "Session initialization failed");
                self.teardown(SessionState::Error, Some(err.to_string())).await;
                true
            }
            InitOutcome::Interrupted(cmd) => {
                // Initialization abandoned mid-flight; release whatever was
                // acquired before acting on the command.
                let exiting = matches!(cmd, Some(SessionCommand::Shutdown { .. }) | None);
                info!(session = %self.id, exiting, "Initialization interrupted");
                self.teardown(SessionState::Stopped, None).await;
                match cmd {
                    Some(SessionCommand::Stop { ack })
                    | Some(SessionCommand::Shutdown { ack }) => {
                        if let Some(ack) = ack {
                            let _ = ack.send(());
                        }
                    }
                    _ => {}
                }
                !exiting
            }
        }
    }

    /// Handles one decode delivery from the engine's workers.
    async fn on_decoded(&mut self, generation: u64, event: ScanEvent) {
        let state = self.state();
        if generation != self.generation || state != SessionState::Active {
            // Late callback from a stopped or restarted session.
            debug!(
                delivered = generation,
                current = self.generation,
                %state,
                "Ignoring stale decode delivery"
            );
            return;
        }

        info!(session = %self.id, code = %event.code, "Barcode accepted");
        if self.scan_tx.send(event).await.is_err() {
            warn!("Scan event receiver dropped, discarding code");
        }

        // One accepted code per start: release the camera immediately
        // rather than keep decoding frames nobody will consume.
        self.teardown(SessionState::Stopped, None).await;
    }

    /// Stops the engine, releases the camera, and publishes `next` — all
    /// within the current transition.
    async fn teardown(&mut self, next: SessionState, last_error: Option<String>) {
        // stop() is a request; anything still in flight is filtered by
        // generation/state checks in on_decoded.
        self.engine.stop().await;
        self.camera.release();
        self.publish(next, last_error);
    }

    fn publish(&self, state: SessionState, last_error: Option<String>) {
        self.status_tx.send_modify(|status| {
            status.state = state;
            status.generation = self.generation;
            status.last_error = last_error;
        });
    }

    fn state(&self) -> SessionState {
        self.status_tx.borrow().state
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
