//! Shared, reconnecting WebSocket channel for run-status events.
//!
//! One [`RunChannel`] instance serves a whole session: every project and run
//! page registers its callback here instead of opening its own socket. The
//! backend pushes run-lifecycle events on `ws(s)://<host>/ws/general`; each
//! inbound JSON payload carrying a `run_id` is routed to the callback
//! currently registered for that run, regardless of the event kind inside.
//!
//! Connection lifecycle:
//!
//! - open: connectivity flag set, any pending reconnect timer cancelled
//! - clean close (code 1000): no reconnect
//! - unclean close (any other code, dial failure, stream error): one
//!   reconnect attempt after a fixed delay, with at most one timer pending
//!
//! Registrations survive a disconnect locally, but no subscribe frames are
//! re-sent to the server after a reconnect; callers that must not miss
//! events across a drop need to re-subscribe themselves.
//!
//! Callbacks run synchronously on the read loop, so they must be quick and
//! must not block.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use super::event::{self, ControlMessage};
use crate::types::RunId;

/// Close code for a deliberate, clean shutdown. Never triggers reconnection.
const CLOSE_NORMAL: u16 = 1000;
/// Close code substituted when the stream ends without a close frame.
const CLOSE_ABNORMAL: u16 = 1006;

/// Callback invoked with every payload routed to its run id.
pub type RunCallback = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Transport configuration for the run channel.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// WebSocket endpoint, e.g. `wss://backend.example.com/ws/general`.
    pub endpoint: String,
    /// Delay before the single reconnect attempt after an unclean close.
    pub reconnect_delay: Duration,
}

impl ChannelConfig {
    pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_delay: Self::DEFAULT_RECONNECT_DELAY,
        }
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Frames queued for the socket writer task.
enum ControlFrame {
    Text(String),
    Close,
}

struct ChannelState {
    config: ChannelConfig,
    connected: AtomicBool,
    callbacks: Mutex<FxHashMap<RunId, RunCallback>>,
    /// Sender/receiver pair for outbound control frames; the receiver side is
    /// drained by the writer task of the current connection.
    control_channel: (flume::Sender<ControlFrame>, flume::Receiver<ControlFrame>),
    reconnect: Mutex<Option<JoinHandle<()>>>,
    socket_task: Mutex<Option<JoinHandle<()>>>,
    reconnects_scheduled: AtomicU64,
}

impl ChannelState {
    /// Handshake succeeded: flip connectivity on and cancel a pending timer.
    fn mark_open(&self) {
        self.connected.store(true, Ordering::SeqCst);
        if let Some(timer) = self.reconnect.lock().unwrap().take() {
            timer.abort();
        }
    }

    /// Socket-level error: connectivity goes false, reconnection is left to
    /// the close event that follows.
    fn handle_error(&self, error: impl fmt::Display) {
        self.connected.store(false, Ordering::SeqCst);
        tracing::warn!(%error, "run channel socket error");
    }

    /// Close event. Clean closes (1000) end the channel quietly; anything
    /// else schedules the single reconnect attempt.
    fn handle_close(self: &Arc<Self>, code: u16) {
        self.connected.store(false, Ordering::SeqCst);
        if code == CLOSE_NORMAL {
            tracing::debug!("run channel closed cleanly");
            return;
        }
        tracing::info!(code, "run channel closed uncleanly, scheduling reconnect");
        self.schedule_reconnect();
    }

    /// Schedule one reconnect after the configured delay. A pending timer is
    /// never duplicated.
    fn schedule_reconnect(self: &Arc<Self>) {
        let mut pending = self.reconnect.lock().unwrap();
        if pending.as_ref().is_some_and(|timer| !timer.is_finished()) {
            return;
        }
        let attempt = self.reconnects_scheduled.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(attempt, "reconnect timer armed");
        let state = Arc::clone(self);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(state.config.reconnect_delay).await;
            spawn_connection(&state);
        }));
    }

    fn has_pending_reconnect(&self) -> bool {
        self.reconnect
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Parse and route one inbound frame. Malformed payloads are logged and
    /// dropped; the connection stays open.
    fn handle_message(&self, raw: &str) {
        let payload: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "dropping malformed run channel payload");
                return;
            }
        };

        if let Some(run_id) = event::run_id_of(&payload) {
            let callback = self.callbacks.lock().unwrap().get(&run_id).cloned();
            match callback {
                Some(callback) => callback(&payload),
                None => tracing::trace!(%run_id, "run event with no registered subscriber"),
            }
        } else if event::is_pong(&payload) {
            tracing::trace!("liveness pong received");
        } else {
            tracing::debug!("ignoring payload without run_id");
        }
    }

    /// Best-effort send of a control frame; only attempted while open.
    fn send_control(&self, message: &ControlMessage) {
        if !self.connected.load(Ordering::SeqCst) {
            return;
        }
        if self
            .control_channel
            .0
            .send(ControlFrame::Text(message.frame()))
            .is_err()
        {
            tracing::debug!("control frame dropped, writer task gone");
        }
    }
}

/// Drive one connection: dial, pump frames, and report the close outcome.
fn spawn_connection(state: &Arc<ChannelState>) {
    let mut socket_task = state.socket_task.lock().unwrap();
    if let Some(previous) = socket_task.take() {
        previous.abort();
    }
    let state = Arc::clone(state);
    *socket_task = Some(tokio::spawn(async move {
        let stream = match connect_async(state.config.endpoint.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(error) => {
                tracing::warn!(%error, endpoint = %state.config.endpoint, "run channel dial failed");
                // A failed dial behaves like an unclean close so the single
                // reconnect timer still covers a backend that is down.
                state.handle_close(CLOSE_ABNORMAL);
                return;
            }
        };

        state.mark_open();
        tracing::info!(endpoint = %state.config.endpoint, "run channel connected");

        let (mut write, mut read) = stream.split();
        let control_rx = state.control_channel.1.clone();
        let writer = tokio::spawn(async move {
            while let Ok(frame) = control_rx.recv_async().await {
                match frame {
                    ControlFrame::Text(text) => {
                        if write.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    ControlFrame::Close => {
                        let _ = write
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "client closing".into(),
                            })))
                            .await;
                        break;
                    }
                }
            }
        });

        let mut close_code = CLOSE_ABNORMAL;
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => state.handle_message(text.as_str()),
                Ok(Message::Close(frame)) => {
                    close_code = frame
                        .map(|frame| u16::from(frame.code))
                        .unwrap_or(CLOSE_ABNORMAL);
                    break;
                }
                Ok(_) => {}
                Err(error) => {
                    state.handle_error(&error);
                    break;
                }
            }
        }

        writer.abort();
        state.handle_close(close_code);
    }));
}

/// One shared, reconnecting transport for server-pushed run-status events.
///
/// Constructed once by the application's composition root and shared via
/// `Arc`; see the module docs for the lifecycle.
pub struct RunChannel {
    state: Arc<ChannelState>,
}

impl RunChannel {
    #[must_use]
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            state: Arc::new(ChannelState {
                config,
                connected: AtomicBool::new(false),
                callbacks: Mutex::new(FxHashMap::default()),
                control_channel: flume::unbounded(),
                reconnect: Mutex::new(None),
                socket_task: Mutex::new(None),
                reconnects_scheduled: AtomicU64::new(0),
            }),
        }
    }

    /// Open the shared connection, discarding any previous connection task.
    pub fn connect(&self) {
        spawn_connection(&self.state);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    /// True while a reconnect timer is armed but has not fired.
    #[must_use]
    pub fn has_pending_reconnect(&self) -> bool {
        self.state.has_pending_reconnect()
    }

    /// Register the callback for a run id, replacing any previous one
    /// (last-registered-wins). If the connection is open, a subscribe control
    /// frame is sent best-effort; either way the registration is kept locally
    /// so matching events are dispatched once they arrive.
    pub fn subscribe_to_run(&self, run_id: &RunId, callback: RunCallback) {
        self.state
            .callbacks
            .lock()
            .unwrap()
            .insert(run_id.clone(), callback);
        self.state.send_control(&ControlMessage::Subscribe {
            run_id: run_id.clone(),
        });
    }

    /// Drop the local callback for a run id and, if open, tell the server.
    pub fn unsubscribe_from_run(&self, run_id: &RunId) {
        self.state.callbacks.lock().unwrap().remove(run_id);
        self.state.send_control(&ControlMessage::Unsubscribe {
            run_id: run_id.clone(),
        });
    }

    /// Request a clean close (code 1000). The resulting close event does not
    /// schedule a reconnect. Also disarms a pending reconnect timer so a
    /// deliberate shutdown stays shut.
    pub fn close(&self) {
        if let Some(timer) = self.state.reconnect.lock().unwrap().take() {
            timer.abort();
        }
        let _ = self.state.control_channel.0.send(ControlFrame::Close);
    }
}

impl Drop for RunChannel {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.state.reconnect.lock() {
            if let Some(timer) = timer.take() {
                timer.abort();
            }
        }
        if let Ok(mut task) = self.state.socket_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn channel() -> RunChannel {
        RunChannel::new(ChannelConfig::new("ws://localhost:9/ws/general"))
    }

    fn counting_callback() -> (RunCallback, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let callback: RunCallback = Arc::new(move |_payload| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (callback, hits)
    }

    #[tokio::test]
    async fn unclean_closes_arm_at_most_one_reconnect_timer() {
        let channel = channel();
        for _ in 0..5 {
            channel.state.handle_close(1001);
        }
        assert!(channel.has_pending_reconnect());
        assert_eq!(
            channel.state.reconnects_scheduled.load(Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn clean_close_never_schedules_a_reconnect() {
        let channel = channel();
        channel.state.handle_close(1000);
        assert!(!channel.has_pending_reconnect());
        assert_eq!(
            channel.state.reconnects_scheduled.load(Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn successful_open_cancels_the_pending_timer() {
        let channel = channel();
        channel.state.handle_close(1006);
        assert!(channel.has_pending_reconnect());

        channel.state.mark_open();
        assert!(channel.is_connected());
        assert!(!channel.has_pending_reconnect());
    }

    #[tokio::test]
    async fn events_route_by_run_id_only() {
        let channel = channel();
        let (callback_a, hits_a) = counting_callback();
        let (callback_b, hits_b) = counting_callback();
        channel.subscribe_to_run(&"A".into(), callback_a);
        channel.subscribe_to_run(&"B".into(), callback_b);

        channel
            .state
            .handle_message(&json!({"run_id": "A", "status": "running"}).to_string());

        assert_eq!(hits_a.load(Ordering::SeqCst), 1);
        assert_eq!(hits_b.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn subscribed_callback_fires_exactly_once_per_event() {
        let channel = channel();
        let payloads: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&payloads);
        channel.subscribe_to_run(
            &"r1".into(),
            Arc::new(move |payload| {
                sink.lock().unwrap().push(payload.clone());
            }),
        );

        channel
            .state
            .handle_message(&json!({"run_id": "r1", "status": "succeeded"}).to_string());

        let seen = payloads.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["status"], "succeeded");
    }

    #[tokio::test]
    async fn last_registered_callback_wins_per_run_id() {
        let channel = channel();
        let (first, first_hits) = counting_callback();
        let (second, second_hits) = counting_callback();
        channel.subscribe_to_run(&"r1".into(), first);
        channel.subscribe_to_run(&"r1".into(), second);

        channel
            .state
            .handle_message(&json!({"run_id": "r1"}).to_string());

        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_dispatch() {
        let channel = channel();
        let (callback, hits) = counting_callback();
        channel.subscribe_to_run(&"r1".into(), callback);
        channel.unsubscribe_from_run(&"r1".into());

        channel
            .state
            .handle_message(&json!({"run_id": "r1"}).to_string());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_and_control_payloads_are_swallowed() {
        let channel = channel();
        let (callback, hits) = counting_callback();
        channel.subscribe_to_run(&"r1".into(), callback);

        channel.state.handle_message("not json at all {{{");
        channel.state.handle_message(&json!({"type": "pong"}).to_string());
        channel
            .state
            .handle_message(&json!({"type": "noise", "detail": 1}).to_string());

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        // The channel remains usable afterwards.
        channel
            .state
            .handle_message(&json!({"run_id": "r1"}).to_string());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn control_frames_are_queued_only_while_open() {
        let channel = channel();
        let (callback, _hits) = counting_callback();

        channel.subscribe_to_run(&"r1".into(), Arc::clone(&callback));
        assert!(channel.state.control_channel.1.try_recv().is_err());

        channel.state.mark_open();
        channel.subscribe_to_run(&"r2".into(), callback);
        let frame = channel.state.control_channel.1.try_recv();
        match frame {
            Ok(ControlFrame::Text(text)) => {
                let value: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["type"], "subscribe");
                assert_eq!(value["run_id"], "r2");
            }
            _ => panic!("expected a queued subscribe frame"),
        }
    }

    #[tokio::test]
    async fn error_marks_disconnected_without_scheduling_reconnect() {
        let channel = channel();
        channel.state.mark_open();
        channel.state.handle_error("connection reset by peer");
        assert!(!channel.is_connected());
        assert!(!channel.has_pending_reconnect());
    }
}
