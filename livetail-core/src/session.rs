use crate::connection::{ConnectionMachine, ConnectionState};
use crate::target::ChannelTarget;
use futures_util::{SinkExt, StreamExt};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use url::Url;

/// What a session pushes to its owner. `Frame`s arrive in exactly the
/// order the socket delivered them; the channel is unbounded so the
/// transport never buffers or drops on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    Frame(String),
}

/// Tuning knobs for the reconnect loop. Tests shrink the delay; the
/// defaults implement the 2s/4s backoff with the third failure permanent.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// One push connection, owned by value.
///
/// Each `open` starts a fresh worker thread with its own single-threaded
/// runtime driving the reconnect loop. `stop` (or drop) signals the worker
/// and joins it: when it returns, the socket is gone and no retry timer is
/// pending. A stopped session never reconnects.
pub struct SessionHandle {
    events: UnboundedReceiver<SessionEvent>,
    stop: watch::Sender<bool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SessionHandle {
    pub fn open(target: &ChannelTarget) -> Self {
        Self::open_with(target, SessionOptions::default())
    }

    pub fn open_with(target: &ChannelTarget, options: SessionOptions) -> Self {
        let url = target.url();
        let (events_tx, events_rx) = unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let thread_events = events_tx.clone();
        let spawned = thread::Builder::new()
            .name("livetail-session".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(error) => {
                        log::error!("session runtime failed to start: {error}");
                        emit(
                            &thread_events,
                            ConnectionState::PermanentlyFailed {
                                reason: format!("runtime: {error}"),
                            },
                        );
                        return;
                    }
                };
                runtime.block_on(run_session(url, options, thread_events, stop_rx));
            });

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(error) => {
                log::error!("session thread failed to spawn: {error}");
                emit(
                    &events_tx,
                    ConnectionState::PermanentlyFailed {
                        reason: format!("session thread: {error}"),
                    },
                );
                None
            }
        };

        Self {
            events: events_rx,
            stop: stop_tx,
            worker,
        }
    }

    /// non-blocking drain hook for the owner's pump
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// signal the worker and wait for it; nothing can fire afterwards
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop.send(true);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(events: UnboundedReceiver<SessionEvent>) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            events,
            stop,
            worker: None,
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn emit(events: &UnboundedSender<SessionEvent>, state: ConnectionState) {
    log::debug!("session state -> {}", state.label());
    let _ = events.send(SessionEvent::StateChanged(state));
}

/// The whole connect/read/backoff loop. Every await point also selects on
/// the stop signal, so teardown interrupts a handshake, an open socket
/// and a pending backoff timer alike.
async fn run_session(
    url: Url,
    options: SessionOptions,
    events: UnboundedSender<SessionEvent>,
    mut stop: watch::Receiver<bool>,
) {
    let mut machine = ConnectionMachine::new(options.max_attempts, options.base_delay);
    loop {
        emit(&events, machine.connect_started());
        let connected = tokio::select! {
            _ = stop.wait_for(|stopped| *stopped) => return,
            connected = connect_async(url.as_str()) => connected,
        };
        let mut socket = match connected {
            Ok((socket, _response)) => socket,
            Err(error) => {
                if wait_out_loss(&mut machine, &events, &mut stop, format!("connect failed: {error}")).await {
                    continue;
                }
                return;
            }
        };
        emit(&events, machine.connection_opened());

        let reason = loop {
            tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => {
                    // deliberate stop: close the socket and end the loop
                    // without consulting the retry policy
                    let _ = socket.send(Message::Close(None)).await;
                    let _ = socket.flush().await;
                    return;
                }
                incoming = socket.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(SessionEvent::Frame(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        // the platform sends text frames; tolerate binary
                        let _ = events.send(SessionEvent::Frame(
                            String::from_utf8_lossy(&bytes).into_owned(),
                        ));
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = socket.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => break close_reason(frame),
                    Some(Err(error)) => break format!("socket error: {error}"),
                    None => break "connection closed".to_string(),
                },
            }
        };

        if !wait_out_loss(&mut machine, &events, &mut stop, reason).await {
            return;
        }
    }
}

/// Registers the loss, emits the resulting state and waits out the
/// backoff. Returns false when the loop must end: the machine gave up or
/// teardown cancelled the pending retry.
async fn wait_out_loss(
    machine: &mut ConnectionMachine,
    events: &UnboundedSender<SessionEvent>,
    stop: &mut watch::Receiver<bool>,
    reason: String,
) -> bool {
    log::warn!("connection lost: {reason}");
    let state = machine.connection_lost(reason, Instant::now());
    emit(events, state.clone());
    match state {
        ConnectionState::Retrying {
            next_attempt_at, ..
        } => {
            let delay = next_attempt_at.saturating_duration_since(Instant::now());
            tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => false,
                _ = tokio::time::sleep(delay) => true,
            }
        }
        _ => false,
    }
}

fn close_reason(frame: Option<CloseFrame>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!("closed by server: {} ({})", frame.reason, frame.code)
        }
        Some(frame) => format!("closed by server ({})", frame.code),
        None => "closed by server".to_string(),
    }
}
