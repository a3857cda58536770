//! Loopback transport tests: a scripted WebSocket server on 127.0.0.1
//! drives the session through connect, frame delivery, reconnect and
//! permanent failure.

use futures_util::{SinkExt, StreamExt};
use livetail_core::{
    ChannelTarget, ConnectionState, LogChannel, SessionEvent, SessionHandle, SessionOptions,
    StreamFilters,
};
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Bind a listener on a free port; the std socket is handed to the server
/// thread's runtime so the address is known before the session opens.
fn bind_listener() -> (std::net::TcpListener, SocketAddr) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind listener");
    listener
        .set_nonblocking(true)
        .expect("failed to set nonblocking");
    let addr = listener.local_addr().expect("failed to read local addr");
    (listener, addr)
}

fn target_for(addr: SocketAddr) -> ChannelTarget {
    ChannelTarget::new(
        &format!("ws://{addr}"),
        LogChannel::Container {
            project: "demo".to_string(),
            environment: "staging".to_string(),
            container: "api".to_string(),
        },
        StreamFilters::default(),
    )
    .expect("failed to build target")
}

fn fast_options() -> SessionOptions {
    SessionOptions {
        max_attempts: 3,
        base_delay: Duration::from_millis(50),
    }
}

/// Poll the session until the predicate holds or the deadline passes;
/// everything received lands in `events`.
fn drain_until(
    session: &mut SessionHandle,
    events: &mut Vec<SessionEvent>,
    timeout: Duration,
    done: impl Fn(&[SessionEvent]) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        while let Some(event) = session.try_next_event() {
            events.push(event);
        }
        if done(events) {
            return true;
        }
        if Instant::now() > deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

fn frames(events: &[SessionEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Frame(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn state_labels(events: &[SessionEvent]) -> Vec<&'static str> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::StateChanged(state) => Some(state.label()),
            _ => None,
        })
        .collect()
}

fn has_frame(events: &[SessionEvent], wanted: &str) -> bool {
    frames(events).contains(&wanted)
}

fn server_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build server runtime")
}

#[test]
fn frames_arrive_in_send_order_after_connect() {
    let (listener, addr) = bind_listener();

    let server = thread::spawn(move || {
        server_runtime().block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("from_std");
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            ws.send(Message::Text("one".into())).await.expect("send");
            ws.send(Message::Text("two".into())).await.expect("send");
            ws.send(Message::Text(
                r#"{"level":"error","message":"boom"}"#.into(),
            ))
            .await
            .expect("send");
            // hold the socket until the client closes
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });
    });

    let mut session = SessionHandle::open_with(&target_for(addr), fast_options());
    let mut events = Vec::new();
    let arrived = drain_until(&mut session, &mut events, Duration::from_secs(5), |seen| {
        frames(seen).len() == 3
    });
    assert!(arrived, "frames did not arrive: {events:?}");

    assert_eq!(events[0], SessionEvent::StateChanged(ConnectionState::Connecting));
    assert_eq!(events[1], SessionEvent::StateChanged(ConnectionState::Connected));
    assert_eq!(
        frames(&events),
        vec!["one", "two", r#"{"level":"error","message":"boom"}"#]
    );
    assert!(!state_labels(&events).contains(&"reconnecting"));

    session.stop();
    server.join().expect("server thread panicked");
}

#[test]
fn abnormal_close_schedules_a_retry_and_reconnects() {
    let (listener, addr) = bind_listener();

    let server = thread::spawn(move || {
        server_runtime().block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("from_std");

            // first connection dies without a close handshake
            let (stream, _) = listener.accept().await.expect("accept #1");
            let mut ws = accept_async(stream).await.expect("handshake #1");
            ws.send(Message::Text("before".into())).await.expect("send");
            drop(ws);

            // the session comes back on its own
            let (stream, _) = listener.accept().await.expect("accept #2");
            let mut ws = accept_async(stream).await.expect("handshake #2");
            ws.send(Message::Text("after".into())).await.expect("send");
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });
    });

    let mut session = SessionHandle::open_with(&target_for(addr), fast_options());
    let mut events = Vec::new();
    let reconnected = drain_until(&mut session, &mut events, Duration::from_secs(5), |seen| {
        has_frame(seen, "after")
    });
    assert!(reconnected, "never saw the second connection: {events:?}");

    assert_eq!(frames(&events), vec!["before", "after"]);
    let retrying = events.iter().any(|event| {
        matches!(
            event,
            SessionEvent::StateChanged(ConnectionState::Retrying { attempt: 1, .. })
        )
    });
    assert!(retrying, "no first-attempt retry state: {events:?}");
    assert_eq!(
        state_labels(&events),
        vec!["connecting", "connected", "reconnecting", "connecting", "connected"]
    );

    session.stop();
    server.join().expect("server thread panicked");
}

#[test]
fn third_consecutive_failure_is_permanent() {
    // bind, read the port, drop: connections get refused from here on
    let (listener, addr) = bind_listener();
    drop(listener);

    let mut session = SessionHandle::open_with(&target_for(addr), fast_options());
    let mut events = Vec::new();
    let failed = drain_until(&mut session, &mut events, Duration::from_secs(5), |seen| {
        seen.iter().any(|event| {
            matches!(
                event,
                SessionEvent::StateChanged(ConnectionState::PermanentlyFailed { .. })
            )
        })
    });
    assert!(failed, "never went permanent: {events:?}");

    assert_eq!(
        state_labels(&events),
        vec![
            "connecting",
            "reconnecting",
            "connecting",
            "reconnecting",
            "connecting",
            "failed"
        ]
    );
    let attempts: Vec<u32> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::StateChanged(ConnectionState::Retrying { attempt, .. }) => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);

    // the worker is done; no fourth attempt ever shows up
    thread::sleep(Duration::from_millis(300));
    assert!(session.try_next_event().is_none());
    session.stop();
}

#[test]
fn stop_cancels_a_pending_retry() {
    let (listener, addr) = bind_listener();
    drop(listener);

    // long backoff: after the first refusal the worker sits in its timer
    let options = SessionOptions {
        max_attempts: 3,
        base_delay: Duration::from_secs(30),
    };
    let mut session = SessionHandle::open_with(&target_for(addr), options);
    let mut events = Vec::new();
    let retrying = drain_until(&mut session, &mut events, Duration::from_secs(5), |seen| {
        state_labels(seen).contains(&"reconnecting")
    });
    assert!(retrying, "never reached the retry state: {events:?}");

    // stop must interrupt the 30s sleep, not wait it out
    let started = Instant::now();
    session.stop();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn stop_closes_cleanly_and_never_reconnects() {
    let (listener, addr) = bind_listener();
    let (report_tx, report_rx) = std::sync::mpsc::channel();

    let server = thread::spawn(move || {
        server_runtime().block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("from_std");
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            ws.send(Message::Text("hello".into())).await.expect("send");

            let mut saw_close = false;
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    saw_close = true;
                    break;
                }
            }

            // a stopped session must not come back
            let came_back =
                tokio::time::timeout(Duration::from_millis(300), listener.accept())
                    .await
                    .is_ok();
            report_tx.send((saw_close, came_back)).expect("report");
        });
    });

    let mut session = SessionHandle::open_with(&target_for(addr), fast_options());
    let mut events = Vec::new();
    let connected = drain_until(&mut session, &mut events, Duration::from_secs(5), |seen| {
        has_frame(seen, "hello")
    });
    assert!(connected, "never connected: {events:?}");

    session.stop();

    let (saw_close, came_back) = report_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("server never reported");
    assert!(saw_close, "stop should close the socket cleanly");
    assert!(!came_back, "a stopped session reconnected");
    server.join().expect("server thread panicked");
}
