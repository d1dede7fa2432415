// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end session lifecycle over loopback TCP: handshake, application
//! traffic, heartbeat exchange, orderly logout.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hfix::parser::ParsedMessage;
use hfix::MessageStore;
use hfix::session::{Session, SessionConfig, SessionHandler, SessionState};
use hfix::store::MemoryStore;
use hfix::transport::{TcpConfig, TcpListener, TcpTransport};
use hfix::types::tag;

#[derive(Default)]
struct Collector {
    app: Arc<Mutex<Vec<(u32, Vec<u8>)>>>,
    logons: Arc<Mutex<usize>>,
    logouts: Arc<Mutex<usize>>,
}

impl Collector {
    fn shareable(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            logons: Arc::clone(&self.logons),
            logouts: Arc::clone(&self.logouts),
        }
    }
}

impl SessionHandler for Collector {
    fn on_app_message(&mut self, msg: &ParsedMessage<'_>) {
        self.app.lock().expect("collector lock").push((
            msg.msg_seq_num().unwrap_or(0),
            msg.msg_type_bytes().to_vec(),
        ));
    }

    fn on_logon(&mut self) {
        *self.logons.lock().expect("collector lock") += 1;
    }

    fn on_logout(&mut self, _reason: &[u8]) {
        *self.logouts.lock().expect("collector lock") += 1;
    }
}

type LoopbackSession = Session<MemoryStore, TcpTransport, Collector>;

fn loopback_sessions() -> (LoopbackSession, LoopbackSession, Collector, Collector) {
    let config = TcpConfig::default();
    let mut listener =
        TcpListener::bind("127.0.0.1:0".parse().expect("addr")).expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");

    let client_transport = TcpTransport::connect(addr, &config).expect("connect");
    let server_transport = listener
        .accept(Duration::from_secs(5), &config)
        .expect("accept");

    let client_events = Collector::default();
    let server_events = Collector::default();
    let now = Instant::now();

    let client = Session::new(
        SessionConfig::new("CLIENT", "SERVER"),
        MemoryStore::new(),
        client_transport,
        client_events.shareable(),
        now,
    );
    let server = Session::new(
        SessionConfig::new("SERVER", "CLIENT"),
        MemoryStore::new(),
        server_transport,
        server_events.shareable(),
        now,
    );
    (client, server, client_events, server_events)
}

/// Pump both sessions until `done` holds or the deadline passes.
fn pump_until(
    client: &mut LoopbackSession,
    server: &mut LoopbackSession,
    mut done: impl FnMut(&LoopbackSession, &LoopbackSession) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        let now = Instant::now();
        let _ = client.pump(now);
        let _ = server.pump(now);
        if done(client, server) {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("condition not reached before deadline");
}

#[test]
fn handshake_traffic_and_logout() {
    let (mut client, mut server, client_events, server_events) = loopback_sessions();

    // Handshake: client initiates, server accepts and echoes Logon.
    client.connect(Instant::now()).expect("client logon");
    pump_until(&mut client, &mut server, |c, s| {
        c.state() == SessionState::Active && s.state() == SessionState::Active
    });
    assert_eq!(*client_events.logons.lock().expect("lock"), 1);
    assert_eq!(*server_events.logons.lock().expect("lock"), 1);

    // Application round trip: order up, execution report back.
    client
        .send_app(b"D", Instant::now(), |b| {
            b.field_bytes(tag::CL_ORD_ID, b"ORD1");
            b.field_bytes(tag::SYMBOL, b"AAPL");
            b.field_char(tag::SIDE, b'1');
            b.field_bytes(tag::ORDER_QTY, b"100");
            b.field_char(tag::ORD_TYPE, b'2');
            b.field_bytes(tag::PRICE, b"150.25");
        })
        .expect("send order");
    pump_until(&mut client, &mut server, |_, _| {
        !server_events.app.lock().expect("lock").is_empty()
    });
    {
        let received = server_events.app.lock().expect("lock");
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1, b"D".to_vec());
    }

    server
        .send_app(b"8", Instant::now(), |b| {
            b.field_bytes(tag::ORDER_ID, b"X1");
            b.field_bytes(tag::EXEC_ID, b"E1");
            b.field_char(tag::EXEC_TYPE, b'0');
            b.field_char(tag::ORD_STATUS, b'0');
            b.field_bytes(tag::SYMBOL, b"AAPL");
            b.field_char(tag::SIDE, b'1');
            b.field_bytes(tag::LEAVES_QTY, b"100");
            b.field_bytes(tag::CUM_QTY, b"0");
        })
        .expect("send execution report");
    pump_until(&mut client, &mut server, |_, _| {
        !client_events.app.lock().expect("lock").is_empty()
    });
    assert_eq!(
        client_events.app.lock().expect("lock")[0].1,
        b"8".to_vec()
    );

    // Orderly logout initiated by the client.
    client.disconnect(Instant::now()).expect("logout");
    assert_eq!(client.state(), SessionState::LogoutSent);
    pump_until(&mut client, &mut server, |c, s| {
        c.state() == SessionState::Disconnected && s.state() == SessionState::Disconnected
    });
    assert!(*client_events.logouts.lock().expect("lock") >= 1);
    assert!(*server_events.logouts.lock().expect("lock") >= 1);
}

#[test]
fn outbound_messages_are_stored_densely() {
    let (mut client, mut server, _client_events, server_events) = loopback_sessions();
    client.connect(Instant::now()).expect("client logon");
    pump_until(&mut client, &mut server, |c, s| {
        c.state() == SessionState::Active && s.state() == SessionState::Active
    });

    for i in 0..10u32 {
        client
            .send_app(b"D", Instant::now(), |b| {
                b.field_bytes(tag::CL_ORD_ID, format!("ORD{i}").as_bytes());
                b.field_bytes(tag::SYMBOL, b"AAPL");
                b.field_char(tag::SIDE, b'1');
            })
            .expect("send order");
    }
    pump_until(&mut client, &mut server, |_, _| {
        server_events.app.lock().expect("lock").len() == 10
    });

    // Store density: every outbound sequence up to the max is present.
    let max = client.store().max_outbound_sent();
    assert!(max >= 11, "logon + 10 orders");
    for seq in 1..=max {
        assert!(
            client.store().retrieve(seq).is_some(),
            "store must be dense at {seq}"
        );
    }

    // The application saw strictly increasing inbound sequence numbers.
    let received = server_events.app.lock().expect("lock");
    let seqs: Vec<u32> = received.iter().map(|(seq, _)| *seq).collect();
    for window in seqs.windows(2) {
        assert!(window[0] < window[1], "inbound sequence must be monotonic");
    }
}
