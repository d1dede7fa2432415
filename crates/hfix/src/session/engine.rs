// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session engine: logon handshake, heartbeats, sequence accounting,
//! gap recovery, and resend service.
//!
//! The engine owns its store and transport and is driven from outside:
//! `pump` drains the transport, `on_timer` fires the heartbeat and
//! test-request schedule, both against an explicit `Instant` so tests run
//! on a simulated clock. The engine never spawns threads and never blocks
//! outside bounded send retries.
//!
//! Outbound invariant: a message is persisted to the store before any
//! byte of it reaches the transport.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant, SystemTime};

use crate::config::{
    DEFAULT_HEARTBEAT_SECS, FATAL_SILENCE_INTERVALS, TEST_REQUEST_DEN, TEST_REQUEST_NUM,
};
use crate::error::{Error, Result};
use crate::parser::{frame_length, ParseError, ParsedMessage, ResendRequest, SequenceReset};
use crate::protocol::{MessageBuilder, TimestampFormatter};
use crate::rt::WaitStrategy;
use crate::scan::SOH;
use crate::store::MessageStore;
use crate::transport::{RecvOutcome, Transport};
use crate::types::{tag, FixVersion, MsgType};
use crate::util::wall_clock_ns;

use super::state::SessionState;

/// Receive chunk pulled from the transport per `recv` call.
const RECV_CHUNK: usize = 16 * 1024;

/// Bounded retries for a blocked transport send.
const SEND_RETRY_LIMIT: u32 = 64;

/// Premature (post-gap) messages buffered while a resend is in flight.
const PENDING_LIMIT: usize = 1024;

/// What to do with inbound PossDupFlag=Y duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliverDup {
    /// Drop duplicates silently (default).
    #[default]
    Suppress,
    /// Hand duplicates to the application like any other message.
    Deliver,
}

/// Static configuration of one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Protocol version (BeginString).
    pub version: FixVersion,
    /// Our comp id (tag 49 outbound, tag 56 inbound).
    pub sender_comp_id: String,
    /// Peer comp id (tag 56 outbound, tag 49 inbound).
    pub target_comp_id: String,
    /// Negotiated heartbeat interval.
    pub heartbeat: Duration,
    /// Duplicate delivery knob.
    pub deliver_dup: DeliverDup,
    /// Reset both sequence counters at logon (141=Y).
    pub reset_seq_on_logon: bool,
}

impl SessionConfig {
    /// FIX 4.4 session with a 30 second heartbeat.
    #[must_use]
    pub fn new(sender_comp_id: impl Into<String>, target_comp_id: impl Into<String>) -> Self {
        Self {
            version: FixVersion::Fix44,
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            deliver_dup: DeliverDup::Suppress,
            reset_seq_on_logon: false,
        }
    }
}

/// Application hooks invoked by the engine.
///
/// Default implementations do nothing, so handlers implement only what
/// they care about.
pub trait SessionHandler {
    /// An application message was accepted in sequence order.
    fn on_app_message(&mut self, _msg: &ParsedMessage<'_>) {}

    /// The lifecycle state changed.
    fn on_state_change(&mut self, _from: SessionState, _to: SessionState) {}

    /// The logon handshake completed.
    fn on_logon(&mut self) {}

    /// The session logged out (peer- or self-initiated).
    fn on_logout(&mut self, _reason: &[u8]) {}

    /// A recoverable error was handled in protocol.
    fn on_error(&mut self, _err: &Error) {}
}

/// Handler that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl SessionHandler for NullHandler {}

/// One FIX session over a store and a transport.
pub struct Session<S: MessageStore, T: Transport, H: SessionHandler> {
    config: SessionConfig,
    state: SessionState,
    store: S,
    transport: T,
    handler: H,

    /// Next outbound sequence to assign.
    outbound_seq: AtomicU32,
    expected_inbound: u32,
    /// Highest sequence of the gap that triggered the open ResendRequest.
    resend_high: Option<u32>,
    /// Premature messages held until the gap in front of them fills.
    pending: BTreeMap<u32, Vec<u8>>,

    last_send: Instant,
    last_recv: Instant,
    /// TestReqID we sent and have not seen echoed yet.
    outstanding_test_req: Option<Vec<u8>>,
    test_req_counter: u32,

    recv_buf: Vec<u8>,
    build_buf: Vec<u8>,
    ts: TimestampFormatter,
    send_wait: WaitStrategy,
}

impl<S: MessageStore, T: Transport, H: SessionHandler> Session<S, T, H> {
    /// Create a disconnected session.
    pub fn new(config: SessionConfig, store: S, transport: T, handler: H, now: Instant) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
            store,
            transport,
            handler,
            outbound_seq: AtomicU32::new(1),
            expected_inbound: 1,
            resend_high: None,
            pending: BTreeMap::new(),
            last_send: now,
            last_recv: now,
            outstanding_test_req: None,
            test_req_counter: 0,
            recv_buf: Vec::with_capacity(RECV_CHUNK),
            build_buf: Vec::with_capacity(1024),
            ts: TimestampFormatter::new(),
            send_wait: WaitStrategy::Backoff,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Next inbound sequence the session will accept.
    #[must_use]
    pub fn expected_inbound(&self) -> u32 {
        self.expected_inbound
    }

    /// True while a requested resend range is still outstanding.
    #[must_use]
    pub fn resend_pending(&self) -> bool {
        self.resend_high.is_some()
    }

    /// Message store (administrative queries).
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Transport (tests and diagnostics).
    #[must_use]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Handler (tests and diagnostics).
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initiate the session: send Logon, start the heartbeat schedule.
    pub fn connect(&mut self, now: Instant) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(Error::InvalidState("connect requires Disconnected"));
        }
        if self.config.reset_seq_on_logon {
            self.store.reset()?;
            self.outbound_seq.store(1, Ordering::Relaxed);
            self.expected_inbound = 1;
        }

        let heartbeat_secs = self.config.heartbeat.as_secs() as u32;
        let reset = self.config.reset_seq_on_logon;
        self.send_message(MsgType::Logon.as_bytes(), now, |b| {
            b.field_u32(tag::ENCRYPT_METHOD, 0);
            b.field_u32(tag::HEART_BT_INT, heartbeat_secs);
            if reset {
                b.field_bool(tag::RESET_SEQ_NUM_FLAG, true);
            }
        })?;
        self.last_recv = now;
        self.set_state(SessionState::LogonSent);
        Ok(())
    }

    /// Orderly logout from Active; a second call forces the transport
    /// closed immediately.
    pub fn disconnect(&mut self, now: Instant) -> Result<()> {
        match self.state {
            SessionState::Active => {
                self.send_message(MsgType::Logout.as_bytes(), now, |_| {})?;
                self.set_state(SessionState::LogoutSent);
                Ok(())
            }
            SessionState::Disconnected => Ok(()),
            _ => {
                // Second invocation (or logout from a handshake state):
                // force close.
                self.transport.close()?;
                self.set_state(SessionState::Disconnected);
                Ok(())
            }
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        log::debug!("[Session] state {} -> {}", self.state, next);
        let from = self.state;
        self.state = next;
        self.handler.on_state_change(from, next);
    }

    fn teardown(&mut self, reason: &[u8]) {
        if self.state == SessionState::Disconnected {
            return;
        }
        let _ = self.transport.close();
        self.set_state(SessionState::Disconnected);
        self.resend_high = None;
        self.pending.clear();
        self.outstanding_test_req = None;
        self.handler.on_logout(reason);
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Drive the heartbeat / test-request schedule.
    ///
    /// Call at least a few times per heartbeat interval; an idle interval
    /// emits a Heartbeat, a silent peer escalates TestRequest then fatal
    /// disconnect at twice the interval.
    pub fn on_timer(&mut self, now: Instant) -> Result<()> {
        if self.state != SessionState::Active {
            return Ok(());
        }
        let heartbeat = self.config.heartbeat;

        let silent_for = now.saturating_duration_since(self.last_recv);
        if silent_for >= heartbeat * FATAL_SILENCE_INTERVALS {
            log::warn!(
                "[Session] counterparty silent for {:?} (2x heartbeat), disconnecting",
                silent_for
            );
            self.teardown(b"heartbeat timeout");
            self.handler.on_error(&Error::HeartbeatTimeout);
            return Err(Error::HeartbeatTimeout);
        }
        if silent_for >= heartbeat * TEST_REQUEST_NUM / TEST_REQUEST_DEN
            && self.outstanding_test_req.is_none()
        {
            self.test_req_counter += 1;
            let id = format!("TEST{}", self.test_req_counter).into_bytes();
            self.send_message(MsgType::TestRequest.as_bytes(), now, |b| {
                b.field_bytes(tag::TEST_REQ_ID, &id);
            })?;
            self.outstanding_test_req = Some(id);
        }

        if now.saturating_duration_since(self.last_send) >= heartbeat {
            self.send_message(MsgType::Heartbeat.as_bytes(), now, |_| {})?;
        }
        Ok(())
    }

    // ========================================================================
    // Receive path
    // ========================================================================

    /// Drain the transport until it would block.
    pub fn pump(&mut self, now: Instant) -> Result<()> {
        let mut chunk = [0u8; RECV_CHUNK];
        loop {
            match self.transport.recv(&mut chunk)? {
                RecvOutcome::Data(n) => {
                    self.on_bytes(&chunk[..n], now)?;
                }
                RecvOutcome::WouldBlock => return Ok(()),
                RecvOutcome::Closed => {
                    let was_active = self.state == SessionState::Active;
                    self.teardown(b"peer closed");
                    return if was_active {
                        Err(Error::EndOfStream)
                    } else {
                        Ok(())
                    };
                }
            }
        }
    }

    /// Feed received bytes; complete frames are processed in order.
    pub fn on_bytes(&mut self, data: &[u8], now: Instant) -> Result<()> {
        self.recv_buf.extend_from_slice(data);

        // The buffer is taken out of self so frames can be borrowed while
        // responses are sent through &mut self.
        let buf = std::mem::take(&mut self.recv_buf);
        let mut processed = 0usize;
        let mut failure: Option<Error> = None;

        loop {
            match frame_length(&buf[processed..]) {
                Ok(Some(len)) => {
                    let frame = &buf[processed..processed + len];
                    processed += len;
                    if let Err(err) = self.handle_frame(frame, now) {
                        failure = Some(err);
                        break;
                    }
                    if self.state == SessionState::Disconnected {
                        processed = buf.len();
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    // Framing is lost; nothing downstream can recover it.
                    log::error!("[Session] stream desynchronized: {err:?}");
                    failure = Some(err.into());
                    break;
                }
            }
        }

        self.recv_buf = buf;
        self.recv_buf.drain(..processed);

        if let Some(err) = failure {
            self.handler.on_error(&err);
            self.teardown(b"receive failure");
            return Err(err);
        }
        Ok(())
    }

    fn handle_frame(&mut self, frame: &[u8], now: Instant) -> Result<()> {
        self.last_recv = now;

        let msg = match ParsedMessage::parse(frame) {
            Ok(msg) => msg,
            Err(ParseError::BadChecksum { declared, computed }) => {
                // Framing held (we found the frame boundary), so reject
                // and continue; the inbound sequence does not advance.
                let ref_seq = ParsedMessage::parse_lenient(frame)
                    .ok()
                    .and_then(|m| m.msg_seq_num().ok())
                    .unwrap_or(self.expected_inbound);
                log::warn!(
                    "[Session] checksum mismatch (declared {declared:03}, computed {computed:03}), rejecting seq {ref_seq}"
                );
                self.send_reject(
                    ref_seq,
                    Some(tag::CHECK_SUM),
                    tag::REJECT_REASON_VALUE_INCORRECT,
                    b"checksum mismatch",
                    now,
                )?;
                self.handler
                    .on_error(&Error::BadChecksum { declared, computed });
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let seq = match msg.msg_seq_num() {
            Ok(seq) => seq,
            Err(value_err) => {
                self.send_reject(
                    self.expected_inbound,
                    Some(tag::MSG_SEQ_NUM),
                    tag::REJECT_REASON_BAD_FORMAT,
                    b"MsgSeqNum missing or malformed",
                    now,
                )?;
                self.handler.on_error(&value_err.into());
                return Ok(());
            }
        };

        match self.state {
            SessionState::Disconnected => self.handle_frame_as_acceptor(&msg, seq, now),
            SessionState::LogonSent => self.handle_frame_awaiting_logon(&msg, seq, now),
            SessionState::Active => self.handle_frame_active(&msg, seq, now),
            SessionState::LogoutSent => {
                if msg.msg_type() == MsgType::Logout {
                    self.store.note_inbound(seq);
                    self.teardown(b"logout complete");
                }
                Ok(())
            }
            SessionState::LogonReceived => {
                // Reply Logon is synchronous, so no frame should find us
                // here; treat like Active to be safe.
                self.handle_frame_active(&msg, seq, now)
            }
        }
    }

    /// Acceptor path: first inbound frame while Disconnected must be Logon.
    fn handle_frame_as_acceptor(
        &mut self,
        msg: &ParsedMessage<'_>,
        seq: u32,
        now: Instant,
    ) -> Result<()> {
        if msg.msg_type() != MsgType::Logon {
            log::debug!("[Session] dropping pre-logon frame while Disconnected");
            return Ok(());
        }
        let logon = crate::parser::views::Logon::from_message(msg)
            .ok_or(Error::ProtocolViolation("logon gate"))?;

        if logon.reset_seq_num() {
            self.store.reset()?;
            self.outbound_seq.store(1, Ordering::Relaxed);
            self.expected_inbound = 1;
        }
        if let Ok(peer_interval) = logon.heart_bt_int() {
            self.config.heartbeat = Duration::from_secs(u64::from(peer_interval));
        }

        self.accept_inbound_seq(seq);
        self.set_state(SessionState::LogonReceived);

        let heartbeat_secs = self.config.heartbeat.as_secs() as u32;
        self.send_message(MsgType::Logon.as_bytes(), now, |b| {
            b.field_u32(tag::ENCRYPT_METHOD, 0);
            b.field_u32(tag::HEART_BT_INT, heartbeat_secs);
        })?;
        self.set_state(SessionState::Active);
        self.handler.on_logon();
        Ok(())
    }

    /// Initiator path: only Logon is legal while LogonSent.
    fn handle_frame_awaiting_logon(
        &mut self,
        msg: &ParsedMessage<'_>,
        seq: u32,
        now: Instant,
    ) -> Result<()> {
        if msg.msg_type() != MsgType::Logon {
            log::error!(
                "[Session] protocol violation: first message was {:?}, not Logon",
                msg.msg_type()
            );
            self.teardown(b"first message not Logon");
            let err = Error::ProtocolViolation("first message must be Logon");
            self.handler.on_error(&err);
            return Err(err);
        }

        let logon = crate::parser::views::Logon::from_message(msg)
            .ok_or(Error::ProtocolViolation("logon gate"))?;
        match logon.heart_bt_int() {
            Ok(echoed) if u64::from(echoed) == self.config.heartbeat.as_secs() => {}
            Ok(echoed) => {
                // The acceptor decides; adopt its interval.
                log::debug!("[Session] peer adjusted heartbeat to {echoed}s");
                self.config.heartbeat = Duration::from_secs(u64::from(echoed));
            }
            Err(err) => {
                self.teardown(b"logon missing HeartBtInt");
                let err: Error = err.into();
                self.handler.on_error(&err);
                return Err(err);
            }
        }

        self.set_state(SessionState::Active);
        self.handler.on_logon();

        // Sequence rules apply to the Logon itself.
        if seq == self.expected_inbound {
            self.accept_inbound_seq(seq);
            Ok(())
        } else {
            self.handle_sequence_mismatch(msg, seq, now)
        }
    }

    fn handle_frame_active(
        &mut self,
        msg: &ParsedMessage<'_>,
        seq: u32,
        now: Instant,
    ) -> Result<()> {
        // SequenceReset owns its own sequence semantics.
        if msg.msg_type() == MsgType::SequenceReset {
            return self.handle_sequence_reset(msg, seq, now);
        }

        if seq == self.expected_inbound {
            self.accept_inbound_seq(seq);
            self.dispatch(msg, now)?;
            self.deliver_queued(now)
        } else {
            self.handle_sequence_mismatch(msg, seq, now)
        }
    }

    fn handle_sequence_mismatch(
        &mut self,
        msg: &ParsedMessage<'_>,
        seq: u32,
        now: Instant,
    ) -> Result<()> {
        if seq > self.expected_inbound {
            // Gap: ask for [expected, seq-1].
            let begin = self.expected_inbound;
            let end = seq - 1;
            let already_requested = self.resend_high.is_some_and(|high| end <= high);
            if !already_requested {
                log::debug!(
                    "[Session] sequence gap: expected {begin}, received {seq}; requesting [{begin}, {end}]"
                );
                self.send_message(MsgType::ResendRequest.as_bytes(), now, |b| {
                    b.field_u32(tag::BEGIN_SEQ_NO, begin);
                    b.field_u32(tag::END_SEQ_NO, end);
                })?;
                self.resend_high = Some(end);
            }

            if msg.msg_type().is_admin() {
                // Sequence-agnostic admin traffic is honored immediately;
                // the gap-fill will collapse it anyway.
                self.dispatch(msg, now)
            } else if self.pending.len() < PENDING_LIMIT {
                self.pending.insert(seq, msg.as_bytes().to_vec());
                Ok(())
            } else {
                log::warn!("[Session] pending buffer full, dropping premature seq {seq}");
                Ok(())
            }
        } else {
            // seq < expected
            if msg.poss_dup() {
                match self.config.deliver_dup {
                    DeliverDup::Suppress => {
                        log::debug!("[Session] suppressing PossDup seq {seq}");
                    }
                    DeliverDup::Deliver => {
                        if !msg.msg_type().is_admin() {
                            self.handler.on_app_message(msg);
                        }
                    }
                }
                Ok(())
            } else {
                let err = Error::LowerSequence {
                    expected: self.expected_inbound,
                    received: seq,
                };
                log::error!("[Session] fatal: {err}");
                self.teardown(b"sequence number lower than expected");
                self.handler.on_error(&err);
                Err(err)
            }
        }
    }

    fn accept_inbound_seq(&mut self, seq: u32) {
        self.store.note_inbound(seq);
        self.expected_inbound = seq + 1;
        if self.resend_high.is_some_and(|high| self.expected_inbound > high) {
            self.resend_high = None;
        }
    }

    /// Flush buffered premature messages that became deliverable.
    fn deliver_queued(&mut self, now: Instant) -> Result<()> {
        while let Some(bytes) = self.pending.remove(&self.expected_inbound) {
            let msg = match ParsedMessage::parse(&bytes) {
                Ok(msg) => msg,
                Err(err) => {
                    // Was validated when queued; treat as internal bug.
                    log::error!("[Session] queued frame failed re-parse: {err:?}");
                    continue;
                }
            };
            let seq = self.expected_inbound;
            self.accept_inbound_seq(seq);
            self.dispatch(&msg, now)?;
        }
        Ok(())
    }

    /// Message-type dispatch for in-sequence (or seq-agnostic) messages.
    fn dispatch(&mut self, msg: &ParsedMessage<'_>, now: Instant) -> Result<()> {
        match msg.msg_type() {
            MsgType::Heartbeat => {
                let echoed = msg.field(tag::TEST_REQ_ID).map(|f| f.as_bytes().to_vec());
                if let (Some(echoed), Some(waiting)) = (echoed, &self.outstanding_test_req) {
                    if &echoed == waiting {
                        self.outstanding_test_req = None;
                    }
                }
                Ok(())
            }
            MsgType::TestRequest => {
                let id = msg
                    .field(tag::TEST_REQ_ID)
                    .map(|f| f.as_bytes().to_vec())
                    .unwrap_or_default();
                self.send_message(MsgType::Heartbeat.as_bytes(), now, |b| {
                    if !id.is_empty() {
                        b.field_bytes(tag::TEST_REQ_ID, &id);
                    }
                })
                .map(|_| ())
            }
            MsgType::ResendRequest => {
                let request = ResendRequest::from_message(msg)
                    .ok_or(Error::ProtocolViolation("resend gate"))?;
                let begin = request.begin_seq_no().map_err(Error::from)?;
                let end = request.end_seq_no().map_err(Error::from)?;
                self.serve_resend(begin, end, now)
            }
            MsgType::Reject => {
                let text = msg
                    .field(tag::TEXT)
                    .map(|f| f.as_bytes().to_vec())
                    .unwrap_or_default();
                log::warn!(
                    "[Session] peer rejected seq {:?}: {}",
                    msg.field(tag::REF_SEQ_NUM).and_then(|f| f.as_u32().ok()),
                    String::from_utf8_lossy(&text)
                );
                self.handler
                    .on_error(&Error::ProtocolViolation("peer sent Reject"));
                Ok(())
            }
            MsgType::Logout => {
                // Peer-initiated logout: echo and tear down.
                let reason = msg
                    .field(tag::TEXT)
                    .map(|f| f.as_bytes().to_vec())
                    .unwrap_or_default();
                self.send_message(MsgType::Logout.as_bytes(), now, |_| {})?;
                self.teardown(&reason);
                Ok(())
            }
            MsgType::Logon => {
                // Duplicate logon in Active: tolerated, logged.
                log::debug!("[Session] duplicate Logon while Active");
                Ok(())
            }
            MsgType::SequenceReset => {
                // Normally intercepted before dispatch; a premature gap
                // fill lands here and is covered by the open resend.
                log::debug!("[Session] ignoring out-of-band SequenceReset");
                Ok(())
            }
            _ => {
                self.handler.on_app_message(msg);
                Ok(())
            }
        }
    }

    fn handle_sequence_reset(
        &mut self,
        msg: &ParsedMessage<'_>,
        seq: u32,
        now: Instant,
    ) -> Result<()> {
        let reset = SequenceReset::from_message(msg)
            .ok_or(Error::ProtocolViolation("sequence reset gate"))?;
        let new_seq = reset.new_seq_no().map_err(Error::from)?;

        if reset.gap_fill() {
            if seq == self.expected_inbound {
                // The run [seq, new_seq) was administrative; skip it.
                log::debug!("[Session] gap fill: {} -> {new_seq}", self.expected_inbound);
                self.expected_inbound = new_seq;
                self.store.note_inbound(new_seq.saturating_sub(1));
                if self
                    .resend_high
                    .is_some_and(|high| self.expected_inbound > high)
                {
                    self.resend_high = None;
                }
                self.deliver_queued(now)
            } else if seq > self.expected_inbound {
                self.handle_sequence_mismatch(msg, seq, now)
            } else {
                // Stale gap fill, PossDup by construction.
                Ok(())
            }
        } else {
            // Reset mode jumps forward unconditionally; backwards is an
            // error on tag 36.
            if new_seq >= self.expected_inbound {
                log::debug!(
                    "[Session] sequence reset: {} -> {new_seq}",
                    self.expected_inbound
                );
                self.expected_inbound = new_seq;
                self.resend_high = None;
                self.pending.clear();
                Ok(())
            } else {
                self.send_reject(
                    seq,
                    Some(tag::NEW_SEQ_NO),
                    tag::REJECT_REASON_VALUE_INCORRECT,
                    b"NewSeqNo lower than expected",
                    now,
                )?;
                Ok(())
            }
        }
    }

    // ========================================================================
    // Resend service (outbound replay)
    // ========================================================================

    /// Serve an inbound ResendRequest for `[begin, end]` (0 = latest).
    ///
    /// Administrative messages collapse per run into SequenceReset-GapFill;
    /// application messages are re-sent with PossDupFlag=Y and the
    /// original SendingTime preserved in OrigSendingTime.
    fn serve_resend(&mut self, begin: u32, end: u32, now: Instant) -> Result<()> {
        let max_sent = self.store.max_outbound_sent();
        let end = if end == 0 { max_sent } else { end.min(max_sent) };
        if begin > end {
            log::debug!("[Session] resend request [{begin}, {end}] has nothing to replay");
            return Ok(());
        }
        log::debug!("[Session] serving resend [{begin}, {end}]");

        let mut gap_run_start: Option<u32> = None;
        for seq in begin..=end {
            let stored = self
                .store
                .retrieve(seq)
                .ok_or(Error::StoreCorrupt("hole in dense outbound log"))?;

            if stored_is_admin(&stored.bytes) {
                gap_run_start.get_or_insert(seq);
                continue;
            }

            if let Some(run_start) = gap_run_start.take() {
                self.send_gap_fill(run_start, seq, now)?;
            }
            self.resend_stored(&stored.bytes, seq, now)?;
        }
        if let Some(run_start) = gap_run_start.take() {
            self.send_gap_fill(run_start, end + 1, now)?;
        }
        Ok(())
    }

    /// Emit `SequenceReset-GapFill` covering `[run_start, new_seq)`.
    fn send_gap_fill(&mut self, run_start: u32, new_seq: u32, now: Instant) -> Result<()> {
        self.build_buf.clear();
        let mut buf = std::mem::take(&mut self.build_buf);
        {
            let mut builder = MessageBuilder::begin(&mut buf, self.config.version);
            builder.field_bytes(tag::MSG_TYPE, MsgType::SequenceReset.as_bytes());
            builder.field_bytes(tag::SENDER_COMP_ID, self.config.sender_comp_id.as_bytes());
            builder.field_bytes(tag::TARGET_COMP_ID, self.config.target_comp_id.as_bytes());
            builder.field_u32(tag::MSG_SEQ_NUM, run_start);
            builder.field_bool(tag::POSS_DUP_FLAG, true);
            let stamp = self.ts.format(SystemTime::now()).as_bytes().to_vec();
            builder.field_bytes(tag::SENDING_TIME, &stamp);
            builder.field_bool(tag::GAP_FILL_FLAG, true);
            builder.field_u32(tag::NEW_SEQ_NO, new_seq);
            builder.finish();
        }
        let result = self.transmit(&buf, now);
        self.build_buf = buf;
        result
    }

    /// Re-send a stored application message with PossDupFlag=Y.
    ///
    /// The stored frame is rebuilt rather than patched: the header gets a
    /// fresh SendingTime, PossDupFlag=Y, and OrigSendingTime; the body is
    /// copied field-for-field in its original order.
    fn resend_stored(&mut self, original: &[u8], seq: u32, now: Instant) -> Result<()> {
        let msg = ParsedMessage::parse(original)
            .map_err(|_| Error::StoreCorrupt("stored message unparseable"))?;
        let msg_type = msg.msg_type_bytes().to_vec();
        let orig_sending_time = msg.sending_time().map(<[u8]>::to_vec);

        self.build_buf.clear();
        let mut buf = std::mem::take(&mut self.build_buf);
        {
            let mut builder = MessageBuilder::begin(&mut buf, self.config.version);
            builder.field_bytes(tag::MSG_TYPE, &msg_type);
            builder.field_bytes(tag::SENDER_COMP_ID, self.config.sender_comp_id.as_bytes());
            builder.field_bytes(tag::TARGET_COMP_ID, self.config.target_comp_id.as_bytes());
            builder.field_u32(tag::MSG_SEQ_NUM, seq);
            builder.field_bool(tag::POSS_DUP_FLAG, true);
            let stamp = self.ts.format(SystemTime::now()).as_bytes().to_vec();
            builder.field_bytes(tag::SENDING_TIME, &stamp);
            if let Some(orig) = &orig_sending_time {
                builder.field_bytes(tag::ORIG_SENDING_TIME, orig);
            }
            for entry in msg.index().entries() {
                match entry.tag {
                    tag::BEGIN_STRING
                    | tag::BODY_LENGTH
                    | tag::MSG_TYPE
                    | tag::SENDER_COMP_ID
                    | tag::TARGET_COMP_ID
                    | tag::MSG_SEQ_NUM
                    | tag::SENDING_TIME
                    | tag::POSS_DUP_FLAG
                    | tag::ORIG_SENDING_TIME
                    | tag::CHECK_SUM => continue,
                    body_tag => {
                        builder.field_bytes(body_tag, &original[entry.value_range()]);
                    }
                }
            }
            builder.finish();
        }
        let result = self.transmit(&buf, now);
        self.build_buf = buf;
        result
    }

    // ========================================================================
    // Send path
    // ========================================================================

    /// Send an application message once the session is Active.
    ///
    /// `body` appends application fields between the standard header and
    /// trailer. Returns the assigned sequence number.
    pub fn send_app(
        &mut self,
        msg_type: &[u8],
        now: Instant,
        body: impl FnOnce(&mut MessageBuilder<'_>),
    ) -> Result<u32> {
        if !self.state.can_send_app() {
            return Err(Error::InvalidState("application send requires Active"));
        }
        self.send_message(msg_type, now, body)
    }

    /// Build, persist, then transmit one message with the next sequence.
    fn send_message(
        &mut self,
        msg_type: &[u8],
        now: Instant,
        body: impl FnOnce(&mut MessageBuilder<'_>),
    ) -> Result<u32> {
        let seq = self.next_outbound()?;

        self.build_buf.clear();
        let mut buf = std::mem::take(&mut self.build_buf);
        {
            let mut builder = MessageBuilder::begin(&mut buf, self.config.version);
            builder.field_bytes(tag::MSG_TYPE, msg_type);
            builder.field_bytes(tag::SENDER_COMP_ID, self.config.sender_comp_id.as_bytes());
            builder.field_bytes(tag::TARGET_COMP_ID, self.config.target_comp_id.as_bytes());
            builder.field_u32(tag::MSG_SEQ_NUM, seq);
            let stamp = self.ts.format(SystemTime::now()).as_bytes().to_vec();
            builder.field_bytes(tag::SENDING_TIME, &stamp);
            body(&mut builder);
            builder.finish();
        }

        // Invariant: no send visible to the peer without a durable store
        // entry.
        let store_result = self.store.store(seq, wall_clock_ns(), &buf);
        let result = match store_result {
            Ok(()) => self.transmit(&buf, now).map(|()| seq),
            Err(err) => Err(err),
        };
        self.build_buf = buf;
        result
    }

    fn send_reject(
        &mut self,
        ref_seq: u32,
        ref_tag: Option<u32>,
        reason: u32,
        text: &[u8],
        now: Instant,
    ) -> Result<()> {
        self.send_message(MsgType::Reject.as_bytes(), now, |b| {
            b.field_u32(tag::REF_SEQ_NUM, ref_seq);
            if let Some(cited) = ref_tag {
                b.field_u32(tag::REF_TAG_ID, cited);
            }
            b.field_u32(tag::SESSION_REJECT_REASON, reason);
            b.field_bytes(tag::TEXT, text);
        })
        .map(|_| ())
    }

    /// Write every byte, retrying blocked writes with bounded backoff.
    fn transmit(&mut self, bytes: &[u8], now: Instant) -> Result<()> {
        let mut written = 0usize;
        let mut retries = 0u32;
        while written < bytes.len() {
            match self.transport.send(&bytes[written..]) {
                Ok(n) => {
                    written += n;
                    retries = 0;
                }
                Err(Error::WouldBlock) => {
                    retries += 1;
                    if retries > SEND_RETRY_LIMIT {
                        log::error!("[Session] transport blocked past retry budget");
                        return Err(Error::Timeout);
                    }
                    self.send_wait.idle(retries);
                }
                Err(err) => return Err(err),
            }
        }
        self.last_send = now;
        Ok(())
    }

    /// Atomically return and increment the outbound counter.
    fn next_outbound(&self) -> Result<u32> {
        loop {
            let seq = self.outbound_seq.load(Ordering::Relaxed);
            if seq == u32::MAX {
                return Err(Error::SeqNumOverflow);
            }
            if self
                .outbound_seq
                .compare_exchange_weak(seq, seq + 1, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(seq);
            }
        }
    }
}

/// Classify a stored wire message without a full parse: locate `35=`.
fn stored_is_admin(bytes: &[u8]) -> bool {
    let mut at = 0usize;
    // Walk the first three fields; 35= is the third by construction.
    for _ in 0..2 {
        match bytes[at..].iter().position(|&b| b == SOH) {
            Some(soh) => at += soh + 1,
            None => return false,
        }
    }
    let Some(rest) = bytes.get(at..) else {
        return false;
    };
    if !rest.starts_with(b"35=") {
        return false;
    }
    let value = &rest[3..];
    let Some(end) = value.iter().position(|&b| b == SOH) else {
        return false;
    };
    MsgType::from_bytes(&value[..end]).is_admin()
}
