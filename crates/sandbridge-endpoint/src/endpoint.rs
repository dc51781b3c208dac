use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use sandbridge_frame::{Frame, FrameError, FrameReader, FrameWriter, MessageKind, Role};
use sandbridge_transport::{LinkStream, RendezvousListener};
use sandbridge_wire::{self as wire, RefId, Value};

use crate::dispatcher::Dispatcher;
use crate::error::{EndpointError, ProtocolViolation, Result};
use crate::message::{CallReply, CallRequest, MessageError, ReleaseRecord};
use crate::refs::{RefTable, ScriptFault};

/// The outcome slot of one in-flight remote invocation.
struct PendingCall {
    outcome: Option<CallOutcome>,
}

type CallOutcome = std::result::Result<Vec<Value>, CallFailure>;

enum CallFailure {
    Script(ScriptFault),
    PeerLost,
}

/// One side of a controller/worker connection.
///
/// Owns the connection's frame reader and writer (cloned descriptors of
/// one accepted stream), the pending-call table for in-flight remote
/// invocations, and the remote-reference table of local script objects
/// the peer holds. Both tables are owned and mutated exclusively by the
/// thread pumping this endpoint; no locking discipline is needed beyond
/// never touching another endpoint's tables.
///
/// When the transport closes — peer exit, crash, or explicit shutdown —
/// every pending call resolves with [`EndpointError::PeerLost`] and
/// every exported reference is dropped, so a dead worker leaks nothing.
pub struct Endpoint {
    role: Role,
    peer_label: String,
    reader: FrameReader<LinkStream>,
    writer: FrameWriter<LinkStream>,
    next_call_id: u64,
    pending_calls: HashMap<u64, PendingCall>,
    remote_refs: RefTable,
    open: bool,
}

impl Endpoint {
    /// Wrap a connected stream. The stream is cloned once so reader and
    /// writer own separate descriptors.
    pub fn from_stream(role: Role, peer_label: impl Into<String>, stream: LinkStream) -> Result<Self> {
        let reader_stream = stream.try_clone()?;
        Ok(Self {
            role,
            peer_label: peer_label.into(),
            reader: FrameReader::new(reader_stream),
            writer: FrameWriter::new(stream),
            next_call_id: 1,
            pending_calls: HashMap::new(),
            remote_refs: RefTable::new(),
            open: true,
        })
    }

    /// Worker side: connect to the controller's rendezvous socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = RendezvousListener::connect(path)?;
        Self::from_stream(Role::Worker, "controller", stream)
    }

    /// Which side of the link this endpoint represents.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Label of the process on the other side, for diagnostics.
    pub fn peer_label(&self) -> &str {
        &self.peer_label
    }

    /// Whether the connection is still up.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of in-flight remote invocations.
    pub fn pending_count(&self) -> usize {
        self.pending_calls.len()
    }

    /// Number of local objects currently exported to the peer.
    pub fn exported_count(&self) -> usize {
        self.remote_refs.len()
    }

    /// Export a local callable to the peer, returning the reference id
    /// to hand across (e.g. inside a `script-function-register`
    /// descriptor). The endpoint owns one counted reference until the
    /// peer releases it or the connection dies.
    pub fn export<F>(&mut self, callable: F) -> RefId
    where
        F: FnMut(u64, &[Value]) -> std::result::Result<Vec<Value>, ScriptFault> + Send + 'static,
    {
        self.remote_refs.export(Box::new(callable))
    }

    /// Send a raw payload under a message kind.
    pub fn send(&mut self, kind: MessageKind, payload: &[u8]) -> Result<()> {
        if !self.open {
            return Err(EndpointError::PeerLost);
        }
        if !kind.receivable_by(self.role.peer()) {
            return Err(ProtocolViolation::WrongRoleSend {
                kind: kind.name(),
                peer_role: self.role.peer().name(),
            }
            .into());
        }
        trace!(kind = kind.name(), len = payload.len(), peer = %self.peer_label, "sending");
        match self.writer.send_message(kind, payload) {
            Ok(()) => Ok(()),
            Err(FrameError::ConnectionClosed) | Err(FrameError::Io(_)) => {
                self.close();
                Err(EndpointError::PeerLost)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Encode a value sequence and send it under a message kind.
    pub fn send_values(&mut self, kind: MessageKind, values: &[Value]) -> Result<()> {
        self.send(kind, &wire::encode(values))
    }

    /// Drop the local alias to a remote reference.
    ///
    /// Fire-and-forget: no reply is expected, and the receiver treats an
    /// unknown or duplicate id as a no-op. Called when the scripting
    /// runtime finalizes its last alias to the reference.
    pub fn release(&mut self, id: RefId) -> Result<()> {
        debug!(id, peer = %self.peer_label, "releasing remote reference");
        self.send(MessageKind::Release, &ReleaseRecord(id).encode())
    }

    /// Invoke a function value living in the peer process.
    ///
    /// Blocks the calling script context until the matching reply
    /// arrives on this endpoint. While blocked, incoming messages keep
    /// being handled on this same thread — including calls from the peer
    /// in the other direction — so nested invocations cannot deadlock
    /// and the single-threaded dispatch invariant holds.
    ///
    /// A script-level failure in the callee surfaces as
    /// [`EndpointError::Script`]; a vanished peer as
    /// [`EndpointError::PeerLost`]. There is no timeout: a call resolves
    /// only on reply or peer loss.
    pub fn call(
        &mut self,
        dispatcher: &mut Dispatcher,
        callee: RefId,
        context: u64,
        args: &[Value],
    ) -> Result<Vec<Value>> {
        if !self.open {
            return Err(EndpointError::PeerLost);
        }

        let call_id = self.next_call_id;
        self.next_call_id += 1;
        self.pending_calls
            .insert(call_id, PendingCall { outcome: None });

        let request = CallRequest {
            callee,
            context,
            call_id,
            args: args.to_vec(),
        };
        if let Err(err) = self.send(MessageKind::Call, &request.encode()) {
            self.pending_calls.remove(&call_id);
            return Err(err);
        }

        loop {
            if let Some(outcome) = self.take_outcome(call_id) {
                return match outcome {
                    Ok(values) => Ok(values),
                    Err(CallFailure::Script(fault)) => Err(EndpointError::Script(fault)),
                    Err(CallFailure::PeerLost) => Err(EndpointError::PeerLost),
                };
            }

            let step = self
                .read_next()
                .and_then(|frame| self.handle_frame(dispatcher, frame));
            if let Err(err) = step {
                self.pending_calls.remove(&call_id);
                return Err(err);
            }
        }
    }

    /// Receive and handle exactly one message.
    ///
    /// Returns `Err(PeerLost)` when the peer closes the connection (a
    /// normal termination signal) and `Err(Protocol(_))` on an invariant
    /// violation, which callers must treat as fatal.
    pub fn pump(&mut self, dispatcher: &mut Dispatcher) -> Result<()> {
        let frame = self.read_next()?;
        self.handle_frame(dispatcher, frame)
    }

    /// Receive and handle messages until the peer goes away.
    ///
    /// Peer loss is the normal exit and yields `Ok(())` after teardown;
    /// any other error propagates.
    pub fn serve(&mut self, dispatcher: &mut Dispatcher) -> Result<()> {
        loop {
            match self.pump(dispatcher) {
                Ok(()) => {}
                Err(EndpointError::PeerLost) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    fn read_next(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(EndpointError::PeerLost);
        }
        match self.reader.read_frame() {
            Ok(frame) => Ok(frame),
            Err(FrameError::ConnectionClosed) => {
                debug!(peer = %self.peer_label, "peer closed the connection");
                self.close();
                Err(EndpointError::PeerLost)
            }
            Err(FrameError::Io(err)) => {
                warn!(peer = %self.peer_label, %err, "read failed; treating peer as lost");
                self.close();
                Err(EndpointError::PeerLost)
            }
            Err(err) => {
                self.close();
                Err(err.into())
            }
        }
    }

    fn handle_frame(&mut self, dispatcher: &mut Dispatcher, frame: Frame) -> Result<()> {
        let Some(kind) = MessageKind::from_code(frame.kind) else {
            return Err(ProtocolViolation::UnknownKind { code: frame.kind }.into());
        };
        if !kind.receivable_by(self.role) {
            return Err(ProtocolViolation::WrongRole {
                kind: kind.name(),
                role: self.role.name(),
            }
            .into());
        }

        trace!(kind = kind.name(), len = frame.payload.len(), peer = %self.peer_label, "received");

        match kind {
            MessageKind::Call => self.handle_call(&frame.payload),
            MessageKind::CallReply => self.handle_call_reply(&frame.payload),
            MessageKind::Release => self.handle_release(&frame.payload),
            other => dispatcher.dispatch(self, other, frame.payload),
        }
    }

    fn handle_call(&mut self, payload: &Bytes) -> Result<()> {
        let request = self.decode_or_close(CallRequest::decode(payload))?;

        let outcome = self
            .remote_refs
            .invoke(request.callee, request.context, &request.args);
        if let Err(fault) = &outcome {
            warn!(callee = request.callee, %fault, "script fault during remote call");
        }

        let reply = CallReply {
            call_id: request.call_id,
            outcome,
        };
        self.send(MessageKind::CallReply, &reply.encode())
    }

    fn handle_call_reply(&mut self, payload: &Bytes) -> Result<()> {
        let reply = self.decode_or_close(CallReply::decode(payload))?;

        match self.pending_calls.get_mut(&reply.call_id) {
            Some(pending) => {
                pending.outcome = Some(reply.outcome.map_err(CallFailure::Script));
                Ok(())
            }
            None => {
                // Crash/respawn races can deliver a reply after its call
                // was already failed and removed.
                warn!(call_id = reply.call_id, "reply for unknown call id; dropping");
                Ok(())
            }
        }
    }

    fn handle_release(&mut self, payload: &Bytes) -> Result<()> {
        let record = self.decode_or_close(ReleaseRecord::decode(payload))?;
        self.remote_refs.release(record.0);
        Ok(())
    }

    fn take_outcome(&mut self, call_id: u64) -> Option<CallOutcome> {
        match self.pending_calls.get(&call_id) {
            Some(pending) if pending.outcome.is_some() => self
                .pending_calls
                .remove(&call_id)
                .and_then(|pending| pending.outcome),
            _ => None,
        }
    }

    fn decode_or_close<T>(
        &mut self,
        decoded: std::result::Result<T, MessageError>,
    ) -> Result<T> {
        decoded.map_err(|err| {
            warn!(peer = %self.peer_label, %err, "malformed payload; closing connection");
            self.close();
            err.into()
        })
    }

    /// Tear down connection state: fail every pending call with peer
    /// loss and drop every exported reference. Safe to call repeatedly.
    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let released = self.remote_refs.clear();
        if released > 0 {
            debug!(peer = %self.peer_label, released, "dropped exported references on teardown");
        }

        let mut failed = 0usize;
        for pending in self.pending_calls.values_mut() {
            if pending.outcome.is_none() {
                pending.outcome = Some(Err(CallFailure::PeerLost));
                failed += 1;
            }
        }
        if failed > 0 {
            debug!(peer = %self.peer_label, failed, "failed pending calls on teardown");
        }
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("role", &self.role)
            .field("peer", &self.peer_label)
            .field("open", &self.open)
            .field("pending_calls", &self.pending_calls.len())
            .field("remote_refs", &self.remote_refs)
            .finish()
    }
}
