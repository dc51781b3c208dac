//! The closed set of protocol message kinds.
//!
//! Each kind has exactly one valid receiving role. Receiving a kind on
//! the wrong role indicates a controller/worker version mismatch and is
//! treated as fatal by the endpoint layer, never silently ignored.

/// Which side of a controller/worker link an endpoint represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The single long-lived coordinating process.
    Controller,
    /// An isolated, sandboxed content process.
    Worker,
}

impl Role {
    /// The role on the other side of the link.
    pub fn peer(self) -> Role {
        match self {
            Role::Controller => Role::Worker,
            Role::Worker => Role::Controller,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Controller => "controller",
            Role::Worker => "worker",
        }
    }
}

/// Which role is allowed to receive a message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ControllerOnly,
    WorkerOnly,
    Either,
}

/// Protocol message kinds. Closed set; the wire code is the frame
/// header's 4-byte kind field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageKind {
    /// Controller instructs a worker to load a script module into a
    /// content context.
    ModuleRequire = 1,
    /// Worker finished loading its startup scripts.
    WorkerScriptLoaded = 2,
    /// Controller registers a script function descriptor in a worker.
    ScriptFunctionRegister = 3,
    /// Worker process came up and attached to the link.
    WorkerProcessReady = 4,
    /// Worker crash diagnostic.
    WorkerCrashReport = 5,
    /// Application-defined script message, opaque to the transport.
    ScriptMessage = 6,
    /// Scroll axis deltas from a content context.
    ScrollEvent = 7,
    /// Result of a controller-initiated script evaluation.
    EvalScriptResult = 8,
    /// Remote function invocation request.
    Call = 9,
    /// Reply to a `Call`, carrying success flag and result or error.
    CallReply = 10,
    /// Fire-and-forget drop of a remote object reference.
    Release = 11,
    /// A content context finished construction (64-bit context id).
    ContentReady = 12,
}

impl MessageKind {
    /// Every kind, in wire-code order. Kept exhaustive by the match in
    /// [`MessageKind::from_code`].
    pub const ALL: [MessageKind; 12] = [
        MessageKind::ModuleRequire,
        MessageKind::WorkerScriptLoaded,
        MessageKind::ScriptFunctionRegister,
        MessageKind::WorkerProcessReady,
        MessageKind::WorkerCrashReport,
        MessageKind::ScriptMessage,
        MessageKind::ScrollEvent,
        MessageKind::EvalScriptResult,
        MessageKind::Call,
        MessageKind::CallReply,
        MessageKind::Release,
        MessageKind::ContentReady,
    ];

    /// The 4-byte wire code for this kind.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Map a wire code back to a kind. `None` for codes outside the
    /// closed set (a protocol violation at the endpoint layer).
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(MessageKind::ModuleRequire),
            2 => Some(MessageKind::WorkerScriptLoaded),
            3 => Some(MessageKind::ScriptFunctionRegister),
            4 => Some(MessageKind::WorkerProcessReady),
            5 => Some(MessageKind::WorkerCrashReport),
            6 => Some(MessageKind::ScriptMessage),
            7 => Some(MessageKind::ScrollEvent),
            8 => Some(MessageKind::EvalScriptResult),
            9 => Some(MessageKind::Call),
            10 => Some(MessageKind::CallReply),
            11 => Some(MessageKind::Release),
            12 => Some(MessageKind::ContentReady),
            _ => None,
        }
    }

    /// Which role may receive this kind.
    pub fn direction(self) -> Direction {
        match self {
            MessageKind::ModuleRequire | MessageKind::ScriptFunctionRegister => {
                Direction::WorkerOnly
            }
            MessageKind::WorkerScriptLoaded
            | MessageKind::WorkerProcessReady
            | MessageKind::WorkerCrashReport
            | MessageKind::ScrollEvent
            | MessageKind::EvalScriptResult
            | MessageKind::ContentReady => Direction::ControllerOnly,
            MessageKind::ScriptMessage
            | MessageKind::Call
            | MessageKind::CallReply
            | MessageKind::Release => Direction::Either,
        }
    }

    /// Whether an endpoint with the given role may receive this kind.
    pub fn receivable_by(self, role: Role) -> bool {
        match self.direction() {
            Direction::Either => true,
            Direction::ControllerOnly => role == Role::Controller,
            Direction::WorkerOnly => role == Role::Worker,
        }
    }

    /// Human-readable kind name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::ModuleRequire => "module-require",
            MessageKind::WorkerScriptLoaded => "worker-script-loaded",
            MessageKind::ScriptFunctionRegister => "script-function-register",
            MessageKind::WorkerProcessReady => "worker-process-ready",
            MessageKind::WorkerCrashReport => "worker-crash-report",
            MessageKind::ScriptMessage => "script-message",
            MessageKind::ScrollEvent => "scroll-event",
            MessageKind::EvalScriptResult => "eval-script-result",
            MessageKind::Call => "call",
            MessageKind::CallReply => "call-reply",
            MessageKind::Release => "release",
            MessageKind::ContentReady => "content-ready",
        }
    }
}
