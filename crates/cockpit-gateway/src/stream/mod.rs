//! WebSocket streaming: wire protocol, per-connection session and the
//! registry of open sessions.

pub mod protocol;
pub mod registry;
pub mod session;

pub use protocol::{parse_frame, ClientAction, Envelope, ProtocolError, ServerEvent};
pub use registry::{SessionGuard, SessionInfo, SessionRegistry};
pub use session::{SessionState, StreamSession};
