//! WebSocket close codes sent by the server.
//!
//! | Reason             | Code |
//! |--------------------|------|
//! | server shutdown    | 1001 |
//! | slow consumer      | 1008 |
//! | registry full      | 1013 |
//! | malformed identity | 4002 |
//! | duplicate username | 4004 |
//! | identity timeout   | 4009 |

use crate::domain::CloseReason;

/// The server is going away (shutdown)
pub const GOING_AWAY: u16 = 1001;
/// The client did not keep up with its outbound queue
pub const POLICY_VIOLATION: u16 = 1008;
/// The server is at capacity; the client may retry later
pub const TRY_AGAIN_LATER: u16 = 1013;
/// The first frame did not carry a valid username
pub const MALFORMED_IDENTITY: u16 = 4002;
/// The username is held by another active session
pub const DUPLICATE_USERNAME: u16 = 4004;
/// No username arrived before the identity timeout
pub const IDENTITY_TIMEOUT: u16 = 4009;

/// Close code for a server-initiated close, `None` when the peer or the
/// transport ended the session.
pub fn for_reason(reason: CloseReason) -> Option<u16> {
    match reason {
        CloseReason::ServerShutdown => Some(GOING_AWAY),
        CloseReason::SlowConsumer => Some(POLICY_VIOLATION),
        CloseReason::MalformedIdentity => Some(MALFORMED_IDENTITY),
        CloseReason::DuplicateUsername => Some(DUPLICATE_USERNAME),
        CloseReason::IdentityTimeout => Some(IDENTITY_TIMEOUT),
        CloseReason::PeerClosed | CloseReason::TransportError | CloseReason::WriterFailed => None,
    }
}
