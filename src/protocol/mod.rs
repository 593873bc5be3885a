//! socket.io wire protocol (engine.io v4 over WebSocket).
//!
//! - `codec`: frame, packet and event encoding/decoding.

pub mod codec;
