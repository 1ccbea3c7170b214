//! Connection Lifecycle State
//!
//! The connection controller owns one [`StateCell`] and is the only writer;
//! every other component reads it to decide whether a protocol message can
//! be sent now or must wait for the next resubscribe-all.

use std::sync::atomic::{AtomicU8, Ordering};

/// State of the gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport connection; either never started or terminally failed.
    #[default]
    Disconnected,
    /// Transport open in progress.
    Connecting,
    /// Transport open and message flow established.
    Connected,
}

impl ConnectionState {
    /// Get the state name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    const fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
        }
    }
}

/// Lock-free cell holding the current [`ConnectionState`].
#[derive(Debug, Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// Create a cell starting in [`ConnectionState::Disconnected`].
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    /// Read the current state.
    #[must_use]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Replace the current state.
    pub fn set(&self, state: ConnectionState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }
}
