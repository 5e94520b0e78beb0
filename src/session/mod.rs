//! Wallet session state and the connection manager
//!
//! ## Architecture
//!
//! - **environment**: user-agent classification (mobile vs. desktop)
//! - **deeplink**: outbound wallet links and inbound return markers
//! - **connection**: [`ConnectionManager`], the only writer of [`Session`]
//!
//! A page instance owns exactly one `Session`. Transitions happen through the
//! manager: provider events, `connect()`, `disconnect()`, and the return half
//! of a redirect round trip.

mod connection;
pub mod deeplink;
mod environment;

pub use connection::ConnectionManager;
pub use deeplink::ReturnMarker;
pub use environment::{detect_environment, Environment};

use solana_sdk::pubkey::Pubkey;
use url::Url;

use crate::errors::WalletFlowResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Redirecting,
    Connected,
}

/// How the signer is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// In-page provider, synchronous round trips
    Extension,
    /// External wallet app via deep-link redirect
    MobileRedirect,
}

/// Page-lifetime wallet session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    state: SessionState,
    signer: Option<Pubkey>,
    mode: Option<TransportMode>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            signer: None,
            mode: None,
        }
    }

    /// Build a session in a given state, for callers that restore or inject one
    pub fn with_state(
        state: SessionState,
        mode: Option<TransportMode>,
        signer: Option<Pubkey>,
    ) -> Self {
        Self {
            state,
            signer,
            mode,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn signer(&self) -> Option<Pubkey> {
        self.signer
    }

    pub fn mode(&self) -> Option<TransportMode> {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub(crate) fn begin_connecting(&mut self) {
        self.state = SessionState::Connecting;
        self.mode = Some(TransportMode::Extension);
    }

    pub(crate) fn begin_redirect(&mut self) {
        self.state = SessionState::Redirecting;
        self.mode = Some(TransportMode::MobileRedirect);
    }

    pub(crate) fn connect(&mut self, mode: TransportMode, signer: Option<Pubkey>) {
        self.state = SessionState::Connected;
        self.mode = Some(mode);
        self.signer = signer;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Browser location control. Navigating away ends the current page load.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url) -> WalletFlowResult<()>;
}
