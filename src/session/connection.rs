use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use super::deeplink::{self, ReturnMarker};
use super::{Environment, Navigator, Session, SessionState, TransportMode};
use crate::config::DeepLinkConfig;
use crate::errors::{WalletFlowError, WalletFlowResult};
use crate::metrics::metrics;
use crate::observability::short_address;
use crate::provider::{ProviderEvent, WalletProvider};
use crate::status::StatusSink;

/// Owns the page's [`Session`] and every transition of it
pub struct ConnectionManager {
    session: Session,
    environment: Environment,
    page_url: Url,
    provider: Option<Arc<dyn WalletProvider>>,
    events: Option<mpsc::UnboundedReceiver<ProviderEvent>>,
    navigator: Arc<dyn Navigator>,
    deeplink: DeepLinkConfig,
    status: StatusSink,
}

impl ConnectionManager {
    /// Set up the session for a fresh page load.
    ///
    /// Applies any redirect return marker on `page_url`, adopts an
    /// already-connected provider, and subscribes to provider events.
    pub fn initialize(
        environment: Environment,
        page_url: Url,
        provider: Option<Arc<dyn WalletProvider>>,
        navigator: Arc<dyn Navigator>,
        deeplink: DeepLinkConfig,
        status: StatusSink,
    ) -> (Self, ReturnMarker) {
        let events = provider.as_ref().map(|p| p.subscribe());
        let mut manager = Self {
            session: Session::new(),
            environment,
            page_url,
            provider,
            events,
            navigator,
            deeplink,
            status,
        };

        let marker = manager.resume_from_return();

        if let Some(provider) = manager.provider.clone() {
            if provider.is_connected() {
                match provider.public_key() {
                    Some(pk) => manager.mark_connected(TransportMode::Extension, pk),
                    None => warn!("Provider reports connected without a public key"),
                }
            }
        }

        (manager, marker)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.provider.as_ref()
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Apply the return marker on the current page URL to the session
    pub fn resume_from_return(&mut self) -> ReturnMarker {
        let marker = deeplink::parse_return(&self.deeplink, &self.page_url);
        match &marker {
            ReturnMarker::None => {}
            ReturnMarker::Connected { public_key } => {
                info!(signer = ?public_key, "Returned from mobile wallet connect");
                self.session.connect(TransportMode::MobileRedirect, *public_key);
                self.status.success("Phantom Mobile connected!");
            }
            ReturnMarker::TransactionReturned { public_key, signature } => {
                info!(signer = ?public_key, signature = ?signature, "Returned from mobile wallet signing");
                self.session.connect(TransportMode::MobileRedirect, *public_key);
                self.status.info("Returned from Phantom, checking transaction...");
            }
            ReturnMarker::Rejected { code, message } => {
                warn!(code = ?code, message = %message, "Mobile wallet returned an error");
                self.session.reset();
                self.status.failure("Request declined in wallet.");
            }
        }
        marker
    }

    /// Single handler for provider events
    pub fn apply_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::Connect(pk) => self.mark_connected(TransportMode::Extension, pk),
            ProviderEvent::Disconnect => {
                info!(signer = ?self.session.signer(), "Provider disconnected");
                metrics().provider_disconnects.inc();
                self.session.reset();
                self.status.failure("Wallet disconnected");
            }
        }
    }

    /// Apply every provider event already queued, without waiting
    pub fn pump_events(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(rx) = self.events.as_mut() {
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }
        let count = pending.len();
        for event in pending {
            self.apply_event(event);
        }
        count
    }

    /// Wait for the next provider event and apply it. `None` once the
    /// provider has gone away or was never present.
    pub async fn next_event(&mut self) -> Option<ProviderEvent> {
        let event = self.events.as_mut()?.recv().await?;
        self.apply_event(event);
        Some(event)
    }

    /// Start connecting through whichever transport the environment calls for.
    ///
    /// On mobile this hands the browser to the wallet app and returns; the
    /// outcome arrives with the next page load.
    pub async fn connect(&mut self) -> WalletFlowResult<()> {
        metrics().connect_attempts.inc();

        if matches!(
            self.session.state(),
            SessionState::Connected | SessionState::Connecting | SessionState::Redirecting
        ) {
            debug!(state = ?self.session.state(), "Connect ignored, session busy or connected");
            return Ok(());
        }

        if self.environment.is_mobile_client {
            return self.begin_redirect();
        }

        match self.provider.clone() {
            Some(provider) => self.connect_extension(provider).await,
            None => {
                self.status.failure(WalletFlowError::ProviderNotFound.user_message());
                Err(WalletFlowError::ProviderNotFound)
            }
        }
    }

    pub fn disconnect(&mut self) {
        info!(signer = ?self.session.signer(), "Session disconnected by user");
        self.session.reset();
        self.status.info("Wallet disconnected");
    }

    fn begin_redirect(&mut self) -> WalletFlowResult<()> {
        let link = deeplink::connect_link(&self.deeplink, &self.page_url)?;
        self.session.begin_redirect();
        self.status.info("Redirecting to Phantom app...");
        metrics().redirects_started.inc();
        debug!(link = %link, "Redirecting to mobile wallet for connect");

        if let Err(err) = self.navigator.navigate(&link) {
            self.session.reset();
            return Err(err);
        }
        Ok(())
    }

    async fn connect_extension(&mut self, provider: Arc<dyn WalletProvider>) -> WalletFlowResult<()> {
        self.session.begin_connecting();
        self.status.info("Connecting to Phantom...");

        match provider.connect().await {
            Ok(pk) => {
                debug!(signer = %pk, "Provider accepted connect");
                // The connect event carries the transition
                self.pump_events();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Provider connect failed");
                self.session.reset();
                let reason = match &err {
                    WalletFlowError::SignerRejected(msg) => msg.clone(),
                    other => other.to_string(),
                };
                self.status.failure(format!("Connection failed: {}", reason));
                Err(err)
            }
        }
    }

    fn mark_connected(&mut self, mode: TransportMode, pk: Pubkey) {
        info!(signer = %pk, mode = ?mode, "Wallet connected");
        self.session.connect(mode, Some(pk));
        self.status
            .success(format!("Wallet connected: {}", short_address(&pk.to_string())));
    }
}
