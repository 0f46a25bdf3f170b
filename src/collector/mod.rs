//! The invoking side of the cross-environment transport.
//!
//! A [`Collector`] is bound fresh for each invocation. It serves the sandbox
//! page and its assets, accepts exactly one well-formed report on
//! `POST /submit`, and hands that report to whoever is awaiting it.

mod client;
mod server;
mod state;

pub use client::{SubmitError, Submitter};
pub use state::{CollectorState, DeliveryRejection, InvalidTransition};

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::models::RunReport;
use server::Shared;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to bind collector on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("collector is {0}, not awaiting a result")]
    NotAwaiting(CollectorState),

    #[error("no report delivered within {}s", .0.as_secs_f64())]
    DeliveryTimeout(Duration),

    #[error("collector closed before a report was delivered")]
    Closed,

    #[error("collector server failed")]
    Server(#[source] io::Error),
}

pub struct Collector {
    addr: SocketAddr,
    shared: Arc<Shared>,
    delivery: Option<oneshot::Receiver<RunReport>>,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<io::Result<()>>>,
}

impl Collector {
    /// Bind the listener and start serving in [`CollectorState::Idle`].
    pub async fn bind(config: &ServerConfig) -> Result<Self, CollectorError> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| CollectorError::Bind {
                addr: format!("{}:{}", config.host, config.port),
                source,
            })?;
        let addr = listener.local_addr().map_err(CollectorError::Server)?;

        let (delivery_tx, delivery_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let shared = Arc::new(Shared::new(delivery_tx, config.assets.clone()));
        let app = server::router(Arc::clone(&shared), config.max_payload());

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });
        tracing::info!(%addr, "collector listening");

        Ok(Self {
            addr,
            shared,
            delivery: Some(delivery_rx),
            shutdown: Some(shutdown_tx),
            server: Some(server),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL handed to the sandbox.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> CollectorState {
        *self.shared.state()
    }

    /// Start expecting a delivery.
    pub fn begin(&self) -> Result<(), CollectorError> {
        self.shared.state().begin()?;
        tracing::debug!("collector awaiting result");
        Ok(())
    }

    /// Wait for the delivered report. Cancel-safe: dropping the future before
    /// it resolves leaves the delivery in place for a later call.
    pub async fn await_delivery(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<RunReport, CollectorError> {
        let state = self.state();
        if matches!(state, CollectorState::Idle | CollectorState::Closed) {
            return Err(CollectorError::NotAwaiting(state));
        }
        let receiver = self.delivery.as_mut().ok_or(CollectorError::Closed)?;

        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, receiver)
                .await
                .map_err(|_| CollectorError::DeliveryTimeout(limit))?,
            None => receiver.await,
        };
        self.delivery = None;
        received.map_err(|_| CollectorError::Closed)
    }

    /// Move to [`CollectorState::Closed`] and shut the server down gracefully.
    pub async fn close(&mut self) -> Result<(), CollectorError> {
        self.shared.state().close();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(server) = self.server.take() {
            match server.await {
                Ok(result) => result.map_err(CollectorError::Server)?,
                Err(err) => tracing::warn!(%err, "collector server task ended abnormally"),
            }
        }
        tracing::debug!(addr = %self.addr, "collector closed");
        Ok(())
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("addr", &self.addr)
            .field("state", &self.state())
            .finish()
    }
}
