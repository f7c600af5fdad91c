//! Listening socket ownership, accept loop and bounded drain.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::ConnectInfo, Router};
use hyper::{body::Incoming, service::service_fn, Request};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use thiserror::Error;
use tokio::{net::TcpStream, task::JoinSet};
use tower::ServiceExt;

use crate::config::ListenerConfig;
use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};
use crate::lifecycle::state::{LifecycleState, LifecycleStatus};
use crate::net::{ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener, ListenerError};

/// Pause after a failed accept (EMFILE and the like) before retrying.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("failed to read bound address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("grace period of {grace_period:?} elapsed with {remaining} connection(s) open; forced them closed")]
    GraceExceeded {
        grace_period: Duration,
        remaining: usize,
    },
}

/// Owns the listening socket for the lifetime of the server.
///
/// `start` binds (Starting → Serving). `run` accepts until the [`Shutdown`]
/// fires, then stops accepting (ShuttingDown) and gives open connections
/// `grace_period` to finish before aborting them (Stopped).
pub struct ServerLifecycle {
    listener: Listener,
    router: Router,
    status: LifecycleStatus,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    grace_period: Duration,
    local_addr: SocketAddr,
}

impl ServerLifecycle {
    pub async fn start(
        config: &ListenerConfig,
        grace_period: Duration,
        router: Router,
    ) -> Result<Self, StartupError> {
        let status = LifecycleStatus::new();
        tracing::info!(address = %config.bind_address, state = %status.get(), "Starting server");

        let listener = Listener::bind(config).await?;
        let local_addr = listener.local_addr().map_err(StartupError::LocalAddr)?;
        status.advance(LifecycleState::Serving);

        Ok(Self {
            listener,
            router,
            status,
            shutdown: Shutdown::new(),
            tracker: ConnectionTracker::new(),
            grace_period,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that stops the server when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status.clone()
    }

    /// Serve until shutdown, then drain.
    pub async fn run(self) -> Result<(), ShutdownError> {
        let Self {
            listener,
            router,
            status,
            shutdown,
            tracker,
            grace_period,
            local_addr,
        } = self;

        tracing::info!(
            address = %local_addr,
            state = %status.get(),
            max_connections = listener.max_connections(),
            "Accepting connections"
        );

        let mut connections = JoinSet::new();
        let mut stop = shutdown.subscribe();

        loop {
            tokio::select! {
                // Shutdown first, so no connection is accepted once it fires.
                biased;

                () = stop.recv() => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            router.clone(),
                            shutdown.subscribe(),
                            permit,
                            tracker.track(),
                        ));
                    }
                    Err(ListenerError::LimiterClosed) => {
                        tracing::error!("Connection limiter closed, stopping server");
                        shutdown.trigger();
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            retry_in_ms = ACCEPT_ERROR_BACKOFF.as_millis() as u64,
                            "Failed to accept connection"
                        );
                        if !back_off(&mut stop, ACCEPT_ERROR_BACKOFF).await {
                            break;
                        }
                    }
                },

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_join(joined);
                }
            }
        }

        let free_slots = listener.available_permits();
        drop(listener);
        status.advance(LifecycleState::ShuttingDown);
        tracing::info!(
            in_flight = tracker.active_count(),
            free_slots,
            grace_period_ms = grace_period.as_millis() as u64,
            "Stopped accepting, draining connections"
        );

        let drained = tokio::time::timeout(grace_period, async {
            while let Some(joined) = connections.join_next().await {
                log_join(joined);
            }
        })
        .await;

        let result = match drained {
            Ok(()) => {
                tracing::info!("All connections drained");
                Ok(())
            }
            Err(_) => {
                let remaining = connections.len();
                connections.abort_all();
                while connections.join_next().await.is_some() {}
                tracing::error!(
                    remaining,
                    grace_period_ms = grace_period.as_millis() as u64,
                    "Grace period elapsed, forced remaining connections closed"
                );
                Err(ShutdownError::GraceExceeded {
                    grace_period,
                    remaining,
                })
            }
        };

        status.advance(LifecycleState::Stopped);
        result
    }
}

/// Serve one connection until it closes or shutdown asks it to wind down.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    mut shutdown: ShutdownSignal,
    _permit: ConnectionPermit,
    guard: ConnectionGuard,
) {
    let connection_id = guard.id();
    let service = service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        router.clone().oneshot(request)
    });

    let builder = auto::Builder::new(TokioExecutor::new());
    let connection = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        () = shutdown.recv() => {
            tracing::debug!(connection_id = %connection_id, "Closing connection gracefully");
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(connection_id = %connection_id, peer = %peer, error = %e, "Connection ended with error");
    }
}

/// Wait `backoff` before the next accept. Returns `false` if shutdown fired
/// in the meantime.
async fn back_off(stop: &mut ShutdownSignal, backoff: Duration) -> bool {
    tokio::select! {
        () = stop.recv() => false,
        () = tokio::time::sleep(backoff) => true,
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Connection task panicked");
        }
    }
}
