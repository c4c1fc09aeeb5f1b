use std::net::TcpListener as StdTcpListener;
use std::os::fd::{FromRawFd, RawFd};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info, warn};

use crate::app::Application;
use crate::config::Config;
use crate::http::connection::Connection;
use crate::server::process::{self, PARENT_PID_ENV, WORKER_FD_ENV, WORKER_INDEX_ENV};
use crate::server::tls;

/// How often a worker probes the supervisor for liveness.
const PARENT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long in-flight connections get to finish at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// One worker process: accepts connections on the socket inherited from
/// the supervisor and runs them through a bounded pool of tasks.
pub struct Worker {
    listener: StdTcpListener,
    app: Arc<dyn Application>,
    host: String,
    port: u16,
    scheme: String,
    parent_pid: u32,
    max_connections: usize,
    index: usize,
    tls: Option<TlsAcceptor>,
}

impl Worker {
    /// Reconstructs the worker from the environment the supervisor set up
    /// at spawn time. Returns `None` when the process was not started in
    /// worker mode.
    pub fn from_env(app: Arc<dyn Application>, config: &Config) -> anyhow::Result<Option<Self>> {
        let Ok(fd) = std::env::var(WORKER_FD_ENV) else {
            return Ok(None);
        };
        let fd: RawFd = fd.parse()?;
        let index: usize = std::env::var(WORKER_INDEX_ENV)?.parse()?;
        let parent_pid: u32 = std::env::var(PARENT_PID_ENV)?.parse()?;

        // The fd was bound, set listening, and inherited by this process;
        // it is never re-bound here.
        let listener = unsafe { StdTcpListener::from_raw_fd(fd) };

        let tls = match &config.tls {
            Some(tls_config) => Some(tls::load_acceptor(&tls_config.cert, &tls_config.key)?),
            None => None,
        };

        Ok(Some(Self {
            listener,
            app,
            host: config.host.clone(),
            port: config.port,
            scheme: config.scheme().to_string(),
            parent_pid,
            max_connections: config.max_connections,
            index,
            tls,
        }))
    }

    /// Runs the accept loop until a termination signal arrives or the
    /// supervisor disappears.
    pub fn start(self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let Worker {
            listener,
            app,
            host,
            port,
            scheme,
            parent_pid,
            max_connections,
            index,
            tls,
        } = self;

        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        info!("Worker {} accepting connections", index);

        let semaphore = Arc::new(Semaphore::new(max_connections));
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut parent_check = tokio::time::interval(PARENT_POLL_INTERVAL);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Worker {} received termination signal", index);
                    break;
                }

                _ = sigint.recv() => {
                    info!("Worker {} interrupted", index);
                    break;
                }

                _ = parent_check.tick() => {
                    if !process::alive(parent_pid) {
                        warn!("Worker {} orphaned (parent {} gone), shutting down", index, parent_pid);
                        break;
                    }
                }

                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    info!("Accepted connection from {}", peer);

                    // Backpressure: when the pool is saturated, hold the
                    // accepted connection until a slot frees up.
                    let permit = semaphore.clone().acquire_owned().await?;

                    let app = Arc::clone(&app);
                    let host = host.clone();
                    let scheme = scheme.clone();
                    let tls = tls.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        if let Err(e) = handle_connection(stream, app, host, port, scheme, tls).await {
                            error!("Connection error from {}: {}", peer, e);
                        }
                    });
                }
            }
        }

        // In-flight connections finish, best effort.
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    app: Arc<dyn Application>,
    host: String,
    port: u16,
    scheme: String,
    tls: Option<TlsAcceptor>,
) -> anyhow::Result<()> {
    match tls {
        Some(acceptor) => {
            let stream = acceptor.accept(stream).await?;
            Connection::new(stream, app, host, port, scheme).run().await
        }
        None => Connection::new(stream, app, host, port, scheme).run().await,
    }
}
