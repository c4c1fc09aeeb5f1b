use std::net::TcpListener as StdTcpListener;
use std::os::fd::AsRawFd;

use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_BACKLOG};
use crate::server::process::{ExecFactory, ProcessFactory, WorkerProcess, WorkerSpec};
use crate::server::socket;

struct WorkerRecord {
    index: usize,
    process: Box<dyn WorkerProcess>,
}

/// The master process: binds the listening socket once, spawns the worker
/// processes that share it, and terminates them on shutdown.
///
/// Workers are spawned through a [`ProcessFactory`] so lifecycle
/// bookkeeping can be exercised in tests without real child processes.
pub struct Supervisor {
    config: Config,
    factory: Box<dyn ProcessFactory>,
    listener: Option<StdTcpListener>,
    workers: Vec<WorkerRecord>,
    alive: bool,
}

impl Supervisor {
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, Box::new(ExecFactory))
    }

    pub fn with_factory(config: Config, factory: Box<dyn ProcessFactory>) -> Self {
        Self {
            config,
            factory,
            listener: None,
            workers: Vec::new(),
            alive: false,
        }
    }

    /// Binds the socket, spawns the configured number of workers, and,
    /// when `blocking`, parks until a shutdown signal invokes [`stop`].
    ///
    /// Non-blocking starts return immediately; the caller owns the
    /// lifecycle and calls [`stop`] itself.
    ///
    /// [`stop`]: Self::stop
    pub fn start(&mut self, blocking: bool) -> anyhow::Result<()> {
        let backlog = self.config.backlog.unwrap_or(DEFAULT_BACKLOG);
        let listener = socket::bind_listener(&self.config.host, self.config.port, backlog)?;
        info!("Listening on {}", self.config.addr());

        // Workers inherit the already-listening socket; they never re-bind.
        socket::clear_cloexec(listener.as_raw_fd())?;

        let parent_pid = std::process::id();
        for index in 0..self.config.workers {
            let spec = WorkerSpec {
                index,
                fd: listener.as_raw_fd(),
                parent_pid,
            };
            let process = self.factory.spawn(&spec)?;
            info!("Spawned worker {} (pid {})", index, process.id());
            self.workers.push(WorkerRecord { index, process });
        }

        self.listener = Some(listener);
        self.alive = true;

        if blocking {
            self.park()?;
        }
        Ok(())
    }

    fn park(&mut self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            Ok::<_, anyhow::Error>(())
        })?;
        self.handle_signal();
        Ok(())
    }

    /// Entry point for termination/interrupt signals.
    pub fn handle_signal(&mut self) {
        info!("Shutdown signal received");
        self.stop();
    }

    /// Terminates every recorded worker and marks the supervisor
    /// not-alive. Safe to call more than once.
    pub fn stop(&mut self) {
        for mut record in self.workers.drain(..) {
            if let Err(e) = record.process.terminate() {
                warn!("Failed to terminate worker {}: {}", record.index, e);
            }
            if let Err(e) = record.process.join() {
                warn!("Failed to join worker {}: {}", record.index, e);
            }
        }
        self.listener = None;
        self.alive = false;
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}
