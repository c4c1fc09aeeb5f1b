use std::os::fd::RawFd;
use std::process::{Child, Command};

/// Environment variable carrying the inherited listener fd.
pub const WORKER_FD_ENV: &str = "PORTER_WORKER_FD";

/// Environment variable carrying the worker index.
pub const WORKER_INDEX_ENV: &str = "PORTER_WORKER_INDEX";

/// Environment variable carrying the supervisor's pid.
pub const PARENT_PID_ENV: &str = "PORTER_PARENT_PID";

/// What a worker needs at spawn time: the shared socket, its index, and
/// the supervisor's pid for orphan detection.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub index: usize,
    pub fd: RawFd,
    pub parent_pid: u32,
}

/// Handle to a running worker process.
pub trait WorkerProcess: Send {
    fn id(&self) -> u32;

    /// Requests termination. Terminating an already-exited worker is a
    /// no-op.
    fn terminate(&mut self) -> anyhow::Result<()>;

    /// Waits for the process to exit.
    fn join(&mut self) -> anyhow::Result<()>;
}

/// Spawns worker processes. The supervisor only depends on this seam, so
/// its bookkeeping is testable without forking real processes.
pub trait ProcessFactory: Send {
    fn spawn(&mut self, spec: &WorkerSpec) -> anyhow::Result<Box<dyn WorkerProcess>>;
}

/// Production factory: re-executes the current binary in worker mode with
/// the listener fd inherited across exec.
pub struct ExecFactory;

impl ProcessFactory for ExecFactory {
    fn spawn(&mut self, spec: &WorkerSpec) -> anyhow::Result<Box<dyn WorkerProcess>> {
        let exe = std::env::current_exe()?;
        let child = Command::new(exe)
            .env(WORKER_FD_ENV, spec.fd.to_string())
            .env(WORKER_INDEX_ENV, spec.index.to_string())
            .env(PARENT_PID_ENV, spec.parent_pid.to_string())
            .spawn()?;
        Ok(Box::new(ChildProcess { child }))
    }
}

struct ChildProcess {
    child: Child,
}

impl WorkerProcess for ChildProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn terminate(&mut self) -> anyhow::Result<()> {
        let rc = unsafe { libc::kill(self.child.id() as libc::pid_t, libc::SIGTERM) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            // ESRCH: the worker already exited.
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(err.into());
            }
        }
        Ok(())
    }

    fn join(&mut self) -> anyhow::Result<()> {
        self.child.wait()?;
        Ok(())
    }
}

/// Whether a process with the given pid still exists.
///
/// Signal 0 probes for existence without delivering anything; EPERM still
/// proves the process is there.
pub fn alive(pid: u32) -> bool {
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}
