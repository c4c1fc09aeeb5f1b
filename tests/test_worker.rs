use std::net::TcpListener;
use std::os::fd::IntoRawFd;
use std::process::Command;
use std::sync::{Arc, Mutex};

use porter::app::{Application, BodyChunks, Environ, ResponseBody};
use porter::config::Config;
use porter::http::response::ResponseProtocol;
use porter::server::process;
use porter::server::worker::Worker;

// Env-var mutations race across test threads; serialize them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

struct NoopApp;

impl Application for NoopApp {
    fn call(
        &self,
        _environ: &Environ,
        _protocol: &mut ResponseProtocol,
    ) -> anyhow::Result<Box<dyn ResponseBody>> {
        Ok(Box::new(BodyChunks::empty()))
    }
}

#[test]
fn test_alive_for_own_process() {
    assert!(process::alive(std::process::id()));
}

#[test]
fn test_alive_false_for_reaped_child() {
    let mut child = Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();

    assert!(!process::alive(pid));
}

#[test]
fn test_from_env_none_outside_worker_mode() {
    let _guard = ENV_LOCK.lock().unwrap();
    unsafe {
        std::env::remove_var("PORTER_WORKER_FD");
    }

    let worker = Worker::from_env(Arc::new(NoopApp), &Config::default()).unwrap();
    assert!(worker.is_none());
}

#[test]
fn test_from_env_reconstructs_worker() {
    let _guard = ENV_LOCK.lock().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let fd = listener.into_raw_fd();

    unsafe {
        std::env::set_var("PORTER_WORKER_FD", fd.to_string());
        std::env::set_var("PORTER_WORKER_INDEX", "3");
        std::env::set_var("PORTER_PARENT_PID", std::process::id().to_string());
    }

    let worker = Worker::from_env(Arc::new(NoopApp), &Config::default()).unwrap();
    assert!(worker.is_some());

    unsafe {
        std::env::remove_var("PORTER_WORKER_FD");
        std::env::remove_var("PORTER_WORKER_INDEX");
        std::env::remove_var("PORTER_PARENT_PID");
    }
}
