use std::sync::Arc;

use bytes::Bytes;

use porter::app::{Application, BodyChunks, Environ, ResponseBody};
use porter::config::Config;
use porter::http::response::{ResponseProtocol, StatusCode};
use porter::server::supervisor::Supervisor;
use porter::server::worker::Worker;

/// Sample application: says hello and echoes the request method.
struct HelloApp;

impl Application for HelloApp {
    fn call(
        &self,
        environ: &Environ,
        protocol: &mut ResponseProtocol,
    ) -> anyhow::Result<Box<dyn ResponseBody>> {
        protocol.declare(
            StatusCode::Ok,
            vec![("Content-Type".to_string(), "text/plain".to_string())],
            None,
        )?;

        let method = environ.var("REQUEST_METHOD").unwrap_or("").to_string();
        Ok(Box::new(BodyChunks::new([
            Bytes::from_static(b"Hello world!\n"),
            Bytes::from(format!("You sent a {} request", method)),
        ])))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let config = Config::load()?;
    let app: Arc<dyn Application> = Arc::new(HelloApp);

    // The supervisor re-executes this binary in worker mode; both roles
    // share one entry point.
    if let Some(worker) = Worker::from_env(app, &config)? {
        return worker.start();
    }

    let mut supervisor = Supervisor::new(config);
    supervisor.start(true)
}
