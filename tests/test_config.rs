use std::sync::Mutex;

use porter::config::{Config, DEFAULT_MAX_CONNECTIONS};

// Env-var mutations race across test threads; serialize them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for var in [
        "PORTER_CONFIG",
        "PORTER_HOST",
        "PORTER_PORT",
        "PORTER_WORKERS",
        "PORTER_MAX_CONNECTIONS",
    ] {
        unsafe {
            std::env::remove_var(var);
        }
    }
}

#[test]
fn test_config_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = Config::load().unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.workers, 2);
    assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
    assert!(cfg.backlog.is_none());
    assert!(cfg.tls.is_none());
}

#[test]
fn test_config_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    unsafe {
        std::env::set_var("PORTER_HOST", "0.0.0.0");
        std::env::set_var("PORTER_PORT", "3000");
        std::env::set_var("PORTER_WORKERS", "8");
        std::env::set_var("PORTER_MAX_CONNECTIONS", "32");
    }

    let cfg = Config::load().unwrap();
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.workers, 8);
    assert_eq!(cfg.max_connections, 32);

    clear_env();
}

#[test]
fn test_config_from_yaml_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let path = std::env::temp_dir().join("porter-test-config.yaml");
    std::fs::write(
        &path,
        "host: 10.0.0.1\nport: 9000\nworkers: 4\nmax_connections: 64\nbacklog: 256\n",
    )
    .unwrap();
    unsafe {
        std::env::set_var("PORTER_CONFIG", &path);
    }

    let cfg = Config::load().unwrap();
    assert_eq!(cfg.host, "10.0.0.1");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.workers, 4);
    assert_eq!(cfg.max_connections, 64);
    assert_eq!(cfg.backlog, Some(256));

    clear_env();
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_config_env_overrides_yaml() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let path = std::env::temp_dir().join("porter-test-config-override.yaml");
    std::fs::write(&path, "host: 10.0.0.1\nport: 9000\n").unwrap();
    unsafe {
        std::env::set_var("PORTER_CONFIG", &path);
        std::env::set_var("PORTER_PORT", "9001");
    }

    let cfg = Config::load().unwrap();
    assert_eq!(cfg.host, "10.0.0.1");
    assert_eq!(cfg.port, 9001);

    clear_env();
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_config_tls_from_yaml() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let path = std::env::temp_dir().join("porter-test-config-tls.yaml");
    std::fs::write(
        &path,
        "tls:\n  cert: /etc/porter/cert.pem\n  key: /etc/porter/key.pem\n",
    )
    .unwrap();
    unsafe {
        std::env::set_var("PORTER_CONFIG", &path);
    }

    let cfg = Config::load().unwrap();
    let tls = cfg.tls.as_ref().unwrap();
    assert_eq!(tls.cert.to_str().unwrap(), "/etc/porter/cert.pem");
    assert_eq!(tls.key.to_str().unwrap(), "/etc/porter/key.pem");
    assert_eq!(cfg.scheme(), "https");

    clear_env();
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_config_addr_and_scheme() {
    let cfg = Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        ..Config::default()
    };
    assert_eq!(cfg.addr(), "127.0.0.1:8080");
    assert_eq!(cfg.scheme(), "http");
}
