use std::net::SocketAddr;
use std::path::PathBuf;

use thumbledger::config::Config;
use thumbledger::config::secrets::ExposeSecret;

const VARS: [&str; 6] = [
    "BUCKET_NAME",
    "UPLOAD_SIGNING_SECRET",
    "TODO_OBJECT_KEY",
    "API_STAGE",
    "MAX_OBJECT_BYTES",
    "LISTEN_ADDR",
];

fn clear() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

// Environment variables are process-wide, so every scenario runs in one test.
#[test]
fn config_from_env() {
    clear();
    assert!(Config::from_env().is_err(), "required vars are missing");

    unsafe {
        std::env::set_var("BUCKET_NAME", "my-bucket");
        std::env::set_var("UPLOAD_SIGNING_SECRET", "s3cr3t");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.bucket_name, "my-bucket");
    assert_eq!(config.upload_signing_secret.expose_secret(), "s3cr3t");
    assert_eq!(config.todo_object_key, "todos.json");
    assert_eq!(config.upload_collection, "todo-images");
    assert_eq!(config.api_stage, None);
    assert_eq!(config.max_object_bytes, 20 * 1024 * 1024);
    assert_eq!(config.listen_addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
    assert!(!config.log_level.is_empty());
    assert!(config.bucket_dir().ends_with(PathBuf::from("my-bucket")));
    assert!(!format!("{config:?}").contains("s3cr3t"));

    unsafe {
        std::env::set_var("TODO_OBJECT_KEY", "ledger/tasks.json");
        std::env::set_var("API_STAGE", "/prod/");
        std::env::set_var("MAX_OBJECT_BYTES", "1024");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.todo_object_key, "ledger/tasks.json");
    assert_eq!(config.api_stage.as_deref(), Some("prod"));
    assert_eq!(config.max_object_bytes, 1024);

    unsafe { std::env::set_var("LISTEN_ADDR", "not an address") };
    assert!(Config::from_env().is_err());

    clear();
}
