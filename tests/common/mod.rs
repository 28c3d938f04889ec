//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use secrecy::SecretString;
use thumbledger::app::App;
use thumbledger::store::{BlobStore, FsStore, StoredObject, UploadSigner};
use thumbledger::trigger::IngestDispatcher;

pub const BUCKET: &str = "test-bucket";
pub const MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Image whose pixel at (x, y) is `[x*10, y*10, 7]`, so crops can be checked
/// by position.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 7]))
}

pub fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Jpeg)
}

/// Poll `store` until `key` exists.
pub async fn wait_for(store: &dyn BlobStore, key: &str) -> StoredObject {
    for _ in 0..200 {
        if let Some(object) = store.get(key, MAX_BYTES).await.unwrap() {
            return object;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("{key} never appeared");
}

/// A running server on a temp-dir store.
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<dyn BlobStore>,
    pub client: reqwest::Client,
    _dir: tempfile::TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

pub async fn spawn_server(stage: Option<&str>) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let signer = Arc::new(UploadSigner::new(
        SecretString::from("integration-secret"),
        format!("http://{addr}"),
    ));
    let store: Arc<dyn BlobStore> = Arc::new(
        FsStore::open(BUCKET, dir.path().join(BUCKET), Arc::clone(&signer))
            .await
            .unwrap(),
    );

    let app = App::with_store(Arc::clone(&store), signer, "todos.json", "todo-images", MAX_BYTES);
    let (ingest, dispatcher) = IngestDispatcher::new(Arc::clone(&app.normalizer));
    tokio::spawn(dispatcher.run());

    let router = match stage {
        Some(stage) => thumbledger::http::router(
            thumbledger::http::AppState {
                ledger: Arc::clone(&app.ledger),
                issuer: Arc::clone(&app.issuer),
            },
            None,
            Some(stage),
        ),
        None => app.router(Some(ingest)),
    };
    tokio::spawn(thumbledger::http::serve(listener, router, std::future::pending()));

    TestServer {
        addr,
        store,
        client: reqwest::Client::new(),
        _dir: dir,
    }
}
