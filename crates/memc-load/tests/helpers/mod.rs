//! Test helpers for memc-load integration tests
//!
//! - gzip fixture files in a scratch directory
//! - an in-memory connector that records every put
//! - a loopback fake memcached speaking the `set` command

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use memc_common::DeviceType;
use memc_load::{BackendConnector, BackendError, CacheBackend};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

pub type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// Write `body` gzip-compressed to `dir/name`
pub fn write_gz(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, gzip(body)).expect("Failed to write fixture");
    path
}

pub fn gzip(body: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).expect("Failed to compress");
    encoder.finish().expect("Failed to finish gzip stream")
}

/// Names of the files left in `dir`, sorted
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|entry| entry.expect("Bad dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// One line per record in the input format
pub fn line(device: &str, id: &str, apps: &str) -> String {
    format!("{device}\t{id}\t55.55\t42.42\t{apps}\n")
}

/// Connector whose backends store into a shared map
#[derive(Default)]
pub struct RecordingConnector {
    pub store: Store,
    /// Puts for these keys fail
    pub fail_keys: HashSet<String>,
    /// Every (device, address) a handle was opened for
    pub connections: Arc<Mutex<Vec<(DeviceType, String)>>>,
}

impl RecordingConnector {
    pub fn failing(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.store.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.store.lock().unwrap().get(key).cloned()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }
}

impl BackendConnector for RecordingConnector {
    fn connect(&self, device: DeviceType, address: &str) -> Box<dyn CacheBackend> {
        self.connections
            .lock()
            .unwrap()
            .push((device, address.to_string()));
        Box::new(RecordingBackend {
            address: address.to_string(),
            store: self.store.clone(),
            fail_keys: self.fail_keys.clone(),
        })
    }
}

struct RecordingBackend {
    address: String,
    store: Store,
    fail_keys: HashSet<String>,
}

#[async_trait]
impl CacheBackend for RecordingBackend {
    fn address(&self) -> &str {
        &self.address
    }

    async fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        if self.fail_keys.contains(key) {
            return Err(BackendError::Rejected {
                address: self.address.clone(),
                reply: "SERVER_ERROR".to_string(),
            });
        }
        self.store
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Loopback server answering `set` with `STORED`, or `reply` when given
pub struct FakeMemcached {
    pub address: String,
    pub store: Store,
}

impl FakeMemcached {
    pub async fn start() -> Self {
        Self::start_with_reply("STORED").await
    }

    pub async fn start_with_reply(reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake memcached");
        let address = listener.local_addr().expect("No local addr").to_string();
        let store = Store::default();

        let server_store = store.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let store = server_store.clone();
                tokio::spawn(async move {
                    let (read, mut write) = socket.into_split();
                    let mut reader = BufReader::new(read);
                    let mut header = String::new();

                    loop {
                        header.clear();
                        if reader.read_line(&mut header).await.unwrap_or(0) == 0 {
                            break;
                        }
                        let parts: Vec<&str> = header.split_whitespace().collect();
                        let ["set", key, _flags, _exptime, len] = parts.as_slice() else {
                            let _ = write.write_all(b"ERROR\r\n").await;
                            continue;
                        };
                        let len: usize = len.parse().expect("Bad length");

                        let mut data = vec![0u8; len + 2];
                        if reader.read_exact(&mut data).await.is_err() {
                            break;
                        }
                        data.truncate(len);

                        if reply == "STORED" {
                            store.lock().unwrap().insert(key.to_string(), data);
                        }
                        let _ = write.write_all(format!("{reply}\r\n").as_bytes()).await;
                    }
                });
            }
        });

        Self { address, store }
    }

    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.store.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }
}
