// Memcached client integration tests
//
// Run the real text-protocol client against loopback fake servers.

mod helpers;

use helpers::{file_names, write_gz, FakeMemcached};
use memc_common::{DeviceType, UserApps};
use memc_load::backend::MemcacheClient;
use memc_load::{
    BackendConfig, BackendError, CacheBackend, LoaderConfig, MemcacheConnector, PipelineDriver,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn fast_backend() -> BackendConfig {
    BackendConfig {
        connect_timeout: Duration::from_millis(500),
        io_timeout: Duration::from_millis(500),
        connect_retries: 1,
    }
}

#[tokio::test]
async fn test_client_stores_values() {
    let server = FakeMemcached::start().await;
    let mut client = MemcacheClient::new(server.address.clone(), fast_backend());

    client.put("idfa:abc", b"first").await.unwrap();
    client.put("idfa:def", b"second").await.unwrap();
    // Overwrites like memcached's set
    client.put("idfa:abc", b"third").await.unwrap();

    assert!(client.is_connected());
    assert_eq!(server.value("idfa:abc").unwrap(), b"third");
    assert_eq!(server.value("idfa:def").unwrap(), b"second");
    assert_eq!(server.len(), 2);
}

#[tokio::test]
async fn test_unexpected_reply_is_a_failed_put() {
    let server = FakeMemcached::start_with_reply("SERVER_ERROR out of memory").await;
    let mut client = MemcacheClient::new(server.address.clone(), fast_backend());

    let err = client.put("gaid:abc", b"value").await.unwrap_err();

    match err {
        BackendError::Rejected { reply, .. } => assert_eq!(reply, "SERVER_ERROR out of memory"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_pipeline_writes_through_memcached_protocol() {
    let servers = [
        FakeMemcached::start().await,
        FakeMemcached::start().await,
        FakeMemcached::start().await,
        FakeMemcached::start().await,
    ];
    let dir = TempDir::new().unwrap();
    write_gz(
        dir.path(),
        "a.tsv.gz",
        "idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23\n\
         gaid\t7rfw452y52g2gq4g\t55.55\t42.42\t7423,424\n\
         adid\tadid-1\t-1.5\t2.25\t\n\
         dvid\tdvid-1\t0\t0\t9,notanumber\n",
    );

    let config = DeviceType::ALL
        .into_iter()
        .zip(&servers)
        .fold(LoaderConfig::new(), |config, (device, server)| {
            config.with_endpoint(device, Some(server.address.clone()))
        })
        .with_pattern(format!("{}/*.tsv.gz", dir.path().display()))
        .with_backend(fast_backend());
    let connector = Arc::new(MemcacheConnector::new(config.backend.clone()));

    let summary = PipelineDriver::new(config, connector).unwrap().run().await.unwrap();

    assert_eq!(summary.processed(), 4);
    assert_eq!(summary.errors(), 0);
    assert_eq!(file_names(dir.path()), vec![".a.tsv.gz"]);

    let [idfa, gaid, adid, dvid] = &servers;
    let value = UserApps::decode_value(&idfa.value("idfa:1rfw452y52g2gq4g").unwrap()).unwrap();
    assert_eq!(value.apps, vec![1423, 43, 567, 3, 7, 23]);
    assert_eq!(value.lat, Some(55.55));

    assert!(gaid.value("gaid:7rfw452y52g2gq4g").is_some());

    let value = UserApps::decode_value(&adid.value("adid:adid-1").unwrap()).unwrap();
    assert!(value.apps.is_empty());
    assert_eq!((value.lat, value.lon), (Some(-1.5), Some(2.25)));

    let value = UserApps::decode_value(&dvid.value("dvid:dvid-1").unwrap()).unwrap();
    assert_eq!(value.apps, vec![9]);
}

#[tokio::test]
async fn test_unreachable_cache_counts_write_failures() {
    // Bind then drop to get a local port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = listener.local_addr().unwrap().to_string();
    drop(listener);

    let dir = TempDir::new().unwrap();
    write_gz(
        dir.path(),
        "a.tsv.gz",
        "idfa\ta\t1\t2\t1\nidfa\tb\t1\t2\t2\n",
    );

    let config = LoaderConfig::new()
        .with_pattern(format!("{}/*.tsv.gz", dir.path().display()))
        .with_endpoint(DeviceType::Idfa, Some(dead))
        .with_backend(BackendConfig {
            connect_timeout: Duration::from_millis(100),
            io_timeout: Duration::from_millis(100),
            connect_retries: 0,
        });
    let connector = Arc::new(MemcacheConnector::new(config.backend.clone()));

    let summary = PipelineDriver::new(config, connector).unwrap().run().await.unwrap();

    let outcome = &summary.files[0].outcome;
    assert_eq!(outcome.processed(), 2);
    assert_eq!(outcome.write_failures(), 2);
    assert!(!summary.files[0].verdict.is_acceptable());
}
