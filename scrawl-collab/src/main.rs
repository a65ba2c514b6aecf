use std::sync::Arc;
use std::time::Duration;

use log::info;

use scrawl_collab::{app, ArchiveConfig, ArchiveStore, ServerConfig};

#[tokio::main]
async fn main() {
    env_logger::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| String::from("3030"))
        .parse()
        .expect("unable to parse PORT");

    let expiry_days: u64 = std::env::var("EXPIRY_DAYS")
        .unwrap_or_else(|_| String::from("1"))
        .parse()
        .expect("unable to parse EXPIRY_DAYS");

    let archive = std::env::var("ARCHIVE_DIR").ok().map(|dir| {
        Arc::new(
            ArchiveStore::open(ArchiveConfig {
                root: dir.into(),
                ..ArchiveConfig::default()
            })
            .expect("unable to open ARCHIVE_DIR"),
        )
    });

    let idle_timeout = std::env::var("IDLE_TIMEOUT_SECS").ok().map(|secs| {
        Duration::from_secs(secs.parse().expect("unable to parse IDLE_TIMEOUT_SECS"))
    });

    let config = ServerConfig {
        quiescence: Duration::from_secs(expiry_days * 24 * 3600),
        idle_timeout,
        archive,
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("unable to bind");
    info!("scrawl-server listening on port {port}");
    axum::serve(listener, app(config))
        .await
        .expect("server error");
}
