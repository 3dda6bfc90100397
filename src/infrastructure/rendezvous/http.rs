//! HTTP rendezvous service and client
//!
//! ## 端点
//! - `POST /announce` `{topic, addr}` → 204
//! - `POST /lookup` `{topic}` → `["ip:port", ...]`
//! - `GET /health` → 200

use super::memory::InMemoryRendezvous;
use super::{Rendezvous, RendezvousError};
use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceRequest {
    pub topic: String,
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRequest {
    pub topic: String,
}

/// Routes of the rendezvous service over a shared table
pub fn rendezvous_router(store: Arc<InMemoryRendezvous>) -> Router {
    Router::new()
        .route("/announce", post(announce_handler))
        .route("/lookup", post(lookup_handler))
        .route("/health", get(|| async { StatusCode::OK }))
        .with_state(store)
}

async fn announce_handler(
    State(store): State<Arc<InMemoryRendezvous>>,
    Json(request): Json<AnnounceRequest>,
) -> StatusCode {
    match request.addr.parse::<SocketAddr>() {
        Ok(addr) => {
            store.insert(&request.topic, addr);
            debug!(topic = %request.topic, %addr, "announce");
            StatusCode::NO_CONTENT
        }
        Err(_) => StatusCode::BAD_REQUEST,
    }
}

async fn lookup_handler(
    State(store): State<Arc<InMemoryRendezvous>>,
    Json(request): Json<LookupRequest>,
) -> Json<Vec<String>> {
    Json(
        store
            .live(&request.topic)
            .into_iter()
            .map(|addr| addr.to_string())
            .collect(),
    )
}

/// Serves the rendezvous API until `shutdown` fires
///
/// Expired entries are purged once per TTL.
pub async fn serve(
    listener: TcpListener,
    store: Arc<InMemoryRendezvous>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!("rendezvous listening on {}", listener.local_addr()?);

    let purge_store = Arc::clone(&store);
    let purge_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_store.ttl().max(Duration::from_millis(10)));
        loop {
            tokio::select! {
                _ = purge_shutdown.cancelled() => break,
                _ = interval.tick() => purge_store.purge_expired(),
            }
        }
    });

    axum::serve(listener, rendezvous_router(store))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Client for the HTTP rendezvous service
#[derive(Debug, Clone)]
pub struct HttpRendezvous {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRendezvous {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RendezvousError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Rendezvous for HttpRendezvous {
    async fn announce(&self, topic: &str, addr: SocketAddr) -> Result<(), RendezvousError> {
        self.client
            .post(format!("{}/announce", self.base_url))
            .json(&AnnounceRequest {
                topic: topic.to_string(),
                addr: addr.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn lookup(&self, topic: &str) -> Result<Vec<SocketAddr>, RendezvousError> {
        let addrs: Vec<String> = self
            .client
            .post(format!("{}/lookup", self.base_url))
            .json(&LookupRequest {
                topic: topic.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        addrs
            .into_iter()
            .map(|addr| {
                addr.parse()
                    .map_err(|_| RendezvousError::InvalidAddress(addr))
            })
            .collect()
    }
}
