use super::{Rendezvous, RendezvousError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// In-process rendezvous table
///
/// Also the backing store of the HTTP rendezvous service.
#[derive(Debug)]
pub struct InMemoryRendezvous {
    ttl: Duration,
    topics: RwLock<HashMap<String, HashMap<SocketAddr, Instant>>>,
}

impl InMemoryRendezvous {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            topics: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Records an announcement
    pub fn insert(&self, topic: &str, addr: SocketAddr) {
        let expires = Instant::now() + self.ttl;
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .insert(addr, expires);
    }

    /// Live addresses under `topic`, sorted
    pub fn live(&self, topic: &str) -> Vec<SocketAddr> {
        let now = Instant::now();
        let topics = self.topics.read();
        let mut peers: Vec<SocketAddr> = topics
            .get(topic)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, expires)| **expires > now)
                    .map(|(addr, _)| *addr)
                    .collect()
            })
            .unwrap_or_default();
        peers.sort_unstable();
        peers
    }

    /// Drops expired entries and empty topics
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut topics = self.topics.write();
        topics.retain(|_, entries| {
            entries.retain(|_, expires| *expires > now);
            !entries.is_empty()
        });
    }
}

impl Default for InMemoryRendezvous {
    fn default() -> Self {
        Self::new(Duration::from_millis(super::DEFAULT_TTL_MS))
    }
}

#[async_trait]
impl Rendezvous for InMemoryRendezvous {
    async fn announce(&self, topic: &str, addr: SocketAddr) -> Result<(), RendezvousError> {
        self.insert(topic, addr);
        Ok(())
    }

    async fn lookup(&self, topic: &str) -> Result<Vec<SocketAddr>, RendezvousError> {
        Ok(self.live(topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn test_announce_and_lookup() {
        let rendezvous = InMemoryRendezvous::default();
        rendezvous.announce("exchange_orders", addr(2)).await.unwrap();
        rendezvous.announce("exchange_orders", addr(1)).await.unwrap();
        rendezvous.announce("exchange_orders", addr(1)).await.unwrap();
        rendezvous.announce("other", addr(3)).await.unwrap();

        assert_eq!(
            rendezvous.lookup("exchange_orders").await.unwrap(),
            vec![addr(1), addr(2)]
        );
        assert!(rendezvous.lookup("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let rendezvous = InMemoryRendezvous::new(Duration::from_millis(50));
        rendezvous.announce("t", addr(1)).await.unwrap();
        assert_eq!(rendezvous.lookup("t").await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(rendezvous.lookup("t").await.unwrap().is_empty());

        rendezvous.purge_expired();
        assert!(rendezvous.topics.read().is_empty());
    }

    #[tokio::test]
    async fn test_reannounce_refreshes() {
        let rendezvous = InMemoryRendezvous::new(Duration::from_millis(150));
        rendezvous.announce("t", addr(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        rendezvous.announce("t", addr(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(rendezvous.lookup("t").await.unwrap(), vec![addr(1)]);
    }
}
