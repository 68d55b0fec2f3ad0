//! One concurrent unit of generated load.
//!
//! A session picks a single resource from the shared popularity model,
//! fetches it over its own private connection, reports the outcome, and
//! terminates. There are no retries; any classified outcome is terminal.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::sync::mpsc;

use crate::fetch::{Fetcher, Outcome};
use crate::popularity::PopularitySelector;

/// A single client session.
#[derive(Debug)]
pub struct Session {
    id: u64,
    seed: u64,
    host: String,
    port: u16,
    selector: Arc<PopularitySelector>,
    outcomes: mpsc::Sender<Outcome>,
}

impl Session {
    /// Creates a session with its identifier and private random seed.
    ///
    /// Seeds are handed out by the orchestrator's master generator, so a
    /// run's resource selection stays reproducible no matter how the session
    /// tasks interleave.
    pub fn new(
        id: u64,
        seed: u64,
        host: impl Into<String>,
        port: u16,
        selector: Arc<PopularitySelector>,
        outcomes: mpsc::Sender<Outcome>,
    ) -> Self {
        Self {
            id,
            seed,
            host: host.into(),
            port,
            selector,
            outcomes,
        }
    }

    /// Runs the session to completion.
    ///
    /// Never fails: every terminal state, including transport errors, is
    /// reported as an outcome record.
    pub async fn run(self) {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let path = format!("/{}", self.selector.choose(&mut rng));

        let mut fetcher = Fetcher::new(self.id, self.host, self.port);
        let outcome = fetcher.get(&path).await;
        tracing::debug!(session = self.id, %path, class = outcome.class, "session finished");

        // The receiver outlives the join barrier, so a send error only means
        // the run has already been torn down.
        let _ = self.outcomes.send(outcome).await;
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn reports_exactly_one_outcome() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello")
                .await
                .unwrap();
        });

        let selector = Arc::new(PopularitySelector::new(10, 1.0));
        let (tx, mut rx) = mpsc::channel(1);

        let session = Session::new(7, 42, addr.ip().to_string(), addr.port(), selector, tx);
        session.run().await;

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.session, 7);
        assert_eq!(outcome.class, 200);
        assert!(outcome.path.starts_with("/file"));
        // sender dropped with the session, exactly one record
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn same_seed_selects_the_same_resource() {
        let selector = Arc::new(PopularitySelector::new(1000, 1.0));
        let mut a = SmallRng::seed_from_u64(9);
        let mut b = SmallRng::seed_from_u64(9);
        assert_eq!(selector.choose(&mut a), selector.choose(&mut b));
    }
}
