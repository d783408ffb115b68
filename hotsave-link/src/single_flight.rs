//! Coalesces bursts of identical queries into one in-flight call.
//!
//! Within the cooldown window every caller asking the same command shares
//! the first caller's call and result. Transport failures are not cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use hotsave_core::QueryResponse;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::query::QueryClient;

struct Flight {
    started: Instant,
    result: Arc<OnceCell<QueryResponse>>,
}

impl Flight {
    fn reusable(&self, cooldown: Duration) -> bool {
        // An unfinished call is always joined, however old.
        !self.result.initialized() || self.started.elapsed() < cooldown
    }
}

pub struct SingleFlight {
    client: QueryClient,
    cooldown: Duration,
    flights: Mutex<HashMap<String, Flight>>,
}

impl SingleFlight {
    pub fn new(client: QueryClient, cooldown: Duration) -> Self {
        Self {
            client,
            cooldown,
            flights: Mutex::new(HashMap::new()),
        }
    }

    pub async fn query(&self, command: &str) -> QueryResponse {
        let result = self.flight_for(command);
        let response = result
            .get_or_init(|| self.client.query(command))
            .await
            .clone();

        if response.is_transport_failure() {
            let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
            if flights
                .get(command)
                .is_some_and(|flight| Arc::ptr_eq(&flight.result, &result))
            {
                flights.remove(command);
            }
        }
        response
    }

    fn flight_for(&self, command: &str) -> Arc<OnceCell<QueryResponse>> {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        flights.retain(|_, flight| flight.reusable(self.cooldown));

        if let Some(flight) = flights.get(command) {
            tracing::trace!(command, "joining in-flight query");
            return flight.result.clone();
        }

        let result = Arc::new(OnceCell::new());
        flights.insert(
            command.to_string(),
            Flight {
                started: Instant::now(),
                result: result.clone(),
            },
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Counts connections; answers each after a short pause.
    async fn counting_daemon() -> (std::net::SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::spawn(async move {
                    let mut buf = [0u8; 256];
                    let _ = socket.read(&mut buf).await;
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    let _ = socket.write_all(format!("OK:call-{n}").as_bytes()).await;
                });
            }
        });
        (addr, hits)
    }

    #[tokio::test]
    async fn concurrent_identical_queries_share_one_call() {
        let (addr, hits) = counting_daemon().await;
        let flight = Arc::new(SingleFlight::new(
            QueryClient::new(addr, "app", "sock"),
            Duration::from_secs(5),
        ));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let flight = flight.clone();
            handles.push(tokio::spawn(async move { flight.query("LIST_CONFIGS").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.expect("join").as_str(), "OK:call-1");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Within the cooldown the cached result is served.
        assert_eq!(flight.query("LIST_CONFIGS").await.as_str(), "OK:call-1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // A different command is its own flight.
        assert_eq!(flight.query("LIST_WORLDS 0").await.as_str(), "OK:call-2");
    }

    #[tokio::test]
    async fn expired_results_are_refetched() {
        let (addr, hits) = counting_daemon().await;
        let flight = SingleFlight::new(
            QueryClient::new(addr, "app", "sock"),
            Duration::from_millis(50),
        );

        assert_eq!(flight.query("LIST_CONFIGS").await.as_str(), "OK:call-1");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(flight.query("LIST_CONFIGS").await.as_str(), "OK:call-2");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transport_failures_are_not_cached() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let flight = SingleFlight::new(QueryClient::new(addr, "app", "sock"), Duration::from_secs(5));
        assert!(flight.query("LIST_CONFIGS").await.is_transport_failure());
        assert!(flight.flights.lock().expect("lock").is_empty());
    }
}
