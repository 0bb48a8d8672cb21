use nexar_bootstrap::Bootstrap;
use std::sync::Arc;

/// Helper: run one closure per rank of a loopback session concurrently,
/// then close every session. Closing fails the test if a rank left
/// unclaimed messages behind.
pub async fn run_ranks<F, Fut>(world_size: u32, f: F)
where
    F: Fn(Arc<Bootstrap>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let sessions = Bootstrap::bootstrap_local(world_size).await.unwrap();
    let sessions: Vec<Arc<Bootstrap>> = sessions.into_iter().map(Arc::new).collect();

    let f = Arc::new(f);
    let mut handles = Vec::new();
    for s in &sessions {
        let s = Arc::clone(s);
        let f = Arc::clone(&f);
        handles.push(tokio::spawn(async move { f(s).await }));
    }
    for h in handles {
        h.await.unwrap();
    }

    for s in sessions {
        let s = Arc::try_unwrap(s)
            .ok()
            .expect("rank task still holds its session");
        s.close().await.unwrap();
    }
}
