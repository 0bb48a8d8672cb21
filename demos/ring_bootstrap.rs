//! Bootstrap a 4-rank ring inside one process.
//!
//! Every rank exchanges its hostname-style label over the ring, then the
//! ranks pass a message around with point-to-point sends and meet at a
//! barrier.
//!
//! ```bash
//! RUST_LOG=nexar_bootstrap=debug cargo run --example ring_bootstrap
//! ```

use nexar_bootstrap::Bootstrap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const WORLD: u32 = 4;
const LABEL: usize = 16;
const TOKEN_TAG: u32 = 7;

#[tokio::main]
async fn main() -> nexar_bootstrap::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let sessions: Vec<Arc<Bootstrap>> = Bootstrap::bootstrap_local(WORLD)
        .await?
        .into_iter()
        .map(Arc::new)
        .collect();

    let mut tasks = Vec::new();
    for b in &sessions {
        let b = Arc::clone(b);
        tasks.push(tokio::spawn(async move {
            let rank = b.rank();

            // Fixed-size label per rank, gathered over the ring.
            let mut labels = vec![0u8; WORLD as usize * LABEL];
            let mine = format!("worker-{rank}");
            let off = rank as usize * LABEL;
            labels[off..off + mine.len()].copy_from_slice(mine.as_bytes());
            b.all_gather(&mut labels, LABEL).await?;

            // Pass a counter once around the ring.
            let next = (rank + 1) % WORLD;
            let prev = (rank + WORLD - 1) % WORLD;
            let mut token = [0u8; 4];
            if rank == 0 {
                b.send(next, TOKEN_TAG, &1u32.to_le_bytes()).await?;
                b.recv(prev, TOKEN_TAG, &mut token).await?;
                println!("token came back with {} hops", u32::from_le_bytes(token));
            } else {
                b.recv(prev, TOKEN_TAG, &mut token).await?;
                let hops = u32::from_le_bytes(token) + 1;
                b.send(next, TOKEN_TAG, &hops.to_le_bytes()).await?;
            }

            b.barrier_all(1).await?;
            if rank == 0 {
                for (r, label) in labels.chunks(LABEL).enumerate() {
                    let end = label.iter().position(|&c| c == 0).unwrap_or(LABEL);
                    println!(
                        "rank {r}: {} at {}",
                        String::from_utf8_lossy(&label[..end]),
                        b.peer_addrs()[r]
                    );
                }
            }
            Ok::<_, nexar_bootstrap::BootstrapError>(())
        }));
    }
    for t in tasks {
        t.await
            .map_err(|e| nexar_bootstrap::BootstrapError::transport_with_source("rank task", e))??;
    }

    for b in sessions {
        if let Ok(b) = Arc::try_unwrap(b) {
            b.close().await?;
        }
    }
    Ok(())
}
