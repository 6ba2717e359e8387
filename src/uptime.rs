//! Background uptime gauge: a 1 Hz ticker updating `csilvm_uptime_seconds`
//! until explicitly stopped.

use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct UptimeReporter {
    stop_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<()>,
}

impl UptimeReporter {
    pub fn spawn() -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let start = Instant::now();

        let join_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        crate::metrics::set_uptime(start.elapsed().as_secs_f64());
                    }
                    _ = &mut stop_rx => break,
                }
            }
        });

        Self { stop_tx, join_handle }
    }

    /// Stops the ticker and waits for the worker to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.join_handle.await;
    }
}
