//! BLE scan loop (§4.8).
//!
//! Some platform BLE stacks silently stop delivering scan results after a
//! long continuous scan window, so the loop periodically stops and
//! restarts scanning rather than starting it once and assuming it keeps
//! working forever. The restart delay is randomized for the same
//! anti-collision reason advertising is jittered (§4.3).

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::radio::RadioPort;

/// Runs the scan-window/restart cycle until cancelled. Intended to be
/// spawned as its own task by the engine; does not return on success.
pub async fn run_scan_loop<R: RadioPort>(
    radio: Arc<R>,
    window_secs: u64,
    restart_range_ms: (u64, u64),
) {
    loop {
        if let Err(e) = radio.start_scanning().await {
            warn!(error = %e, "scan start failed, retrying after restart delay");
        } else {
            info!("scan started");
            sleep(Duration::from_secs(window_secs)).await;
            if let Err(e) = radio.stop_scanning().await {
                warn!(error = %e, "scan stop failed");
            }
        }

        let restart_delay = {
            let mut rng = rand::thread_rng();
            rng.gen_range(restart_range_ms.0..=restart_range_ms.1)
        };
        sleep(Duration::from_millis(restart_delay)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::MockRadio;

    #[tokio::test(start_paused = true)]
    async fn scan_loop_cycles_start_and_stop() {
        let radio = Arc::new(MockRadio::new());
        let handle = {
            let radio = radio.clone();
            tokio::spawn(async move { run_scan_loop(radio, 10, (100, 100)).await })
        };

        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        let calls = radio.calls().await;
        assert!(calls.len() >= 2);
        handle.abort();
    }
}
