//! Anti-collision advertising (§4.3, §6.1, I3, P2).
//!
//! The BLE peripheral can hold exactly one outgoing advertisement at a
//! time. Every frame this node originates or relays — announce, message,
//! sos, direct, friendRequest, ack — funnels through [`AdvertiseSlot`] so
//! two sends never race for the hardware. A send waits a small random
//! pre-jitter before claiming the slot (so a burst of simultaneous local
//! triggers doesn't all key down at once), holds it for the broadcast
//! window, then quiesces briefly before releasing, giving the radio time
//! to actually stop before the next start.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Result;
use crate::radio::{Advertisement, RadioPort};

/// Serializes access to the single BLE advertising slot.
pub struct AdvertiseSlot<R: RadioPort> {
    radio: Arc<R>,
    lock: Mutex<()>,
    pre_jitter_range_ms: (u64, u64),
    window_ms: u64,
    quiesce_ms: u64,
}

impl<R: RadioPort> AdvertiseSlot<R> {
    pub fn new(
        radio: Arc<R>,
        pre_jitter_range_ms: (u64, u64),
        window_ms: u64,
        quiesce_ms: u64,
    ) -> Self {
        Self {
            radio,
            lock: Mutex::new(()),
            pre_jitter_range_ms,
            window_ms,
            quiesce_ms,
        }
    }

    /// Advertise `payload` for this node's broadcast window, then quiesce.
    /// Waits for a random pre-jitter delay and for the slot to free up
    /// before claiming it; only one call runs the hold-and-release body at
    /// a time.
    pub async fn advertise(&self, manufacturer_id: u16, payload: Vec<u8>) -> Result<()> {
        let pre_jitter = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.pre_jitter_range_ms.0..=self.pre_jitter_range_ms.1)
        };
        sleep(Duration::from_millis(pre_jitter)).await;

        let _permit = self.lock.lock().await;
        debug!(len = payload.len(), "claiming advertising slot");
        let ad = Advertisement {
            manufacturer_id,
            payload,
        };
        if let Err(e) = self.radio.start_advertising(ad).await {
            warn!(error = %e, "advertise start failed, releasing slot");
            return Err(e);
        }
        sleep(Duration::from_millis(self.window_ms)).await;
        self.radio.stop_advertising().await?;
        sleep(Duration::from_millis(self.quiesce_ms)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::MockRadio;

    #[tokio::test(start_paused = true)]
    async fn single_advertise_completes_lifecycle() {
        let radio = Arc::new(MockRadio::new());
        let slot = AdvertiseSlot::new(radio.clone(), (0, 0), 1500, 150);
        slot.advertise(0x8888, vec![1, 2, 3]).await.unwrap();
        let calls = radio.calls().await;
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_advertises_are_serialized() {
        let radio = Arc::new(MockRadio::new());
        let slot = Arc::new(AdvertiseSlot::new(radio.clone(), (0, 0), 100, 10));

        let a = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.advertise(0x8888, vec![1]).await })
        };
        let b = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.advertise(0x8888, vec![2]).await })
        };

        tokio::time::advance(Duration::from_millis(500)).await;
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let calls = radio.calls().await;
        // Each advertise does start+stop; with serialization there is no
        // interleaving of two starts before a stop.
        assert_eq!(calls.len(), 4);
    }
}
