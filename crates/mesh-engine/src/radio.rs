//! The `RadioPort` collaborator boundary (§6.1).
//!
//! Actual BLE scanning/advertising is platform I/O out of scope for this
//! crate (§6: Non-goals). `RadioPort` is the narrow async trait the engine
//! programs against; a real application wires a platform-specific adapter
//! behind it, and tests wire [`MockRadio`].

use async_trait::async_trait;

use crate::error::{EngineError, Result};

/// A single manufacturer-data advertisement to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub manufacturer_id: u16,
    pub payload: Vec<u8>,
}

/// The engine's view of the BLE peripheral/central, reduced to what the
/// protocol actually touches: start/stop a single advertisement, and poll
/// for inbound manufacturer-data sightings while scanning.
#[async_trait]
pub trait RadioPort: Send + Sync {
    /// Start advertising `ad`. Only one advertisement may be outstanding at
    /// a time (§6.1: "single-slot BLE peripheral resource"); callers must
    /// `stop_advertising` before starting a new one.
    async fn start_advertising(&self, ad: Advertisement) -> Result<()>;

    async fn stop_advertising(&self) -> Result<()>;

    /// Begin scanning for manufacturer-data advertisements. Implementations
    /// push sightings onto whatever channel the adapter was constructed
    /// with; this trait only models the lifecycle, not delivery.
    async fn start_scanning(&self) -> Result<()>;

    async fn stop_scanning(&self) -> Result<()>;
}

/// An in-memory `RadioPort` used by engine tests (§8.1): records every
/// advertise/scan lifecycle call so a test can assert on call order and
/// timing without a real adapter.
#[derive(Debug, Default)]
pub struct MockRadio {
    calls: tokio::sync::Mutex<Vec<MockRadioCall>>,
    fail_next: std::sync::atomic::AtomicBool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRadioCall {
    StartAdvertising(Advertisement),
    StopAdvertising,
    StartScanning,
    StopScanning,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<MockRadioCall> {
        self.calls.lock().await.clone()
    }

    /// Make the next radio call return `EngineError::Radio` (§7: transient
    /// radio errors), to exercise the engine's retry path.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn maybe_fail(&self) -> Result<()> {
        if self
            .fail_next
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(EngineError::Radio("mock radio injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RadioPort for MockRadio {
    async fn start_advertising(&self, ad: Advertisement) -> Result<()> {
        self.maybe_fail()?;
        self.calls.lock().await.push(MockRadioCall::StartAdvertising(ad));
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<()> {
        self.maybe_fail()?;
        self.calls.lock().await.push(MockRadioCall::StopAdvertising);
        Ok(())
    }

    async fn start_scanning(&self) -> Result<()> {
        self.maybe_fail()?;
        self.calls.lock().await.push(MockRadioCall::StartScanning);
        Ok(())
    }

    async fn stop_scanning(&self) -> Result<()> {
        self.maybe_fail()?;
        self.calls.lock().await.push(MockRadioCall::StopScanning);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_advertise_lifecycle() {
        let radio = MockRadio::new();
        let ad = Advertisement {
            manufacturer_id: 0x8888,
            payload: vec![1, 2, 3],
        };
        radio.start_advertising(ad.clone()).await.unwrap();
        radio.stop_advertising().await.unwrap();
        let calls = radio.calls().await;
        assert_eq!(
            calls,
            vec![
                MockRadioCall::StartAdvertising(ad),
                MockRadioCall::StopAdvertising,
            ]
        );
    }

    #[tokio::test]
    async fn fail_next_call_injects_one_error() {
        let radio = MockRadio::new();
        radio.fail_next_call();
        assert!(radio.start_scanning().await.is_err());
        assert!(radio.start_scanning().await.is_ok());
    }
}
