//! Scripted transport for exercising the handle, reader, and loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::device::{ClaimedInterface, DeviceId, UsbBackend};
use crate::error::{HidError, HidResult};
use crate::shutdown::Shutdown;

#[derive(Default)]
struct Script {
    reads: VecDeque<rusb::Result<Vec<u8>>>,
    failing_opens: u32,
    opens: u32,
    releases: u32,
    live_claims: u32,
    max_live_claims: u32,
    reads_attempted: u32,
    stop_when_drained: Option<Shutdown>,
}

/// Backend whose reads and opens come from a queue.
///
/// Once the read queue is empty every read times out and, if configured,
/// triggers the shutdown so the loop under test exits.
#[derive(Clone, Default)]
pub(crate) struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_report(&self, bytes: &[u8]) {
        self.script.lock().reads.push_back(Ok(bytes.to_vec()));
    }

    pub(crate) fn push_error(&self, err: rusb::Error) {
        self.script.lock().reads.push_back(Err(err));
    }

    pub(crate) fn fail_next_opens(&self, count: u32) {
        self.script.lock().failing_opens = count;
    }

    pub(crate) fn stop_when_drained(&self, shutdown: Shutdown) {
        self.script.lock().stop_when_drained = Some(shutdown);
    }

    pub(crate) fn opens(&self) -> u32 {
        self.script.lock().opens
    }

    pub(crate) fn releases(&self) -> u32 {
        self.script.lock().releases
    }

    pub(crate) fn max_live_claims(&self) -> u32 {
        self.script.lock().max_live_claims
    }

    pub(crate) fn live_claims(&self) -> u32 {
        self.script.lock().live_claims
    }

    pub(crate) fn reads_attempted(&self) -> u32 {
        self.script.lock().reads_attempted
    }
}

impl UsbBackend for ScriptedBackend {
    type Interface = ScriptedInterface;

    fn open_and_claim(&self, id: &DeviceId) -> HidResult<ScriptedInterface> {
        let mut script = self.script.lock();
        if script.failing_opens > 0 {
            script.failing_opens -= 1;
            return Err(HidError::DeviceNotFound { vendor_id: id.vendor_id, product_id: id.product_id });
        }

        script.opens += 1;
        script.live_claims += 1;
        script.max_live_claims = script.max_live_claims.max(script.live_claims);
        Ok(ScriptedInterface { script: Arc::clone(&self.script) })
    }
}

pub(crate) struct ScriptedInterface {
    script: Arc<Mutex<Script>>,
}

impl ClaimedInterface for ScriptedInterface {
    fn read_interrupt(&self, _endpoint: u8, buf: &mut [u8], _timeout: Duration) -> rusb::Result<usize> {
        let mut script = self.script.lock();
        script.reads_attempted += 1;

        match script.reads.pop_front() {
            Some(Ok(bytes)) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            Some(Err(e)) => Err(e),
            None => {
                if let Some(shutdown) = &script.stop_when_drained {
                    shutdown.trigger();
                }
                Err(rusb::Error::Timeout)
            }
        }
    }

    fn release(&mut self) -> rusb::Result<()> {
        let mut script = self.script.lock();
        script.releases += 1;
        script.live_claims -= 1;
        Ok(())
    }
}
