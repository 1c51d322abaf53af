//! Scripted transport for sequence tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::codec::Report;
use crate::command::Opcode;
use crate::error::{HidError, HidResult};
use crate::transport::{DeviceDescriptor, Transport};

pub(crate) fn descriptor() -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id: 0x2972,
        product_id: 0x0055,
        bus_number: 1,
        address: 4,
        product_name: Some("FiiO KA5".to_string()),
    }
}

pub(crate) fn dawn_descriptor() -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id: 0x2fc6,
        product_id: 0xf06a,
        bus_number: 1,
        address: 5,
        product_name: None,
    }
}

#[derive(Default)]
struct Script {
    responses: HashMap<Opcode, Vec<u8>>,
    fail_send_at: Option<usize>,
    cancel_after: Option<(usize, CancellationToken)>,
    unavailable: bool,
    sent: Vec<Report>,
    pending: Option<Vec<u8>>,
    opened: usize,
    closed: usize,
}

/// Answers each query with a canned response and records every report.
///
/// Clones share the same script, so a test can keep one to inspect what the
/// code under test sent.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    script: Arc<Mutex<Script>>,
}

impl FakeTransport {
    pub(crate) fn respond(self, opcode: [u8; 3], response: Vec<u8>) -> Self {
        self.script.lock().responses.insert(Opcode(opcode), response);
        self
    }

    /// Fail the `index`-th send (zero based).
    pub(crate) fn fail_send_at(self, index: usize) -> Self {
        self.script.lock().fail_send_at = Some(index);
        self
    }

    /// Cancel `token` once `sends` reports have gone out.
    pub(crate) fn cancel_after(self, sends: usize, token: CancellationToken) -> Self {
        self.script.lock().cancel_after = Some((sends, token));
        self
    }

    pub(crate) fn unavailable(self) -> Self {
        self.script.lock().unavailable = true;
        self
    }

    pub(crate) fn sent(&self) -> Vec<Report> {
        self.script.lock().sent.clone()
    }

    pub(crate) fn sent_opcodes(&self) -> Vec<[u8; 3]> {
        self.sent().iter().map(|report| report.opcode().0).collect()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.script.lock().opened
    }

    pub(crate) fn close_count(&self) -> usize {
        self.script.lock().closed
    }
}

impl Transport for FakeTransport {
    type Handle = ();

    fn open(&self, _device: &DeviceDescriptor) -> Option<()> {
        let mut script = self.script.lock();
        if script.unavailable {
            return None;
        }
        script.opened += 1;
        Some(())
    }

    fn send(&self, _handle: &mut (), report: &Report) -> HidResult<()> {
        let mut script = self.script.lock();
        if script.fail_send_at == Some(script.sent.len()) {
            return Err(HidError::UsbError(rusb::Error::Io));
        }
        script.sent.push(report.clone());
        if let Some((sends, token)) = &script.cancel_after {
            if script.sent.len() == *sends {
                token.cancel();
            }
        }
        script.pending = script.responses.get(&report.opcode()).cloned();
        Ok(())
    }

    fn receive(&self, _handle: &mut (), _timeout: Duration) -> HidResult<Option<Vec<u8>>> {
        Ok(self.script.lock().pending.take())
    }

    fn close(&self, _handle: ()) {
        self.script.lock().closed += 1;
    }
}
