//! Scripted in-memory transport used by unit tests to emulate the device.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// Serial port stand-in with scripted responses.
///
/// Each queued response is released to the reader when the next command byte
/// is written, mirroring the device's one-write-one-read exchanges. An empty
/// script entry (or an exhausted response) makes reads fail with
/// [`io::ErrorKind::TimedOut`], the way a real port does when the device
/// stays silent.
#[derive(Default)]
pub struct MockSerial {
    written: Vec<u8>,
    responses: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response released by the next written command.
    pub fn push_response(&mut self, data: &[u8]) {
        self.responses.push_back(data.to_vec());
    }

    /// Queue an exchange that yields no bytes before the timeout.
    pub fn push_timeout(&mut self) {
        self.responses.push_back(Vec::new());
    }

    /// All bytes written to the mock so far, in order.
    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        // A command write releases the next scripted response.
        if let Some(response) = self.responses.pop_front() {
            self.pending.extend(response);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no data before timeout",
            ));
        }
        let n = buf.len().min(self.pending.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.pending.pop_front().unwrap();
        }
        Ok(n)
    }
}
