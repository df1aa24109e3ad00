//! Log capture for unit tests.

use std::io;
use std::sync::{Arc, Mutex};
use tracing::Level;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a thread-scoped JSON subscriber and return its result
/// along with every record emitted, one JSON object per record.
pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<serde_json::Value>) {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(Level::TRACE)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let records = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (result, records)
}
