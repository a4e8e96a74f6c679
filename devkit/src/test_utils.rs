/*!
Small helpers shared by async tests

- `SharedBuffer`: a cloneable `Write` sink for capturing terminal output
- `wait_until`: poll a condition without a fixed sleep
- `init_logging`: route `log` output through env_logger once per process
*/

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const POLL_STEP: Duration = Duration::from_millis(10);

/// In-memory writer whose clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` elapses. Returns whether it held.
pub async fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_STEP).await;
    }
}

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}
