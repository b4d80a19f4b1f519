//! Background thread driving retransmissions.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use super::engine::Engine;
use crate::{debug, error};

/// Handle to the thread periodically calling
/// [Engine::send_outgoing_packets]. The thread stops when the handle is
/// stopped or dropped.
#[derive(Debug)]
pub struct Driver {
    stop: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl Driver {
    pub(super) fn spawn(engine: Engine) -> io::Result<Self> {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let stop_clone = Arc::clone(&stop);
        let interval = engine.config().flush_interval;

        let handle = thread::Builder::new()
            .name("tcp-retransmit".into())
            .spawn(move || {
                let (stopped, wake) = &*stop_clone;

                debug!("retransmission driver started, interval {interval:?}");

                loop {
                    engine.send_outgoing_packets();

                    let mut guard = stopped.lock();
                    if !*guard {
                        wake.wait_for(&mut guard, interval);
                    }

                    if *guard {
                        break;
                    }
                }

                debug!("retransmission driver stopped");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let (stopped, wake) = &*self.stop;

        *stopped.lock() = true;
        wake.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("retransmission driver panicked");
            }
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
