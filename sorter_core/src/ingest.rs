//! Sensor event ingestion.
//!
//! The pump owns the single consumer thread that applies sensor events in
//! arrival order: origin passes advance the tracker, and both origin and
//! chute passes are retained in bounded windows for the next self-check
//! cycle. The last-ingest time is tracked for stall detection.
//!
//! Each `PassEventPump` spawns exactly one thread, joined when dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use sorter_traits::clock::Clock;

use crate::topology::{ChutePassEvent, PassEvent, SensorEvent};
use crate::tracker::CartPositionTracker;

const POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct PassWindows {
    capacity: usize,
    origin: VecDeque<PassEvent>,
    chute: VecDeque<ChutePassEvent>,
}

impl PassWindows {
    fn push_origin(&mut self, e: PassEvent) {
        if self.origin.len() == self.capacity {
            self.origin.pop_front();
        }
        self.origin.push_back(e);
    }

    fn push_chute(&mut self, e: ChutePassEvent) {
        if self.chute.len() == self.capacity {
            self.chute.pop_front();
        }
        self.chute.push_back(e);
    }
}

pub struct PassEventPump {
    tx: Option<xch::Sender<SensorEvent>>,
    windows: Arc<Mutex<PassWindows>>,
    submitted: AtomicU64,
    processed: Arc<AtomicU64>,
    last_ok: Arc<AtomicU64>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl core::fmt::Debug for PassEventPump {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PassEventPump")
            .field("submitted", &self.submitted.load(Ordering::Relaxed))
            .field("processed", &self.processed.load(Ordering::Relaxed))
            .finish()
    }
}

impl PassEventPump {
    /// Spawn the ingest thread.
    ///
    /// `channel_capacity` bounds the queue between producer and pump;
    /// `window` bounds how many origin and chute events are retained.
    pub fn spawn<C: Clock + Send + Sync + 'static>(
        tracker: Arc<CartPositionTracker>,
        channel_capacity: usize,
        window: usize,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::bounded::<SensorEvent>(channel_capacity.max(1));
        let windows = Arc::new(Mutex::new(PassWindows {
            capacity: window.max(1),
            ..PassWindows::default()
        }));
        let windows_clone = Arc::clone(&windows);
        let processed = Arc::new(AtomicU64::new(0));
        let processed_clone = Arc::clone(&processed);
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = Arc::clone(&last_ok);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(clock);
        let thread_clock = Arc::clone(&clock);
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            tracing::debug!("ingest thread started");
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("ingest thread received shutdown signal");
                    break;
                }
                let event = match rx.recv_timeout(POLL) {
                    Ok(ev) => ev,
                    Err(xch::RecvTimeoutError::Timeout) => continue,
                    Err(xch::RecvTimeoutError::Disconnected) => {
                        tracing::debug!("ingest producer disconnected, exiting thread");
                        break;
                    }
                };
                {
                    let mut w = windows_clone.lock().unwrap_or_else(PoisonError::into_inner);
                    match event {
                        SensorEvent::OriginPass(pass) => {
                            tracker.on_cart_passed_origin(pass.timestamp);
                            w.push_origin(pass);
                        }
                        SensorEvent::ChutePass(chute) => w.push_chute(chute),
                    }
                }
                last_ok_clone.store(thread_clock.ms_since(epoch), Ordering::Relaxed);
                processed_clone.fetch_add(1, Ordering::Release);
            }
            tracing::trace!("ingest thread exiting cleanly");
        });

        Self {
            tx: Some(tx),
            windows,
            submitted: AtomicU64::new(0),
            processed,
            last_ok,
            clock,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Queue one event. Blocks while the channel is full; fails only if the
    /// ingest thread has gone away.
    pub fn send(&self, event: SensorEvent) -> Result<(), xch::SendError<SensorEvent>> {
        match &self.tx {
            Some(tx) => {
                tx.send(event)?;
                self.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(xch::SendError(event)),
        }
    }

    /// Wait until every event accepted by `send` has been applied.
    /// Returns false on timeout.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.processed.load(Ordering::Acquire) >= self.submitted.load(Ordering::Relaxed) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    /// Retained origin pass events, oldest first.
    pub fn recent_origin_events(&self) -> Vec<PassEvent> {
        let w = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        w.origin.iter().copied().collect()
    }

    /// Retained chute pass events, oldest first.
    pub fn recent_chute_events(&self) -> Vec<ChutePassEvent> {
        let w = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        w.chute.iter().copied().collect()
    }

    /// Take every retained origin event, oldest first, leaving the window
    /// empty. Read and clear happen under one lock.
    pub fn drain_origin_events(&self) -> Vec<PassEvent> {
        let mut w = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut w.origin).into()
    }

    /// Chute counterpart of `drain_origin_events`.
    pub fn drain_chute_events(&self) -> Vec<ChutePassEvent> {
        let mut w = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut w.chute).into()
    }

    /// Milliseconds since the last applied event, relative to `now_ms`
    /// measured from this pump's epoch.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    pub fn stalled_for_now(&self) -> u64 {
        self.stalled_for(self.clock.ms_since(self.epoch))
    }
}

impl Drop for PassEventPump {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Disconnect so a blocked recv wakes immediately.
        self.tx.take();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("ingest thread joined"),
                Err(e) => tracing::warn!(?e, "ingest thread panicked during shutdown"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_drop_oldest_beyond_capacity() {
        let mut w = PassWindows {
            capacity: 2,
            ..PassWindows::default()
        };
        for ms in 0..3 {
            w.push_origin(PassEvent::new(Some(ms), Duration::from_millis(ms as u64), 1.0));
        }
        let kept: Vec<_> = w.origin.iter().filter_map(|e| e.cart_id).collect();
        assert_eq!(kept, vec![1, 2]);
    }

    #[test]
    fn drain_keeps_capacity_for_later_pushes() {
        let mut w = PassWindows {
            capacity: 2,
            ..PassWindows::default()
        };
        w.push_origin(PassEvent::new(Some(1), Duration::ZERO, 1.0));
        let taken: Vec<PassEvent> = std::mem::take(&mut w.origin).into();
        assert_eq!(taken.len(), 1);
        w.push_origin(PassEvent::new(Some(2), Duration::ZERO, 1.0));
        w.push_origin(PassEvent::new(Some(3), Duration::ZERO, 1.0));
        assert_eq!(w.origin.len(), 2);
    }
}
