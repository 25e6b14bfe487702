//! Cancelable streaming loop.
//!
//! Playback runs on its own OS thread and busy-streams frames back to
//! back: the converter expects a continuous code stream, and the output
//! frequency falls out of the per-frame bus latency. The only control
//! input is the [`PlaybackState`] flag, re-checked before every single
//! frame, so a stop takes effect within one frame rather than one whole
//! period.

use crate::spi::{SpiBus, transmit_frame};
use crate::{Error, Result};
use atomic_enum::atomic_enum;
use std::num::NonZeroU32;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use wavedac_frames::Frame;
use wavedac_globals::Span;

/// Streaming loop state. Written only by `start`/`stop`, read atomically
/// by the transmit loop.
#[atomic_enum]
#[derive(PartialEq, Eq)]
pub enum PlaybackState {
    Idle = 0,
    Running,
}

/// What the transmit loop does about bus write failures.
///
/// The device streams best-effort: the reference behavior is to log a
/// failed frame and move on to the next one. `StopAfter` bails out once
/// that many frames fail in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Tolerate,
    StopAfter(NonZeroU32),
}

/// Owns the streaming thread and the state flag.
///
/// The bus is shared with the device handle through a mutex, but the
/// loop holds the lock for exactly one select/write/deselect bracket at
/// a time, so no frame is ever interleaved with another writer.
pub struct Playback<B> {
    state: Arc<AtomicPlaybackState>,
    bus: Arc<Mutex<B>>,
    policy: FailurePolicy,
    worker: Option<JoinHandle<()>>,
}

impl<B> Playback<B> {
    pub fn new(bus: Arc<Mutex<B>>, policy: FailurePolicy) -> Self {
        Self {
            state: Arc::new(AtomicPlaybackState::new(PlaybackState::Idle)),
            bus,
            policy,
            worker: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state.load(Ordering::Acquire)
    }

    /// Stops the loop after the in-flight frame, if any, and waits for
    /// the thread to park. No-op when already idle.
    pub fn stop(&mut self) {
        self.state.store(PlaybackState::Idle, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl<B: SpiBus + Send + 'static> Playback<B> {
    /// Starts streaming `frames` in table order, wrapping after the last
    /// row, until [`stop`](Self::stop) flips the flag.
    ///
    /// The span select command is sent twice before the first sample
    /// frame on every start — also when the span has not changed since
    /// the previous session (device requirement). If span selection
    /// fails, the state reverts to idle and the error propagates.
    pub fn start(&mut self, span: Span, frames: Arc<[Frame]>) -> Result<()> {
        if frames.is_empty() {
            return Err(Error::NoWaveform);
        }
        if self
            .state
            .compare_exchange(
                PlaybackState::Idle,
                PlaybackState::Running,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            log::warn!("start requested while already running");
            return Err(Error::Busy);
        }

        // the previous session's thread has already seen Idle; reap it
        if let Some(done) = self.worker.take() {
            let _ = done.join();
        }

        let select_span = Frame::span_select(span);
        {
            let mut bus = self.bus.lock().unwrap();
            let armed = transmit_frame(&mut *bus, &select_span)
                .and_then(|()| transmit_frame(&mut *bus, &select_span));
            if let Err(e) = armed {
                self.state.store(PlaybackState::Idle, Ordering::Release);
                log::error!("span select failed: {e}");
                return Err(e);
            }
        }
        log::debug!("span armed ({select_span}), streaming {} frames", frames.len());

        let state = Arc::clone(&self.state);
        let bus = Arc::clone(&self.bus);
        let policy = self.policy;
        self.worker = Some(std::thread::spawn(move || {
            stream_loop(&state, &bus, &frames, policy);
        }));
        Ok(())
    }
}

impl<B> Drop for Playback<B> {
    fn drop(&mut self) {
        self.state.store(PlaybackState::Idle, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn stream_loop<B: SpiBus>(
    state: &AtomicPlaybackState,
    bus: &Mutex<B>,
    frames: &[Frame],
    policy: FailurePolicy,
) {
    let mut consecutive_failures = 0u32;
    'session: loop {
        for frame in frames {
            if state.load(Ordering::Acquire) != PlaybackState::Running {
                break 'session;
            }
            let sent = {
                let mut bus = bus.lock().unwrap();
                transmit_frame(&mut *bus, frame)
            };
            match sent {
                Ok(()) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures += 1;
                    log::warn!("frame {frame} dropped by transport: {e}");
                    if let FailurePolicy::StopAfter(limit) = policy {
                        if consecutive_failures >= limit.get() {
                            log::error!(
                                "{consecutive_failures} consecutive transport failures, stopping"
                            );
                            state.store(PlaybackState::Idle, Ordering::Release);
                            break 'session;
                        }
                    }
                }
            }
        }
    }
    log::debug!("transmit loop parked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::{Duration, Instant};

    /// Counts writes; optionally flips a playback flag to Idle from
    /// inside the bus after a set number of writes, and optionally fails
    /// writes from a set point on.
    struct CountingBus {
        writes: Vec<Vec<u8>>,
        halt: Option<(Arc<AtomicPlaybackState>, usize)>,
        fail_from: Option<usize>,
    }

    impl CountingBus {
        fn new() -> Self {
            Self {
                writes: Vec::new(),
                halt: None,
                fail_from: None,
            }
        }
    }

    impl SpiBus for CountingBus {
        fn select(&mut self) -> Result<()> {
            Ok(())
        }

        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            if let Some(from) = self.fail_from {
                if self.writes.len() >= from {
                    return Err(Error::Io(io::Error::other("nak")));
                }
            }
            self.writes.push(bytes.to_vec());
            if let Some((state, after)) = &self.halt {
                if self.writes.len() >= *after {
                    state.store(PlaybackState::Idle, Ordering::Release);
                }
            }
            Ok(())
        }

        fn deselect(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn table(len: usize) -> Arc<[Frame]> {
        (0..len)
            .map(|i| Frame::sample_write(i as u16))
            .collect::<Vec<_>>()
            .into()
    }

    fn wait_until_idle(playback: &Playback<CountingBus>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while playback.state() != PlaybackState::Idle {
            assert!(Instant::now() < deadline, "loop never parked");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn stop_takes_effect_within_one_frame() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        let mut playback = Playback::new(Arc::clone(&bus), FailurePolicy::default());
        // flip the flag from inside the 12th write: 2 span frames plus
        // 10 sample frames
        bus.lock().unwrap().halt = Some((Arc::clone(&playback.state), 12));

        playback.start(Span::Bipolar10, table(4)).unwrap();
        wait_until_idle(&playback);
        playback.stop();

        // the loop re-checks the flag before every frame, so nothing is
        // sent after the write that flipped it
        assert_eq!(bus.lock().unwrap().writes.len(), 12);
    }

    #[test]
    fn span_sent_twice_before_first_sample() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        let mut playback = Playback::new(Arc::clone(&bus), FailurePolicy::default());
        bus.lock().unwrap().halt = Some((Arc::clone(&playback.state), 3));

        playback.start(Span::Bipolar5, table(8)).unwrap();
        wait_until_idle(&playback);
        playback.stop();

        let writes = &bus.lock().unwrap().writes;
        assert_eq!(writes[0], vec![0x8F, 0x00, 0x02]);
        assert_eq!(writes[1], vec![0x8F, 0x00, 0x02]);
        assert_eq!(writes[2], vec![0x9F, 0x00, 0x00]);
    }

    #[test]
    fn table_order_wraps_around() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        let mut playback = Playback::new(Arc::clone(&bus), FailurePolicy::default());
        bus.lock().unwrap().halt = Some((Arc::clone(&playback.state), 2 + 5));

        playback.start(Span::Bipolar10, table(2)).unwrap();
        wait_until_idle(&playback);
        playback.stop();

        let writes = &bus.lock().unwrap().writes;
        let codes: Vec<u16> = writes[2..]
            .iter()
            .map(|w| u16::from_be_bytes([w[1], w[2]]))
            .collect();
        assert_eq!(codes, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        let mut playback = Playback::new(Arc::clone(&bus), FailurePolicy::default());

        playback.start(Span::Bipolar10, table(4)).unwrap();
        assert!(matches!(
            playback.start(Span::Bipolar10, table(4)),
            Err(Error::Busy)
        ));
        playback.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        let mut playback = Playback::new(bus, FailurePolicy::default());
        assert_eq!(playback.state(), PlaybackState::Idle);
        playback.stop();
        playback.stop();
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn restart_after_stop() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        let mut playback = Playback::new(Arc::clone(&bus), FailurePolicy::default());

        playback.start(Span::Bipolar10, table(4)).unwrap();
        playback.stop();
        let first_session = bus.lock().unwrap().writes.len();

        playback.start(Span::Bipolar10, table(4)).unwrap();
        playback.stop();
        assert!(bus.lock().unwrap().writes.len() > first_session);
    }

    #[test]
    fn span_failure_reverts_to_idle() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        bus.lock().unwrap().fail_from = Some(0);
        let mut playback = Playback::new(bus, FailurePolicy::default());

        assert!(playback.start(Span::Bipolar10, table(4)).is_err());
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn stop_after_n_consecutive_failures() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        // span frames succeed, every sample frame fails
        bus.lock().unwrap().fail_from = Some(2);
        let policy = FailurePolicy::StopAfter(NonZeroU32::new(3).unwrap());
        let mut playback = Playback::new(Arc::clone(&bus), policy);

        playback.start(Span::Bipolar10, table(4)).unwrap();
        wait_until_idle(&playback);
        playback.stop();

        // only the two span frames ever landed on the wire
        assert_eq!(bus.lock().unwrap().writes.len(), 2);
    }

    #[test]
    fn tolerate_keeps_streaming_through_failures() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        bus.lock().unwrap().fail_from = Some(2);
        let mut playback = Playback::new(Arc::clone(&bus), FailurePolicy::default());

        playback.start(Span::Bipolar10, table(4)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(playback.state(), PlaybackState::Running);
        playback.stop();
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn empty_table_is_rejected() {
        let bus = Arc::new(Mutex::new(CountingBus::new()));
        let mut playback = Playback::new(bus, FailurePolicy::default());
        assert!(matches!(
            playback.start(Span::Bipolar10, table(0)),
            Err(Error::NoWaveform)
        ));
        assert_eq!(playback.state(), PlaybackState::Idle);
    }
}
