//! Cancellable background decode loop for one playback slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::frame::FrameBuffer;
use crate::source::SourceOpener;

/// Identifier of one of the two independent playback sessions, carried by
/// every notification so the same callback signature serves both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The main stream.
    Primary,
    /// The picture-in-picture inset stream.
    Pip,
}

/// Notifications posted from decode threads to the UI-affine consumer.
///
/// Always delivered through the controller's event channel, never by a
/// direct callback from a decode thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A new frame is in the slot's buffer; a repaint is due.
    FrameReady(Slot),
    /// The slot's first frame has been decoded and is drawable.
    Started(Slot),
    /// End of stream, or a stop request was honored.
    Stopped(Slot),
    /// The stream failed to open or decode. No internal retry happens;
    /// restarting is the host's decision.
    Failed(Slot),
}

type SharedBuffer = Arc<Mutex<Option<Arc<FrameBuffer>>>>;

/// One playback slot: a background task that pulls frames from an opened
/// source, updates its owned [`FrameBuffer`] in place, and posts lifecycle
/// notifications.
///
/// At most one session runs per slot; a start request while one is active
/// is a no-op, not queued.
pub struct PlaybackLoop {
    slot: Slot,
    events: Sender<PlayerEvent>,
    buffer: SharedBuffer,
    active: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackLoop {
    /// Create an idle loop for the given slot, posting to `events`.
    pub fn new(slot: Slot, events: Sender<PlayerEvent>) -> Self {
        Self {
            slot,
            events,
            buffer: Arc::new(Mutex::new(None)),
            active: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            handle: None,
        }
    }

    /// Slot this loop feeds.
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Whether a session is currently running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Buffer holding the most recent decoded frame, if any.
    pub fn current_buffer(&self) -> Option<Arc<FrameBuffer>> {
        self.buffer.lock().unwrap().clone()
    }

    /// Start a session for `locator`. A no-op if this slot already has a
    /// running session; stop it first to switch streams.
    pub fn start(&mut self, opener: Arc<dyn SourceOpener>, locator: &str) {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("{:?} slot busy, ignoring start for {}", self.slot, locator);
            return;
        }

        // The previous session has already exited; reclaim its thread.
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        self.stop_requested.store(false, Ordering::SeqCst);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        self.stop_tx = Some(stop_tx);

        let session = Session {
            slot: self.slot,
            locator: locator.to_owned(),
            opener,
            buffer: Arc::clone(&self.buffer),
            stop_requested: Arc::clone(&self.stop_requested),
            stop_rx,
            events: self.events.clone(),
            active: Arc::clone(&self.active),
        };
        self.handle = Some(thread::spawn(move || session.run()));
    }

    /// Request cancellation and block until the session thread has exited.
    ///
    /// Idempotent, safe to call when nothing is running. Must not be
    /// called from a lifecycle callback dispatched for this slot; the
    /// join would deadlock against the running session.
    pub fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            // try_send wakes a session sleeping out its pacing delay; the
            // drop disconnects the channel and wakes it even when the
            // signal slot is already full.
            let _ = stop_tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the session thread.
struct Session {
    slot: Slot,
    locator: String,
    opener: Arc<dyn SourceOpener>,
    buffer: SharedBuffer,
    stop_requested: Arc<AtomicBool>,
    stop_rx: Receiver<()>,
    events: Sender<PlayerEvent>,
    active: Arc<AtomicBool>,
}

impl Session {
    fn run(self) {
        let event = match self.play() {
            Ok(()) => {
                log::info!("{:?} slot: playback stopped", self.slot);
                PlayerEvent::Stopped(self.slot)
            }
            Err(e) => {
                log::warn!("{:?} slot: playback failed: {}", self.slot, e);
                PlayerEvent::Failed(self.slot)
            }
        };
        let _ = self.events.send(event);
        self.active.store(false, Ordering::SeqCst);
    }

    fn play(&self) -> crate::Result<()> {
        let mut source = self.opener.open(&self.locator)?;
        log::info!("{:?} slot: playing {}", self.slot, self.locator);

        // The buffer from any previous session is released here; the new
        // one is created lazily from the first decoded picture.
        self.buffer.lock().unwrap().take();

        let mut first_frame = true;
        loop {
            let Some(picture) = source.next_picture()? else {
                return Ok(());
            };
            if self.stop_requested.load(Ordering::SeqCst) {
                return Ok(());
            }

            {
                let mut current = self.buffer.lock().unwrap();
                match current.as_ref() {
                    Some(frame) => frame.update(&picture),
                    None => *current = Some(Arc::new(FrameBuffer::new(&picture)?)),
                }
            }
            let _ = self.events.send(PlayerEvent::FrameReady(self.slot));

            // Cancellable pacing sleep: a stop signal or a dropped sender
            // ends the session without waiting out the delay.
            match self.stop_rx.recv_timeout(source.interframe_delay()) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }

            // Deferred one frame so a drawable buffer is guaranteed to
            // exist the instant a consumer observes the start.
            if first_frame {
                let _ = self.events.send(PlayerEvent::Started(self.slot));
                first_frame = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crossbeam_channel::unbounded;

    use super::*;
    use crate::source::testing::ScriptedOpener;

    /// Session threads log their lifecycle; make it visible under
    /// `RUST_LOG` without double-initializing across tests.
    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn drain_until_terminal(rx: &Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(event) => {
                    let terminal =
                        matches!(event, PlayerEvent::Stopped(_) | PlayerEvent::Failed(_));
                    events.push(event);
                    if terminal {
                        return events;
                    }
                }
                Err(_) => continue,
            }
        }
        panic!("no terminal event within deadline: {events:?}");
    }

    #[test]
    fn test_session_runs_to_end_of_stream() {
        init_logging();
        let (tx, rx) = unbounded();
        let mut playback = PlaybackLoop::new(Slot::Primary, tx);
        let opener = Arc::new(ScriptedOpener {
            frames: 3,
            ..Default::default()
        });

        playback.start(opener, "test://stream");
        let events = drain_until_terminal(&rx);
        playback.stop();

        let started = events
            .iter()
            .filter(|e| matches!(e, PlayerEvent::Started(Slot::Primary)))
            .count();
        let frames = events
            .iter()
            .filter(|e| matches!(e, PlayerEvent::FrameReady(Slot::Primary)))
            .count();
        assert_eq!(started, 1);
        assert_eq!(frames, 3);
        assert_eq!(events.last(), Some(&PlayerEvent::Stopped(Slot::Primary)));

        let buffer = playback.current_buffer().expect("buffer retained");
        assert_eq!(buffer.dimensions(), (8, 6));
    }

    #[test]
    fn test_second_start_is_noop_while_running() {
        init_logging();
        let (tx, rx) = unbounded();
        let mut playback = PlaybackLoop::new(Slot::Primary, tx);
        let opener = Arc::new(ScriptedOpener {
            frames: 10_000,
            delay: Duration::from_millis(2),
            ..Default::default()
        });

        playback.start(Arc::clone(&opener) as Arc<dyn SourceOpener>, "test://a");
        // Wait until the first session has observably started.
        let mut events = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !events.iter().any(|e| matches!(e, PlayerEvent::Started(_))) {
            assert!(Instant::now() < deadline, "session never started");
            if let Ok(event) = rx.recv_timeout(Duration::from_millis(50)) {
                events.push(event);
            }
        }

        playback.start(opener, "test://b");
        playback.stop();

        events.extend(rx.try_iter());
        let started = events
            .iter()
            .filter(|e| matches!(e, PlayerEvent::Started(_)))
            .count();
        assert_eq!(started, 1, "second start must not spawn a session");
    }

    #[test]
    fn test_stop_is_idempotent_and_safe_before_start() {
        init_logging();
        let (tx, _rx) = unbounded();
        let mut playback = PlaybackLoop::new(Slot::Pip, tx);
        playback.stop();
        playback.stop();
        assert!(!playback.is_active());
    }

    #[test]
    fn test_stop_interrupts_pacing_sleep() {
        init_logging();
        let (tx, rx) = unbounded();
        let mut playback = PlaybackLoop::new(Slot::Primary, tx);
        let opener = Arc::new(ScriptedOpener {
            frames: 100,
            delay: Duration::from_secs(30),
            ..Default::default()
        });

        playback.start(opener, "test://slow");
        // First frame arrives before the long sleep begins.
        let deadline = Instant::now() + Duration::from_secs(5);
        while playback.current_buffer().is_none() {
            assert!(Instant::now() < deadline, "first frame never arrived");
            thread::sleep(Duration::from_millis(1));
        }

        let begun = Instant::now();
        playback.stop();
        assert!(
            begun.elapsed() < Duration::from_secs(5),
            "stop must not wait out the pacing delay"
        );
        assert!(rx
            .try_iter()
            .any(|e| e == PlayerEvent::Stopped(Slot::Primary)));
    }

    #[test]
    fn test_open_failure_posts_failed() {
        init_logging();
        let (tx, rx) = unbounded();
        let mut playback = PlaybackLoop::new(Slot::Primary, tx);
        let opener = Arc::new(ScriptedOpener {
            fail_open: true,
            ..Default::default()
        });

        playback.start(opener, "test://missing");
        let events = drain_until_terminal(&rx);
        assert_eq!(events.last(), Some(&PlayerEvent::Failed(Slot::Primary)));
        assert!(playback.current_buffer().is_none());
        playback.stop();
    }

    #[test]
    fn test_decode_failure_posts_failed_after_frames() {
        init_logging();
        let (tx, rx) = unbounded();
        let mut playback = PlaybackLoop::new(Slot::Pip, tx);
        let opener = Arc::new(ScriptedOpener {
            frames: 2,
            fail_at_end: true,
            ..Default::default()
        });

        playback.start(opener, "test://flaky");
        let events = drain_until_terminal(&rx);
        playback.stop();

        assert_eq!(events.last(), Some(&PlayerEvent::Failed(Slot::Pip)));
        // Frames decoded before the failure were still published.
        assert!(events
            .iter()
            .any(|e| matches!(e, PlayerEvent::FrameReady(Slot::Pip))));
    }

    #[test]
    fn test_restart_after_stop_runs_new_session() {
        init_logging();
        let (tx, rx) = unbounded();
        let mut playback = PlaybackLoop::new(Slot::Primary, tx);
        let opener = Arc::new(ScriptedOpener {
            frames: 2,
            ..Default::default()
        });

        playback.start(Arc::clone(&opener) as Arc<dyn SourceOpener>, "test://first");
        drain_until_terminal(&rx);
        playback.stop();

        playback.start(opener, "test://second");
        let events = drain_until_terminal(&rx);
        playback.stop();
        assert!(events.contains(&PlayerEvent::Started(Slot::Primary)));
    }
}
