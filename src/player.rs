//! Player controller: owns the two playback slots and the host relay.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver};

use crate::error::{PlayerError, Result};
use crate::playback::{PlaybackLoop, PlayerEvent, Slot};
use crate::render::{Compositor, PaintSurface, RenderSettings};
use crate::source::SourceOpener;

/// Host callback invoked with the slot a lifecycle event belongs to.
pub type SlotCallback = Box<dyn FnMut(Slot) + Send>;

/// Host-side wiring required by [`PlayerController::initialize`].
///
/// Every field must be set; initialization fails fast with a
/// configuration error otherwise.
#[derive(Default)]
pub struct PlayerParams {
    /// Destination window surface.
    pub surface: Option<Box<dyn PaintSurface>>,
    /// Invoked once a slot's first frame is drawable.
    pub on_started: Option<SlotCallback>,
    /// Invoked when a slot reaches end of stream or honors a stop.
    pub on_stopped: Option<SlotCallback>,
    /// Invoked when a slot's stream fails to open or decode.
    pub on_failed: Option<SlotCallback>,
}

/// Validated host wiring held between initialize and uninitialize.
struct Host {
    surface: Box<dyn PaintSurface>,
    on_started: SlotCallback,
    on_stopped: SlotCallback,
    on_failed: SlotCallback,
}

/// Owns the two independent playback slots (primary, PiP), the shared
/// render configuration, and the event relay to the host.
///
/// All methods must be called from the host's UI-affine thread; the decode
/// loops communicate with it exclusively through the posted event channel
/// drained by [`PlayerController::pump_events`].
pub struct PlayerController {
    opener: Arc<dyn SourceOpener>,
    host: Option<Host>,
    events: Receiver<PlayerEvent>,
    primary: PlaybackLoop,
    pip: PlaybackLoop,
    /// The PiP slot has reported started and not yet stopped or failed.
    pip_live: bool,
    settings: RenderSettings,
    compositor: Compositor,
}

impl PlayerController {
    /// Create a controller bound to a source opener. The controller is
    /// inert until [`PlayerController::initialize`] attaches a surface
    /// and callbacks.
    pub fn new(opener: Arc<dyn SourceOpener>) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            opener,
            host: None,
            events: events_rx,
            primary: PlaybackLoop::new(Slot::Primary, events_tx.clone()),
            pip: PlaybackLoop::new(Slot::Pip, events_tx),
            pip_live: false,
            settings: RenderSettings::default(),
            compositor: Compositor::new(),
        }
    }

    /// Attach the window surface and lifecycle callbacks, resetting the
    /// render configuration to its defaults.
    ///
    /// Fails with [`PlayerError::Config`] when any required field is
    /// unset; no partial state is retained.
    pub fn initialize(&mut self, params: PlayerParams) -> Result<()> {
        let surface = params
            .surface
            .ok_or(PlayerError::Config("window surface is not set"))?;
        let on_started = params
            .on_started
            .ok_or(PlayerError::Config("started callback is not set"))?;
        let on_stopped = params
            .on_stopped
            .ok_or(PlayerError::Config("stopped callback is not set"))?;
        let on_failed = params
            .on_failed
            .ok_or(PlayerError::Config("failed callback is not set"))?;

        self.host = Some(Host {
            surface,
            on_started,
            on_stopped,
            on_failed,
        });
        self.settings = RenderSettings::default();
        log::info!("player initialized");
        Ok(())
    }

    /// Whether a host is currently attached.
    pub fn is_initialized(&self) -> bool {
        self.host.is_some()
    }

    /// Asynchronously play a stream on the primary slot. Fire-and-forget;
    /// a no-op if the slot is already active.
    pub fn start_play(&mut self, locator: &str) {
        self.primary.start(Arc::clone(&self.opener), locator);
    }

    /// Asynchronously play a second stream on the PiP slot. Fire-and-
    /// forget; a no-op if the slot is already active.
    pub fn start_play_pip(&mut self, locator: &str) {
        self.pip.start(Arc::clone(&self.opener), locator);
    }

    /// Stop both slots, blocking until both decode threads have exited.
    ///
    /// Must not be called from inside a lifecycle callback dispatched by
    /// [`PlayerController::pump_events`]; the join would self-deadlock.
    pub fn stop(&mut self) {
        self.primary.stop();
        self.pip.stop();
        self.pip_live = false;
    }

    /// Stop playback, discard pending notifications, and detach from the
    /// window.
    pub fn uninitialize(&mut self) {
        self.stop();
        while self.events.try_recv().is_ok() {}
        if self.host.take().is_some() {
            log::info!("player uninitialized");
        }
    }

    /// Snapshot of the current primary frame as a self-describing bitmap
    /// (header + pixel bytes), ownership transferred to the caller.
    ///
    /// Fails with [`PlayerError::NoFrameYet`] until the primary slot has
    /// produced its first frame.
    pub fn get_current_frame(&self) -> Result<Vec<u8>> {
        let buffer = self
            .primary
            .current_buffer()
            .ok_or(PlayerError::NoFrameYet)?;
        buffer.to_bitmap()
    }

    /// Unstretched size of the primary frame, in pixels. Same failure
    /// condition as [`PlayerController::get_current_frame`].
    pub fn get_frame_size(&self) -> Result<(u32, u32)> {
        let buffer = self
            .primary
            .current_buffer()
            .ok_or(PlayerError::NoFrameYet)?;
        Ok(buffer.dimensions())
    }

    /// Set the PiP inset placement; see [`crate::PipPlacement`] for the
    /// auto-center semantics of negative values.
    pub fn configure_pip(&mut self, width: i32, top: i32, left: i32) {
        self.settings.set_pip(width, top, left);
    }

    /// Set the zoom factor, clamped to a minimum of 1.
    pub fn configure_zoom(&mut self, zoom: i32) {
        self.settings.set_zoom(zoom);
    }

    /// Set the crosshair arm length; 0 (or negative) disables it.
    pub fn configure_crosshair(&mut self, length: i32) {
        self.settings.set_crosshair(length);
    }

    /// Drain posted notifications on the UI thread: schedule a repaint
    /// for frame arrivals and relay lifecycle events to the host
    /// callbacks. Events arriving while uninitialized are discarded.
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let Some(host) = self.host.as_mut() else {
                continue;
            };
            match event {
                PlayerEvent::FrameReady(_) => host.surface.request_redraw(),
                PlayerEvent::Started(slot) => {
                    if slot == Slot::Pip {
                        self.pip_live = true;
                    }
                    (host.on_started)(slot);
                }
                PlayerEvent::Stopped(slot) => {
                    if slot == Slot::Pip {
                        self.pip_live = false;
                    }
                    (host.on_stopped)(slot);
                }
                PlayerEvent::Failed(slot) => {
                    if slot == Slot::Pip {
                        self.pip_live = false;
                    }
                    (host.on_failed)(slot);
                }
            }
        }
    }

    /// Paint-hook body: draw the current primary frame, compositing the
    /// PiP inset while its stream is live. A no-op before the first frame
    /// or when no host is attached.
    pub fn handle_redraw(&mut self) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        let Some(primary) = self.primary.current_buffer() else {
            return;
        };
        let pip = if self.pip_live {
            self.pip.current_buffer()
        } else {
            None
        };
        self.compositor
            .draw(host.surface.as_mut(), &primary, pip.as_deref(), &self.settings);
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.uninitialize();
    }
}
