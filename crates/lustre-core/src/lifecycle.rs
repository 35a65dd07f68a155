//! Scene lifecycle: async acquisition, the frame tick and teardown
//!
//! A [`SceneHandle`] owns everything a mounted scene needs: the
//! orientation controller, the backend [`Stage`] and the phase they are
//! in. The only suspension point is [`SceneHandle::init`]. A [`Disposer`]
//! taken before `init` can cancel the scene while acquisition is still in
//! flight; `init` notices on resume and releases whatever it acquired.
//!
//! Teardown always runs in the same order: the frame loop stops, input
//! listeners are detached, then the stage releases its GPU resources.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::card::Edition;
use crate::interact::{ContainerRect, HostRequest, InputEvent, Orientation, OrientationController};
use crate::{Error, Result};

/// Drawable size in physical pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero dimension means there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, `None` when empty
    pub fn aspect(&self) -> Option<f32> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }
}

/// Everything a stage needs to draw one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Seconds on the host clock
    pub time: f64,
    /// Never empty; empty frames are skipped before they reach a stage
    pub size: SurfaceSize,
    pub orientation: Orientation,
}

/// A rendering backend for one scene
pub trait Stage {
    /// Resize owned targets and the camera together
    fn resize(&mut self, size: SurfaceSize);

    fn render(&mut self, frame: &Frame) -> Result<()>;

    /// Switch the shading pass; stages without editions ignore this
    fn set_edition(&mut self, _edition: Edition) {}

    /// Free GPU resources
    fn release(self)
    where
        Self: Sized;
}

struct CancelShared {
    cancelled: AtomicBool,
    hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

/// Cancellation flag shared between a scene and its pending acquisition
#[derive(Clone)]
pub struct CancelToken {
    shared: Arc<CancelShared>,
}

impl CancelToken {
    fn new() -> Self {
        Self {
            shared: Arc::new(CancelShared {
                cancelled: AtomicBool::new(false),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Run `hook` on cancellation, or immediately if already cancelled
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        let mut hooks = self.shared.hooks.lock();
        if self.is_cancelled() {
            drop(hooks);
            hook();
        } else {
            hooks.push(Box::new(hook));
        }
    }

    fn cancel(&self) {
        if self.shared.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let hooks = std::mem::take(&mut *self.shared.hooks.lock());
        for hook in hooks {
            hook();
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cloneable handle that disposes a scene from outside its `&mut` owner
#[derive(Debug, Clone)]
pub struct Disposer {
    token: CancelToken,
}

impl Disposer {
    /// Request disposal. Pending acquisition sees it on resume; a running
    /// scene tears down on its next tick.
    pub fn dispose(&self) {
        self.token.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Created,
    Initializing,
    Running,
    /// Acquisition failed; the frame loop never started
    Failed,
    Disposed,
}

/// Whether the host should schedule another tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    Continue,
    Stopped,
}

/// A mounted scene
pub struct SceneHandle<S: Stage> {
    phase: Phase,
    token: CancelToken,
    controller: OrientationController,
    stage: Option<S>,
    size: SurfaceSize,
    edition: Edition,
    frames: u64,
}

impl<S: Stage> SceneHandle<S> {
    pub fn new(controller: OrientationController, size: SurfaceSize) -> Self {
        Self {
            phase: Phase::Created,
            token: CancelToken::new(),
            controller,
            stage: None,
            size,
            edition: Edition::default(),
            frames: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn edition(&self) -> Edition {
        self.edition
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn controller(&self) -> &OrientationController {
        &self.controller
    }

    pub fn stage(&self) -> Option<&S> {
        self.stage.as_ref()
    }

    pub fn disposer(&self) -> Disposer {
        Disposer {
            token: self.token.clone(),
        }
    }

    /// Acquire the stage. `acquire` receives a token it may poll or hook
    /// to abandon work early.
    pub async fn init<F, Fut>(&mut self, acquire: F) -> Result<()>
    where
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        match self.phase {
            Phase::Created => {}
            Phase::Disposed => return Err(Error::Cancelled),
            phase => return Err(Error::Backend(format!("init called while {phase:?}"))),
        }
        if self.token.is_cancelled() {
            self.finish_dispose();
            return Err(Error::Cancelled);
        }

        self.phase = Phase::Initializing;
        debug!("acquiring stage");
        let acquired = acquire(self.token.clone()).await;

        if self.token.is_cancelled() {
            if let Ok(stage) = acquired {
                debug!("disposed during init, releasing acquired stage");
                stage.release();
            }
            self.finish_dispose();
            return Err(Error::Cancelled);
        }

        match acquired {
            Ok(mut stage) => {
                stage.set_edition(self.edition);
                if !self.size.is_empty() {
                    stage.resize(self.size);
                }
                self.stage = Some(stage);
                self.phase = Phase::Running;
                info!(
                    width = self.size.width,
                    height = self.size.height,
                    "scene running"
                );
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "scene init failed");
                self.phase = Phase::Failed;
                self.controller.detach();
                Err(err)
            }
        }
    }

    /// Advance and draw one frame
    pub fn tick(&mut self, now: f64) -> TickOutcome {
        if self.token.is_cancelled() {
            self.finish_dispose();
            return TickOutcome::Stopped;
        }
        if self.phase != Phase::Running {
            return TickOutcome::Stopped;
        }

        // Input handlers ran to completion before this point
        let orientation = self.controller.tick(now);

        if self.size.is_empty() {
            return TickOutcome::Continue;
        }
        let Some(stage) = self.stage.as_mut() else {
            return TickOutcome::Stopped;
        };

        let frame = Frame {
            time: now,
            size: self.size,
            orientation,
        };
        if let Err(err) = stage.render(&frame) {
            warn!(error = %err, "render failed, stopping scene");
            self.finish_dispose();
            return TickOutcome::Stopped;
        }
        self.frames += 1;
        TickOutcome::Continue
    }

    /// Forward an input event to the controller
    pub fn handle_input(&mut self, event: InputEvent) -> Option<HostRequest> {
        if matches!(self.phase, Phase::Disposed | Phase::Failed) {
            return None;
        }
        self.controller.handle(event)
    }

    /// New drawable size; camera and targets change before the next tick
    pub fn resize(&mut self, size: SurfaceSize) {
        if self.size == size {
            return;
        }
        self.size = size;
        if size.is_empty() {
            debug!("surface collapsed, skipping frames");
            return;
        }
        if let Some(stage) = self.stage.as_mut() {
            stage.resize(size);
        }
    }

    /// Container bounds for pointer normalisation
    pub fn set_container(&mut self, rect: ContainerRect) {
        self.controller.set_rect(rect);
    }

    /// Swap the shading pass without touching geometry or textures
    pub fn set_edition(&mut self, edition: Edition) {
        self.edition = edition;
        if let Some(stage) = self.stage.as_mut() {
            stage.set_edition(edition);
        }
    }

    pub fn kick(&mut self, direction: f32) {
        if self.phase != Phase::Disposed {
            self.controller.kick(direction);
        }
    }

    /// Tear the scene down. Safe before, during (via [`Disposer`]) and
    /// after `init`, and any number of times.
    pub fn dispose(&mut self) {
        self.token.cancel();
        self.finish_dispose();
    }

    fn finish_dispose(&mut self) {
        if self.phase == Phase::Disposed {
            return;
        }
        self.token.cancel();

        // 1. frame loop
        self.phase = Phase::Disposed;
        // 2. input listeners
        self.controller.detach();
        // 3. GPU resources
        if let Some(stage) = self.stage.take() {
            stage.release();
        }
        info!(frames = self.frames, "scene disposed");
    }
}

impl<S: Stage> Drop for SceneHandle<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interact::{GyroSupport, InteractionConfig};
    use pollster::block_on;

    #[derive(Default)]
    struct Recorder {
        sizes: Vec<SurfaceSize>,
        frames: usize,
        released: usize,
    }

    struct MockStage(Arc<Mutex<Recorder>>);

    impl Stage for MockStage {
        fn resize(&mut self, size: SurfaceSize) {
            self.0.lock().sizes.push(size);
        }

        fn render(&mut self, _frame: &Frame) -> Result<()> {
            self.0.lock().frames += 1;
            Ok(())
        }

        fn release(self) {
            self.0.lock().released += 1;
        }
    }

    fn handle(size: SurfaceSize) -> SceneHandle<MockStage> {
        let controller = OrientationController::new(
            InteractionConfig::default(),
            GyroSupport::Unavailable,
            ContainerRect::new(0.0, 0.0, size.width as f32, size.height as f32),
            0.0,
        );
        SceneHandle::new(controller, size)
    }

    #[test]
    fn surface_size_guards_zero() {
        assert!(SurfaceSize::new(0, 10).is_empty());
        assert_eq!(SurfaceSize::new(10, 0).aspect(), None);
        assert_eq!(SurfaceSize::new(400, 200).aspect(), Some(2.0));
    }

    #[test]
    fn init_resizes_stage_and_runs() {
        let rec = Arc::new(Mutex::new(Recorder::default()));
        let mut h = handle(SurfaceSize::new(400, 560));
        let stage = MockStage(Arc::clone(&rec));
        block_on(h.init(move |_| async move { Ok(stage) })).unwrap();

        assert_eq!(h.phase(), Phase::Running);
        assert_eq!(rec.lock().sizes, vec![SurfaceSize::new(400, 560)]);
        assert_eq!(h.tick(0.016), TickOutcome::Continue);
        assert_eq!(rec.lock().frames, 1);
    }

    #[test]
    fn init_resumes_when_acquisition_completes_elsewhere() {
        let rec = Arc::new(Mutex::new(Recorder::default()));
        let mut h = handle(SurfaceSize::new(64, 64));
        let (tx, rx) = tokio::sync::oneshot::channel();
        let stage = MockStage(Arc::clone(&rec));
        let sender = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            let _ = tx.send(stage);
        });

        block_on(h.init(move |_| async move {
            rx.await.map_err(|_| Error::Backend("acquisition dropped".into()))
        }))
        .unwrap();
        sender.join().unwrap();

        assert_eq!(h.phase(), Phase::Running);
        assert_eq!(rec.lock().sizes, vec![SurfaceSize::new(64, 64)]);
    }

    #[test]
    fn zero_size_skips_render() {
        let rec = Arc::new(Mutex::new(Recorder::default()));
        let mut h = handle(SurfaceSize::new(0, 300));
        let stage = MockStage(Arc::clone(&rec));
        block_on(h.init(move |_| async move { Ok(stage) })).unwrap();

        assert_eq!(h.tick(0.1), TickOutcome::Continue);
        assert_eq!(rec.lock().frames, 0);
        assert!(rec.lock().sizes.is_empty());

        h.resize(SurfaceSize::new(300, 300));
        h.tick(0.2);
        assert_eq!(rec.lock().frames, 1);
    }

    #[test]
    fn failed_init_never_ticks() {
        let mut h = handle(SurfaceSize::new(10, 10));
        let err = block_on(h.init(|_| async { Err(Error::Backend("no adapter".into())) }));
        assert!(matches!(err, Err(Error::Backend(_))));
        assert_eq!(h.phase(), Phase::Failed);
        assert_eq!(h.tick(1.0), TickOutcome::Stopped);
        h.dispose();
        assert_eq!(h.phase(), Phase::Disposed);
    }

    #[test]
    fn dispose_twice_releases_once() {
        let rec = Arc::new(Mutex::new(Recorder::default()));
        let mut h = handle(SurfaceSize::new(10, 10));
        let stage = MockStage(Arc::clone(&rec));
        block_on(h.init(move |_| async move { Ok(stage) })).unwrap();

        h.dispose();
        h.dispose();
        assert_eq!(rec.lock().released, 1);
        assert_eq!(h.tick(1.0), TickOutcome::Stopped);
        assert!(!h.controller().is_listening());
    }

    #[test]
    fn dispose_before_init_cancels_it() {
        let mut h = handle(SurfaceSize::new(10, 10));
        h.dispose();
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let res = block_on(h.init(move |_| async move {
            flag.store(true, Ordering::SeqCst);
            Err(Error::Backend("unreachable".into()))
        }));
        assert!(matches!(res, Err(Error::Cancelled)));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn disposer_from_tick_side_stops_loop() {
        let rec = Arc::new(Mutex::new(Recorder::default()));
        let mut h = handle(SurfaceSize::new(10, 10));
        let stage = MockStage(Arc::clone(&rec));
        block_on(h.init(move |_| async move { Ok(stage) })).unwrap();

        h.disposer().dispose();
        assert_eq!(h.tick(1.0), TickOutcome::Stopped);
        assert_eq!(h.phase(), Phase::Disposed);
        assert_eq!(rec.lock().released, 1);
    }

    #[test]
    fn cancel_hooks_run_once() {
        let h = handle(SurfaceSize::new(10, 10));
        let token = h.token.clone();
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        token.on_cancel(move || *c.lock() += 1);

        let d = h.disposer();
        d.dispose();
        d.dispose();
        assert_eq!(*count.lock(), 1);

        // Registered after the fact: runs immediately
        let c = Arc::clone(&count);
        token.on_cancel(move || *c.lock() += 1);
        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn edition_set_before_init_reaches_stage() {
        struct EditionStage(Arc<Mutex<Option<Edition>>>);
        impl Stage for EditionStage {
            fn resize(&mut self, _size: SurfaceSize) {}
            fn render(&mut self, _frame: &Frame) -> Result<()> {
                Ok(())
            }
            fn set_edition(&mut self, edition: Edition) {
                *self.0.lock() = Some(edition);
            }
            fn release(self) {}
        }

        let seen = Arc::new(Mutex::new(None));
        let controller = OrientationController::new(
            InteractionConfig::default(),
            GyroSupport::Unavailable,
            ContainerRect::default(),
            0.0,
        );
        let mut h = SceneHandle::new(controller, SurfaceSize::new(4, 4));
        h.set_edition(Edition::Polychrome);
        let stage = EditionStage(Arc::clone(&seen));
        block_on(h.init(move |_| async move { Ok(stage) })).unwrap();
        assert_eq!(*seen.lock(), Some(Edition::Polychrome));

        h.set_edition(Edition::Foil);
        assert_eq!(*seen.lock(), Some(Edition::Foil));
    }
}
