//! Orientation controller
//!
//! Fuses pointer, touch and device-orientation input into a smoothed two
//! axis tilt, plus an independent spring "kick". Input sources are
//! arbitrated by an explicit state machine with priority
//! gyroscope > pointer/touch > idle.
//!
//! The controller never touches a platform API. Hosts feed it
//! [`InputEvent`]s and act on the [`HostRequest`]s it returns; the only
//! clock it sees is the `now` passed to [`OrientationController::tick`].

mod spring;

pub use spring::{Spring, SpringParams};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Interaction tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Tilt at full pointer deflection (radians, about 15 degrees)
    pub max_tilt: f32,
    /// Fraction of the remaining distance covered per tick
    pub smoothing: f32,
    /// Amplitude of the idle breathing tilt
    pub idle_tilt: f32,
    /// Amplitude of the idle vertical bob
    pub idle_bob: f32,
    /// Device tilt (degrees) mapped to full deflection
    pub gyro_range: f32,
    /// Seconds a fresh orientation listener may stay silent
    pub listen_timeout: f64,
    pub kick_stiffness: f32,
    pub kick_damping: f32,
    /// Velocity added by `kick(1.0)`
    pub kick_impulse: f32,
    pub kick_max_dt: f32,
    pub kick_rest_epsilon: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            max_tilt: 0.26,
            smoothing: 0.08,
            idle_tilt: 0.04,
            idle_bob: 0.015,
            gyro_range: 25.0,
            listen_timeout: 1.5,
            kick_stiffness: 35.0,
            kick_damping: 6.0,
            kick_impulse: 1.5,
            kick_max_dt: 0.05,
            kick_rest_epsilon: 1e-4,
        }
    }
}

impl InteractionConfig {
    fn spring(&self) -> SpringParams {
        SpringParams {
            stiffness: self.kick_stiffness,
            damping: self.kick_damping,
            max_dt: self.kick_max_dt,
            rest_epsilon: self.kick_rest_epsilon,
        }
    }
}

/// Which source currently drives the target rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InputMode {
    #[default]
    Idle,
    /// Mouse hover or an active touch
    Pointer,
    Gyroscope,
}

/// What the platform offers for device orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GyroSupport {
    /// No orientation events at all
    Unavailable,
    /// Events may fire without asking
    NoPermissionApi,
    /// Events only fire after a permission request made inside a user
    /// gesture
    RequiresPermission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permission {
    NotAsked,
    Pending,
    Granted,
    Denied,
}

/// State of the orientation listener
#[derive(Debug, Clone, Copy, PartialEq)]
enum Listener {
    Detached,
    /// Attached at `since`, no reading yet
    Probing { since: f64 },
    /// At least one reading received
    Live,
}

/// Something the host must do on the controller's behalf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    /// Call the platform's orientation permission API now, synchronously,
    /// inside the gesture handler that delivered the click. Report the
    /// answer with [`InputEvent::PermissionResult`].
    RequestOrientationPermission,
}

/// Container bounds in the same coordinate space as pointer events
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ContainerRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Map a client position to `[-1, 1]` on both axes (y down).
    /// `None` for an empty rect.
    pub fn normalize(&self, x: f32, y: f32) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let n = Vec2::new(
            (x - self.left) / self.width * 2.0 - 1.0,
            (y - self.top) / self.height * 2.0 - 1.0,
        );
        Some(n.clamp(Vec2::NEG_ONE, Vec2::ONE))
    }
}

/// Input delivered by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerEnter { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerLeave,
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,
    Click,
    /// Device orientation in degrees; either angle may be missing
    Orientation { beta: Option<f32>, gamma: Option<f32> },
    PermissionResult { granted: bool },
}

/// Per-tick controller output
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    /// Smoothed tilt (x = pitch, y = yaw)
    pub tilt: Vec2,
    /// Spring offset from the last kick
    pub kick: Vec2,
    /// Vertical bob, non-zero only while idle
    pub bob: f32,
    /// Last normalised pointer or gyro deflection
    pub pointer: Vec2,
    pub mode: InputMode,
}

impl Orientation {
    /// Final rotation: smoothed tilt plus kick offset
    pub fn rotation(&self) -> Vec2 {
        self.tilt + self.kick
    }
}

/// Owns all interaction state for one scene
#[derive(Debug, Clone)]
pub struct OrientationController {
    config: InteractionConfig,
    support: GyroSupport,
    mode: InputMode,
    permission: Permission,
    listener: Listener,
    /// (beta, gamma) of the first reading after (re)attaching
    baseline: Option<(f32, f32)>,
    rect: ContainerRect,
    pointer: Vec2,
    target: Vec2,
    current: Vec2,
    bob: f32,
    spring: Spring,
    clock: f64,
    last_tick: Option<f64>,
}

impl OrientationController {
    /// Create a controller. The orientation listener is attached right
    /// away when the platform has one; the listening window starts at `now`.
    pub fn new(config: InteractionConfig, support: GyroSupport, rect: ContainerRect, now: f64) -> Self {
        let mut controller = Self {
            config,
            support,
            mode: InputMode::Idle,
            permission: Permission::NotAsked,
            listener: Listener::Detached,
            baseline: None,
            rect,
            pointer: Vec2::ZERO,
            target: Vec2::ZERO,
            current: Vec2::ZERO,
            bob: 0.0,
            spring: Spring::default(),
            clock: now,
            last_tick: None,
        };
        controller.start_listening();
        controller
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn support(&self) -> GyroSupport {
        self.support
    }

    /// Whether the orientation listener is attached
    pub fn is_listening(&self) -> bool {
        !matches!(self.listener, Listener::Detached)
    }

    pub fn permission_denied(&self) -> bool {
        self.permission == Permission::Denied
    }

    pub fn baseline(&self) -> Option<(f32, f32)> {
        self.baseline
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn current(&self) -> Vec2 {
        self.current
    }

    pub fn kick_state(&self) -> Spring {
        self.spring
    }

    pub fn set_rect(&mut self, rect: ContainerRect) {
        self.rect = rect;
    }

    /// Apply one input event. Returns a request the host must honour
    /// before returning from its own event handler.
    pub fn handle(&mut self, event: InputEvent) -> Option<HostRequest> {
        match event {
            InputEvent::PointerEnter { x, y } | InputEvent::TouchStart { x, y } => {
                if self.mode != InputMode::Gyroscope {
                    self.set_mode(InputMode::Pointer);
                    self.aim_at(x, y);
                }
                None
            }
            InputEvent::PointerMove { x, y } | InputEvent::TouchMove { x, y } => {
                if self.mode != InputMode::Gyroscope {
                    self.aim_at(x, y);
                }
                None
            }
            InputEvent::PointerLeave | InputEvent::TouchEnd => {
                if self.mode != InputMode::Gyroscope {
                    self.set_mode(InputMode::Idle);
                    self.target = Vec2::ZERO;
                    self.pointer = Vec2::ZERO;
                }
                None
            }
            InputEvent::Click => self.on_click(),
            InputEvent::Orientation { beta, gamma } => {
                if let (Some(beta), Some(gamma)) = (beta, gamma) {
                    self.on_orientation(beta, gamma);
                }
                None
            }
            InputEvent::PermissionResult { granted } => {
                if granted {
                    debug!("orientation permission granted");
                    self.permission = Permission::Granted;
                    self.restart_listening();
                } else {
                    debug!("orientation permission denied");
                    self.permission = Permission::Denied;
                    self.stop_listening();
                }
                None
            }
        }
    }

    /// Schedule a spring impulse; `direction` scales the configured impulse
    pub fn kick(&mut self, direction: f32) {
        self.spring
            .impulse(Vec2::new(0.0, direction * self.config.kick_impulse));
    }

    /// Advance one frame at time `now` (seconds)
    pub fn tick(&mut self, now: f64) -> Orientation {
        self.clock = now;

        if let Listener::Probing { since } = self.listener {
            if now - since >= self.config.listen_timeout {
                debug!("orientation listener timed out, detaching listener");
                self.stop_listening();
            }
        }

        let t = now as f32;
        if self.mode == InputMode::Idle {
            self.target = Vec2::new(
                (t * 0.5).sin() * self.config.idle_tilt,
                (t * 0.7).cos() * self.config.idle_tilt,
            );
            self.bob = (t * 0.4).sin() * self.config.idle_bob;
        } else {
            self.bob = 0.0;
        }

        self.current += (self.target - self.current) * self.config.smoothing;

        let dt = self.last_tick.map_or(0.0, |last| (now - last).max(0.0) as f32);
        self.last_tick = Some(now);
        self.spring.step(dt, &self.config.spring());

        Orientation {
            tilt: self.current,
            kick: self.spring.offset,
            bob: self.bob,
            pointer: self.pointer,
            mode: self.mode,
        }
    }

    /// Remove every listener; called once on teardown
    pub fn detach(&mut self) {
        self.stop_listening();
        self.set_mode(InputMode::Idle);
    }

    fn on_click(&mut self) -> Option<HostRequest> {
        if self.mode == InputMode::Gyroscope || self.permission == Permission::Denied {
            return None;
        }
        match self.support {
            GyroSupport::Unavailable => None,
            GyroSupport::RequiresPermission => {
                if self.permission == Permission::Pending {
                    return None;
                }
                self.permission = Permission::Pending;
                Some(HostRequest::RequestOrientationPermission)
            }
            GyroSupport::NoPermissionApi => {
                // The first listening window may have closed before the device woke
                self.restart_listening();
                None
            }
        }
    }

    fn on_orientation(&mut self, beta: f32, gamma: f32) {
        if !self.is_listening() {
            return;
        }
        self.listener = Listener::Live;

        let (beta0, gamma0) = *self.baseline.get_or_insert((beta, gamma));
        self.set_mode(InputMode::Gyroscope);

        let range = self.config.gyro_range;
        let d_beta = (beta - beta0).clamp(-range, range);
        let d_gamma = (gamma - gamma0).clamp(-range, range);

        self.pointer = Vec2::new(d_gamma / range, d_beta / range);
        self.aim(self.pointer);
    }

    fn aim_at(&mut self, x: f32, y: f32) {
        if let Some(n) = self.rect.normalize(x, y) {
            self.pointer = n;
            self.aim(n);
        }
    }

    fn aim(&mut self, n: Vec2) {
        self.target = Vec2::new(-n.y, n.x) * self.config.max_tilt;
    }

    fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "input mode");
            self.mode = mode;
        }
    }

    fn start_listening(&mut self) {
        if self.support == GyroSupport::Unavailable {
            return;
        }
        self.listener = Listener::Probing { since: self.clock };
    }

    fn restart_listening(&mut self) {
        self.baseline = None;
        self.start_listening();
    }

    fn stop_listening(&mut self) {
        self.listener = Listener::Detached;
    }
}
