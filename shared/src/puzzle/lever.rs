use crate::{
    interpolation::{approx_eq, snap_to_grid, DEFAULT_EPSILON},
    FieldId,
};

/// The replicated field a lever entity keeps its angle in
pub const LEVER_ANGLE: FieldId = FieldId(0);

/// Geometry of a lever, in radians in the lever's parent-local space
#[derive(Clone, Debug)]
pub struct LeverConfig {
    pub min_angle: f32,
    pub max_angle: f32,
    /// Pulling past this angle activates the lever
    pub activation_angle: f32,
    /// How far back below `activation_angle` the lever must travel to
    /// deactivate again
    pub hysteresis: f32,
    /// Detent spacing the angle snaps to when close enough
    pub detent: Option<f32>,
    pub tolerance: f32,
}

impl Default for LeverConfig {
    fn default() -> Self {
        Self {
            min_angle: 0.0,
            max_angle: std::f32::consts::FRAC_PI_2,
            activation_angle: std::f32::consts::FRAC_PI_3,
            hysteresis: 0.1,
            detent: None,
            tolerance: DEFAULT_EPSILON,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeverSignal {
    Activated,
    Deactivated,
}

/// A grabbed lever, simulated by whichever participant owns it.
///
/// The angle is clamped in local space. Crossing the activation angle only
/// produces a signal; the owner turns that into a Request and the
/// authority decides whether it counts.
#[derive(Clone, Debug)]
pub struct Lever {
    config: LeverConfig,
    angle: f32,
    active: bool,
}

impl Lever {
    pub fn new(config: LeverConfig) -> Self {
        let angle = config.min_angle;
        Self {
            config,
            angle,
            active: false,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Moves the lever toward the grabbing hand's angle, expressed in the
    /// lever's local space
    pub fn apply_grab(&mut self, local_angle: f32) -> Option<LeverSignal> {
        let mut angle = local_angle.clamp(self.config.min_angle, self.config.max_angle);
        if let Some(detent) = self.config.detent {
            if let Some(snapped) = snap_to_grid(angle, detent, self.config.tolerance) {
                angle = snapped.clamp(self.config.min_angle, self.config.max_angle);
            }
        }
        self.angle = angle;

        let threshold = self.config.activation_angle;
        let reached = angle > threshold || approx_eq(angle, threshold, self.config.tolerance);
        if !self.active && reached {
            self.active = true;
            return Some(LeverSignal::Activated);
        }
        let released = threshold - self.config.hysteresis;
        if self.active && angle < released && !approx_eq(angle, released, self.config.tolerance) {
            self.active = false;
            return Some(LeverSignal::Deactivated);
        }
        None
    }

    /// Applies the authority's verdict, e.g. after a reset
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
