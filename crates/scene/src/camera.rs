use foundation::bounds::Aabb3;
use foundation::math::{Mat4, Vec3, mat4_look_at_rh, mat4_mul, mat4_perspective_rh_z0};

const PITCH_LIMIT_RAD: f64 = 1.55;
const MIN_DISTANCE: f64 = 0.05;
const MAX_DISTANCE: f64 = 50_000.0;

/// Orbit camera: spherical coordinates around `target`, Y up.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitCamera {
    pub yaw_rad: f64,
    pub pitch_rad: f64,
    pub distance: f64,
    pub target: Vec3,
    pub fov_y_rad: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw_rad: 0.6,
            pitch_rad: 0.3,
            distance: 3.0,
            target: Vec3::ZERO,
            fov_y_rad: 45f64.to_radians(),
            near: 0.05,
            far: 10_000.0,
        }
    }
}

impl OrbitCamera {
    /// Unit vector from the target towards the eye.
    fn direction(&self) -> Vec3 {
        Vec3::new(
            self.pitch_rad.cos() * self.yaw_rad.cos(),
            self.pitch_rad.sin(),
            self.pitch_rad.cos() * self.yaw_rad.sin(),
        )
    }

    pub fn eye(&self) -> Vec3 {
        self.target + self.direction().scale(self.distance)
    }

    /// Pointer drag in pixels.
    pub fn orbit(&mut self, delta_x_px: f64, delta_y_px: f64) {
        let speed = 0.005;
        self.yaw_rad += delta_x_px * speed;
        self.pitch_rad =
            (self.pitch_rad + delta_y_px * speed).clamp(-PITCH_LIMIT_RAD, PITCH_LIMIT_RAD);
    }

    /// Moves the target in the view plane; pointer delta in pixels.
    pub fn pan(&mut self, delta_x_px: f64, delta_y_px: f64) {
        let forward = -self.direction();
        let right = forward.cross(Vec3::UP).normalize();
        let up = right.cross(forward);
        let pan_scale = self.distance * 0.002;
        self.target = self.target
            + right.scale(-delta_x_px * pan_scale)
            + up.scale(delta_y_px * pan_scale);
    }

    /// Dolly by a wheel `deltaY`.
    pub fn zoom(&mut self, wheel_delta_y: f64) {
        let factor = (wheel_delta_y * 0.0015).exp();
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Aims at the center of `bounds` from far enough away that its
    /// bounding sphere fills the view, keeping the current angles. Near and
    /// far planes follow the distance.
    pub fn frame(&mut self, bounds: &Aabb3) {
        if bounds.is_empty() {
            return;
        }
        let radius = bounds.radius().max(1e-3);
        self.target = bounds.center();
        let fit = radius / (0.5 * self.fov_y_rad).sin();
        self.distance = (fit * 1.2).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.near = (self.distance - radius).max(self.distance * 1e-3).max(1e-3) * 0.5;
        self.far = (self.distance + radius) * 4.0;
    }

    pub fn view_proj(&self, canvas_width: f64, canvas_height: f64) -> Mat4 {
        let aspect = if canvas_height <= 0.0 {
            1.0
        } else {
            (canvas_width / canvas_height).max(1e-6)
        };
        let view = mat4_look_at_rh(self.eye(), self.target, Vec3::UP);
        let proj = mat4_perspective_rh_z0(self.fov_y_rad, aspect, self.near, self.far);
        mat4_mul(proj, view)
    }
}
