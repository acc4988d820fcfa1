use catalog::ModelSettings;
use formats::{Mesh, ModelFormat};
use foundation::math::{
    Mat4, Vec3, mat4_mul, mat4_rotation_xyz, mat4_scale, mat4_translation,
};

use crate::camera::OrbitCamera;
use crate::loader::LoadError;

/// Cube spin while a placeholder is shown, radians per second on X and Y.
const CUBE_SPIN_RAD_PER_S: f64 = 0.6;
/// One turn every 30 s.
const AUTO_ROTATE_RAD_PER_S: f64 = std::f64::consts::TAU / 30.0;

/// Scale, then XYZ rotation, then translation, applied after recentering.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Placement {
    pub scale: Vec3,
    pub rotation_rad: Vec3,
    pub position: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            scale: Vec3::new(1.0, 1.0, 1.0),
            rotation_rad: Vec3::ZERO,
            position: Vec3::ZERO,
        }
    }
}

impl Placement {
    pub fn matrix(&self) -> Mat4 {
        mat4_mul(
            mat4_translation(self.position),
            mat4_mul(mat4_rotation_xyz(self.rotation_rad), mat4_scale(self.scale)),
        )
    }
}

/// Everything needed to (re)load one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub url: String,
    /// `None` when the type is not one we can read.
    pub format: Option<ModelFormat>,
    pub use_draco: bool,
    pub draco_decoder_path: Option<String>,
    pub placement: Placement,
    pub auto_rotate: bool,
    pub background_color: Option<String>,
}

impl ModelRequest {
    pub fn new(url: impl Into<String>, format: Option<ModelFormat>) -> Self {
        Self {
            url: url.into(),
            format,
            use_draco: false,
            draco_decoder_path: None,
            placement: Placement::default(),
            auto_rotate: false,
            background_color: None,
        }
    }

    /// `None` when the settings name no model file.
    pub fn from_settings(settings: &ModelSettings) -> Option<Self> {
        let url = settings.url.as_deref().filter(|_| settings.has_model())?;
        Some(Self {
            url: url.to_string(),
            format: settings.format(),
            use_draco: settings.use_draco,
            draco_decoder_path: settings.draco_decoder_path.clone(),
            placement: Placement {
                scale: settings.scale_vec(),
                rotation_rad: settings.rotation_rad(),
                position: settings.position_vec(),
            },
            auto_rotate: settings.auto_rotate,
            background_color: settings.background_color.clone(),
        })
    }
}

/// Identifies one load attempt. Only the newest ticket is honored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeshSource {
    Model,
    /// Stand-in for a model type we cannot read.
    DefaultCube,
    /// Chosen from the error panel.
    Demo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerState {
    Uninitialized,
    Loading {
        ticket: LoadTicket,
        loaded: u64,
        total: Option<u64>,
    },
    Displayed(MeshSource),
    Error {
        message: String,
    },
}

/// The 3D panel of a project page: which mesh is shown, how it is framed
/// and what the overlay (spinner, error panel) should say.
#[derive(Debug, Clone)]
pub struct ModelViewer {
    state: ViewerState,
    request: Option<ModelRequest>,
    mesh: Option<Mesh>,
    camera: OrbitCamera,
    spin_rad: Vec3,
    next_ticket: u64,
}

impl Default for ModelViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelViewer {
    pub fn new() -> Self {
        Self {
            state: ViewerState::Uninitialized,
            request: None,
            mesh: None,
            camera: OrbitCamera::default(),
            spin_rad: Vec3::ZERO,
            next_ticket: 0,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn request(&self) -> Option<&ModelRequest> {
        self.request.as_ref()
    }

    /// The mesh to draw, already recentered and placed.
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ViewerState::Loading { .. })
    }

    /// Fraction loaded, when the total size is known.
    pub fn progress(&self) -> Option<f64> {
        match self.state {
            ViewerState::Loading {
                loaded,
                total: Some(total),
                ..
            } if total > 0 => Some((loaded as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    /// Rotation applied on top of the mesh when drawing.
    pub fn model_matrix(&self) -> Mat4 {
        mat4_rotation_xyz(self.spin_rad)
    }

    /// Starts loading `request`. Unreadable model types never hit the
    /// network: the default cube is shown and `None` returned.
    pub fn begin_load(&mut self, request: ModelRequest) -> Option<LoadTicket> {
        if request.format.is_none() {
            tracing::warn!(url = request.url.as_str(), "unsupported model type, showing default cube");
            self.request = Some(request);
            // Any load still in flight is now stale.
            self.next_ticket += 1;
            self.show_cube(MeshSource::DefaultCube);
            return None;
        }
        self.request = Some(request);
        Some(self.start_loading())
    }

    pub fn report_progress(&mut self, ticket: LoadTicket, loaded: u64, total: Option<u64>) -> bool {
        match &mut self.state {
            ViewerState::Loading {
                ticket: current,
                loaded: l,
                total: t,
            } if *current == ticket => {
                *l = loaded;
                *t = total;
                true
            }
            _ => false,
        }
    }

    /// Applies the outcome of a load. Returns `false` (and changes nothing)
    /// when `ticket` is not the load in progress.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Mesh, LoadError>) -> bool {
        match self.state {
            ViewerState::Loading { ticket: current, .. } if current == ticket => {}
            _ => {
                tracing::debug!(?ticket, "ignoring stale model load");
                return false;
            }
        }

        match result {
            Ok(mut mesh) => {
                mesh.recenter();
                if let Some(request) = &self.request {
                    mesh.transform(&request.placement.matrix());
                }
                self.camera.frame(&mesh.bounds());
                self.mesh = Some(mesh);
                self.state = ViewerState::Displayed(MeshSource::Model);
            }
            Err(err) => {
                tracing::warn!("model load failed: {err}");
                self.mesh = None;
                self.state = ViewerState::Error {
                    message: err.to_string(),
                };
            }
        }
        true
    }

    /// From the error panel: load the same request again.
    pub fn retry(&mut self) -> Option<LoadTicket> {
        if !matches!(self.state, ViewerState::Error { .. }) || self.request.is_none() {
            return None;
        }
        Some(self.start_loading())
    }

    /// From the error panel: give up on the model and spin a cube instead.
    /// Once shown, the demo stays until the next `begin_load`.
    pub fn show_demo(&mut self) -> bool {
        if !matches!(self.state, ViewerState::Error { .. }) {
            return false;
        }
        self.show_cube(MeshSource::Demo);
        true
    }

    /// Advances animation by `dt_s` seconds: placeholder cubes spin and
    /// `autoRotate` models orbit the camera.
    pub fn tick(&mut self, dt_s: f64) {
        let dt_s = dt_s.max(0.0);
        match self.state {
            ViewerState::Displayed(MeshSource::DefaultCube | MeshSource::Demo) => {
                let step = CUBE_SPIN_RAD_PER_S * dt_s;
                self.spin_rad.x = (self.spin_rad.x + step) % std::f64::consts::TAU;
                self.spin_rad.y = (self.spin_rad.y + step) % std::f64::consts::TAU;
            }
            ViewerState::Displayed(MeshSource::Model)
                if self.request.as_ref().is_some_and(|r| r.auto_rotate) =>
            {
                self.camera.yaw_rad =
                    (self.camera.yaw_rad + AUTO_ROTATE_RAD_PER_S * dt_s) % std::f64::consts::TAU;
            }
            _ => {}
        }
    }

    /// Back to the empty panel; loads in flight become stale.
    pub fn reset(&mut self) {
        self.next_ticket += 1;
        self.state = ViewerState::Uninitialized;
        self.request = None;
        self.mesh = None;
        self.spin_rad = Vec3::ZERO;
        self.camera = OrbitCamera::default();
    }

    fn start_loading(&mut self) -> LoadTicket {
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        self.state = ViewerState::Loading {
            ticket,
            loaded: 0,
            total: None,
        };
        self.spin_rad = Vec3::ZERO;
        ticket
    }

    fn show_cube(&mut self, source: MeshSource) {
        let cube = Mesh::cube(1.0);
        self.camera = OrbitCamera::default();
        self.camera.frame(&cube.bounds());
        self.mesh = Some(cube);
        self.spin_rad = Vec3::ZERO;
        self.state = ViewerState::Displayed(source);
    }
}
