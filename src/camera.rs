use glam::{Mat4, Vec3};

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            yaw,
            pitch,
            fov: std::f32::consts::PI / 3.0,
            near: 0.1,
            far: 1000.0,
        };
        camera.update_vectors();
        camera
    }

    pub fn update_vectors(&mut self) {
        let forward = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize();

        let right = forward.cross(Vec3::Y);
        self.forward = forward;
        self.right = if right.length_squared() < 1e-6 {
            Vec3::X
        } else {
            right.normalize()
        };
        self.up = self.right.cross(forward).normalize();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// OpenGL-style projection: clip-space depth grows with distance from the eye.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, aspect.max(1e-6), self.near, self.far)
    }

    /// Column-major view-projection, the layout the sort kernel consumes.
    pub fn view_projection(&self, aspect: f32) -> [f32; 16] {
        (self.projection_matrix(aspect) * self.view_matrix()).to_cols_array()
    }
}

pub fn look_at_target(camera: &mut Camera, target: Vec3) {
    let to_target = target - camera.position;
    if to_target.length_squared() < 1e-8 {
        return;
    }
    let to_target = to_target.normalize();
    camera.yaw = to_target.z.atan2(to_target.x);
    camera.pitch = to_target.y.clamp(-1.0, 1.0).asin();
    camera.update_vectors();
}

/// Places the camera on a horizontal circle around `target` and aims it there.
pub fn orbit(camera: &mut Camera, target: Vec3, radius: f32, angle: f32, height: f32) {
    camera.position = target + Vec3::new(radius * angle.cos(), height, radius * angle.sin());
    look_at_target(camera, target);
}
