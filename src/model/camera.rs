use glam::{Mat4, Vec3};

/// Pitch limit in degrees. Keeps `cos(pitch)` away from zero so `front` never degenerates.
pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;

/// Keyboard movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Tuning parameters supplied at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees
    pub zoom: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            movement_speed: 3.0,
            mouse_sensitivity: 0.1,
            zoom: MAX_ZOOM,
        }
    }
}

/// Free-fly camera driven by yaw/pitch in degrees.
///
/// `front`, `right` and `up` are derived from the angles and only change through
/// [`Camera::update_orientation`], which every angle-mutating method calls before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,

    yaw: f32,
    pitch: f32,

    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0), -90.0, 0.0)
    }
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self::with_settings(position, yaw, pitch, CameraSettings::default())
    }

    pub fn with_settings(position: Vec3, yaw: f32, pitch: f32, settings: CameraSettings) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw,
            pitch,
            movement_speed: settings.movement_speed,
            mouse_sensitivity: settings.mouse_sensitivity,
            zoom: settings.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        };
        camera.update_orientation();
        camera
    }

    pub fn front(&self) -> Vec3 { self.front }

    pub fn up(&self) -> Vec3 { self.up }

    pub fn right(&self) -> Vec3 { self.right }

    pub fn world_up(&self) -> Vec3 { self.world_up }

    pub fn yaw(&self) -> f32 { self.yaw }

    pub fn pitch(&self) -> f32 { self.pitch }

    /// Field of view in degrees, always within `[MIN_ZOOM, MAX_ZOOM]`
    pub fn zoom(&self) -> f32 { self.zoom }

    /// Recompute the orientation basis from yaw/pitch
    pub fn update_orientation(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let direction = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.front = direction.normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }

    pub fn target(&self) -> Vec3 { self.position + self.front }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target(), self.up)
    }

    /// Perspective projection using the current zoom as vertical FOV
    pub fn projection_matrix(&self, aspect: f32, z_near: f32, z_far: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, z_near, z_far)
    }

    /// Move along `front`/`right`. `dt` is in seconds and is not clamped.
    pub fn process_movement(&mut self, direction: CameraMovement, dt: f32) {
        let velocity = self.movement_speed * dt;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Apply a look delta in degrees (before sensitivity scaling)
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32, constrain_pitch: bool) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch += dy * self.mouse_sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_orientation();
    }

    pub fn process_scroll(&mut self, dy: f32) {
        self.zoom = (self.zoom - dy).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Put the camera back at a known pose, e.g. after loading a new mesh
    pub fn reset_pose(&mut self, position: Vec3, yaw: f32, pitch: f32) {
        self.position = position;
        self.yaw = yaw;
        self.pitch = pitch;
        self.update_orientation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPS: f32 = 1e-5;

    fn assert_orthonormal(camera: &Camera) {
        let (f, r, u) = (camera.front(), camera.right(), camera.up());
        assert_relative_eq!(f.length(), 1.0, epsilon = EPS);
        assert_relative_eq!(r.length(), 1.0, epsilon = EPS);
        assert_relative_eq!(u.length(), 1.0, epsilon = EPS);
        assert_relative_eq!(f.dot(r), 0.0, epsilon = EPS);
        assert_relative_eq!(f.dot(u), 0.0, epsilon = EPS);
        assert_relative_eq!(r.dot(u), 0.0, epsilon = EPS);
    }

    #[test]
    fn front_is_unit_length_across_pitch_range() {
        for pitch in (-89..=89).step_by(7) {
            for yaw in (-180..=180).step_by(30) {
                let camera = Camera::new(Vec3::ZERO, yaw as f32, pitch as f32);
                assert_relative_eq!(camera.front().length(), 1.0, epsilon = EPS);
            }
        }
    }

    #[test]
    fn basis_stays_orthonormal_after_mouse_look() {
        let mut camera = Camera::default();
        for step in 0..50 {
            let dx = (step as f32 * 13.0) % 40.0 - 20.0;
            let dy = (step as f32 * 7.0) % 30.0 - 15.0;
            camera.process_mouse_movement(dx, dy, true);
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn zero_mouse_delta_is_idempotent() {
        let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), 30.0, 10.0);
        camera.process_mouse_movement(5.0, -3.0, true);
        let before = camera.clone();
        for _ in 0..10 {
            camera.process_mouse_movement(0.0, 0.0, true);
        }
        assert_eq!(camera, before);
    }

    #[test]
    fn scroll_keeps_zoom_in_range() {
        let mut camera = Camera::default();
        camera.process_scroll(1000.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
        camera.process_scroll(-1000.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);

        camera.process_scroll(10.0);
        assert_relative_eq!(camera.zoom(), 35.0);
        for dy in [f32::MAX, -f32::MAX, 0.5, -0.25] {
            camera.process_scroll(dy);
            assert!((MIN_ZOOM..=MAX_ZOOM).contains(&camera.zoom()));
        }
    }

    #[test]
    fn constructor_clamps_initial_zoom() {
        let settings = CameraSettings { zoom: 90.0, ..CameraSettings::default() };
        let camera = Camera::with_settings(Vec3::ZERO, -90.0, 0.0, settings);
        assert_eq!(camera.zoom(), MAX_ZOOM);
    }

    #[test]
    fn pitch_is_capped_when_constrained() {
        let mut camera = Camera::with_settings(
            Vec3::ZERO,
            -90.0,
            0.0,
            CameraSettings { mouse_sensitivity: 1.0, ..CameraSettings::default() },
        );
        for _ in 0..10 {
            camera.process_mouse_movement(0.0, 20.0, true);
        }
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        for _ in 0..20 {
            camera.process_mouse_movement(0.0, -20.0, true);
        }
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn pitch_is_free_when_unconstrained() {
        let mut camera = Camera::with_settings(
            Vec3::ZERO,
            -90.0,
            0.0,
            CameraSettings { mouse_sensitivity: 1.0, ..CameraSettings::default() },
        );
        camera.process_mouse_movement(0.0, 120.0, false);
        assert_relative_eq!(camera.pitch(), 120.0);
    }

    #[test]
    fn forward_motion_from_initial_pose() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), -90.0, 0.0);
        assert!(camera.front().abs_diff_eq(Vec3::NEG_Z, EPS));

        camera.process_movement(CameraMovement::Forward, 1.0);
        assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), EPS));
    }

    #[test]
    fn strafing_follows_right_vector() {
        let mut camera = Camera::new(Vec3::ZERO, -90.0, 0.0);
        assert!(camera.right().abs_diff_eq(Vec3::X, EPS));

        camera.process_movement(CameraMovement::Right, 0.5);
        assert!(camera.position.abs_diff_eq(Vec3::new(1.5, 0.0, 0.0), EPS));
        camera.process_movement(CameraMovement::Left, 0.5);
        camera.process_movement(CameraMovement::Backward, 1.0);
        assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, 3.0), EPS));
    }

    #[test]
    fn keyboard_movement_leaves_orientation_alone() {
        let mut camera = Camera::new(Vec3::ZERO, 12.0, -30.0);
        let (front, up, right) = (camera.front(), camera.up(), camera.right());
        camera.process_movement(CameraMovement::Forward, 0.25);
        assert_eq!((camera.front(), camera.up(), camera.right()), (front, up, right));
    }

    #[test]
    fn view_matrix_maps_target_onto_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), -90.0, 0.0);
        let view = camera.view_matrix();
        let eye = view.transform_point3(camera.position);
        let ahead = view.transform_point3(camera.target());
        assert!(eye.abs_diff_eq(Vec3::ZERO, EPS));
        assert!(ahead.abs_diff_eq(Vec3::NEG_Z, EPS));
    }

    #[test]
    fn reset_pose_recomputes_orientation() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(300.0, 200.0, true);
        camera.reset_pose(Vec3::new(0.0, 0.0, 5.0), -90.0, 0.0);
        assert!(camera.front().abs_diff_eq(Vec3::NEG_Z, EPS));
        assert_eq!(camera.pitch(), 0.0);
        assert_eq!(camera.world_up(), Vec3::Y);
    }
}
