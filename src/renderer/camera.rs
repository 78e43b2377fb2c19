use glam::{Mat3, Mat4, Vec3};

use crate::config::ViewerConfig;

/// Projected CRS convention: z is height.
pub const WORLD_UP: Vec3 = Vec3::Z;

/// Elevation of the eye above the horizontal plane never reaches this.
pub const MAX_ELEVATION: f32 = 89.0 * std::f32::consts::PI / 180.0;

pub const MIN_DISTANCE: f32 = 0.01;
pub const DEFAULT_FAR_PLANE: f32 = 1000.0;

/// Eye/center orbit camera.
///
/// Every mutation rebuilds the view and combined matrices and marks the
/// camera dirty; the viewer pushes the uniform right after the handler that
/// caused it.
pub struct CameraController {
    eye: Vec3,
    center: Vec3,

    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,

    sensitivity: f32,
    dolly_percentage: f32,

    view: Mat4,
    projection: Mat4,
    combined: Mat4,
    dirty: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}

impl CameraController {
    pub fn new(config: &ViewerConfig) -> Self {
        let mut camera = Self {
            eye: Vec3::new(0.0, -1.0, 1.0) * 100.0,
            center: Vec3::ZERO,

            fov: config.fov_degrees.to_radians(),
            aspect: 16.0 / 9.0,
            near: config.near_plane,
            far: DEFAULT_FAR_PLANE,

            sensitivity: config.rotate_sensitivity,
            dolly_percentage: config.dolly_percentage,

            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            combined: Mat4::IDENTITY,
            dirty: true,
        };
        camera.rebuild_projection();
        camera.update_matrices();
        camera
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn combined(&self) -> Mat4 {
        self.combined
    }

    pub fn far_plane(&self) -> f32 {
        self.far
    }

    pub fn distance(&self) -> f32 {
        self.eye.distance(self.center)
    }

    /// Angle of the center-to-eye vector above the horizontal plane.
    pub fn elevation(&self) -> f32 {
        let offset = self.eye - self.center;
        let length = offset.length();
        if length <= f32::EPSILON {
            return 0.0;
        }
        (offset.z / length).clamp(-1.0, 1.0).asin()
    }

    pub fn is_finite(&self) -> bool {
        self.combined.is_finite()
    }

    /// Returns whether the matrices changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn reshape(&mut self, width: u32, height: u32, far_plane: f32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
        self.far = far_plane.max(self.near * 2.0);
        self.rebuild_projection();
        self.update_matrices();
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.reshape(width, height, self.far);
    }

    /// Centers the view on the origin at `distance`, 45° above the horizon.
    pub fn frame(&mut self, distance: f32, far_plane: f32) {
        self.center = Vec3::ZERO;
        self.eye = Vec3::new(0.0, -1.0, 1.0).normalize() * distance.max(MIN_DISTANCE);
        self.far = far_plane.max(self.near * 2.0);
        self.rebuild_projection();
        self.update_matrices();
    }

    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        let yaw = -delta_x / self.sensitivity;
        let mut pitch = delta_y / self.sensitivity;

        if (self.elevation() + pitch).abs() >= MAX_ELEVATION {
            pitch = 0.0;
        }

        let mut offset = Mat3::from_axis_angle(WORLD_UP, yaw) * (self.eye - self.center);

        if pitch != 0.0 {
            // horizontal axis perpendicular to the eye vector
            if let Some(axis) = (offset + WORLD_UP).cross(offset).try_normalize() {
                offset = Mat3::from_axis_angle(axis, -pitch) * offset;
            }
        }

        self.eye = self.center + offset;
        self.update_matrices();
    }

    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let forward = self.center - self.eye;
        let direction = Vec3::new(forward.x, forward.y, 0.0)
            .try_normalize()
            .unwrap_or(Vec3::Y);
        let side = Vec3::new(direction.y, -direction.x, 0.0);

        let scale = self.distance() / self.sensitivity;
        let shift = direction * (delta_y * scale) - side * (delta_x * scale);

        self.eye += shift;
        self.center += shift;
        self.update_matrices();
    }

    pub fn dolly(&mut self, scroll_delta: f32) {
        let distance = self.distance();
        self.place_eye(distance + distance * scroll_delta * self.dolly_percentage);
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.place_eye(distance);
    }

    fn place_eye(&mut self, distance: f32) {
        let direction = (self.eye - self.center)
            .try_normalize()
            .unwrap_or(Vec3::new(0.0, -1.0, 1.0).normalize());
        self.eye = self.center + direction * distance.max(MIN_DISTANCE);
        self.update_matrices();
    }

    fn rebuild_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
    }

    fn update_matrices(&mut self) {
        self.view = Mat4::look_at_rh(self.eye, self.center, WORLD_UP);
        self.combined = self.projection * self.view;
        self.dirty = true;
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &CameraController) -> Self {
        Self {
            view_proj: camera.combined().to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DEFAULT_DOLLY: f32 = crate::config::DEFAULT_DOLLY_PERCENTAGE;

    fn framed() -> CameraController {
        let mut camera = CameraController::default();
        camera.reshape(1280, 720, 4000.0);
        camera.frame(200.0, 4000.0);
        camera
    }

    #[test]
    fn test_frame_places_eye() {
        let camera = framed();
        assert_relative_eq!(camera.distance(), 200.0, epsilon = 1e-3);
        assert_relative_eq!(camera.elevation(), std::f32::consts::FRAC_PI_4, epsilon = 1e-5);
        assert_eq!(camera.center(), Vec3::ZERO);
        assert!(camera.is_finite());
    }

    #[test]
    fn test_elevation_never_reaches_clamp() {
        for direction in [1.0, -1.0] {
            let mut camera = framed();
            for _ in 0..2000 {
                camera.orbit(3.0, direction * 450.0);
                assert!(camera.elevation().abs() < MAX_ELEVATION);
                assert!(camera.is_finite());
            }
            assert_relative_eq!(camera.distance(), 200.0, epsilon = 0.5);
        }
    }

    #[test]
    fn test_small_orbit_steps_approach_clamp() {
        let mut camera = framed();
        for _ in 0..10_000 {
            camera.orbit(0.0, 5.0);
        }
        assert!(camera.elevation() > 80.0_f32.to_radians());
        assert!(camera.elevation() < MAX_ELEVATION);
    }

    #[test]
    fn test_horizontal_orbit_keeps_elevation() {
        let mut camera = framed();
        let elevation = camera.elevation();
        camera.orbit(500.0, 0.0);

        assert_relative_eq!(camera.elevation(), elevation, epsilon = 1e-5);
        assert_relative_eq!(camera.distance(), 200.0, epsilon = 1e-3);
        assert_eq!(camera.center(), Vec3::ZERO);
        // one radian about +Z
        let eye = camera.eye();
        assert_relative_eq!(eye.y.atan2(eye.x), -std::f32::consts::FRAC_PI_2 - 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_dolly_round_trip_restores_eye() {
        let mut camera = framed();
        camera.orbit(123.0, -45.0);
        let eye = camera.eye();

        let scroll = 250.0;
        camera.dolly(scroll);
        assert_relative_eq!(camera.distance(), 200.0 * 1.25, epsilon = 1e-2);

        let factor = 1.0 / (1.0 + scroll * DEFAULT_DOLLY);
        camera.dolly((factor - 1.0) / DEFAULT_DOLLY);

        assert_relative_eq!(camera.eye().x, eye.x, epsilon = 1e-2);
        assert_relative_eq!(camera.eye().y, eye.y, epsilon = 1e-2);
        assert_relative_eq!(camera.eye().z, eye.z, epsilon = 1e-2);
    }

    #[test]
    fn test_dolly_never_crosses_center() {
        let mut camera = framed();
        camera.dolly(-1.0e6);
        assert!(camera.distance() >= MIN_DISTANCE * 0.99);
        assert!(camera.is_finite());
    }

    #[test]
    fn test_set_distance_keeps_direction() {
        let mut camera = framed();
        let direction = (camera.eye() - camera.center()).normalize();
        camera.set_distance(50.0);

        assert_relative_eq!(camera.distance(), 50.0, epsilon = 1e-3);
        let after = (camera.eye() - camera.center()).normalize();
        assert_relative_eq!(direction.dot(after), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_pan_moves_eye_and_center_together() {
        let mut camera = framed();
        let offset = camera.eye() - camera.center();
        camera.pan(100.0, 40.0);

        let moved = camera.center();
        assert!(moved.length() > 0.0);
        assert_relative_eq!(moved.z, 0.0, epsilon = 1e-5);
        let after = camera.eye() - camera.center();
        assert_relative_eq!(after.x, offset.x, epsilon = 1e-3);
        assert_relative_eq!(after.y, offset.y, epsilon = 1e-3);
        assert_relative_eq!(after.z, offset.z, epsilon = 1e-3);

        // looking along +Y: vertical drag moves forward, horizontal drag sideways
        assert!(moved.y > 0.0);
        assert!(moved.x < 0.0);
    }

    #[test]
    fn test_dirty_flag() {
        let mut camera = framed();
        assert!(camera.take_dirty());
        assert!(!camera.take_dirty());
        camera.orbit(1.0, 0.0);
        assert!(camera.take_dirty());
    }

    #[test]
    fn test_uniform_matches_combined() {
        let camera = framed();
        let uniform = CameraUniform::from_camera(&camera);
        assert_eq!(uniform.view_proj, camera.combined().to_cols_array_2d());
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
    }
}
