use glam::{Mat4, Vec2, Vec3};

/// Vertical field of view of the field camera, in degrees.
pub const FIELD_OF_VIEW_DEGREES: f32 = 75.0;
/// Distance from the camera to the field plane along +Z.
pub const CAMERA_DISTANCE: f32 = 6.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;

/// Width and height of the frustum cross-section at `distance`.
pub fn frustum_extent(fov_degrees: f32, distance: f32, aspect: f32) -> Vec2 {
    let height = 2.0 * (fov_degrees.to_radians() / 2.0).tan() * distance;
    Vec2::new(height * aspect, height)
}

/// Width over height, with degenerate sizes treated as square.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

/// Perspective camera looking down -Z at the origin from `CAMERA_DISTANCE`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
    position: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(aspect: f32) -> Self {
        let mut camera = Self {
            fov_degrees: FIELD_OF_VIEW_DEGREES,
            aspect,
            near: NEAR_PLANE,
            far: FAR_PLANE,
            position: Vec3::new(0.0, 0.0, CAMERA_DISTANCE),
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn distance(&self) -> f32 {
        self.position.z
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection();
    }

    fn update_projection(&mut self) {
        // wgpu clip space uses a 0..1 depth range, which is what the `_rh`
        // (not `_rh_gl`) variant produces.
        self.projection =
            Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view()
    }
}

/// Unit plane at the origin scaled so it exactly fills the camera frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    scale: Vec2,
}

impl SurfaceGeometry {
    pub fn covering(camera: &PerspectiveCamera) -> Self {
        let mut geometry = Self { scale: Vec2::ONE };
        geometry.fit(camera);
        geometry
    }

    /// Rescales the plane for the camera's current aspect.
    pub fn fit(&mut self, camera: &PerspectiveCamera) {
        self.scale = frustum_extent(camera.fov_degrees(), camera.distance(), camera.aspect());
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
    }

    /// Full model-view-projection transform for the field plane.
    pub fn transform(&self, camera: &PerspectiveCamera) -> Mat4 {
        camera.view_projection() * self.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_keeps_aspect_ratio() {
        for aspect in [0.25, 9.0 / 16.0, 1.0, 4.0 / 3.0, 16.0 / 9.0, 32.0 / 9.0] {
            let extent = frustum_extent(FIELD_OF_VIEW_DEGREES, CAMERA_DISTANCE, aspect);
            assert!((extent.x / extent.y - aspect).abs() < 1e-5);
        }
    }

    #[test]
    fn extent_height_matches_fov() {
        let extent = frustum_extent(75.0, 6.0, 1.0);
        let expected = 2.0 * (37.5_f32).to_radians().tan() * 6.0;
        assert!((extent.y - expected).abs() < 1e-5);
        assert!((extent.y - 9.2079).abs() < 1e-3);
    }

    #[test]
    fn plane_corners_hit_clip_edges() {
        for aspect in [0.5, 1.0, 16.0 / 9.0] {
            let camera = PerspectiveCamera::new(aspect);
            let geometry = SurfaceGeometry::covering(&camera);
            let transform = geometry.transform(&camera);
            for (x, y) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                let ndc = transform.project_point3(Vec3::new(x, y, 0.0));
                assert!((ndc.x - x * 2.0).abs() < 1e-4, "x {ndc:?} at aspect {aspect}");
                assert!((ndc.y - y * 2.0).abs() < 1e-4, "y {ndc:?} at aspect {aspect}");
                assert!(ndc.z > 0.0 && ndc.z < 1.0);
            }
        }
    }

    #[test]
    fn refit_follows_aspect_changes() {
        let mut camera = PerspectiveCamera::new(1.0);
        let mut geometry = SurfaceGeometry::covering(&camera);
        camera.set_aspect(2.0);
        geometry.fit(&camera);
        assert!((geometry.scale().x / geometry.scale().y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn degenerate_sizes_are_square() {
        assert_eq!(aspect_ratio(0, 100), 1.0);
        assert_eq!(aspect_ratio(100, 0), 1.0);
        assert_eq!(aspect_ratio(300, 150), 2.0);
    }
}
