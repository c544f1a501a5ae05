use {
    crate::aabb::AABB,
    glam::{Mat4, Vec3},
};

#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// View frustum rebuilt once per streaming update from the camera's
/// view-projection matrix.
#[derive(Debug, Clone)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Gribb/Hartmann extraction: each clip plane is the w row of the
    /// view-projection matrix plus or minus one of the other rows, in the
    /// order left, right, bottom, top, near, far.
    pub fn from_matrix(view_proj: Mat4) -> Self {
        let rows = view_proj.transpose();
        let axis_rows = [rows.x_axis, rows.y_axis, rows.z_axis];
        let w_row = rows.w_axis;

        let mut planes = [Plane::new(Vec3::ZERO, 0.0); 6];
        for (slot, plane) in planes.iter_mut().enumerate() {
            let row = axis_rows[slot / 2];
            let coeffs = if slot % 2 == 0 { w_row + row } else { w_row - row };
            let normal = coeffs.truncate();
            let length = normal.length();
            *plane = if length > 0.0 {
                Plane::new(normal / length, coeffs.w / length)
            } else {
                Plane::new(normal, coeffs.w)
            };
        }

        Self { planes }
    }

    /// Positive-vertex test: the AABB is outside as soon as its farthest
    /// corner along some plane normal falls behind that plane.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        let center = aabb.center();
        let extents = aabb.extents();

        self.planes.iter().all(|plane| {
            let towards_normal = plane.normal.cmpge(Vec3::ZERO);
            let positive_vertex = center + Vec3::select(towards_normal, extents, -extents);
            plane.distance_to_point(positive_vertex) >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn look_down_pos_x(eye: Vec3) -> Frustum {
        let view = Mat4::look_at_rh(eye, eye + Vec3::X, Vec3::Y);
        let proj = Mat4::perspective_rh(80f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0);
        Frustum::from_matrix(proj * view)
    }

    #[test]
    fn chunk_in_front_is_visible() {
        let frustum = look_down_pos_x(Vec3::new(0.0, 80.0, 0.0));
        // a chunk straight ahead along +x
        assert!(frustum.intersects_aabb(&AABB::chunk_bounds(3, 0)));
    }

    #[test]
    fn chunk_behind_is_culled() {
        let frustum = look_down_pos_x(Vec3::new(0.0, 80.0, 0.0));
        assert!(!frustum.intersects_aabb(&AABB::chunk_bounds(-5, 0)));
    }

    #[test]
    fn containing_chunk_always_intersects() {
        let frustum = look_down_pos_x(Vec3::new(8.0, 80.0, 8.0));
        assert!(frustum.intersects_aabb(&AABB::chunk_bounds(0, 0)));
    }
}
