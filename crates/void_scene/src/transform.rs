//! Local transform declared by node data

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::data::NodeData;

/// Local transform of a loader node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation
    pub position: Vec3,
    /// Euler XYZ rotation in radians
    pub rotation: Vec3,
    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// Overwrite the parts `data` declares, leaving the rest untouched
    pub fn apply(&mut self, data: &NodeData) {
        if let Some(p) = data.position {
            self.position = Vec3::from_array(p);
        }
        if let Some(r) = data.rotation {
            self.rotation = Vec3::from_array(r);
        }
        if let Some(s) = data.scale {
            self.scale = Vec3::from_array(s);
        }
    }

    /// Rotation as a quaternion
    pub fn rotation_quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Local matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation_quat(), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_partial() {
        let mut transform = Transform::IDENTITY;
        transform.apply(&NodeData::new("a").with_position([1.0, 2.0, 3.0]));

        assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.scale, Vec3::ONE);
        assert_eq!(transform.rotation, Vec3::ZERO);
    }

    #[test]
    fn test_matrix_translation() {
        let mut transform = Transform::IDENTITY;
        transform.apply(&NodeData::new("a").with_position([4.0, 0.0, 0.0]).with_scale([2.0, 2.0, 2.0]));

        let p = transform.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(6.0, 0.0, 0.0)).length() < 1e-5);
    }
}
