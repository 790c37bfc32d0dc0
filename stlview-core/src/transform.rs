/// Model matrices and transform composition
use nalgebra::{Matrix4, Point3, Unit, Vector3};

/// Which model matrix is applied to the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelMode {
    /// Mesh is drawn as stored
    #[default]
    Identity,
    /// Debug rotation about the (1, 1, 1) diagonal through the mesh center
    Spin,
}

impl ModelMode {
    pub fn toggled(self) -> Self {
        match self {
            ModelMode::Identity => ModelMode::Spin,
            ModelMode::Spin => ModelMode::Identity,
        }
    }

    /// Model matrix at `time` seconds since startup
    pub fn matrix(self, time: f32, pivot: &Point3<f32>) -> Matrix4<f32> {
        match self {
            ModelMode::Identity => Matrix4::identity(),
            ModelMode::Spin => Transform::spin_matrix(time, pivot),
        }
    }
}

/// Transform builder for model/view/projection matrices
pub struct Transform;

impl Transform {
    /// Rotate by `angle` radians around the (1, 1, 1) axis through `pivot`
    pub fn spin_matrix(angle: f32, pivot: &Point3<f32>) -> Matrix4<f32> {
        let axis = Unit::new_normalize(Vector3::repeat(1.0));
        let to_pivot = Matrix4::new_translation(&pivot.coords);
        let from_pivot = Matrix4::new_translation(&-pivot.coords);

        to_pivot * Matrix4::from_axis_angle(&axis, angle) * from_pivot
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}
