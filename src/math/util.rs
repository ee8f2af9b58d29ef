use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// Projects a point onto a local coordinate system.
///
/// # Parameters
/// * `point` - The point to project
/// * `origin` - The origin of the coordinate system
/// * `x_axis` - The basis vector pointing in the positive x-axis.
/// * `y_axis` - The basis vector pointing in the positive y-axis.
pub fn project_local(
    point: Point2d,
    origin: Point2d,
    x_axis: Vector2d,
    y_axis: Vector2d,
) -> Point2d {
    let point = point - origin;
    Point2d::new(point.dot(x_axis), point.dot(y_axis))
}

/// Rotates a vector 90 degrees anti-clockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// The unit vector pointing in the direction `angle`, in radians.
pub fn heading_vector(angle: f64) -> Vector2d {
    let (sin, cos) = angle.sin_cos();
    Vector2d::new(cos, sin)
}

/// Rotates a point about a centre.
///
/// # Parameters
/// * `point` - The point to rotate
/// * `centre` - The centre of rotation
/// * `sin` - The sine of the rotation angle
/// * `cos` - The cosine of the rotation angle
pub fn rotate_about(point: Point2d, centre: Point2d, sin: f64, cos: f64) -> Point2d {
    let d = point - centre;
    centre + Vector2d::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
}

/// Estimates the curvature at `p1` from three points spaced `chord` apart
/// along the curve.
pub fn three_point_curvature(p0: Point2d, p1: Point2d, p2: Point2d, chord: f64) -> f64 {
    (p1 - p0).perp_dot(p2 - p1) / (chord * chord * chord)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn curvature_of_circle() {
        let radius = 50.0;
        let step = 0.5;
        let point = |i: f64| {
            let angle = i * step / radius;
            Point2d::new(radius * angle.sin(), radius * (1.0 - angle.cos()))
        };
        let curv = three_point_curvature(point(0.0), point(1.0), point(2.0), step);
        assert_approx_eq!(curv, 1.0 / radius, 1e-6);

        let curv = three_point_curvature(point(2.0), point(1.0), point(0.0), step);
        assert_approx_eq!(curv, -1.0 / radius, 1e-6);
    }

    #[test]
    fn rotation() {
        let p = rotate_about(Point2d::new(2.0, 1.0), Point2d::new(1.0, 1.0), 1.0, 0.0);
        assert_approx_eq!(p.x, 1.0);
        assert_approx_eq!(p.y, 2.0);

        let local = project_local(
            Point2d::new(3.0, 4.0),
            Point2d::new(1.0, 1.0),
            heading_vector(0.0),
            rot90(heading_vector(0.0)),
        );
        assert_approx_eq!(local.x, 2.0);
        assert_approx_eq!(local.y, 3.0);
    }
}
