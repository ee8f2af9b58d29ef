//! Plane geometry of the reference line.

use cgmath::{Point2, Vector2};
pub use lut::LookupTable;
pub use util::*;

mod lut;
mod util;

/// A position in the world plane, in metres.
pub type Point2d = Point2<f64>;

/// A direction or displacement in the world plane.
pub type Vector2d = Vector2<f64>;
