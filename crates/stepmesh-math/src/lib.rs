#![warn(missing_docs)]

//! Math types for the stepmesh STEP importer.
//!
//! Thin wrappers around nalgebra providing domain-specific types
//! for B-rep geometry: points, vectors, directions, rigid placements,
//! and bounding boxes.

use nalgebra::{Matrix3, Unit, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Squared length below which a direction is considered degenerate.
const DEGENERATE_NORM: f64 = 1e-12;

// =============================================================================
// Placement
// =============================================================================

/// A rigid frame locating local geometry in world space.
///
/// The three axes are unit length and mutually orthogonal. `y_axis` is derived
/// as `z_axis × x_axis`, and `x_axis` is re-orthogonalized as `y_axis × z_axis`
/// so a reference direction that is not exactly perpendicular to the axis is
/// still accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Location of the local origin.
    pub origin: Point3,
    /// Local X axis (reference direction).
    pub x_axis: Dir3,
    /// Local Y axis.
    pub y_axis: Dir3,
    /// Local Z axis (normal / main axis).
    pub z_axis: Dir3,
}

impl Placement {
    /// The world frame: origin at zero, axes aligned to X, Y, Z.
    pub fn identity() -> Self {
        Self {
            origin: Point3::origin(),
            x_axis: Vec3::x_axis(),
            y_axis: Vec3::y_axis(),
            z_axis: Vec3::z_axis(),
        }
    }

    /// Build a placement from an origin, an optional main axis, and an
    /// optional reference direction.
    ///
    /// A missing axis defaults to +Z; a missing reference direction (or one
    /// parallel to the axis) is replaced by an arbitrary perpendicular.
    /// Returns `None` when a supplied direction has zero length.
    pub fn try_from_axes(origin: Point3, axis: Option<Vec3>, ref_direction: Option<Vec3>) -> Option<Self> {
        let z = match axis {
            Some(a) if a.norm_squared() < DEGENERATE_NORM => return None,
            Some(a) => a.normalize(),
            None => Vec3::z(),
        };
        let x_hint = match ref_direction {
            Some(r) if r.norm_squared() < DEGENERATE_NORM => return None,
            Some(r) => r,
            None => arbitrary_perpendicular(&z),
        };

        let mut y = z.cross(&x_hint);
        if y.norm_squared() < DEGENERATE_NORM {
            // Reference direction parallel to the axis.
            y = z.cross(&arbitrary_perpendicular(&z));
        }
        let y = y.normalize();
        let x = y.cross(&z).normalize();

        Some(Self {
            origin,
            x_axis: Dir3::new_unchecked(x),
            y_axis: Dir3::new_unchecked(y),
            z_axis: Dir3::new_unchecked(z),
        })
    }

    /// Like [`Placement::try_from_axes`], falling back to [`Placement::identity`]
    /// on degenerate input.
    pub fn from_axes(origin: Point3, axis: Option<Vec3>, ref_direction: Option<Vec3>) -> Self {
        Self::try_from_axes(origin, axis, ref_direction).unwrap_or_default()
    }

    /// Rotation matrix whose columns are the local axes.
    pub fn rotation(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&[
            self.x_axis.into_inner(),
            self.y_axis.into_inner(),
            self.z_axis.into_inner(),
        ])
    }

    /// Map a point from local coordinates to world coordinates
    /// (rotate, then translate).
    pub fn transform_point(&self, local: &Point3) -> Point3 {
        self.origin + self.rotation() * local.coords
    }

    /// Map a vector from local to world coordinates (rotation only).
    pub fn transform_vector(&self, local: &Vec3) -> Vec3 {
        self.rotation() * local
    }

    /// Map a direction from local to world coordinates and re-normalize it to
    /// absorb floating drift. Zero-length input maps to the local Z axis.
    pub fn transform_direction(&self, local: &Vec3) -> Dir3 {
        let v = self.transform_vector(local);
        if v.norm_squared() < DEGENERATE_NORM {
            self.z_axis
        } else {
            Dir3::new_normalize(v)
        }
    }

    /// Map a world point into this placement's local coordinates.
    pub fn to_local_point(&self, world: &Point3) -> Point3 {
        let d = world - self.origin;
        Point3::new(
            d.dot(self.x_axis.as_ref()),
            d.dot(self.y_axis.as_ref()),
            d.dot(self.z_axis.as_ref()),
        )
    }

    /// Check the frame invariant: unit axes, mutually orthogonal.
    pub fn is_orthonormal(&self, tol: f64) -> bool {
        let (x, y, z) = (self.x_axis.as_ref(), self.y_axis.as_ref(), self.z_axis.as_ref());
        (x.norm() - 1.0).abs() < tol
            && (y.norm() - 1.0).abs() < tol
            && (z.norm() - 1.0).abs() < tol
            && x.dot(y).abs() < tol
            && y.dot(z).abs() < tol
            && z.dot(x).abs() < tol
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

/// Pick a unit vector perpendicular to `v`.
pub fn arbitrary_perpendicular(v: &Vec3) -> Vec3 {
    let arbitrary = if v.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    let p = arbitrary - arbitrary.dot(v) / v.norm_squared().max(DEGENERATE_NORM) * v;
    p.normalize()
}

// =============================================================================
// Bounding box
// =============================================================================

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl BoundingBox {
    /// Bounding box of a point set, or `None` if the set is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self {
            min: *first,
            max: *first,
        };
        for p in iter {
            bbox.include(p);
        }
        Some(bbox)
    }

    /// Grow the box to contain `p`.
    pub fn include(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center of the box.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the diagonal.
    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }
}
