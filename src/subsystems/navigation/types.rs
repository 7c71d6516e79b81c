//! Navigation types: coordinate frames and waypoints.

use nalgebra::Vector3;

/// An orthonormal coordinate frame: position plus forward/up vectors.
///
/// Right-handed with `right = forward x up`. Constructors orthonormalize, so
/// the derived axes are always unit length and mutually perpendicular.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub position: Vector3<f64>,
    pub forward: Vector3<f64>,
    pub up: Vector3<f64>,
}

impl Frame {
    /// Build a frame from a position and (possibly non-orthonormal)
    /// forward/up hints.
    ///
    /// Degenerate hints (zero or parallel vectors) fall back to the world
    /// axes instead of producing NaN.
    pub fn new(position: Vector3<f64>, forward: Vector3<f64>, up: Vector3<f64>) -> Self {
        let forward = normalize_or(forward, Vector3::new(0.0, 0.0, -1.0));
        let mut right = forward.cross(&up);
        if right.norm_squared() < 1e-12 {
            // Up hint parallel to forward: pick any perpendicular axis.
            let fallback = if forward.x.abs() < 0.9 {
                Vector3::new(1.0, 0.0, 0.0)
            } else {
                Vector3::new(0.0, 1.0, 0.0)
            };
            right = forward.cross(&fallback);
        }
        let right = normalize_or(right, Vector3::new(1.0, 0.0, 0.0));
        let up = right.cross(&forward);
        Self {
            position,
            forward,
            up,
        }
    }

    pub fn right(&self) -> Vector3<f64> {
        self.forward.cross(&self.up)
    }

    pub fn backward(&self) -> Vector3<f64> {
        -self.forward
    }

    pub fn down(&self) -> Vector3<f64> {
        -self.up
    }

    /// Rotate a vector from this frame's local basis (x=right, y=up,
    /// z=backward) into world coordinates.
    pub fn local_to_world(&self, v: Vector3<f64>) -> Vector3<f64> {
        self.right() * v.x + self.up * v.y + self.backward() * v.z
    }

    /// Rotate a world vector into this frame's local basis.
    pub fn world_to_local(&self, v: Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            v.dot(&self.right()),
            v.dot(&self.up),
            v.dot(&self.backward()),
        )
    }
}

fn normalize_or(v: Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    let norm = v.norm();
    if norm > 1e-9 {
        v / norm
    } else {
        fallback
    }
}

/// An immutable-after-construction path point.
///
/// The stored position is relative to `reference` (zero for absolute
/// waypoints), so a whole path can be re-based against a moving reference
/// grid with [`Waypoint::set_reference_all`] without rewriting the points.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    name: String,
    position: Vector3<f64>,
    forward: Vector3<f64>,
    up: Vector3<f64>,
    reference: Vector3<f64>,
    related_entity: Option<u64>,
}

impl Waypoint {
    /// Absolute waypoint at the given frame.
    pub fn new(name: impl Into<String>, frame: &Frame) -> Self {
        Self {
            name: name.into(),
            position: frame.position,
            forward: frame.forward,
            up: frame.up,
            reference: Vector3::zeros(),
            related_entity: None,
        }
    }

    /// Waypoint stored relative to `reference`, optionally bound to a host
    /// entity (connector, grid) whose position the reference tracks.
    pub fn with_reference(
        name: impl Into<String>,
        frame: &Frame,
        reference: Vector3<f64>,
        related_entity: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            position: frame.position - reference,
            forward: frame.forward,
            up: frame.up,
            reference,
            related_entity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn related_entity(&self) -> Option<u64> {
        self.related_entity
    }

    pub fn world_position(&self) -> Vector3<f64> {
        self.reference + self.position
    }

    pub fn frame(&self) -> Frame {
        Frame::new(self.world_position(), self.forward, self.up)
    }

    pub fn set_reference(&mut self, reference: Vector3<f64>) {
        self.reference = reference;
    }

    /// Re-base every waypoint in a path against a new reference position.
    pub fn set_reference_all(path: &mut [Waypoint], reference: Vector3<f64>) {
        for wp in path {
            wp.set_reference(reference);
        }
    }

    /// Encode as `name@px py pz;fx fy fz;ux uy uz` (the relative position,
    /// not the world one, so re-based paths persist correctly).
    pub fn encode(&self) -> String {
        format!(
            "{}@{} {} {};{} {} {};{} {} {}",
            self.name,
            self.position.x,
            self.position.y,
            self.position.z,
            self.forward.x,
            self.forward.y,
            self.forward.z,
            self.up.x,
            self.up.y,
            self.up.z,
        )
    }

    /// Decode a single waypoint; `None` on malformed input.
    pub fn decode(text: &str) -> Option<Waypoint> {
        let (name, rest) = text.split_once('@')?;
        let mut vectors = rest.split(';').map(parse_vector);
        let position = vectors.next()??;
        let forward = vectors.next()??;
        let up = vectors.next()??;
        Some(Waypoint {
            name: name.to_string(),
            position,
            forward,
            up,
            reference: Vector3::zeros(),
            related_entity: None,
        })
    }

    /// Encode a path with `|` separators.
    pub fn encode_path(path: &[Waypoint]) -> String {
        path.iter()
            .map(Waypoint::encode)
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Decode a `|`-separated path. Malformed entries are skipped with a
    /// warning rather than failing the whole path.
    pub fn decode_path(text: &str) -> Vec<Waypoint> {
        text.split('|')
            .filter(|part| !part.trim().is_empty())
            .filter_map(|part| {
                let wp = Waypoint::decode(part);
                if wp.is_none() {
                    log::warn!("skipping malformed waypoint: {:?}", part);
                }
                wp
            })
            .collect()
    }
}

fn parse_vector(text: &str) -> Option<Vector3<f64>> {
    let mut parts = text.split_whitespace().map(str::parse::<f64>);
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    Some(Vector3::new(x, y, z))
}
