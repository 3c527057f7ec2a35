//! Geographic primitives: great-circle distance and unit-sphere conversion.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two positions given in degrees.
///
/// Standard haversine formulation:
/// `a = sin²(Δφ/2) + cos(φ1)·cos(φ2)·sin²(Δλ/2)`,
/// `c = 2·atan2(√a, √(1−a))`, `d = R·c`.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Convert a position in degrees to a point on the unit sphere.
///
/// Chord distance between two such points is a true metric equivalent of
/// great-circle distance, so a single radius query on an R-tree of these
/// points is exact at any latitude.
pub fn unit_sphere(lat: f64, lon: f64) -> [f64; 3] {
    let phi = lat.to_radians();
    let lambda = lon.to_radians();
    [
        phi.cos() * lambda.cos(),
        phi.cos() * lambda.sin(),
        phi.sin(),
    ]
}

/// Chord length on the unit sphere subtending a great-circle arc in radians.
pub fn chord_length(arc_radians: f64) -> f64 {
    2.0 * (arc_radians / 2.0).sin()
}

/// Squared unit-sphere chord radius equivalent to a distance in meters.
pub fn chord_radius_squared(distance_m: f64) -> f64 {
    let chord = chord_length(distance_m / EARTH_RADIUS_M);
    chord * chord
}
