/// Geodesic primitives shared by the geometry mapper and the position
/// resolver. Coordinates are [lon, lat] degrees throughout.

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates via the Haversine formula,
/// in meters.
pub fn haversine_distance(coord1: [f64; 2], coord2: [f64; 2]) -> f64 {
    let lat1 = coord1[1].to_radians();
    let lat2 = coord2[1].to_radians();
    let delta_lat = (coord2[1] - coord1[1]).to_radians();
    let delta_lon = (coord2[0] - coord1[0]).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Arc length of a polyline: the sum of great-circle distances between
/// consecutive points, in meters.
pub fn path_length(path: &[[f64; 2]]) -> f64 {
    path.windows(2).map(|w| haversine_distance(w[0], w[1])).sum()
}

/// Point at `fraction` (0.0-1.0, clamped) of a path's arc length. Walking by
/// arc length rather than point index keeps apparent speed independent of
/// point density.
pub fn point_along_path(path: &[[f64; 2]], fraction: f64) -> [f64; 2] {
    match path {
        [] => [0.0, 0.0],
        [only] => *only,
        _ => {
            let total = path_length(path);
            if total <= 0.0 {
                return path[0];
            }
            let target = total * fraction.clamp(0.0, 1.0);

            let mut walked = 0.0;
            for window in path.windows(2) {
                let step = haversine_distance(window[0], window[1]);
                if walked + step >= target && step > 0.0 {
                    let t = (target - walked) / step;
                    return [
                        window[0][0] + (window[1][0] - window[0][0]) * t,
                        window[0][1] + (window[1][1] - window[0][1]) * t,
                    ];
                }
                walked += step;
            }
            path[path.len() - 1]
        }
    }
}

/// Initial bearing (forward azimuth) from one coordinate to another, in
/// degrees clockwise from north, normalized to [0, 360).
pub fn initial_bearing(from: [f64; 2], to: [f64; 2]) -> f64 {
    let lat1 = from[1].to_radians();
    let lat2 = to[1].to_radians();
    let delta_lon = (to[0] - from[0]).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Degrees of latitude per meter (constant) and longitude per meter at the
/// given latitude, for small presentation offsets.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> (f64, f64) {
    let lat_deg = meters / 111_320.0;
    let lon_deg = meters / (111_320.0 * latitude.to_radians().cos().max(1e-6));
    (lon_deg, lat_deg)
}
