//! Geodesic distance and bearing on the WGS-84 ellipsoid.

use std::f64::consts::PI;

use crate::error::{Result, TkError};

/// WGS-84 semi-major axis in kilometers
const MAJOR_KM: f64 = 6378.137;

/// WGS-84 semi-minor axis in kilometers
const MINOR_KM: f64 = 6356.7523142;

/// WGS-84 flattening
const FLATTENING: f64 = 1.0 / 298.257223563;

const ITERATION_LIMIT: usize = 20;

/// Convergence threshold for the reduced longitude difference, in radians
const CONVERGENCE: f64 = 1e-11;

/// Result of an inverse geodesic solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodesic {
    pub distance_km: f64,
    /// Initial bearing in degrees, in [0, 360).
    pub bearing: f64,
}

impl Geodesic {
    pub const ZERO: Geodesic = Geodesic {
        distance_km: 0.0,
        bearing: 0.0,
    };

    /// Bearing as shown to users: half a degree added, then truncated.
    pub fn rounded_bearing(&self) -> i64 {
        (self.bearing + 0.5) as i64
    }
}

/// Calculates the geodesic distance and initial bearing between two points using
/// Thaddeus Vincenty's inverse formula on the WGS-84 ellipsoid.
///
/// Coordinates are decimal degrees. Nearly antipodal points may not converge within
/// the iteration limit, which is reported as [`TkError::ConvergenceError`].
///
/// References:
/// - T. Vincenty, "Direct and Inverse Solutions of Geodesics on the Ellipsoid with
///   application of nested equations", Survey Review, vol. 23, no. 176, 1975
/// - https://www.movable-type.co.uk/scripts/latlong-vincenty.html
pub fn vincenty(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<Geodesic> {
    let delta_lon = (lon2 - lon1).to_radians();

    let reduced_lat1 = ((1.0 - FLATTENING) * lat1.to_radians().tan()).atan();
    let reduced_lat2 = ((1.0 - FLATTENING) * lat2.to_radians().tan()).atan();

    let (sin_u1, cos_u1) = reduced_lat1.sin_cos();
    let (sin_u2, cos_u2) = reduced_lat2.sin_cos();

    let mut lambda = delta_lon;
    let mut lambda_prev;
    let mut converged = false;

    let mut sin_sigma = 0.0;
    let mut cos_sigma = 0.0;
    let mut sigma = 0.0;
    let mut cos_sq_alpha = 0.0;
    let mut cos2_sigma_m = 0.0;

    for _ in 0..ITERATION_LIMIT {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();

        sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();

        if sin_sigma == 0.0 {
            // coincident points
            return Ok(Geodesic::ZERO);
        }

        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);

        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha.powi(2);

        cos2_sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            // equatorial line
            0.0
        };

        let c = FLATTENING / 16.0 * cos_sq_alpha * (4.0 + FLATTENING * (4.0 - 3.0 * cos_sq_alpha));

        lambda_prev = lambda;
        lambda = delta_lon
            + (1.0 - c)
                * FLATTENING
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos2_sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos2_sigma_m.powi(2))));

        // NaN never compares as converged
        if (lambda - lambda_prev).abs() < CONVERGENCE {
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(TkError::ConvergenceError {
            lat1,
            lon1,
            lat2,
            lon2,
        });
    }

    let u_sq = cos_sq_alpha * (MAJOR_KM.powi(2) - MINOR_KM.powi(2)) / MINOR_KM.powi(2);
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));

    let delta_sigma = b
        * sin_sigma
        * (cos2_sigma_m
            + b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos2_sigma_m.powi(2))
                    - b / 6.0
                        * cos2_sigma_m
                        * (-3.0 + 4.0 * sin_sigma.powi(2))
                        * (-3.0 + 4.0 * cos2_sigma_m.powi(2))));

    let distance_km = MINOR_KM * a * (sigma - delta_sigma);

    let (sin_lambda, cos_lambda) = lambda.sin_cos();
    let alpha1 = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
    let bearing = (360.0 + alpha1 * 180.0 / PI) % 360.0;

    Ok(Geodesic {
        distance_km,
        bearing,
    })
}
