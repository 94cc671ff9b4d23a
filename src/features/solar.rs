//! Solar geometry for daily features
//!
//! NOAA solar calculator equations (Meeus). Angles are in degrees unless
//! a name says otherwise; times are minutes after 00:00 UTC.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::GeoPoint;

/// Zenith angle of the sun's upper limb at apparent sunrise, including
/// atmospheric refraction.
const SUNRISE_ZENITH_DEG: f64 = 90.833;

/// Julian day number of 0001-01-01T00:00 (proleptic Gregorian) minus one day.
const JD_BEFORE_CE: f64 = 1_721_424.5;

/// Julian day at 00:00 UTC of `day`.
pub fn julian_day(day: NaiveDate) -> f64 {
    JD_BEFORE_CE + day.num_days_from_ce() as f64
}

/// Julian centuries since J2000.0.
pub fn julian_century(jd: f64) -> f64 {
    (jd - 2_451_545.0) / 36_525.0
}

pub fn geom_mean_long_sun(t: f64) -> f64 {
    (280.46646 + t * (36000.76983 + t * 0.0003032)).rem_euclid(360.0)
}

pub fn geom_mean_anomaly_sun(t: f64) -> f64 {
    357.52911 + t * (35999.05029 - 0.0001537 * t)
}

pub fn eccentricity_earth_orbit(t: f64) -> f64 {
    0.016708634 - t * (0.000042037 + 0.0000001267 * t)
}

pub fn sun_eq_of_center(t: f64) -> f64 {
    let m = geom_mean_anomaly_sun(t).to_radians();
    m.sin() * (1.914602 - t * (0.004817 + 0.000014 * t))
        + (2.0 * m).sin() * (0.019993 - 0.000101 * t)
        + (3.0 * m).sin() * 0.000289
}

pub fn sun_true_long(t: f64) -> f64 {
    geom_mean_long_sun(t) + sun_eq_of_center(t)
}

pub fn sun_true_anomaly(t: f64) -> f64 {
    geom_mean_anomaly_sun(t) + sun_eq_of_center(t)
}

/// Sun–earth distance in AU.
pub fn sun_rad_vector(t: f64) -> f64 {
    let v = sun_true_anomaly(t).to_radians();
    let e = eccentricity_earth_orbit(t);
    (1.000001018 * (1.0 - e * e)) / (1.0 + e * v.cos())
}

pub fn sun_apparent_long(t: f64) -> f64 {
    let omega = 125.04 - 1934.136 * t;
    sun_true_long(t) - 0.00569 - 0.00478 * omega.to_radians().sin()
}

pub fn mean_obliquity_of_ecliptic(t: f64) -> f64 {
    let seconds = 21.448 - t * (46.8150 + t * (0.00059 - t * 0.001813));
    23.0 + (26.0 + seconds / 60.0) / 60.0
}

pub fn obliquity_correction(t: f64) -> f64 {
    let omega = 125.04 - 1934.136 * t;
    mean_obliquity_of_ecliptic(t) + 0.00256 * omega.to_radians().cos()
}

pub fn sun_declination(t: f64) -> f64 {
    let e = obliquity_correction(t).to_radians();
    let lambda = sun_apparent_long(t).to_radians();
    (e.sin() * lambda.sin()).asin().to_degrees()
}

/// Equation of time in minutes.
pub fn equation_of_time(t: f64) -> f64 {
    let epsilon = obliquity_correction(t);
    let l0 = geom_mean_long_sun(t).to_radians();
    let e = eccentricity_earth_orbit(t);
    let m = geom_mean_anomaly_sun(t).to_radians();

    let y = (epsilon.to_radians() / 2.0).tan().powi(2);

    let e_time = y * (2.0 * l0).sin() - 2.0 * e * m.sin()
        + 4.0 * e * y * m.sin() * (2.0 * l0).cos()
        - 0.5 * y * y * (4.0 * l0).sin()
        - 1.25 * e * e * (2.0 * m).sin();

    4.0 * e_time.to_degrees()
}

/// Hour angle of sunrise in radians (sunset is its negative).
///
/// Polar night clamps to 0 and polar day to pi.
pub fn hour_angle_sunrise(latitude: f64, declination: f64) -> f64 {
    let lat = latitude.to_radians();
    let dec = declination.to_radians();
    let arg = SUNRISE_ZENITH_DEG.to_radians().cos() / (lat.cos() * dec.cos()) - lat.tan() * dec.tan();
    arg.clamp(-1.0, 1.0).acos()
}

/// Sun times of one day at one location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise_utc_minutes: f64,
    pub sunset_utc_minutes: f64,
    pub solar_noon_utc_minutes: f64,
    pub sun_distance_au: f64,
}

impl SunTimes {
    pub fn compute(day: NaiveDate, location: GeoPoint) -> Self {
        let t = julian_century(julian_day(day));
        let eq_time = equation_of_time(t);
        let declination = sun_declination(t);
        let ha = hour_angle_sunrise(location.latitude, declination).to_degrees();

        Self {
            sunrise_utc_minutes: 720.0 - 4.0 * (location.longitude + ha) - eq_time,
            sunset_utc_minutes: 720.0 - 4.0 * (location.longitude - ha) - eq_time,
            solar_noon_utc_minutes: 720.0 - 4.0 * location.longitude - eq_time,
            sun_distance_au: sun_rad_vector(t),
        }
    }

    /// Sunset minus sunrise
    pub fn daylight_minutes(&self) -> f64 {
        self.sunset_utc_minutes - self.sunrise_utc_minutes
    }
}
