//! Clear-sky radiation and cloud attenuation.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::domain::GeoPoint;

/// Daily cloud regime of the simulated region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudCover {
    /// Clear sky (0-10% clouds)
    Clear,
    /// Partly cloudy (10-50% clouds)
    PartlyCloudy,
    /// Mostly cloudy (50-90% clouds)
    MostlyCloudy,
    /// Overcast (90-100% clouds)
    Overcast,
}

impl CloudCover {
    /// Representative cloud fraction of the regime (0.0-1.0)
    pub fn fraction(&self) -> f64 {
        match self {
            CloudCover::Clear => 0.05,
            CloudCover::PartlyCloudy => 0.3,
            CloudCover::MostlyCloudy => 0.7,
            CloudCover::Overcast => 0.95,
        }
    }

    /// Get a random regime (weighted towards clear/partly cloudy)
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let roll = rng.gen_range(0..100);
        match roll {
            0..=40 => CloudCover::Clear,
            41..=70 => CloudCover::PartlyCloudy,
            71..=85 => CloudCover::MostlyCloudy,
            _ => CloudCover::Overcast,
        }
    }
}

/// Share of clear-sky irradiance reaching the ground under a cloud
/// fraction (Kasten-Czeplak).
pub fn cloud_transmission(fraction: f64) -> f64 {
    1.0 - 0.75 * fraction.clamp(0.0, 1.0).powf(3.4)
}

/// Clear-sky solar radiation model for one location, driven by UTC time.
pub struct ClearSkyModel {
    location: GeoPoint,
}

impl ClearSkyModel {
    pub fn new(location: GeoPoint) -> Self {
        Self { location }
    }

    /// Solar elevation in degrees at a UTC time.
    pub fn solar_elevation(&self, time: NaiveDateTime) -> f64 {
        let day_of_year = time.ordinal() as f64;
        let hour = time.hour() as f64 + time.minute() as f64 / 60.0;

        let declination_rad =
            (23.45 * (360.0 / 365.0 * (day_of_year + 284.0) * PI / 180.0).sin()).to_radians();
        let latitude_rad = self.location.latitude.to_radians();

        let solar_time = hour + self.location.longitude / 15.0;
        let hour_angle_rad = (15.0 * (solar_time - 12.0)).to_radians();

        let elevation_sin = latitude_rad.sin() * declination_rad.sin()
            + latitude_rad.cos() * declination_rad.cos() * hour_angle_rad.cos();
        elevation_sin.clamp(-1.0, 1.0).asin().to_degrees()
    }

    /// Clear-sky global irradiance in W/m²
    pub fn clear_sky_irradiance(&self, time: NaiveDateTime) -> f64 {
        let elevation_deg = self.solar_elevation(time);
        if elevation_deg <= 0.0 {
            return 0.0;
        }

        let elevation_rad = elevation_deg.to_radians();
        let solar_constant = 1367.0;

        let air_mass = if elevation_deg > 5.0 {
            1.0 / elevation_rad.sin()
        } else {
            12.0 - elevation_deg / 5.0
        };
        let transmittance = 0.7_f64.powf(air_mass.powf(0.678));

        solar_constant * transmittance * elevation_rad.sin()
    }

    /// Clear-sky irradiation over the local solar day, in kWh/m².
    pub fn daily_insolation(&self, day: NaiveDate) -> f64 {
        const STEP_MINUTES: i64 = 15;
        let local_midnight = day.and_time(chrono::NaiveTime::MIN)
            - Duration::minutes((self.location.longitude * 4.0).round() as i64);
        let wh: f64 = (0..24 * 60 / STEP_MINUTES)
            .map(|i| {
                let t = local_midnight + Duration::minutes(i * STEP_MINUTES);
                self.clear_sky_irradiance(t) * STEP_MINUTES as f64 / 60.0
            })
            .sum();
        wh / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oklahoma() -> ClearSkyModel {
        ClearSkyModel::new(GeoPoint::new(35.5, -97.5))
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_solar_elevation_noon() {
        // Solar noon at -97.5° is 18:30 UTC
        let elevation = oklahoma().solar_elevation(at(2008, 6, 21, 18, 30));
        assert!(elevation > 75.0 && elevation < 80.0);
        assert!(oklahoma().solar_elevation(at(2008, 6, 21, 6, 30)) < 0.0);
    }

    #[test]
    fn test_irradiance_is_zero_at_night() {
        assert_eq!(oklahoma().clear_sky_irradiance(at(2008, 6, 21, 8, 0)), 0.0);
        assert!(oklahoma().clear_sky_irradiance(at(2008, 6, 21, 18, 30)) > 700.0);
    }

    #[test]
    fn test_seasonal_insolation() {
        let summer = oklahoma().daily_insolation(NaiveDate::from_ymd_opt(2008, 6, 21).unwrap());
        let winter = oklahoma().daily_insolation(NaiveDate::from_ymd_opt(2008, 12, 21).unwrap());
        assert!(summer > winter * 1.5);
        assert!(summer > 5.0 && summer < 12.0);
    }

    #[test]
    fn test_cloud_transmission() {
        assert_eq!(cloud_transmission(0.0), 1.0);
        assert!((cloud_transmission(1.0) - 0.25).abs() < 1e-12);
        assert!(cloud_transmission(CloudCover::Clear.fraction()) > 0.99);
        assert!(cloud_transmission(CloudCover::Overcast.fraction()) < 0.4);
    }
}
