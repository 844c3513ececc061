//! # Constants and type definitions for rotcol
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - Geodetic and geophysical constants (WGS-84 ellipsoid, Earth gravity and rotation)
//! - Unit conversions (degrees ↔ radians, days ↔ seconds)
//! - Epoch offsets between the 1900 second count, Julian dates, the Unix epoch and GPS time
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of seconds in a day, integer form for calendar arithmetic
pub const SECONDS_PER_DAY_I64: i64 = 86_400;

/// Numerical epsilon used for floating-point comparisons
pub const EPS: f64 = 1e-6;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Earth equatorial radius in kilometers (WGS84)
pub const EARTH_EQUATORIAL_RADIUS: Kilometer = 6378.137;

/// Earth polar radius in kilometers (WGS84)
pub const EARTH_POLAR_RADIUS: Kilometer = 6356.7523142;

/// Earth gravitational parameter in km³/s²
pub const GM_EARTH: f64 = 3.986004418e5;

/// Length of the sidereal day in seconds
pub const SIDEREAL_DAY: f64 = 86_164.0905;

/// Earth rotation rate in radians per second
pub const EARTH_ROTATION_RATE: f64 = DPI / SIDEREAL_DAY;

// -------------------------------------------------------------------------------------------------
// Time scale offsets
// -------------------------------------------------------------------------------------------------

/// Julian date of 1900-01-01T00:00:00, origin of every 1900 second count
pub const JD_1900: JulianDate = 2_415_020.5;

/// Julian date of J2000.0 (2000-01-01T12:00:00), origin of the SGP4 epoch
pub const JD_J2000: JulianDate = 2_451_545.0;

/// Days in a Julian year, the unit of the SGP4 epoch
pub const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

/// GPS epoch (1980-01-06T00:00:00) counted in seconds since 1900-01-01
pub const GPS_EPOCH_1900: i64 = 2_524_953_600;

/// Unix epoch (1970-01-01T00:00:00) counted in seconds since 1900-01-01
pub const UNIX_EPOCH_1900: i64 = 2_208_988_800;

/// Constant offset TAI − GPS in seconds
pub const TAI_MINUS_GPS: f64 = 19.0;

/// Largest distance between a requested time and the epoch of a usable TLE (12 hours)
pub const MAX_TLE_AGE_DAYS: f64 = 0.5;

/// Duration of one week in seconds
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY_I64;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in meters
pub type Meter = f64;
/// Duration in seconds
pub type Seconds = f64;
/// Julian date (days)
pub type JulianDate = f64;
/// Modified Julian Date (days)
pub type MJD = f64;

/// Identity of a radio-occultation sounding, supplied by the data provider
pub type OccId = String;
