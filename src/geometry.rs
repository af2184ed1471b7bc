//! Physical and camera geometry constants.
//!
//! All values are process-wide constants for the lifetime of a run. The
//! camera-side numbers default to the flight sensor the estimator was tuned
//! on; the orbital-side numbers are fixed physical constants and are not
//! configurable.

/// Gravitational constant, m^3 kg^-1 s^-2.
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674_30e-11;

/// Mass of the orbited body, kg.
pub const BODY_MASS_KG: f64 = 5.972_2e24;

/// Standard gravitational parameter G*M, m^3 s^-2.
pub const GRAVITATIONAL_PARAMETER: f64 = GRAVITATIONAL_CONSTANT * BODY_MASS_KG;

/// Mean radius of the orbited body, m.
pub const BODY_RADIUS_M: f64 = 6.378_1e6;

/// Default focal length of the camera, m.
pub const DEFAULT_FOCAL_LENGTH_M: f64 = 0.005;

/// Default physical sensor width, m.
pub const DEFAULT_SENSOR_WIDTH_M: f64 = 0.006_287;

/// Default horizontal pixel count of the sensor.
pub const DEFAULT_PIXEL_COUNT: u32 = 4056;

/// Camera and orbital geometry, immutable for the lifetime of a run.
#[derive(Clone, Copy, Debug)]
pub struct Geometry {
    /// Focal length, m.
    pub focal_length_m: f64,
    /// Physical sensor width, m.
    pub sensor_width_m: f64,
    /// Horizontal pixel count.
    pub pixel_count: u32,
    /// Standard gravitational parameter G*M, m^3 s^-2.
    pub gravitational_parameter: f64,
    /// Body radius, m.
    pub body_radius_m: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            focal_length_m: DEFAULT_FOCAL_LENGTH_M,
            sensor_width_m: DEFAULT_SENSOR_WIDTH_M,
            pixel_count: DEFAULT_PIXEL_COUNT,
            gravitational_parameter: GRAVITATIONAL_PARAMETER,
            body_radius_m: BODY_RADIUS_M,
        }
    }
}

impl Geometry {
    /// Circular-orbit speed at altitude `altitude_m` above the body surface,
    /// m/s. Returns NaN when `body_radius_m + altitude_m` is not positive;
    /// callers treat non-finite values as a skip, never a fault.
    pub fn orbital_velocity(&self, altitude_m: f64) -> f64 {
        (self.gravitational_parameter / (self.body_radius_m + altitude_m)).sqrt()
    }

    /// Pixel-to-ground scale numerator: focal length times horizontal pixel
    /// count. Ground distance g at altitude h projects to
    /// `g * focal * pixel_count / (sensor_width * h)` pixels.
    pub fn projection_factor(&self) -> f64 {
        self.focal_length_m * f64::from(self.pixel_count)
    }
}
