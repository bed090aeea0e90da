//! Brightness level conversion
//!
//! The host uses a 0-255 integer brightness scale; the controller uses a
//! 0.0-100.0 percentage. The host-side conversion truncates toward zero
//! rather than rounding, matching observed device behavior.

/// Convert a host light level (0-255) to a controller level (0.0-100.0)
pub fn to_controller_level(level: u8) -> f64 {
    f64::from(level) * 100.0 / 255.0
}

/// Convert a controller level (0.0-100.0) to a host light level (0-255)
pub fn to_host_level(level: f64) -> u8 {
    (level * 255.0 / 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact() {
        assert_eq!(to_controller_level(0), 0.0);
        assert_eq!(to_controller_level(255), 100.0);
        assert_eq!(to_host_level(0.0), 0);
        assert_eq!(to_host_level(100.0), 255);
    }

    #[test]
    fn test_truncates_toward_zero() {
        assert_eq!(to_host_level(50.196), 127);
        assert_eq!(to_host_level(0.39), 0);
        assert_eq!(to_host_level(99.99), 254);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        for level in 0..=255u8 {
            let back = to_host_level(to_controller_level(level));
            let diff = i32::from(level) - i32::from(back);
            assert!(
                (-1..=1).contains(&diff),
                "level {level} round-tripped to {back}"
            );
        }
    }

    #[test]
    fn test_mid_scale_percentage() {
        let vendor = to_controller_level(128);
        assert!((vendor - 50.196).abs() < 0.001);
    }
}
