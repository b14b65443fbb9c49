//! Display formatting for the distances and durations shown in guidance banners.

/// Format a distance in meters for banner display
/// Sub-kilometer distances are rounded to the nearest 10 m
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", (meters / 10.0).round() as i64 * 10)
    }
}

/// Format a duration in seconds for banner display
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.round().max(0.0) as i64;
    if total >= 3600 {
        format!("{} h {} min", total / 3600, (total % 3600) / 60)
    } else if total >= 60 {
        format!("{} min", (total + 30) / 60)
    } else {
        format!("{} s", total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance_meters() {
        assert_eq!(format_distance(150.0), "150 m");
        assert_eq!(format_distance(163.0), "160 m");
        assert_eq!(format_distance(5.0), "10 m");
        assert_eq!(format_distance(0.0), "0 m");
    }

    #[test]
    fn test_format_distance_kilometers() {
        assert_eq!(format_distance(2500.0), "2.5 km");
        assert_eq!(format_distance(1000.0), "1.0 km");
    }

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(45.0), "45 s");
        assert_eq!(format_duration(0.4), "0 s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(90.0), "2 min");
        assert_eq!(format_duration(60.0), "1 min");
        assert_eq!(format_duration(605.0), "10 min");
    }

    #[test]
    fn test_format_duration_hours() {
        assert_eq!(format_duration(3660.0), "1 h 1 min");
        assert_eq!(format_duration(7200.0), "2 h 0 min");
    }

    #[test]
    fn test_format_duration_negative_clamps_to_zero() {
        assert_eq!(format_duration(-5.0), "0 s");
    }
}
