//! Time formatting helpers for progress reporting

/// Format a second count as `m:ss` or `h:mm:ss`
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Format a position in seconds (f32) as `m:ss.t` for segment reports
pub fn format_position(seconds: f32) -> String {
    let whole = seconds.max(0.0) as u64;
    let tenths = ((seconds.max(0.0) - whole as f32) * 10.0).round() as u64;
    format!("{}:{:02}.{}", whole / 60, whole % 60, tenths.min(9))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_hms(0), "0:00");
        assert_eq!(format_hms(59), "0:59");
        assert_eq!(format_hms(61), "1:01");
        assert_eq!(format_hms(3661), "1:01:01");
    }

    #[test]
    fn formats_positions_with_tenths() {
        assert_eq!(format_position(0.0), "0:00.0");
        assert_eq!(format_position(4.25), "0:04.3");
        assert_eq!(format_position(65.5), "1:05.5");
    }
}
