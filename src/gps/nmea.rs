// src/gps/nmea.rs
//! Position extraction from NMEA sentences

/// A positioning fix as delivered to the acquisition controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Extract a position from a GGA or RMC sentence.
///
/// Returns `None` for other sentence types, for RMC sentences flagged void
/// and for GGA sentences reporting fix quality 0.
pub fn parse_position(line: &str) -> Option<Fix> {
    let parts: Vec<&str> = line.trim().split(',').collect();

    if line.starts_with("$GPGGA") || line.starts_with("$GNGGA") {
        parse_gga(&parts)
    } else if line.starts_with("$GPRMC") || line.starts_with("$GNRMC") {
        parse_rmc(&parts)
    } else {
        None
    }
}

/// GGA (Global Positioning System Fix Data)
fn parse_gga(parts: &[&str]) -> Option<Fix> {
    if parts.len() < 7 {
        return None;
    }

    // Fix quality (field 6)
    if parts[6].is_empty() || parts[6] == "0" {
        return None;
    }

    // Latitude (fields 2 and 3), longitude (fields 4 and 5)
    let latitude = parse_coordinate(parts[2], parts[3], "S")?;
    let longitude = parse_coordinate(parts[4], parts[5], "W")?;
    Some(Fix::new(latitude, longitude))
}

/// RMC (Recommended Minimum Course)
fn parse_rmc(parts: &[&str]) -> Option<Fix> {
    if parts.len() < 7 {
        return None;
    }

    // Status (field 2): A = active, V = void
    if parts[2] != "A" {
        return None;
    }

    // Latitude (fields 3 and 4), longitude (fields 5 and 6)
    let latitude = parse_coordinate(parts[3], parts[4], "S")?;
    let longitude = parse_coordinate(parts[5], parts[6], "W")?;
    Some(Fix::new(latitude, longitude))
}

/// Convert NMEA `(d)ddmm.mmmm` plus hemisphere to signed decimal degrees
fn parse_coordinate(value: &str, hemisphere: &str, negative: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }

    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;

    if hemisphere == negative {
        Some(-decimal)
    } else {
        Some(decimal)
    }
}
