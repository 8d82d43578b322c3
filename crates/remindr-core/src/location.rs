//! Venue address normalization.
//! Pure string handling: no geocoding, no network.

use crate::types::{Location, Venue};

const MAPS_PLACE_URL: &str = "https://www.google.com/maps/place/";

/// Split a raw address into its street line and its "City, ST 00000" remainder.
///
/// Only the first comma splits. A trailing `", USA"` is dropped from the remainder.
pub fn parse_address(address: &str) -> (String, String) {
    if address.is_empty() {
        return (String::new(), String::new());
    }
    match address.split_once(',') {
        None => (address.trim().to_string(), String::new()),
        Some((line1, rest)) => {
            let rest = rest.trim();
            let city_state_zip = rest.strip_suffix(", USA").unwrap_or(rest);
            (line1.trim().to_string(), city_state_zip.to_string())
        }
    }
}

/// Google Maps link for an address, or an empty string if either half is missing.
pub fn map_url(line1: &str, city_state_zip: &str) -> String {
    if line1.is_empty() || city_state_zip.is_empty() {
        return String::new();
    }
    let query = format!("{line1},{city_state_zip}");
    let escaped: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{MAPS_PLACE_URL}{escaped}")
}

impl Location {
    /// Build a display-ready location from a store venue record.
    pub fn from_venue(venue: &Venue) -> Self {
        let (line1, city_state_zip) = parse_address(&venue.address);
        let map_url = map_url(&line1, &city_state_zip);
        Self {
            name: venue.name.clone(),
            line1,
            city_state_zip,
            map_url,
        }
    }
}
