//! Weather forecast client with a chained temperature map tile.
//!
//! A forecast fetch returns up to [`MAX_FORECASTS`] three-hour entries and
//! the city's coordinates. When coordinates are known the client then
//! fetches the map tile covering them and keeps it as a PNG blob.

use super::http::scan;
use super::status::{Message, message};
use heapless::{String, Vec};

pub mod client;

pub use client::{Stage, WeatherClient};

/// Most forecast entries kept (48 hours at three-hour steps).
pub const MAX_FORECASTS: usize = 16;
pub const DESCRIPTION_CAPACITY: usize = 64;
pub const ICON_CAPACITY: usize = 8;
pub const CITY_NAME_CAPACITY: usize = 64;
/// Largest map image kept; longer bodies are cut.
pub const MAP_IMAGE_MAX_SIZE: usize = 64 * 1024;
/// Zoom level of the fetched map tile.
pub const MAP_ZOOM: u8 = 5;
/// Deepest zoom level [`tile_for`] computes; larger values are clamped.
pub const MAX_ZOOM: u8 = 22;

const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];

/// One forecast point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    /// Unix seconds.
    pub timestamp: i64,
    /// Degrees Celsius.
    pub temp: f32,
    pub feels_like: f32,
    /// Percent.
    pub humidity: i32,
    pub description: String<DESCRIPTION_CAPACITY>,
    /// Service icon code such as `10d`.
    pub icon: String<ICON_CAPACITY>,
}

impl Forecast {
    /// Single-character glyph for [`icon`](Self::icon).
    pub fn glyph(&self) -> char {
        icon_glyph(&self.icon)
    }
}

/// Everything a forecast response yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastData {
    pub latitude: f32,
    pub longitude: f32,
    pub forecasts: Vec<Forecast, MAX_FORECASTS>,
}

impl ForecastData {
    /// Whether the response located the city.
    pub fn has_coordinates(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }
}

/// Pull the forecast list and city coordinates out of a response body.
///
/// Each entry is the span from one `"dt":` key to the next, so fields are
/// never borrowed from a neighbouring entry.
pub fn extract_forecast(body: &[u8], out: &mut ForecastData) -> Result<usize, Message> {
    *out = ForecastData::default();

    if scan::contains(body, b"\"cod\":\"404\"") {
        let msg = scan::string_field(body, b"\"message\":\"")
            .map(|(msg, _)| msg)
            .unwrap_or_else(|| message("City not found"));
        return Err(msg);
    }
    if scan::contains(body, b"\"cod\":401") {
        return Err(message("Invalid API key"));
    }

    if let Some(coord_at) = scan::find(body, b"\"coord\":{") {
        let coord = &body[coord_at..];
        if let (Some(lat), Some(lon)) = (
            scan::float_field(coord, b"\"lat\":"),
            scan::float_field(coord, b"\"lon\":"),
        ) {
            out.latitude = lat;
            out.longitude = lon;
        }
    }

    let Some(list_at) = scan::find(body, b"\"list\":[") else {
        return Err(message("Invalid forecast data"));
    };

    for entry in scan::records(&body[list_at..], b"\"dt\":") {
        if out.forecasts.is_full() {
            break;
        }
        let forecast = Forecast {
            timestamp: scan::parse_i64(entry),
            temp: scan::float_field(entry, b"\"temp\":").unwrap_or_default(),
            feels_like: scan::float_field(entry, b"\"feels_like\":").unwrap_or_default(),
            humidity: scan::int_field(entry, b"\"humidity\":")
                .map(|h| h.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
                .unwrap_or_default(),
            description: scan::string_field(entry, b"\"description\":\"")
                .map(|(s, _)| s)
                .unwrap_or_default(),
            icon: scan::string_field(entry, b"\"icon\":\"")
                .map(|(s, _)| s)
                .unwrap_or_default(),
        };
        // Bounded by `is_full` above.
        let _ = out.forecasts.push(forecast);
    }

    debug!("weather: parsed {=usize} forecasts", out.forecasts.len());
    if out.forecasts.is_empty() {
        return Err(message("No forecasts found"));
    }
    Ok(out.forecasts.len())
}

/// Copy a PNG body into `image`.
///
/// Returns `false` and leaves `image` empty when the body does not start
/// with the PNG signature. Bodies over [`MAP_IMAGE_MAX_SIZE`] are cut.
pub fn extract_map_image(body: &[u8], image: &mut Vec<u8, MAP_IMAGE_MAX_SIZE>) -> bool {
    image.clear();
    if !body.starts_with(&PNG_MAGIC) {
        warn!("weather: map body is not a PNG image");
        return false;
    }
    let len = body.len().min(MAP_IMAGE_MAX_SIZE);
    if len < body.len() {
        warn!("weather: map image truncated to {=usize} bytes", len);
    }
    // `len` never exceeds the capacity.
    let _ = image.extend_from_slice(&body[..len]);
    true
}

/// Slippy-map tile containing `lat`/`lon` at `zoom`, capped at [`MAX_ZOOM`].
pub fn tile_for(lat: f32, lon: f32, zoom: u8) -> (u32, u32) {
    let n = f64::from(1u32 << zoom.min(MAX_ZOOM));
    let lat_rad = f64::from(lat).to_radians();
    let x = (f64::from(lon) + 180.0) / 360.0 * n;
    let y = (1.0 - libm::log(libm::tan(lat_rad) + 1.0 / libm::cos(lat_rad)) / core::f64::consts::PI)
        / 2.0
        * n;
    let max = n - 1.0;
    (
        libm::floor(x.clamp(0.0, max)) as u32,
        libm::floor(y.clamp(0.0, max)) as u32,
    )
}

/// Map a service icon code to a display glyph.
pub fn icon_glyph(icon: &str) -> char {
    match icon.as_bytes() {
        [b'0', b'1', ..] => '*',
        [b'0', b'2' | b'3' | b'4', ..] => 'o',
        [b'0', b'9', ..] | [b'1', b'0', ..] => '~',
        [b'1', b'1', ..] => '!',
        [b'1', b'3', ..] => 'S',
        [b'5', b'0', ..] => 'F',
        _ => '?',
    }
}

/// A city offered for quick selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub lat: f32,
    pub lon: f32,
}

pub const CITIES: [City; 10] = [
    City { name: "New York", lat: 40.7128, lon: -74.0060 },
    City { name: "Los Angeles", lat: 34.0522, lon: -118.2437 },
    City { name: "London", lat: 51.5074, lon: -0.1278 },
    City { name: "Paris", lat: 48.8566, lon: 2.3522 },
    City { name: "Tokyo", lat: 35.6762, lon: 139.6503 },
    City { name: "Sydney", lat: -33.8688, lon: 151.2093 },
    City { name: "Athens", lat: 37.9838, lon: 23.7275 },
    City { name: "Mumbai", lat: 19.0760, lon: 72.8777 },
    City { name: "Dubai", lat: 25.2048, lon: 55.2708 },
    City { name: "Toronto", lat: 43.6532, lon: -79.3832 },
];

pub fn cities() -> &'static [City] {
    &CITIES
}
