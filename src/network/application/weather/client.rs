use super::{
    CITY_NAME_CAPACITY, ForecastData, MAP_IMAGE_MAX_SIZE, MAP_ZOOM, extract_forecast,
    extract_map_image, tile_for,
};
use crate::config::WeatherConfig;
use crate::network::application::http::scan::url_encode;
use crate::network::application::http::{HttpEngine, Request, Step, Target, Timeouts};
use crate::network::application::status::{State, Status, message};
use crate::network::buffer::truncate_str;
use crate::network::error::Error;
use crate::network::tls::{SecureEngine, TlsPolicy};
use crate::network::{Event, Transport};
use core::fmt::Write;
use heapless::{String, Vec};

pub const REQUEST_CAPACITY: usize = 512;
pub const RESPONSE_CAPACITY: usize = 16384;

const PATH_CAPACITY: usize = 256;
const ENCODED_CITY_CAPACITY: usize = CITY_NAME_CAPACITY * 3;

/// Which of the two chained requests is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Forecast,
    Map,
}

/// Forecast and map client. Every request goes over the secure channel.
#[derive(Debug)]
pub struct WeatherClient<E: SecureEngine> {
    engine: HttpEngine<E, REQUEST_CAPACITY, RESPONSE_CAPACITY>,
    config: WeatherConfig,
    status: Status,
    stage: Stage,
    city: String<CITY_NAME_CAPACITY>,
    forecast: ForecastData,
    map_image: Vec<u8, MAP_IMAGE_MAX_SIZE>,
    map_loaded: bool,
}

impl<E: SecureEngine> WeatherClient<E> {
    pub fn new(engine: E, policy: TlsPolicy, config: WeatherConfig) -> Self {
        Self {
            engine: HttpEngine::new(engine, policy),
            config,
            status: Status::new(),
            stage: Stage::Forecast,
            city: String::new(),
            forecast: ForecastData::default(),
            map_image: Vec::new(),
            map_loaded: false,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.engine.set_timeouts(timeouts);
        self
    }

    /// Fetch the forecast for `city`, then the map tile around it.
    ///
    /// Does nothing while a fetch is already in flight.
    pub fn fetch_forecast<T: Transport>(&mut self, transport: &mut T, city: &str) {
        if self.status.state().is_active() {
            debug!("weather: fetch already in progress");
            return;
        }
        self.status.begin(State::Receiving);
        self.stage = Stage::Forecast;
        self.city = truncate_str(city);
        self.forecast = ForecastData::default();
        self.map_image.clear();
        self.map_loaded = false;

        let encoded: String<ENCODED_CITY_CAPACITY> = url_encode(city);
        let mut path: String<PATH_CAPACITY> = String::new();
        if write!(
            path,
            "/data/2.5/forecast?q={}&appid={}&units={}&cnt={}",
            encoded, self.config.api_key, self.config.units, self.config.forecast_count
        )
        .is_err()
        {
            self.status.fail(Error::RequestTooLarge.message());
            return;
        }

        info!("weather: fetching forecast for {=str}", self.city.as_str());
        let target = Target::https(&self.config.host).with_port(self.config.port);
        if let Err(err) = self.engine.start(transport, &target, &Request::get(&path)) {
            self.status.fail(err.message());
        }
    }

    /// Fetch only the map tile around `lat`/`lon`.
    ///
    /// Does nothing while a fetch is already in flight.
    pub fn fetch_map<T: Transport>(&mut self, transport: &mut T, lat: f32, lon: f32) {
        if self.status.state().is_active() {
            debug!("weather: fetch already in progress");
            return;
        }
        self.status.begin(State::Receiving);
        self.start_map(transport, lat, lon);
    }

    fn start_map<T: Transport>(&mut self, transport: &mut T, lat: f32, lon: f32) {
        self.stage = Stage::Map;
        self.map_image.clear();
        self.map_loaded = false;

        let (x, y) = tile_for(lat, lon, MAP_ZOOM);
        let mut path: String<PATH_CAPACITY> = String::new();
        if write!(
            path,
            "/map/{}/{}/{}/{}.png?appid={}",
            self.config.map_layer, MAP_ZOOM, x, y, self.config.api_key
        )
        .is_err()
        {
            self.status.fail(Error::RequestTooLarge.message());
            return;
        }

        debug!("weather: fetching map tile {=u32}/{=u32}", x, y);
        let target = Target::https(&self.config.map_host).with_port(self.config.port);
        if let Err(err) = self.engine.start(transport, &target, &Request::get(&path)) {
            self.status.fail(err.message());
        }
    }

    /// Feed one network event to the client.
    pub fn drive<T: Transport>(&mut self, transport: &mut T, event: Event<'_>) {
        match self.engine.drive(transport, event) {
            Step::Pending => {}
            Step::Failed(err) => self.status.fail(err.message()),
            Step::Response => match self.stage {
                Stage::Forecast => self.on_forecast(transport),
                Stage::Map => self.on_map(),
            },
        }
    }

    fn on_forecast<T: Transport>(&mut self, transport: &mut T) {
        let outcome = match self.engine.response() {
            Ok(response) => extract_forecast(response.body, &mut self.forecast),
            Err(err) => Err(message(err.message())),
        };
        if let Err(msg) = outcome {
            warn!("weather: forecast failed: {=str}", msg.as_str());
            self.status.fail(&msg);
            return;
        }

        if self.forecast.has_coordinates() {
            let (lat, lon) = (self.forecast.latitude, self.forecast.longitude);
            self.start_map(transport, lat, lon);
        } else {
            debug!("weather: no coordinates, skipping map");
            self.status.succeed();
        }
    }

    fn on_map(&mut self) {
        match self.engine.response() {
            Ok(response) => {
                self.map_loaded = extract_map_image(response.body, &mut self.map_image);
                self.status.succeed();
            }
            Err(_) => self.status.fail("Invalid map response"),
        }
    }

    pub fn state(&self) -> State {
        self.status.state()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn forecast(&self) -> &ForecastData {
        &self.forecast
    }

    /// The PNG tile, when the last fetch loaded one.
    pub fn map_image(&self) -> Option<&[u8]> {
        self.map_loaded.then_some(self.map_image.as_slice())
    }
}
