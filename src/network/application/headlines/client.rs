use super::{Article, CredentialPlacement, MAX_ARTICLES, extract_headlines};
use crate::config::NewsConfig;
use crate::network::application::http::scan::url_encode;
use crate::network::application::http::{Header, HttpEngine, Request, Scheme, Step, Target, Timeouts};
use crate::network::application::status::{State, Status, message};
use crate::network::error::Error;
use crate::network::tls::{PlainOnly, SecureEngine, TlsPolicy};
use crate::network::{Event, Transport};
use core::fmt::Write;
use heapless::{String, Vec};

pub const REQUEST_CAPACITY: usize = 512;
pub const RESPONSE_CAPACITY: usize = 8192;

/// Headline fetcher. Plain HTTP unless the configuration asks for HTTPS.
#[derive(Debug)]
pub struct HeadlineClient<E: SecureEngine = PlainOnly> {
    engine: HttpEngine<E, REQUEST_CAPACITY, RESPONSE_CAPACITY>,
    config: NewsConfig,
    status: Status,
    articles: Vec<Article, MAX_ARTICLES>,
}

impl HeadlineClient<PlainOnly> {
    /// A client that only ever speaks plain HTTP.
    pub fn plain(config: NewsConfig) -> Self {
        Self::new(PlainOnly, TlsPolicy::default(), config)
    }
}

impl<E: SecureEngine> HeadlineClient<E> {
    pub fn new(engine: E, policy: TlsPolicy, config: NewsConfig) -> Self {
        Self {
            engine: HttpEngine::new(engine, policy),
            config,
            status: Status::new(),
            articles: Vec::new(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.engine.set_timeouts(timeouts);
        self
    }

    /// Start fetching top headlines for `country` (e.g. `us`).
    ///
    /// Does nothing while a fetch is already in flight.
    pub fn fetch_headlines<T: Transport>(&mut self, transport: &mut T, country: &str) {
        if self.status.state().is_active() {
            debug!("headlines: fetch already in progress");
            return;
        }
        self.status.begin(State::Receiving);
        self.articles.clear();

        let country: String<16> = url_encode(country);
        let mut path: String<256> = String::new();
        let mut written = write!(
            path,
            "/v2/top-headlines?country={}&pageSize={}",
            country, self.config.page_size
        );
        if self.config.credentials == CredentialPlacement::Query {
            written = written.and_then(|_| write!(path, "&apiKey={}", self.config.api_key));
        }
        if written.is_err() {
            self.status.fail(Error::RequestTooLarge.message());
            return;
        }

        let key_header = [Header::new("X-Api-Key", &self.config.api_key)];
        let mut request = Request::get(&path);
        if self.config.credentials == CredentialPlacement::Header {
            request = request.with_headers(&key_header);
        }

        let scheme = if self.config.secure { Scheme::Https } else { Scheme::Http };
        let target = Target {
            host: &self.config.host,
            port: self.config.port,
            scheme,
        };

        info!("headlines: fetching for {=str}", country.as_str());
        if let Err(err) = self.engine.start(transport, &target, &request) {
            self.status.fail(err.message());
        }
    }

    /// Feed one network event to the client.
    pub fn drive<T: Transport>(&mut self, transport: &mut T, event: Event<'_>) {
        match self.engine.drive(transport, event) {
            Step::Pending => {}
            Step::Failed(err) => self.status.fail(err.message()),
            Step::Response => {
                let outcome = match self.engine.response() {
                    Ok(response) => extract_headlines(response.body, &mut self.articles),
                    Err(err) => Err(message(err.message())),
                };
                match outcome {
                    Ok(_) => self.status.succeed(),
                    Err(msg) => self.status.fail(&msg),
                }
            }
        }
    }

    pub fn state(&self) -> State {
        self.status.state()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }
}
