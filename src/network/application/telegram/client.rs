use super::{ChatMessage, MAX_MESSAGES, TEXT_CAPACITY, check_sent, extract_updates};
use crate::config::TelegramConfig;
use crate::network::application::http::scan::url_encode;
use crate::network::application::http::{Header, HttpEngine, Request, Step, Target, Timeouts};
use crate::network::application::status::{State, Status, message};
use crate::network::error::Error;
use crate::network::tls::{SecureEngine, TlsPolicy};
use crate::network::{Event, Transport};
use core::fmt::Write;
use heapless::{String, Vec};

pub const REQUEST_CAPACITY: usize = 1280;
pub const RESPONSE_CAPACITY: usize = 8192;

const ENCODED_TEXT_CAPACITY: usize = TEXT_CAPACITY * 3;
const BODY_CAPACITY: usize = ENCODED_TEXT_CAPACITY + 32;
const PATH_CAPACITY: usize = 256;

/// Which call the in-flight request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    SendMessage,
    GetUpdates,
}

/// Bot client. Every request goes over the secure channel.
///
/// Unlike the other clients this one may be re-armed while a request is in
/// flight: the prior connection is torn down and the new request replaces it.
#[derive(Debug)]
pub struct TelegramClient<E: SecureEngine> {
    engine: HttpEngine<E, REQUEST_CAPACITY, RESPONSE_CAPACITY>,
    config: TelegramConfig,
    status: Status,
    kind: RequestKind,
    messages: Vec<ChatMessage, MAX_MESSAGES>,
    last_seen_id: i64,
}

impl<E: SecureEngine> TelegramClient<E> {
    pub fn new(engine: E, policy: TlsPolicy, config: TelegramConfig) -> Self {
        Self {
            engine: HttpEngine::new(engine, policy),
            config,
            status: Status::new(),
            kind: RequestKind::GetUpdates,
            messages: Vec::new(),
            last_seen_id: 0,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.engine.set_timeouts(timeouts);
        self
    }

    /// Post `text` to `chat_id`.
    pub fn send_message<T: Transport>(&mut self, transport: &mut T, chat_id: i64, text: &str) {
        self.status.begin(State::Sending);
        self.kind = RequestKind::SendMessage;

        let encoded: String<ENCODED_TEXT_CAPACITY> = url_encode(text);
        let mut body: String<BODY_CAPACITY> = String::new();
        let mut path: String<PATH_CAPACITY> = String::new();
        if write!(body, "chat_id={}&text={}", chat_id, encoded).is_err()
            || write!(path, "/bot{}/sendMessage", self.config.bot_token).is_err()
        {
            self.status.fail(Error::RequestTooLarge.message());
            return;
        }

        let headers = [Header::new(
            "Content-Type",
            "application/x-www-form-urlencoded",
        )];
        let request = Request::post(&path, body.as_bytes()).with_headers(&headers);

        info!("telegram: sending {=usize} bytes to chat {=i64}", body.len(), chat_id);
        self.start(transport, &request);
    }

    /// Ask for updates newer than the last one seen.
    pub fn poll_updates<T: Transport>(&mut self, transport: &mut T) {
        if self.status.state().is_active() {
            debug!("telegram: re-arming active client");
        }
        self.status.begin(State::Receiving);
        self.kind = RequestKind::GetUpdates;
        self.messages.clear();

        let offset = self.last_seen_id.saturating_add(1);
        let mut path: String<PATH_CAPACITY> = String::new();
        if write!(
            path,
            "/bot{}/getUpdates?offset={}&timeout={}",
            self.config.bot_token,
            offset,
            self.config.poll_timeout_s
        )
        .is_err()
        {
            self.status.fail(Error::RequestTooLarge.message());
            return;
        }

        debug!("telegram: polling from offset {=i64}", offset);
        self.start(transport, &Request::get(&path));
    }

    fn start<T: Transport>(&mut self, transport: &mut T, request: &Request<'_>) {
        let target = Target::https(&self.config.host).with_port(self.config.port);
        if let Err(err) = self.engine.start(transport, &target, request) {
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
                    Ok(response) => match self.kind {
                        RequestKind::SendMessage => check_sent(response.body),
                        RequestKind::GetUpdates => {
                            extract_updates(response.body, &mut self.last_seen_id, &mut self.messages)
                                .map(|_| ())
                        }
                    },
                    Err(err) => Err(message(err.message())),
                };
                match outcome {
                    Ok(()) => self.status.succeed(),
                    Err(msg) => {
                        warn!("telegram: request failed: {=str}", msg.as_str());
                        self.status.fail(&msg)
                    }
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

    /// Messages from the most recent poll.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Highest update id seen over the client's lifetime.
    pub fn last_seen_id(&self) -> i64 {
        self.last_seen_id
    }

    /// The call the current or most recent request made.
    pub fn request_kind(&self) -> RequestKind {
        self.kind
    }
}
