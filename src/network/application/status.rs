use crate::network::buffer::truncate_str;
use heapless::String;

/// Capacity of a status message.
pub const MESSAGE_CAPACITY: usize = 128;

/// A status message, bounded like every other stored string.
pub type Message = String<MESSAGE_CAPACITY>;

/// Copy `text` into a [`Message`], truncating to capacity.
pub fn message(text: &str) -> Message {
    truncate_str(text)
}

/// Lifecycle of one client operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    /// A request that sends data is in flight.
    Sending,
    /// A request that fetches data is in flight.
    Receiving,
    Success,
    Error,
}

#[cfg(feature = "defmt")]
impl defmt::Format for State {
    fn format(&self, f: defmt::Formatter) {
        match self {
            State::Idle => defmt::write!(f, "Idle"),
            State::Sending => defmt::write!(f, "Sending"),
            State::Receiving => defmt::write!(f, "Receiving"),
            State::Success => defmt::write!(f, "Success"),
            State::Error => defmt::write!(f, "Error"),
        }
    }
}

impl State {
    pub fn is_active(&self) -> bool {
        matches!(self, State::Sending | State::Receiving)
    }
}

/// A client's observable state and its last error message.
///
/// Once an operation reaches `Success` or `Error` the status stays there
/// until the next operation begins.
#[derive(Debug, Clone, Default)]
pub struct Status {
    state: State,
    message: Message,
}

impl Status {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            message: String::new(),
        }
    }

    /// Enter an active state, clearing the previous message.
    pub fn begin(&mut self, state: State) {
        debug_assert!(state.is_active());
        self.state = state;
        self.message.clear();
    }

    /// Finish the active operation successfully. No effect otherwise.
    pub fn succeed(&mut self) {
        if self.state.is_active() {
            self.state = State::Success;
        }
    }

    /// Finish the active operation with `message`, truncated to capacity.
    /// No effect unless an operation is active.
    pub fn fail(&mut self, message: &str) {
        if self.state.is_active() {
            self.state = State::Error;
            self.message = truncate_str(message);
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
