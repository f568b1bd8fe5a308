//! Connectivity supervision
//!
//! Keeps the network link alive: link events and periodic status checks
//! drive a bounded-retry reconnect state machine that escalates to a device
//! restart when the retry budget is exhausted.

pub mod clock;
pub mod events;
pub mod state;
pub mod supervisor;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use events::{inbox, LinkEvent, LinkEventInbox, LinkEventSender};
pub use state::{ConnectivityState, Phase};
pub use supervisor::{ConnectivitySupervisor, SupervisorTiming, TickOutcome};
