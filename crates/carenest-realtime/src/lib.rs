//! Realtime features scoped to one child profile.
//!
//! - [`ChangeRelay`] turns the backend's row-change feed into query cache
//!   invalidations and toasts.
//! - [`PresenceTracker`] keeps the roster of other caregivers online.
//!
//! Both sit on a [`ScopedChannel`] over the [`RealtimeTransport`], whose
//! production implementation is the WebSocket [`RealtimeClient`].

pub mod change;
pub mod channel;
pub mod presence;
pub mod relay;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use change::{ChangeEvent, ChangeKind};
pub use channel::{ChannelScope, ScopedChannel};
pub use presence::{PresenceEntry, PresenceState, PresenceTracker};
pub use relay::{ChangeRelay, RelayState};
pub use transport::{
    BroadcastConfig, ChannelConfig, PhoenixMessage, PostgresChangeBinding, PresenceConfig,
    RealtimeClient, RealtimeConfig, RealtimeEvent, RealtimeTransport,
};
