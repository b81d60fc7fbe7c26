use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::version::TargetVersion;

/// Connection state of a [`super::LiveSyncController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, IntoStaticStr)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl LinkState {
    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// - Disconnected -> Connecting on an explicit connect
    /// - Connecting -> Connected once a layout is chosen (fallback included)
    /// - Connecting -> Disconnected when no connection could be made
    /// - Connected -> Disconnected on disconnect or any I/O failure
    pub fn can_transition_to(&self, next: LinkState) -> bool {
        matches!(
            (self, next),
            (LinkState::Disconnected, LinkState::Connecting)
                | (LinkState::Connecting, LinkState::Connected)
                | (LinkState::Connecting, LinkState::Disconnected)
                | (LinkState::Connected, LinkState::Disconnected)
                | (LinkState::Disconnected, LinkState::Disconnected)
        )
    }
}

/// Observable link status, readable without waiting on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkStatus {
    pub state: LinkState,
    pub version: Option<TargetVersion>,
    /// `false` while running on the unvalidated fallback layout
    pub validated: bool,
}
