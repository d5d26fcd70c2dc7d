//! Client event → hub event translation table.
//!
//! Pure: decides what the hub should see and what the adapter should do,
//! but touches no state. [`super::SessionAdapter::handle_event`] applies the
//! result.

use crate::client::{ClientEvent, Identity, ScanStatus};
use crate::hub::{HubEvent, CANCEL_ON_PHONE, CONFIRM_ON_PHONE};

use super::{CancelPolicy, SessionState, Termination};

/// Reason sent with `LOGOUT_DONE` when the client logs out without one.
pub const DEFAULT_LOGOUT_REASON: &str = "user logged out";

/// Side effect the adapter performs after forwarding the hub event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing beyond the hub event.
    None,
    /// Replace the cached identity, then notify `LOGIN_DONE`.
    AdoptIdentity(Identity),
    /// Ask the hub sink to sync contacts and rooms.
    SyncContacts,
    /// Log the session out and drop the handle; the adapter stays usable.
    Abandon,
    /// Drop the handle and end the adapter for good.
    Terminate(Termination),
}

/// What one client event means to the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// Event to forward to the hub, if any.
    pub hub_event: Option<HubEvent>,
    /// New session state, if the event moves it.
    pub next_state: Option<SessionState>,
    /// Side effect to run.
    pub effect: Effect,
}

impl Translation {
    fn ignore() -> Self {
        Self {
            hub_event: None,
            next_state: None,
            effect: Effect::None,
        }
    }

    fn scan(url: impl Into<String>, status: ScanStatus, next_state: SessionState) -> Self {
        Self {
            hub_event: Some(HubEvent::LoginScan {
                url: url.into(),
                status: status.code(),
            }),
            next_state: Some(next_state),
            effect: Effect::None,
        }
    }
}

/// Translate one client event.
pub fn translate(event: &ClientEvent, cancel_policy: CancelPolicy) -> Translation {
    match event {
        ClientEvent::Scan { url, status } => translate_scan(url, *status, cancel_policy),
        ClientEvent::Login(identity) => Translation {
            hub_event: None,
            next_state: Some(SessionState::Authenticated),
            effect: Effect::AdoptIdentity(identity.clone()),
        },
        ClientEvent::Ready => Translation {
            hub_event: None,
            next_state: None,
            effect: Effect::SyncContacts,
        },
        ClientEvent::Logout { reason } => {
            let reason = reason
                .clone()
                .unwrap_or_else(|| DEFAULT_LOGOUT_REASON.to_owned());
            Translation {
                hub_event: Some(HubEvent::LogoutDone {
                    reason: Some(reason.clone()),
                }),
                next_state: Some(SessionState::LoggedOut),
                effect: Effect::Terminate(Termination::LoggedOut { reason }),
            }
        }
        ClientEvent::Error(_)
        | ClientEvent::Heartbeat(_)
        | ClientEvent::Friendship { .. }
        | ClientEvent::Message { .. }
        | ClientEvent::RoomJoin { .. }
        | ClientEvent::RoomTopic { .. }
        | ClientEvent::RoomLeave { .. }
        | ClientEvent::RoomInvite { .. } => Translation::ignore(),
    }
}

fn translate_scan(url: &str, status: ScanStatus, cancel_policy: CancelPolicy) -> Translation {
    match status {
        ScanStatus::NeedScan => Translation::scan(url, status, SessionState::AwaitingScan),
        ScanStatus::ScannedAwaitingConfirm => Translation::scan(
            CONFIRM_ON_PHONE,
            status,
            SessionState::ScanConfirmedPendingPhone,
        ),
        ScanStatus::CancelledOnPhone => {
            let mut translation =
                Translation::scan(CANCEL_ON_PHONE, status, SessionState::ScanCancelled);
            if cancel_policy == CancelPolicy::Abandon {
                translation.next_state = Some(SessionState::None);
                translation.effect = Effect::Abandon;
            }
            translation
        }
        ScanStatus::Expired => Translation {
            hub_event: Some(HubEvent::LogoutDone { reason: None }),
            next_state: Some(SessionState::ScanExpired),
            effect: Effect::Terminate(Termination::ScanExpired),
        },
        ScanStatus::Confirmed | ScanStatus::Unknown(_) => Translation::ignore(),
    }
}
