//! Station/access-point selection, reconnect policy and the restart effects
//! that end a boot cycle.

mod machine;
mod status;

use heapless::Vec;
use statig::blocking::IntoStateMachineExt as _;

pub use status::{ConnectivityMode, ConnectivityStatus, ConnectivityStatusCell};

use self::machine::{ConnectivityMachine, DispatchContext};
use crate::credentials::{CredentialStore, WifiCredentials};
use crate::error::CredentialsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    Boot { has_credentials: bool },
    AddressAcquired,
    Disconnected,
}

/// Work the radio owner must perform after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkAction {
    StartStation,
    StartAccessPoint,
    StartCaptivePortal,
    Reconnect { attempt: u32 },
    /// The retry policy declined another attempt; the link stays down.
    GiveUp,
}

pub type LinkActions = Vec<LinkAction, 2>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyStatus {
    Applied,
    Unchanged,
    InvalidTransition,
}

#[derive(Clone, Debug)]
pub struct ApplyResult {
    pub before: ConnectivityStatus,
    pub after: ConnectivityStatus,
    pub status: ApplyStatus,
    pub actions: LinkActions,
}

impl ApplyResult {
    pub fn changed(&self) -> bool {
        matches!(self.status, ApplyStatus::Applied)
    }
}

pub trait RetryPolicy {
    fn should_retry(&self, attempt: u32) -> bool;
}

/// Reconnect unconditionally.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetryForever;

impl RetryPolicy for RetryForever {
    fn should_retry(&self, _attempt: u32) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BoundedRetry {
    pub max_attempts: u32,
}

impl RetryPolicy for BoundedRetry {
    fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

/// Boundary to the platform restart primitive.
pub trait DeviceControl {
    fn restart_device(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartReason {
    CredentialsSaved,
    FactoryReset,
}

impl RestartReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CredentialsSaved => "credentials saved",
            Self::FactoryReset => "factory reset",
        }
    }
}

/// A committed change that only takes effect after a restart.
#[must_use = "the change takes effect only after the device restarts"]
#[derive(Debug, PartialEq, Eq)]
pub struct RestartRequired {
    reason: RestartReason,
}

impl RestartRequired {
    pub fn reason(&self) -> RestartReason {
        self.reason
    }

    pub fn perform<D: DeviceControl + ?Sized>(self, device: &mut D) {
        log::warn!("wifi: restarting device ({})", self.reason.as_str());
        device.restart_device();
    }
}

pub struct ConnectivityManager<'a, S, P = RetryForever> {
    machine: statig::blocking::StateMachine<ConnectivityMachine>,
    store: S,
    policy: P,
    credentials: Option<WifiCredentials>,
    status: &'a ConnectivityStatusCell,
}

impl<'a, S: CredentialStore, P: RetryPolicy> ConnectivityManager<'a, S, P> {
    /// Read stored credentials once and choose the boot posture.
    pub fn boot(mut store: S, policy: P, status: &'a ConnectivityStatusCell) -> (Self, ApplyResult) {
        let credentials = match store.load() {
            Ok(credentials) => credentials,
            Err(fault) => {
                log::warn!("wifi: credential load failed: {}", fault);
                None
            }
        };
        let mut manager = Self {
            machine: ConnectivityMachine::new().state_machine(),
            store,
            policy,
            credentials,
            status,
        };
        let result = manager.apply(LinkEvent::Boot {
            has_credentials: credentials.is_some(),
        });
        log::info!(
            "wifi: boot mode={} stored_credentials={}",
            result.after.mode.as_str(),
            credentials.is_some()
        );
        (manager, result)
    }

    pub fn apply(&mut self, event: LinkEvent) -> ApplyResult {
        let before = self.status();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);

        let mut actions = context.actions;
        for action in actions.iter_mut() {
            if let LinkAction::Reconnect { attempt } = *action {
                if !self.policy.should_retry(attempt) {
                    log::warn!("wifi: giving up after {} attempts", attempt);
                    *action = LinkAction::GiveUp;
                }
            }
        }

        let after = self.status();
        self.status.publish(after);
        ApplyResult {
            before,
            after,
            status: context.status,
            actions,
        }
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.machine.inner().status
    }

    pub fn current_mode(&self) -> ConnectivityMode {
        self.status().mode
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.current_mode(), ConnectivityMode::Connected)
    }

    pub fn retry_count(&self) -> u32 {
        self.status().retry_count
    }

    /// Credentials read at boot; later saves only apply after restart.
    pub fn credentials(&self) -> Option<&WifiCredentials> {
        self.credentials.as_ref()
    }

    pub fn save_credentials(
        &mut self,
        ssid: &[u8],
        password: &[u8],
    ) -> Result<RestartRequired, CredentialsError> {
        let credentials = WifiCredentials::from_parts(ssid, password)?;
        self.store.save(&credentials)?;
        log::info!(
            "wifi: credentials saved ssid={}",
            credentials.ssid_str().unwrap_or("<non_utf8>")
        );
        Ok(RestartRequired {
            reason: RestartReason::CredentialsSaved,
        })
    }

    /// Erase stored credentials. Restarts even if the erase failed.
    pub fn factory_reset(&mut self) -> RestartRequired {
        if let Err(fault) = self.store.erase() {
            log::error!("wifi: factory reset erase failed: {}", fault);
        }
        RestartRequired {
            reason: RestartReason::FactoryReset,
        }
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
