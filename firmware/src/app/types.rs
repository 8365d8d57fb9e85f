use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use esp_scope::{
    connectivity::{ConnectivityManager, RestartRequired},
    control::ControlPlane,
    credentials::FlashCredentialStore,
};
use esp_storage::FlashStorage;

use super::tone::LedcTone;

pub(crate) type CredentialStore = FlashCredentialStore<FlashStorage<'static>>;
pub(crate) type Manager = ConnectivityManager<'static, CredentialStore>;
pub(crate) type ManagerMutex = Mutex<CriticalSectionRawMutex, Manager>;
pub(crate) type Control = ControlPlane<'static, LedcTone>;
pub(crate) type ControlMutex = Mutex<CriticalSectionRawMutex, Control>;

pub(crate) enum PowerRequest {
    Restart(RestartRequired),
    PowerOff,
}

/// Shared handles passed to every HTTP worker.
#[derive(Clone, Copy)]
pub(crate) struct HttpContext {
    pub(crate) manager: &'static ManagerMutex,
    pub(crate) control: &'static ControlMutex,
}

/// Network role chosen at boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NetRole {
    Station,
    AccessPoint,
}
