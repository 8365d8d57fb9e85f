use core::sync::atomic::{AtomicU32, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityMode {
    Provisioning,
    Connecting,
    Connected,
}

impl ConnectivityMode {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Provisioning => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Provisioning),
            1 => Some(Self::Connecting),
            2 => Some(Self::Connected),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectivityStatus {
    pub mode: ConnectivityMode,
    pub retry_count: u32,
}

impl ConnectivityStatus {
    const MODE_MASK: u32 = 0b11;
    const RETRY_SHIFT: u32 = 8;
    const RETRY_MAX: u32 = u32::MAX >> Self::RETRY_SHIFT;

    pub const fn initial() -> Self {
        Self {
            mode: ConnectivityMode::Connecting,
            retry_count: 0,
        }
    }

    pub const fn packed(self) -> u32 {
        let retry = if self.retry_count > Self::RETRY_MAX {
            Self::RETRY_MAX
        } else {
            self.retry_count
        };
        (self.mode.as_u8() as u32) | (retry << Self::RETRY_SHIFT)
    }

    pub fn from_packed(raw: u32) -> Self {
        Self {
            mode: ConnectivityMode::from_u8((raw & Self::MODE_MASK) as u8)
                .unwrap_or(ConnectivityMode::Connecting),
            retry_count: raw >> Self::RETRY_SHIFT,
        }
    }
}

/// Lock-free view of the connectivity state for tasks that do not own the
/// manager (status LED, HTTP routing).
pub struct ConnectivityStatusCell {
    raw: AtomicU32,
}

impl ConnectivityStatusCell {
    pub const fn new() -> Self {
        Self {
            raw: AtomicU32::new(ConnectivityStatus::initial().packed()),
        }
    }

    pub fn publish(&self, status: ConnectivityStatus) {
        self.raw.store(status.packed(), Ordering::Relaxed);
    }

    pub fn read(&self) -> ConnectivityStatus {
        ConnectivityStatus::from_packed(self.raw.load(Ordering::Relaxed))
    }

    pub fn current_mode(&self) -> ConnectivityMode {
        self.read().mode
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.current_mode(), ConnectivityMode::Connected)
    }
}

impl Default for ConnectivityStatusCell {
    fn default() -> Self {
        Self::new()
    }
}
