use core::fmt;

/// Peripheral failure outside the expected "no data yet" case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HardwareFault {
    Configure,
    Start,
    Stop,
    Read,
    ToneConfigure,
}

impl HardwareFault {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configure => "adc configure failed",
            Self::Start => "adc start failed",
            Self::Stop => "adc stop failed",
            Self::Read => "adc read failed",
            Self::ToneConfigure => "tone configure failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendError {
    /// Outbound queue is full; the frame is dropped.
    Congestion,
    /// Peer connection no longer exists.
    Gone,
}

impl SendError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Congestion => "transport congestion",
            Self::Gone => "transport gone",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigParseError {
    NotAnObject,
    TooLarge,
    Utf8,
}

impl ConfigParseError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotAnObject => "body is not a json object",
            Self::TooLarge => "body exceeds size limit",
            Self::Utf8 => "body is not utf8",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistenceFault {
    Read,
    Write,
    Erase,
}

impl PersistenceFault {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "credential store read failed",
            Self::Write => "credential store write failed",
            Self::Erase => "credential store erase failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialsError {
    InvalidLength,
    Persistence(PersistenceFault),
}

impl CredentialsError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidLength => "invalid wifi credentials length",
            Self::Persistence(fault) => fault.as_str(),
        }
    }
}

impl From<PersistenceFault> for CredentialsError {
    fn from(fault: PersistenceFault) -> Self {
        Self::Persistence(fault)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DnsError {
    Truncated,
}

impl DnsError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Truncated => "dns packet truncated",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhcpError {
    Truncated,
    /// Not an Ethernet BOOTREQUEST carrying the DHCP cookie.
    Malformed,
}

impl DhcpError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Truncated => "dhcp packet truncated",
            Self::Malformed => "dhcp packet malformed",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(
    HardwareFault,
    SendError,
    ConfigParseError,
    PersistenceFault,
    CredentialsError,
    DnsError,
    DhcpError,
);
