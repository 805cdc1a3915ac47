//! Group-addressed delivery modes
//!
//! IEEE 802.11aa defines several ways for an AP to deliver a multicast frame,
//! from plain broadcast to the GroupCast with Retries (GCR) services.

use std::fmt;
use std::str::FromStr;

use crate::MulticastError;

/// Multicast delivery mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum MulticastModeKind {
    /// Legacy group-addressed transmission, no retries
    Legacy = 0,
    /// Directed Multicast Service: one unicast copy per member
    Dms = 1,
    /// GCR with unsolicited retries
    GcrUr = 2,
    /// GCR block ack, immediate
    GcrIback = 3,
    /// GCR block ack, delayed
    GcrDback = 4,
}

impl Default for MulticastModeKind {
    fn default() -> Self {
        Self::Legacy
    }
}

impl MulticastModeKind {
    /// All modes in numeric order
    pub const ALL: [MulticastModeKind; 5] = [
        Self::Legacy,
        Self::Dms,
        Self::GcrUr,
        Self::GcrIback,
        Self::GcrDback,
    ];

    /// Numeric value used by the configuration surface
    pub fn value(self) -> i16 {
        self as i16
    }

    /// Get the mode name
    pub fn name(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Dms => "dms",
            Self::GcrUr => "gcr-ur",
            Self::GcrIback => "gcr-iback",
            Self::GcrDback => "gcr-dback",
        }
    }

    /// Check if this is one of the GCR services
    pub fn is_gcr(self) -> bool {
        matches!(self, Self::GcrUr | Self::GcrIback | Self::GcrDback)
    }

    /// Check if the retry count is meaningful for this mode
    pub fn uses_retries(self) -> bool {
        matches!(self, Self::GcrUr)
    }

    /// Check if this mode relies on block acknowledgement
    pub fn uses_block_ack(self) -> bool {
        matches!(self, Self::GcrIback | Self::GcrDback)
    }
}

impl TryFrom<i16> for MulticastModeKind {
    type Error = MulticastError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Legacy),
            1 => Ok(Self::Dms),
            2 => Ok(Self::GcrUr),
            3 => Ok(Self::GcrIback),
            4 => Ok(Self::GcrDback),
            _ => Err(MulticastError::InvalidConfiguration(format!(
                "multicast mode {} out of range 0..=4",
                value
            ))),
        }
    }
}

impl From<MulticastModeKind> for i16 {
    fn from(mode: MulticastModeKind) -> Self {
        mode.value()
    }
}

impl fmt::Display for MulticastModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MulticastModeKind {
    type Err = MulticastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Ok(value) = lower.parse::<i16>() {
            return Self::try_from(value);
        }

        match lower.as_str() {
            "legacy" => Ok(Self::Legacy),
            "dms" => Ok(Self::Dms),
            "gcr-ur" | "gcrur" => Ok(Self::GcrUr),
            "gcr-iback" | "gcriback" => Ok(Self::GcrIback),
            "gcr-dback" | "gcrdback" => Ok(Self::GcrDback),
            _ => Err(MulticastError::InvalidConfiguration(format!(
                "unknown multicast mode '{}'",
                s
            ))),
        }
    }
}
