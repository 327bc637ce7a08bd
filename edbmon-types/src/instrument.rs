//! Instruments and their persistence schemas.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Instrument whose engineering mnemonics are monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    /// Near Infrared Camera.
    Nircam,
    /// Near Infrared Imager and Slitless Spectrograph.
    Niriss,
    /// Mid-Infrared Instrument.
    Miri,
    /// Fine Guidance Sensor.
    Fgs,
    /// Near Infrared Spectrograph.
    Nirspec,
}

impl Instrument {
    /// Every supported instrument.
    pub const ALL: [Self; 5] = [
        Self::Nircam,
        Self::Niriss,
        Self::Miri,
        Self::Fgs,
        Self::Nirspec,
    ];

    /// Lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nircam => "nircam",
            Self::Niriss => "niriss",
            Self::Miri => "miri",
            Self::Fgs => "fgs",
            Self::Nirspec => "nirspec",
        }
    }

    /// Persistence schema for this instrument's trend entries.
    #[must_use]
    pub const fn schema(self) -> SchemaHandle {
        match self {
            Self::Nircam => SchemaHandle::NIRCAM,
            Self::Niriss => SchemaHandle::NIRISS,
            Self::Miri => SchemaHandle::MIRI,
            Self::Fgs => SchemaHandle::FGS,
            Self::Nirspec => SchemaHandle::NIRSPEC,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == lower)
            .ok_or_else(|| MonitorError::InvalidArg(format!("unknown instrument: {s:?}")))
    }
}

/// Compile-time handle naming the table that stores an instrument's trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SchemaHandle {
    table: &'static str,
}

impl SchemaHandle {
    /// NIRCam EDB mnemonic trends.
    pub const NIRCAM: Self = Self::new("nircam_edb_mnemonics");
    /// NIRISS EDB mnemonic trends.
    pub const NIRISS: Self = Self::new("niriss_edb_mnemonics");
    /// MIRI EDB mnemonic trends.
    pub const MIRI: Self = Self::new("miri_edb_mnemonics");
    /// FGS EDB mnemonic trends.
    pub const FGS: Self = Self::new("fgs_edb_mnemonics");
    /// NIRSpec EDB mnemonic trends.
    pub const NIRSPEC: Self = Self::new("nirspec_edb_mnemonics");

    const fn new(table: &'static str) -> Self {
        Self { table }
    }

    /// Table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        self.table
    }
}

impl fmt::Display for SchemaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table)
    }
}
