//! Amateur radio bands.

use serde::{Deserialize, Serialize};

/// A named amateur band with its edges in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    M10,
    M6,
    M4,
    M2,
    Cm70,
    Cm33,
    Cm23,
    Cm13,
    Cm3,
}

impl Band {
    pub const ALL: [Band; 9] =
        [Band::M10, Band::M6, Band::M4, Band::M2, Band::Cm70, Band::Cm33, Band::Cm23, Band::Cm13, Band::Cm3];

    /// Lower and upper edge in MHz.
    pub fn range(self) -> (f64, f64) {
        match self {
            Band::M10 => (28.0, 29.7),
            Band::M6 => (50.0, 54.0),
            Band::M4 => (70.0, 70.5),
            Band::M2 => (144.0, 148.0),
            Band::Cm70 => (420.0, 450.0),
            Band::Cm33 => (902.0, 928.0),
            Band::Cm23 => (1240.0, 1300.0),
            Band::Cm13 => (2300.0, 2450.0),
            Band::Cm3 => (10_000.0, 10_500.0),
        }
    }

    pub fn low(self) -> f64 {
        self.range().0
    }

    pub fn high(self) -> f64 {
        self.range().1
    }

    pub fn contains(self, frequency_mhz: f64) -> bool {
        let (low, high) = self.range();
        (low..=high).contains(&frequency_mhz)
    }

    /// The band a frequency falls in, if any.
    pub fn of(frequency_mhz: f64) -> Option<Band> {
        Self::ALL.into_iter().find(|b| b.contains(frequency_mhz))
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::M10 => "10m",
            Band::M6 => "6m",
            Band::M4 => "4m",
            Band::M2 => "2m",
            Band::Cm70 => "70cm",
            Band::Cm33 => "33cm",
            Band::Cm23 => "23cm",
            Band::Cm13 => "13cm",
            Band::Cm3 => "3cm",
        }
    }

    /// Parse a label such as `2m` or `70cm`.
    pub fn from_label(label: &str) -> Option<Band> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|b| b.label() == label)
    }
}
