//! Structured export queries and endpoint routing.
//!
//! An [`ExportQuery`] describes which repeaters to request from the upstream
//! directory. Every field is a set; an empty set leaves that dimension
//! unconstrained. [`route`] decides which upstream endpoint(s) the query must
//! be sent to and [`endpoint_params`] produces the canonical query-string
//! parameters for one endpoint.

mod route;

pub use route::{Endpoint, EndpointSet, endpoint_params, route};

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A country as named by the upstream directory.
///
/// Names typed in a single case (`germany`, `GERMANY`) are title-cased so the
/// same country always yields the same request parameters. Mixed-case names
/// are kept as given.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Country(String);

const NORTH_AMERICA: [&str; 3] = ["United States", "Canada", "Mexico"];

/// Words left lower-case inside a title-cased name.
const MINOR_WORDS: [&str; 5] = ["and", "of", "the", "da", "du"];

impl Country {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim();
        let single_case = name == name.to_lowercase() || name == name.to_uppercase();
        if single_case { Self(title_case(name)) } else { Self(name.to_string()) }
    }

    pub fn united_states() -> Self {
        Self::new("United States")
    }

    pub fn canada() -> Self {
        Self::new("Canada")
    }

    pub fn mexico() -> Self {
        Self::new("Mexico")
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether the country is served by the North America endpoint.
    pub fn is_north_america(&self) -> bool {
        NORTH_AMERICA.iter().any(|na| na.eq_ignore_ascii_case(&self.0))
    }
}

impl From<String> for Country {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut word = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() || c == '\'' {
            word.push(c);
        } else {
            push_word(&mut out, &word);
            word.clear();
            out.push(c);
        }
    }
    push_word(&mut out, &word);
    out
}

fn push_word(out: &mut String, word: &str) {
    if word.is_empty() {
        return;
    }
    let lower = word.to_lowercase();
    if !out.is_empty() && MINOR_WORDS.contains(&lower.as_str()) {
        out.push_str(&lower);
        return;
    }
    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Country {
    type Err = Error;

    /// Parse a country name, accepting the usual codes for the North American countries.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidQuery("country cannot be empty".into()));
        }
        let country = match trimmed.to_ascii_uppercase().as_str() {
            "US" | "USA" | "UNITED STATES OF AMERICA" => Self::united_states(),
            "CA" | "CAN" => Self::canada(),
            "MX" | "MEX" => Self::mexico(),
            _ => match NORTH_AMERICA.iter().find(|na| na.eq_ignore_ascii_case(trimmed)) {
                Some(na) => Self::new(*na),
                None => Self::new(trimmed),
            },
        };
        Ok(country)
    }
}

/// Operating mode filter understood by both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Analog,
    Dmr,
    Nxdn,
    P25,
    Tetra,
}

impl Mode {
    /// Value sent in the `mode` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            Mode::Analog => "analog",
            Mode::Dmr => "DMR",
            Mode::Nxdn => "NXDN",
            Mode::P25 => "P-25",
            Mode::Tetra => "tetra",
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analog" | "fm" => Ok(Mode::Analog),
            "dmr" => Ok(Mode::Dmr),
            "nxdn" => Ok(Mode::Nxdn),
            "p25" | "p-25" => Ok(Mode::P25),
            "tetra" => Ok(Mode::Tetra),
            other => Err(Error::InvalidQuery(format!("unknown mode: {other}"))),
        }
    }
}

/// Emergency-service affiliation filter (North America only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Emergency {
    Ares,
    Races,
    Skywarn,
    Canwarn,
}

impl Emergency {
    pub fn as_param(self) -> &'static str {
        match self {
            Emergency::Ares => "ARES",
            Emergency::Races => "RACES",
            Emergency::Skywarn => "SKYWARN",
            Emergency::Canwarn => "CANWARN",
        }
    }
}

/// Service type filter (North America only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceType {
    Gmrs,
}

impl ServiceType {
    pub fn as_param(self) -> &'static str {
        match self {
            ServiceType::Gmrs => "GMRS",
        }
    }
}

/// A structured export query.
///
/// `state_ids`, `counties`, `emcomm` and `stype` only exist in the North
/// America schema; `regions` only exists in the rest-of-world schema. The
/// remaining fields are common to both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub callsigns: BTreeSet<String>,
    #[serde(default)]
    pub cities: BTreeSet<String>,
    #[serde(default)]
    pub landmarks: BTreeSet<String>,
    #[serde(default)]
    pub countries: BTreeSet<Country>,
    /// Output frequencies in MHz.
    #[serde(default)]
    pub frequencies: Vec<f64>,
    #[serde(default)]
    pub modes: BTreeSet<Mode>,

    #[serde(default)]
    pub state_ids: BTreeSet<String>,
    #[serde(default)]
    pub counties: BTreeSet<String>,
    #[serde(default)]
    pub emcomm: BTreeSet<Emergency>,
    #[serde(default)]
    pub stype: BTreeSet<ServiceType>,

    #[serde(default)]
    pub regions: BTreeSet<String>,
}

impl ExportQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_country(mut self, country: Country) -> Self {
        self.countries.insert(country);
        self
    }

    pub fn with_state_id(mut self, state_id: impl Into<String>) -> Self {
        self.state_ids.insert(state_id.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.regions.insert(region.into());
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.modes.insert(mode);
        self
    }

    /// Whether any North-America-only field is set.
    pub fn has_north_america_fields(&self) -> bool {
        !self.state_ids.is_empty() || !self.counties.is_empty() || !self.emcomm.is_empty() || !self.stype.is_empty()
    }

    /// Whether any rest-of-world-only field is set.
    pub fn has_rest_of_world_fields(&self) -> bool {
        !self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_aliases() {
        assert_eq!("US".parse::<Country>().unwrap(), Country::united_states());
        assert_eq!("usa".parse::<Country>().unwrap(), Country::united_states());
        assert_eq!("canada".parse::<Country>().unwrap(), Country::canada());
        assert_eq!("MX".parse::<Country>().unwrap(), Country::mexico());
        assert_eq!("Germany".parse::<Country>().unwrap(), Country::new("Germany"));
        assert!("  ".parse::<Country>().is_err());
    }

    #[test]
    fn test_country_north_america() {
        assert!(Country::united_states().is_north_america());
        assert!(Country::new("canada").is_north_america());
        assert!(!Country::new("Brazil").is_north_america());
    }

    #[test]
    fn test_country_case_is_canonical() {
        assert_eq!("germany".parse::<Country>().unwrap(), Country::new("Germany"));
        assert_eq!(Country::new("GERMANY").name(), "Germany");
        assert_eq!(Country::new("trinidad and tobago").name(), "Trinidad and Tobago");
        assert_eq!(Country::new("ISLE OF MAN").name(), "Isle of Man");
        assert_eq!(Country::new("guinea-bissau").name(), "Guinea-Bissau");
        assert_eq!(Country::new("Bosnia and Herzegovina").name(), "Bosnia and Herzegovina");

        let parsed: Country = serde_json::from_str("\"united kingdom\"").unwrap();
        assert_eq!(parsed.name(), "United Kingdom");
    }

    #[test]
    fn test_mode_params() {
        assert_eq!(Mode::Dmr.as_param(), "DMR");
        assert_eq!(Mode::P25.as_param(), "P-25");
        assert_eq!("p25".parse::<Mode>().unwrap(), Mode::P25);
        assert!("dstar9".parse::<Mode>().is_err());
    }

    #[test]
    fn test_default_query_is_unconstrained() {
        let query = ExportQuery::default();
        assert!(query.countries.is_empty());
        assert!(!query.has_north_america_fields());
        assert!(!query.has_rest_of_world_fields());
    }

    #[test]
    fn test_builder_sets_fields() {
        let query = ExportQuery::new().with_state_id("06").with_mode(Mode::Dmr).with_mode(Mode::Nxdn);
        assert!(query.has_north_america_fields());
        assert_eq!(query.modes.len(), 2);
    }
}
