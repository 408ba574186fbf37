//! Export response envelope and raw record shapes.
//!
//! Upstream field names contain spaces and punctuation, and the same field
//! arrives as a string in one record and a number in the next. Every field is
//! therefore an explicit `Option<RawValue>`; conversion happens in
//! [`crate::normalize`].

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;

use rptrbook_core::{Endpoint, Error, ValidationError};

/// Upstream caps a single export at this many results.
pub const MAX_COUNT: u64 = 3500;

/// A JSON scalar as it appears in a record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl RawValue {
    /// The value as text, trimmed.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawValue::Text(s) => Cow::Borrowed(s.trim()),
            RawValue::Number(n) => Cow::Owned(n.to_string()),
            RawValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// Fields shared by both export endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommonFields {
    #[serde(rename = "State ID")]
    pub state_id: Option<RawValue>,
    #[serde(rename = "Rptr ID")]
    pub rptr_id: Option<RawValue>,
    #[serde(rename = "Frequency")]
    pub frequency: Option<RawValue>,
    #[serde(rename = "Input Freq")]
    pub input_freq: Option<RawValue>,
    #[serde(rename = "PL")]
    pub pl: Option<RawValue>,
    #[serde(rename = "TSQ")]
    pub tsq: Option<RawValue>,
    #[serde(rename = "Nearest City")]
    pub nearest_city: Option<RawValue>,
    #[serde(rename = "Landmark")]
    pub landmark: Option<RawValue>,
    #[serde(rename = "Region")]
    pub region: Option<RawValue>,
    #[serde(rename = "State")]
    pub state: Option<RawValue>,
    #[serde(rename = "Country")]
    pub country: Option<RawValue>,
    #[serde(rename = "Lat")]
    pub lat: Option<RawValue>,
    #[serde(rename = "Long")]
    pub long: Option<RawValue>,
    #[serde(rename = "Precise")]
    pub precise: Option<RawValue>,
    #[serde(rename = "Callsign")]
    pub callsign: Option<RawValue>,
    #[serde(rename = "Use")]
    pub use_membership: Option<RawValue>,
    #[serde(rename = "Operational Status")]
    pub operational_status: Option<RawValue>,
    #[serde(rename = "AllStar Node")]
    pub allstar_node: Option<RawValue>,
    #[serde(rename = "EchoLink Node")]
    pub echolink_node: Option<RawValue>,
    #[serde(rename = "IRLP Node")]
    pub irlp_node: Option<RawValue>,
    #[serde(rename = "Wires Node")]
    pub wires_node: Option<RawValue>,
    #[serde(rename = "FM Analog")]
    pub fm_analog: Option<RawValue>,
    #[serde(rename = "FM Bandwidth")]
    pub fm_bandwidth: Option<RawValue>,
    #[serde(rename = "DMR")]
    pub dmr: Option<RawValue>,
    #[serde(rename = "DMR Color Code")]
    pub dmr_color_code: Option<RawValue>,
    #[serde(rename = "DMR ID")]
    pub dmr_id: Option<RawValue>,
    #[serde(rename = "D-Star")]
    pub d_star: Option<RawValue>,
    #[serde(rename = "NXDN")]
    pub nxdn: Option<RawValue>,
    #[serde(rename = "APCO P-25")]
    pub apco_p_25: Option<RawValue>,
    #[serde(rename = "P-25 NAC")]
    pub p_25_nac: Option<RawValue>,
    #[serde(rename = "M17")]
    pub m17: Option<RawValue>,
    #[serde(rename = "M17 CAN")]
    pub m17_can: Option<RawValue>,
    #[serde(rename = "Tetra")]
    pub tetra: Option<RawValue>,
    #[serde(rename = "Tetra MCC")]
    pub tetra_mcc: Option<RawValue>,
    #[serde(rename = "Tetra MNC")]
    pub tetra_mnc: Option<RawValue>,
    #[serde(rename = "System Fusion")]
    pub system_fusion: Option<RawValue>,
    #[serde(rename = "YSF DG ID Uplink")]
    pub ysf_dg_id_uplink: Option<RawValue>,
    #[serde(rename = "YSF DG ID Downlink")]
    pub ysf_dg_id_downlink: Option<RawValue>,
    #[serde(rename = "YSF DSC")]
    pub ysf_dsc: Option<RawValue>,
    #[serde(rename = "Notes")]
    pub notes: Option<RawValue>,
    #[serde(rename = "Last Update")]
    pub last_update: Option<RawValue>,
}

/// A record from the North America export.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NorthAmericaRecord {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(rename = "County")]
    pub county: Option<RawValue>,
    #[serde(rename = "ARES")]
    pub ares: Option<RawValue>,
    #[serde(rename = "RACES")]
    pub races: Option<RawValue>,
    #[serde(rename = "SKYWARN")]
    pub skywarn: Option<RawValue>,
    #[serde(rename = "CANWARN")]
    pub canwarn: Option<RawValue>,
}

/// A record from the rest-of-world export.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorldRecord {
    #[serde(flatten)]
    pub common: CommonFields,
}

/// A raw record tagged with the shape of the endpoint it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    NorthAmerica(NorthAmericaRecord),
    World(WorldRecord),
}

impl RawRecord {
    /// Decode one element of `results` returned by `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the element is not an object of scalars.
    pub fn from_value(endpoint: Endpoint, value: Value) -> Result<Self, ValidationError> {
        let record_id = value.get("Rptr ID").and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        let fail = |e: serde_json::Error| ValidationError::new(record_id, "record", e.to_string());

        match endpoint {
            Endpoint::NorthAmerica => serde_json::from_value(value).map(RawRecord::NorthAmerica).map_err(fail),
            Endpoint::RestOfWorld => serde_json::from_value(value).map(RawRecord::World).map_err(fail),
        }
    }

    pub fn common(&self) -> &CommonFields {
        match self {
            RawRecord::NorthAmerica(r) => &r.common,
            RawRecord::World(r) => &r.common,
        }
    }
}

/// A validated export envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPage {
    /// Record count reported by upstream.
    pub count: u64,
    /// Undecoded result elements.
    pub results: Vec<Value>,
}

impl ExportPage {
    /// Whether the reported count hit the upstream cap, meaning results are truncated.
    pub fn is_truncated(&self) -> bool {
        self.count >= MAX_COUNT
    }

    /// Whether the reported count disagrees with the results received.
    pub fn count_mismatch(&self) -> bool {
        self.count != self.results.len() as u64
    }
}

/// Parse and validate a response body from `endpoint`.
///
/// # Errors
///
/// Returns `Error::Api` when the body is not JSON, carries an error envelope,
/// or lacks `count`/`results`.
pub fn parse_envelope(endpoint: Endpoint, body: &[u8]) -> Result<ExportPage, Error> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| Error::api(endpoint, format!("malformed response: {e}")))?;
    let Value::Object(mut object) = value else {
        return Err(Error::api(endpoint, "malformed response: expected a JSON object"));
    };

    if object.get("status").and_then(Value::as_str) == Some("error") {
        let message = object.get("message").and_then(Value::as_str).unwrap_or("unknown error");
        return Err(Error::api(endpoint, message));
    }

    let count = match object.get("count") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::api(endpoint, "malformed response: missing or invalid `count`"))?;

    let results = match object.remove("results") {
        Some(Value::Array(results)) => results,
        Some(Value::Null) | None if count == 0 => Vec::new(),
        _ => return Err(Error::api(endpoint, "malformed response: missing or invalid `results`")),
    };

    Ok(ExportPage { count, results })
}
