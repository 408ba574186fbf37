//! The repeater record and its enumerations.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::LatLon;

/// Operational status of a repeater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    OnAir,
    OffAir,
    #[default]
    Unknown,
}

impl Status {
    /// Column value stored in the local database.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::OnAir => "on_air",
            Status::OffAir => "off_air",
            Status::Unknown => "unknown",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_air" => Ok(Status::OnAir),
            "off_air" => Ok(Status::OffAir),
            "unknown" => Ok(Status::Unknown),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership / use class of a repeater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Use {
    #[default]
    Open,
    Private,
    Closed,
}

impl Use {
    pub fn as_str(self) -> &'static str {
        match self {
            Use::Open => "open",
            Use::Private => "private",
            Use::Closed => "closed",
        }
    }
}

impl FromStr for Use {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Use::Open),
            "private" => Ok(Use::Private),
            "closed" => Ok(Use::Closed),
            other => Err(format!("unknown use: {other}")),
        }
    }
}

impl fmt::Display for Use {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repeater as stored locally.
///
/// `id` is the upstream repeater id and identifies the record across
/// refetches. Mode-specific fields (`dmr_*`, `p_25_nac`, `m17_can`,
/// `tetra_*`, `ysf_*`) are only set when the matching capability flag is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repeater {
    pub id: i64,
    pub state_id: Option<String>,
    pub callsign: Option<String>,

    /// Output (downlink) frequency in MHz.
    pub frequency: f64,
    /// Input (uplink) frequency in MHz.
    pub input_frequency: f64,
    pub pl_ctcss_uplink: Option<String>,
    pub pl_ctcss_tsq_downlink: Option<String>,

    pub location_nearest_city: Option<String>,
    pub landmark: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub precise: bool,

    pub use_membership: Use,
    pub operational_status: Status,

    pub ares: bool,
    pub races: bool,
    pub skywarn: bool,
    pub canwarn: bool,

    pub allstar_node: Option<String>,
    pub echolink_node: Option<String>,
    pub irlp_node: Option<String>,
    pub wires_node: Option<String>,

    pub analog_capable: bool,
    /// FM channel bandwidth in kHz.
    pub fm_bandwidth: Option<f64>,
    pub dmr_capable: bool,
    pub dmr_color_code: Option<String>,
    pub dmr_id: Option<String>,
    pub d_star_capable: bool,
    pub nxdn_capable: bool,
    pub apco_p_25_capable: bool,
    pub p_25_nac: Option<String>,
    pub m17_capable: bool,
    pub m17_can: Option<String>,
    pub tetra_capable: bool,
    pub tetra_mcc: Option<String>,
    pub tetra_mnc: Option<String>,
    pub yaesu_system_fusion_capable: bool,
    pub ysf_digital_id_uplink: Option<String>,
    pub ysf_digital_id_downlink: Option<String>,
    pub ysf_dsc: Option<String>,

    pub notes: Option<String>,
    pub last_update: Option<NaiveDate>,
}

impl Repeater {
    /// A minimal record with every optional field unset.
    pub fn new(id: i64, frequency: f64, input_frequency: f64, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            state_id: None,
            callsign: None,
            frequency,
            input_frequency,
            pl_ctcss_uplink: None,
            pl_ctcss_tsq_downlink: None,
            location_nearest_city: None,
            landmark: None,
            region: None,
            country: None,
            county: None,
            state: None,
            latitude,
            longitude,
            precise: false,
            use_membership: Use::Open,
            operational_status: Status::Unknown,
            ares: false,
            races: false,
            skywarn: false,
            canwarn: false,
            allstar_node: None,
            echolink_node: None,
            irlp_node: None,
            wires_node: None,
            analog_capable: false,
            fm_bandwidth: None,
            dmr_capable: false,
            dmr_color_code: None,
            dmr_id: None,
            d_star_capable: false,
            nxdn_capable: false,
            apco_p_25_capable: false,
            p_25_nac: None,
            m17_capable: false,
            m17_can: None,
            tetra_capable: false,
            tetra_mcc: None,
            tetra_mnc: None,
            yaesu_system_fusion_capable: false,
            ysf_digital_id_uplink: None,
            ysf_digital_id_downlink: None,
            ysf_dsc: None,
            notes: None,
            last_update: None,
        }
    }

    /// Position of the repeater.
    pub fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    /// Check the range invariants of the record.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` naming the record id and the first field out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fail = |field: &str, reason: &str| Err(ValidationError::new(Some(self.id), field, reason));

        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return fail("frequency", "frequency must be positive");
        }
        if !self.input_frequency.is_finite() || self.input_frequency < 0.0 {
            return fail("input_frequency", "input frequency must not be negative");
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return fail("latitude", "latitude must be between -90 and 90");
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return fail("longitude", "longitude must be between -180 and 180");
        }
        if let Some(bw) = self.fm_bandwidth
            && (!bw.is_finite() || bw <= 0.0)
        {
            return fail("fm_bandwidth", "bandwidth must be positive");
        }
        Ok(())
    }

    /// Clear mode-specific fields whose capability flag is false.
    pub fn clear_unsupported_mode_fields(&mut self) {
        if !self.dmr_capable {
            self.dmr_color_code = None;
            self.dmr_id = None;
        }
        if !self.apco_p_25_capable {
            self.p_25_nac = None;
        }
        if !self.m17_capable {
            self.m17_can = None;
        }
        if !self.tetra_capable {
            self.tetra_mcc = None;
            self.tetra_mnc = None;
        }
        if !self.yaesu_system_fusion_capable {
            self.ysf_digital_id_uplink = None;
            self.ysf_digital_id_downlink = None;
            self.ysf_dsc = None;
        }
    }

    /// Offset between input and output frequency in MHz.
    pub fn offset(&self) -> f64 {
        self.input_frequency - self.frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Repeater {
        let mut r = Repeater::new(123, 146.94, 146.34, 34.0522, -118.2437);
        r.callsign = Some("W6ABC".into());
        r.analog_capable = true;
        r
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_latitude_out_of_range() {
        for lat in [91.0, -91.0] {
            let r = Repeater { latitude: lat, ..sample() };
            let err = r.validate().unwrap_err();
            assert_eq!(err.field, "latitude");
            assert_eq!(err.record_id, Some(123));
        }
    }

    #[test]
    fn test_longitude_out_of_range() {
        for lon in [181.0, -181.0] {
            let r = Repeater { longitude: lon, ..sample() };
            assert_eq!(r.validate().unwrap_err().field, "longitude");
        }
    }

    #[test]
    fn test_frequency_must_be_positive() {
        for freq in [0.0, -10.0, f64::NAN] {
            let r = Repeater { frequency: freq, ..sample() };
            let err = r.validate().unwrap_err();
            assert_eq!(err.field, "frequency");
            assert!(err.reason.contains("positive"));
        }
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let r = Repeater { latitude: 90.0, longitude: -180.0, ..sample() };
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_clear_unsupported_mode_fields() {
        let mut r = sample();
        r.dmr_color_code = Some("1".into());
        r.dmr_id = Some("310123".into());
        r.tetra_mcc = Some("262".into());
        r.tetra_capable = true;

        r.clear_unsupported_mode_fields();
        assert!(r.dmr_color_code.is_none());
        assert!(r.dmr_id.is_none());
        assert_eq!(r.tetra_mcc.as_deref(), Some("262"));
    }

    #[test]
    fn test_enum_round_trip_strings() {
        for status in [Status::OnAir, Status::OffAir, Status::Unknown] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        for use_ in [Use::Open, Use::Private, Use::Closed] {
            assert_eq!(use_.as_str().parse::<Use>().unwrap(), use_);
        }
    }

    #[test]
    fn test_offset() {
        assert!((sample().offset() + 0.6).abs() < 1e-9);
    }
}
