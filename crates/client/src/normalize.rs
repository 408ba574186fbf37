//! Conversion from raw export records to validated [`Repeater`]s.

use chrono::NaiveDate;

use rptrbook_core::{Repeater, Status, Use, ValidationError};

use crate::api::response::{CommonFields, RawRecord, RawValue};

type Field<'a> = &'a Option<RawValue>;

/// Convert a raw record into a validated repeater.
///
/// # Errors
///
/// Returns a `ValidationError` naming the upstream field that failed to
/// convert, or the domain field that is out of range.
pub fn normalize(raw: &RawRecord) -> Result<Repeater, ValidationError> {
    let c = raw.common();
    let id = record_id(c)?;
    let id_ref = Some(id);

    let mut r = Repeater::new(
        id,
        required_number(id_ref, "Frequency", &c.frequency)?,
        required_number(id_ref, "Input Freq", &c.input_freq)?,
        required_number(id_ref, "Lat", &c.lat)?,
        required_number(id_ref, "Long", &c.long)?,
    );

    r.state_id = text(&c.state_id);
    r.callsign = text(&c.callsign);
    r.pl_ctcss_uplink = text(&c.pl);
    r.pl_ctcss_tsq_downlink = text(&c.tsq);
    r.location_nearest_city = text(&c.nearest_city);
    r.landmark = text(&c.landmark);
    r.region = text(&c.region);
    r.state = text(&c.state);
    r.country = text(&c.country);
    r.precise = flag(id_ref, "Precise", &c.precise)?;
    r.use_membership = use_membership(id_ref, &c.use_membership)?;
    r.operational_status = status(id_ref, &c.operational_status)?;

    r.allstar_node = text(&c.allstar_node);
    r.echolink_node = text(&c.echolink_node);
    r.irlp_node = text(&c.irlp_node);
    r.wires_node = text(&c.wires_node);

    r.analog_capable = flag(id_ref, "FM Analog", &c.fm_analog)?;
    r.fm_bandwidth = bandwidth(id_ref, &c.fm_bandwidth)?;
    r.dmr_capable = flag(id_ref, "DMR", &c.dmr)?;
    r.dmr_color_code = text(&c.dmr_color_code);
    r.dmr_id = text(&c.dmr_id);
    r.d_star_capable = flag(id_ref, "D-Star", &c.d_star)?;
    r.nxdn_capable = flag(id_ref, "NXDN", &c.nxdn)?;
    r.apco_p_25_capable = flag(id_ref, "APCO P-25", &c.apco_p_25)?;
    r.p_25_nac = text(&c.p_25_nac);
    r.m17_capable = flag(id_ref, "M17", &c.m17)?;
    r.m17_can = text(&c.m17_can);
    r.tetra_capable = flag(id_ref, "Tetra", &c.tetra)?;
    r.tetra_mcc = text(&c.tetra_mcc);
    r.tetra_mnc = text(&c.tetra_mnc);
    r.yaesu_system_fusion_capable = flag(id_ref, "System Fusion", &c.system_fusion)?;
    r.ysf_digital_id_uplink = text(&c.ysf_dg_id_uplink);
    r.ysf_digital_id_downlink = text(&c.ysf_dg_id_downlink);
    r.ysf_dsc = text(&c.ysf_dsc);

    r.notes = text(&c.notes);
    r.last_update = date(&c.last_update);

    if let RawRecord::NorthAmerica(na) = raw {
        r.county = text(&na.county);
        r.ares = flag(id_ref, "ARES", &na.ares)?;
        r.races = flag(id_ref, "RACES", &na.races)?;
        r.skywarn = flag(id_ref, "SKYWARN", &na.skywarn)?;
        r.canwarn = flag(id_ref, "CANWARN", &na.canwarn)?;
    }

    r.clear_unsupported_mode_fields();
    r.validate()?;
    Ok(r)
}

/// The upstream repeater id of a record.
pub fn record_id(c: &CommonFields) -> Result<i64, ValidationError> {
    let value = c.rptr_id.as_ref().ok_or_else(|| ValidationError::new(None, "Rptr ID", "missing"))?;
    let s = value.as_text();
    s.parse().map_err(|_| ValidationError::new(None, "Rptr ID", format!("not an integer: {s:?}")))
}

/// Parse an upstream yes/no value.
///
/// Accepts `Yes`/`No`, `1`/`0` and `true`/`false` in any case; empty is false.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" | "1" | "true" => Some(true),
        "no" | "0" | "false" | "" => Some(false),
        _ => None,
    }
}

fn text(v: Field<'_>) -> Option<String> {
    v.as_ref().map(RawValue::as_text).filter(|s| !s.is_empty()).map(|s| s.into_owned())
}

fn number(id: Option<i64>, field: &str, v: Field<'_>) -> Result<Option<f64>, ValidationError> {
    let Some(s) = text(v) else { return Ok(None) };
    s.parse::<f64>()
        .map(Some)
        .map_err(|_| ValidationError::new(id, field, format!("not a number: {s:?}")))
}

fn required_number(id: Option<i64>, field: &str, v: Field<'_>) -> Result<f64, ValidationError> {
    number(id, field, v)?.ok_or_else(|| ValidationError::new(id, field, "missing"))
}

fn flag(id: Option<i64>, field: &str, v: Field<'_>) -> Result<bool, ValidationError> {
    let Some(v) = v else { return Ok(false) };
    if let RawValue::Bool(b) = v {
        return Ok(*b);
    }
    let s = v.as_text();
    parse_bool(&s).ok_or_else(|| ValidationError::new(id, field, format!("not a yes/no value: {s:?}")))
}

fn use_membership(id: Option<i64>, v: Field<'_>) -> Result<Use, ValidationError> {
    let s = text(v).unwrap_or_default();
    match s.to_ascii_uppercase().as_str() {
        "" | "OPEN" => Ok(Use::Open),
        "PRIVATE" => Ok(Use::Private),
        "CLOSED" => Ok(Use::Closed),
        _ => Err(ValidationError::new(id, "Use", format!("unknown use: {s:?}"))),
    }
}

fn status(id: Option<i64>, v: Field<'_>) -> Result<Status, ValidationError> {
    let s = text(v).unwrap_or_default();
    match s.to_ascii_lowercase().as_str() {
        "" | "unknown" => Ok(Status::Unknown),
        "on-air" => Ok(Status::OnAir),
        "off-air" => Ok(Status::OffAir),
        _ => Err(ValidationError::new(id, "Operational Status", format!("unknown status: {s:?}"))),
    }
}

fn bandwidth(id: Option<i64>, v: Field<'_>) -> Result<Option<f64>, ValidationError> {
    let Some(s) = text(v) else { return Ok(None) };
    let trimmed = s.trim_end_matches("kHz").trim_end_matches("KHz").trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ValidationError::new(id, "FM Bandwidth", format!("not a bandwidth: {s:?}")))
}

fn date(v: Field<'_>) -> Option<NaiveDate> {
    text(v).and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rptrbook_core::Endpoint;
    use serde_json::json;

    fn na(value: serde_json::Value) -> RawRecord {
        RawRecord::from_value(Endpoint::NorthAmerica, value).unwrap()
    }

    fn world(value: serde_json::Value) -> RawRecord {
        RawRecord::from_value(Endpoint::RestOfWorld, value).unwrap()
    }

    fn sample() -> serde_json::Value {
        json!({
            "State ID": "06",
            "Rptr ID": 123,
            "Frequency": "146.94000",
            "Input Freq": "146.34000",
            "PL": "100.0",
            "TSQ": "",
            "Nearest City": "Los Angeles",
            "Landmark": "Mt. Wilson",
            "Region": null,
            "State": "California",
            "Country": "United States",
            "Lat": "34.2256",
            "Long": "-118.0664",
            "Precise": 1,
            "Callsign": "W6ABC",
            "Use": "OPEN",
            "Operational Status": "On-air",
            "AllStar Node": "",
            "EchoLink Node": 98765,
            "IRLP Node": "",
            "Wires Node": "",
            "FM Analog": "Yes",
            "FM Bandwidth": "12.5 kHz",
            "DMR": "No",
            "DMR Color Code": "1",
            "DMR ID": "",
            "D-Star": "No",
            "NXDN": "No",
            "APCO P-25": "No",
            "P-25 NAC": "",
            "M17": "No",
            "M17 CAN": "",
            "Tetra": "No",
            "Tetra MCC": "",
            "Tetra MNC": "",
            "System Fusion": "No",
            "Notes": "",
            "Last Update": "2024-03-15",
            "County": "Los Angeles",
            "ARES": "Yes",
            "RACES": "No",
            "SKYWARN": "",
            "CANWARN": "No"
        })
    }

    #[test]
    fn test_normalize_north_america() {
        let r = normalize(&na(sample())).unwrap();
        assert_eq!(r.id, 123);
        assert_eq!(r.state_id.as_deref(), Some("06"));
        assert_eq!(r.frequency, 146.94);
        assert_eq!(r.input_frequency, 146.34);
        assert_eq!(r.pl_ctcss_uplink.as_deref(), Some("100.0"));
        assert_eq!(r.pl_ctcss_tsq_downlink, None);
        assert_eq!(r.latitude, 34.2256);
        assert!(r.precise);
        assert_eq!(r.use_membership, Use::Open);
        assert_eq!(r.operational_status, Status::OnAir);
        assert_eq!(r.echolink_node.as_deref(), Some("98765"));
        assert!(r.analog_capable);
        assert_eq!(r.fm_bandwidth, Some(12.5));
        assert_eq!(r.county.as_deref(), Some("Los Angeles"));
        assert!(r.ares);
        assert!(!r.races);
        assert!(!r.skywarn);
        assert_eq!(r.last_update, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_mode_fields_cleared_without_capability() {
        let r = normalize(&na(sample())).unwrap();
        assert!(!r.dmr_capable);
        assert_eq!(r.dmr_color_code, None);
    }

    #[test]
    fn test_world_record_skips_north_america_fields() {
        let mut value = sample();
        value["Region"] = json!("Bayern");
        let r = normalize(&world(value)).unwrap();
        assert_eq!(r.region.as_deref(), Some("Bayern"));
        assert_eq!(r.county, None);
        assert!(!r.ares);
    }

    #[test]
    fn test_bool_table() {
        for (input, expected) in [
            ("Yes", Some(true)),
            ("yes", Some(true)),
            ("1", Some(true)),
            ("true", Some(true)),
            ("No", Some(false)),
            ("0", Some(false)),
            ("FALSE", Some(false)),
            ("", Some(false)),
            ("maybe", None),
        ] {
            assert_eq!(parse_bool(input), expected, "{input:?}");
        }
    }

    #[test]
    fn test_absent_flags_are_false() {
        let value = json!({"Rptr ID": 1, "Frequency": "145.5", "Input Freq": "145.5", "Lat": "0", "Long": "0"});
        let r = normalize(&world(value)).unwrap();
        assert!(!r.analog_capable);
        assert!(!r.precise);
        assert_eq!(r.use_membership, Use::Open);
        assert_eq!(r.operational_status, Status::Unknown);
        assert_eq!(r.input_frequency, 145.5);
    }

    #[test]
    fn test_missing_input_frequency_is_rejected() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("Input Freq");
        let err = normalize(&na(value)).unwrap_err();
        assert_eq!(err.record_id, Some(123));
        assert_eq!(err.field, "Input Freq");

        let mut value = sample();
        value["Input Freq"] = json!("");
        assert_eq!(normalize(&na(value)).unwrap_err().field, "Input Freq");
    }

    #[test]
    fn test_enum_mapping() {
        let mut value = sample();
        value["Use"] = json!("CLOSED");
        value["Operational Status"] = json!("Off-air");
        let r = normalize(&na(value)).unwrap();
        assert_eq!(r.use_membership, Use::Closed);
        assert_eq!(r.operational_status, Status::OffAir);

        let mut value = sample();
        value["Use"] = json!("");
        value["Operational Status"] = json!("");
        let r = normalize(&na(value)).unwrap();
        assert_eq!(r.use_membership, Use::Open);
        assert_eq!(r.operational_status, Status::Unknown);
    }

    #[test]
    fn test_unknown_enum_is_error() {
        let mut value = sample();
        value["Operational Status"] = json!("Testing");
        let err = normalize(&na(value)).unwrap_err();
        assert_eq!(err.field, "Operational Status");
        assert_eq!(err.record_id, Some(123));
    }

    #[test]
    fn test_bad_number_names_field() {
        let mut value = sample();
        value["Lat"] = json!("north-ish");
        let err = normalize(&na(value)).unwrap_err();
        assert_eq!(err.field, "Lat");
        assert_eq!(err.record_id, Some(123));
    }

    #[test]
    fn test_out_of_range_fails_validation() {
        let mut value = sample();
        value["Lat"] = json!("91.5");
        let err = normalize(&na(value)).unwrap_err();
        assert_eq!(err.field, "latitude");
    }

    #[test]
    fn test_missing_id() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("Rptr ID");
        let err = normalize(&na(value)).unwrap_err();
        assert_eq!(err.field, "Rptr ID");
        assert_eq!(err.record_id, None);
    }

    #[test]
    fn test_unparseable_date_is_unset() {
        let mut value = sample();
        value["Last Update"] = json!("0000-00-00");
        assert_eq!(normalize(&na(value)).unwrap().last_update, None);
    }

    #[test]
    fn test_bandwidth_without_suffix() {
        let mut value = sample();
        value["FM Bandwidth"] = json!("25");
        assert_eq!(normalize(&na(value)).unwrap().fm_bandwidth, Some(25.0));

        let mut value = sample();
        value["FM Bandwidth"] = json!(" kHz");
        assert_eq!(normalize(&na(value)).unwrap().fm_bandwidth, None);
    }
}
