//! Composable filter expressions over the `repeaters` table.
//!
//! A [`Predicate`] is a tagged expression tree that renders to a SQL `WHERE`
//! fragment with positional `?` placeholders. Values are always bound, never
//! interpolated, and columns come from the closed [`Column`] enum.

use tokio_rusqlite::rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use tokio_rusqlite::rusqlite;

use crate::model::{Band, Repeater, Status, Use};

/// A column of the `repeaters` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    StateId,
    Callsign,
    Frequency,
    InputFrequency,
    PlCtcssUplink,
    PlCtcssTsqDownlink,
    LocationNearestCity,
    Landmark,
    Region,
    Country,
    County,
    State,
    Latitude,
    Longitude,
    Precise,
    UseMembership,
    OperationalStatus,
    Ares,
    Races,
    Skywarn,
    Canwarn,
    AllstarNode,
    EcholinkNode,
    IrlpNode,
    WiresNode,
    AnalogCapable,
    FmBandwidth,
    DmrCapable,
    DmrColorCode,
    DmrId,
    DStarCapable,
    NxdnCapable,
    ApcoP25Capable,
    P25Nac,
    M17Capable,
    M17Can,
    TetraCapable,
    TetraMcc,
    TetraMnc,
    YaesuSystemFusionCapable,
    YsfDigitalIdUplink,
    YsfDigitalIdDownlink,
    YsfDsc,
    Notes,
    LastUpdate,
}

impl Column {
    /// Every column, in table order.
    pub const ALL: [Column; 46] = [
        Column::Id,
        Column::StateId,
        Column::Callsign,
        Column::Frequency,
        Column::InputFrequency,
        Column::PlCtcssUplink,
        Column::PlCtcssTsqDownlink,
        Column::LocationNearestCity,
        Column::Landmark,
        Column::Region,
        Column::Country,
        Column::County,
        Column::State,
        Column::Latitude,
        Column::Longitude,
        Column::Precise,
        Column::UseMembership,
        Column::OperationalStatus,
        Column::Ares,
        Column::Races,
        Column::Skywarn,
        Column::Canwarn,
        Column::AllstarNode,
        Column::EcholinkNode,
        Column::IrlpNode,
        Column::WiresNode,
        Column::AnalogCapable,
        Column::FmBandwidth,
        Column::DmrCapable,
        Column::DmrColorCode,
        Column::DmrId,
        Column::DStarCapable,
        Column::NxdnCapable,
        Column::ApcoP25Capable,
        Column::P25Nac,
        Column::M17Capable,
        Column::M17Can,
        Column::TetraCapable,
        Column::TetraMcc,
        Column::TetraMnc,
        Column::YaesuSystemFusionCapable,
        Column::YsfDigitalIdUplink,
        Column::YsfDigitalIdDownlink,
        Column::YsfDsc,
        Column::Notes,
        Column::LastUpdate,
    ];

    /// SQL column name.
    pub fn name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::StateId => "state_id",
            Column::Callsign => "callsign",
            Column::Frequency => "frequency",
            Column::InputFrequency => "input_frequency",
            Column::PlCtcssUplink => "pl_ctcss_uplink",
            Column::PlCtcssTsqDownlink => "pl_ctcss_tsq_downlink",
            Column::LocationNearestCity => "location_nearest_city",
            Column::Landmark => "landmark",
            Column::Region => "region",
            Column::Country => "country",
            Column::County => "county",
            Column::State => "state",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
            Column::Precise => "precise",
            Column::UseMembership => "use_membership",
            Column::OperationalStatus => "operational_status",
            Column::Ares => "ares",
            Column::Races => "races",
            Column::Skywarn => "skywarn",
            Column::Canwarn => "canwarn",
            Column::AllstarNode => "allstar_node",
            Column::EcholinkNode => "echolink_node",
            Column::IrlpNode => "irlp_node",
            Column::WiresNode => "wires_node",
            Column::AnalogCapable => "analog_capable",
            Column::FmBandwidth => "fm_bandwidth",
            Column::DmrCapable => "dmr_capable",
            Column::DmrColorCode => "dmr_color_code",
            Column::DmrId => "dmr_id",
            Column::DStarCapable => "d_star_capable",
            Column::NxdnCapable => "nxdn_capable",
            Column::ApcoP25Capable => "apco_p_25_capable",
            Column::P25Nac => "p_25_nac",
            Column::M17Capable => "m17_capable",
            Column::M17Can => "m17_can",
            Column::TetraCapable => "tetra_capable",
            Column::TetraMcc => "tetra_mcc",
            Column::TetraMnc => "tetra_mnc",
            Column::YaesuSystemFusionCapable => "yaesu_system_fusion_capable",
            Column::YsfDigitalIdUplink => "ysf_digital_id_uplink",
            Column::YsfDigitalIdDownlink => "ysf_digital_id_downlink",
            Column::YsfDsc => "ysf_dsc",
            Column::Notes => "notes",
            Column::LastUpdate => "last_update",
        }
    }

    /// The value of this column for `r`, as it is stored.
    pub fn value_of(self, r: &Repeater) -> Value {
        match self {
            Column::Id => Value::Integer(r.id),
            Column::StateId => r.state_id.clone().into(),
            Column::Callsign => r.callsign.clone().into(),
            Column::Frequency => Value::Real(r.frequency),
            Column::InputFrequency => Value::Real(r.input_frequency),
            Column::PlCtcssUplink => r.pl_ctcss_uplink.clone().into(),
            Column::PlCtcssTsqDownlink => r.pl_ctcss_tsq_downlink.clone().into(),
            Column::LocationNearestCity => r.location_nearest_city.clone().into(),
            Column::Landmark => r.landmark.clone().into(),
            Column::Region => r.region.clone().into(),
            Column::Country => r.country.clone().into(),
            Column::County => r.county.clone().into(),
            Column::State => r.state.clone().into(),
            Column::Latitude => Value::Real(r.latitude),
            Column::Longitude => Value::Real(r.longitude),
            Column::Precise => Value::Bool(r.precise),
            Column::UseMembership => r.use_membership.into(),
            Column::OperationalStatus => r.operational_status.into(),
            Column::Ares => Value::Bool(r.ares),
            Column::Races => Value::Bool(r.races),
            Column::Skywarn => Value::Bool(r.skywarn),
            Column::Canwarn => Value::Bool(r.canwarn),
            Column::AllstarNode => r.allstar_node.clone().into(),
            Column::EcholinkNode => r.echolink_node.clone().into(),
            Column::IrlpNode => r.irlp_node.clone().into(),
            Column::WiresNode => r.wires_node.clone().into(),
            Column::AnalogCapable => Value::Bool(r.analog_capable),
            Column::FmBandwidth => r.fm_bandwidth.map_or(Value::Null, Value::Real),
            Column::DmrCapable => Value::Bool(r.dmr_capable),
            Column::DmrColorCode => r.dmr_color_code.clone().into(),
            Column::DmrId => r.dmr_id.clone().into(),
            Column::DStarCapable => Value::Bool(r.d_star_capable),
            Column::NxdnCapable => Value::Bool(r.nxdn_capable),
            Column::ApcoP25Capable => Value::Bool(r.apco_p_25_capable),
            Column::P25Nac => r.p_25_nac.clone().into(),
            Column::M17Capable => Value::Bool(r.m17_capable),
            Column::M17Can => r.m17_can.clone().into(),
            Column::TetraCapable => Value::Bool(r.tetra_capable),
            Column::TetraMcc => r.tetra_mcc.clone().into(),
            Column::TetraMnc => r.tetra_mnc.clone().into(),
            Column::YaesuSystemFusionCapable => Value::Bool(r.yaesu_system_fusion_capable),
            Column::YsfDigitalIdUplink => r.ysf_digital_id_uplink.clone().into(),
            Column::YsfDigitalIdDownlink => r.ysf_digital_id_downlink.clone().into(),
            Column::YsfDsc => r.ysf_dsc.clone().into(),
            Column::Notes => r.notes.clone().into(),
            Column::LastUpdate => r.last_update.map(|d| d.format("%Y-%m-%d").to_string()).into(),
        }
    }
}

/// A bound SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map_or(Value::Null, Value::Text)
    }
}

impl From<Status> for Value {
    fn from(v: Status) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

impl From<Use> for Value {
    fn from(v: Use) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Owned(SqlValue::Text(s.clone())),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
        })
    }
}

/// A filter over repeater columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Column equals value; `Value::Null` matches unset columns.
    Eq(Column, Value),
    /// Column differs from value (null-safe).
    Ne(Column, Value),
    /// Inclusive range; an absent bound is open.
    Range { column: Column, min: Option<Value>, max: Option<Value> },
    /// Column is one of the values. An empty list matches nothing.
    In(Column, Vec<Value>),
    /// Column is unset.
    IsNull(Column),
    /// Case-insensitive substring match on a text column.
    Contains(Column, String),
    /// Every predicate holds. Empty matches everything.
    And(Vec<Predicate>),
    /// At least one predicate holds. Empty matches nothing.
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Predicate::Eq(column, value.into())
    }

    pub fn ne(column: Column, value: impl Into<Value>) -> Self {
        Predicate::Ne(column, value.into())
    }

    pub fn between(column: Column, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Predicate::Range { column, min: Some(min.into()), max: Some(max.into()) }
    }

    pub fn at_least(column: Column, min: impl Into<Value>) -> Self {
        Predicate::Range { column, min: Some(min.into()), max: None }
    }

    pub fn at_most(column: Column, max: impl Into<Value>) -> Self {
        Predicate::Range { column, min: None, max: Some(max.into()) }
    }

    pub fn one_of<V: Into<Value>>(column: Column, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In(column, values.into_iter().map(Into::into).collect())
    }

    pub fn contains(column: Column, needle: impl Into<String>) -> Self {
        Predicate::Contains(column, needle.into())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut parts) => {
                parts.push(other);
                Predicate::And(parts)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut parts) => {
                parts.push(other);
                Predicate::Or(parts)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Output frequency within `band`.
    pub fn band(band: Band) -> Self {
        Predicate::between(Column::Frequency, band.low(), band.high())
    }

    /// Output frequency within any of `bands`.
    pub fn bands(bands: &[Band]) -> Self {
        Predicate::Or(bands.iter().copied().map(Predicate::band).collect())
    }

    /// Render as a SQL boolean expression, appending bound values to `params`.
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Eq(column, Value::Null) | Predicate::IsNull(column) => format!("{} IS NULL", column.name()),
            Predicate::Eq(column, value) => {
                params.push(value.clone());
                format!("{} = ?", column.name())
            }
            Predicate::Ne(column, value) => {
                params.push(value.clone());
                format!("{} IS NOT ?", column.name())
            }
            Predicate::Range { column, min, max } => {
                let mut parts = Vec::with_capacity(2);
                if let Some(min) = min {
                    params.push(min.clone());
                    parts.push(format!("{} >= ?", column.name()));
                }
                if let Some(max) = max {
                    params.push(max.clone());
                    parts.push(format!("{} <= ?", column.name()));
                }
                if parts.is_empty() { format!("{} IS NOT NULL", column.name()) } else { parts.join(" AND ") }
            }
            Predicate::In(_, values) if values.is_empty() => "0".to_string(),
            Predicate::In(column, values) => {
                params.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({placeholders})", column.name())
            }
            Predicate::Contains(column, needle) => {
                let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
                params.push(Value::Text(format!("%{escaped}%")));
                format!("{} LIKE ? ESCAPE '\\'", column.name())
            }
            Predicate::And(parts) if parts.is_empty() => "1".to_string(),
            Predicate::And(parts) => {
                let sql: Vec<String> = parts.iter().map(|p| p.to_sql(params)).collect();
                format!("({})", sql.join(" AND "))
            }
            Predicate::Or(parts) if parts.is_empty() => "0".to_string(),
            Predicate::Or(parts) => {
                let sql: Vec<String> = parts.iter().map(|p| p.to_sql(params)).collect();
                format!("({})", sql.join(" OR "))
            }
            Predicate::Not(inner) => format!("NOT ({})", inner.to_sql(params)),
        }
    }
}

/// Render a list of predicates joined with AND.
pub fn where_clause(predicates: &[Predicate]) -> (String, Vec<Value>) {
    let mut params = Vec::new();
    if predicates.is_empty() {
        return ("1".to_string(), params);
    }
    let sql: Vec<String> = predicates.iter().map(|p| p.to_sql(&mut params)).collect();
    (sql.join(" AND "), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_unique() {
        let mut names: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Column::ALL.len());
    }

    #[test]
    fn test_eq_binds_value() {
        let mut params = Vec::new();
        let sql = Predicate::eq(Column::StateId, "CA").to_sql(&mut params);
        assert_eq!(sql, "state_id = ?");
        assert_eq!(params, vec![Value::Text("CA".into())]);
    }

    #[test]
    fn test_ne_is_null_aware() {
        let mut params = Vec::new();
        let sql = Predicate::ne(Column::Country, "Canada").to_sql(&mut params);
        assert_eq!(sql, "country IS NOT ?");
        assert_eq!(params, vec![Value::Text("Canada".into())]);
    }

    #[test]
    fn test_eq_null_is_null() {
        let mut params = Vec::new();
        let sql = Predicate::Eq(Column::Callsign, Value::Null).to_sql(&mut params);
        assert_eq!(sql, "callsign IS NULL");
        assert_eq!(Predicate::IsNull(Column::Callsign).to_sql(&mut params), sql);
        assert!(params.is_empty());
    }

    #[test]
    fn test_range_and_in() {
        let mut params = Vec::new();
        let sql = Predicate::between(Column::Latitude, -1.0, 1.0)
            .and(Predicate::one_of(Column::Country, ["Brazil", "Chile"]))
            .to_sql(&mut params);
        assert_eq!(sql, "(latitude >= ? AND latitude <= ? AND country IN (?, ?))");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_empty_combinators() {
        let mut params = Vec::new();
        assert_eq!(Predicate::And(vec![]).to_sql(&mut params), "1");
        assert_eq!(Predicate::Or(vec![]).to_sql(&mut params), "0");
        assert_eq!(Predicate::In(Column::Id, vec![]).to_sql(&mut params), "0");
    }

    #[test]
    fn test_or_and_not() {
        let mut params = Vec::new();
        let sql = Predicate::eq(Column::DmrCapable, true)
            .or(Predicate::eq(Column::NxdnCapable, true))
            .not()
            .to_sql(&mut params);
        assert_eq!(sql, "NOT ((dmr_capable = ? OR nxdn_capable = ?))");
        assert_eq!(params, vec![Value::Bool(true), Value::Bool(true)]);
    }

    #[test]
    fn test_contains_escapes_wildcards() {
        let mut params = Vec::new();
        let sql = Predicate::contains(Column::Notes, "50%_off").to_sql(&mut params);
        assert_eq!(sql, "notes LIKE ? ESCAPE '\\'");
        assert_eq!(params, vec![Value::Text("%50\\%\\_off%".into())]);
    }

    #[test]
    fn test_band_predicate() {
        let mut params = Vec::new();
        let sql = Predicate::bands(&[Band::M2, Band::Cm70]).to_sql(&mut params);
        assert_eq!(sql, "(frequency >= ? AND frequency <= ? OR frequency >= ? AND frequency <= ?)");
        assert_eq!(params, vec![Value::Real(144.0), Value::Real(148.0), Value::Real(420.0), Value::Real(450.0)]);
    }

    #[test]
    fn test_where_clause_joins_with_and() {
        let (sql, params) = where_clause(&[]);
        assert_eq!(sql, "1");
        assert!(params.is_empty());

        let (sql, params) =
            where_clause(&[Predicate::eq(Column::StateId, "CA"), Predicate::at_least(Column::Frequency, 144.0)]);
        assert_eq!(sql, "state_id = ? AND frequency >= ?");
        assert_eq!(params.len(), 2);
    }
}
