//! Repeater persistence: merge, lookup and filtered queries.

use std::sync::LazyLock;

use chrono::NaiveDate;
use serde::Serialize;
use tokio_rusqlite::rusqlite::types::Type;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row, params, params_from_iter};

use super::connection::RepeaterDb;
use super::predicate::{Column, Predicate, where_clause};
use crate::Error;
use crate::geo::{Radius, bounding_box_predicate, filter_by_radius};
use crate::model::Repeater;

static COLUMNS: LazyLock<String> =
    LazyLock::new(|| Column::ALL.iter().map(|c| c.name()).collect::<Vec<_>>().join(", "));

/// Insert-or-update keyed by `id`. The update only fires when some column
/// differs, so the changed-row count tells updated from unchanged.
static UPSERT: LazyLock<String> = LazyLock::new(|| {
    let placeholders = (1..=Column::ALL.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
    let rest = Column::ALL.iter().filter(|c| **c != Column::Id).map(|c| c.name());
    let assignments = rest.clone().map(|n| format!("{n} = excluded.{n}")).collect::<Vec<_>>().join(", ");
    let changed = rest.map(|n| format!("repeaters.{n} IS NOT excluded.{n}")).collect::<Vec<_>>().join(" OR ");
    format!(
        "INSERT INTO repeaters ({}) VALUES ({placeholders})
         ON CONFLICT(id) DO UPDATE SET {assignments} WHERE {changed}",
        *COLUMNS
    )
});

/// Outcome of [`RepeaterDb::populate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PopulateStats {
    /// Records whose id was not stored before.
    pub inserted: u64,
    /// Records that replaced a stored row with different content.
    pub updated: u64,
    /// Records identical to the stored row.
    pub unchanged: u64,
}

impl PopulateStats {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.unchanged
    }
}

impl RepeaterDb {
    /// Merge `records` into the store in one transaction.
    ///
    /// Records are matched by id. Existing rows not present in `records` are
    /// kept. If any record is invalid nothing is written.
    ///
    /// # Errors
    ///
    /// `Error::Validation` for an out-of-range record, `Error::Database` if the
    /// transaction fails.
    pub async fn populate(&self, records: impl IntoIterator<Item = Repeater>) -> Result<PopulateStats, Error> {
        let records: Vec<Repeater> = records.into_iter().collect();
        for record in &records {
            record.validate()?;
        }

        let stats = self
            .conn
            .call(move |conn| -> Result<PopulateStats, Error> {
                let tx = conn.transaction()?;
                let mut stats = PopulateStats::default();
                {
                    let mut exists = tx.prepare_cached("SELECT EXISTS(SELECT 1 FROM repeaters WHERE id = ?1)")?;
                    let mut upsert = tx.prepare_cached(&UPSERT)?;

                    for record in &records {
                        let existed: bool = exists.query_row(params![record.id], |row| row.get(0))?;
                        let values = Column::ALL.iter().map(|c| c.value_of(record));
                        let changed = upsert.execute(params_from_iter(values))?;
                        match (existed, changed) {
                            (false, _) => stats.inserted += 1,
                            (true, 0) => stats.unchanged += 1,
                            (true, _) => stats.updated += 1,
                        }
                    }
                }
                tx.commit()?;
                Ok(stats)
            })
            .await?;

        tracing::info!(
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            "populated local store"
        );
        Ok(stats)
    }

    /// Records matching every predicate, ordered by id.
    pub async fn query(&self, predicates: &[Predicate]) -> Result<Vec<Repeater>, Error> {
        let (clause, params) = where_clause(predicates);
        let sql = format!("SELECT {} FROM repeaters WHERE {clause} ORDER BY id", *COLUMNS);

        self.conn
            .call(move |conn| -> Result<Vec<Repeater>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(params.iter()), from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }

    /// The record with `id`, if stored.
    pub async fn get(&self, id: i64) -> Result<Option<Repeater>, Error> {
        let sql = format!("SELECT {} FROM repeaters WHERE id = ?1", *COLUMNS);
        self.conn
            .call(move |conn| conn.query_row(&sql, params![id], from_row).optional())
            .await
            .map_err(Error::from)
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64, Error> {
        let count: i64 = self
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM repeaters", [], |row| row.get(0)))
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Records within `radius` that also match `extra`, nearest first.
    ///
    /// The bounding box narrows the rows in SQL; exact distances are computed
    /// on the survivors.
    pub async fn near(&self, radius: &Radius, extra: &[Predicate]) -> Result<Vec<Repeater>, Error> {
        radius.validate()?;
        let mut predicates = Vec::with_capacity(extra.len() + 1);
        predicates.push(bounding_box_predicate(radius));
        predicates.extend_from_slice(extra);

        let candidates = self.query(&predicates).await?;
        let candidate_count = candidates.len();
        let hits = filter_by_radius(candidates, radius);
        tracing::debug!(candidates = candidate_count, hits = hits.len(), "radius query");
        Ok(hits)
    }
}

fn conversion_error(column: Column, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        Column::ALL.iter().position(|c| *c == column).unwrap_or_default(),
        Type::Text,
        format!("{}: {message}", column.name()).into(),
    )
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Repeater> {
    let use_membership: String = row.get(Column::UseMembership.name())?;
    let operational_status: String = row.get(Column::OperationalStatus.name())?;
    let last_update: Option<String> = row.get(Column::LastUpdate.name())?;

    let last_update = last_update
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| conversion_error(Column::LastUpdate, e.to_string()))?;

    Ok(Repeater {
        id: row.get("id")?,
        state_id: row.get("state_id")?,
        callsign: row.get("callsign")?,
        frequency: row.get("frequency")?,
        input_frequency: row.get("input_frequency")?,
        pl_ctcss_uplink: row.get("pl_ctcss_uplink")?,
        pl_ctcss_tsq_downlink: row.get("pl_ctcss_tsq_downlink")?,
        location_nearest_city: row.get("location_nearest_city")?,
        landmark: row.get("landmark")?,
        region: row.get("region")?,
        country: row.get("country")?,
        county: row.get("county")?,
        state: row.get("state")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        precise: row.get("precise")?,
        use_membership: use_membership.parse().map_err(|e| conversion_error(Column::UseMembership, e))?,
        operational_status: operational_status.parse().map_err(|e| conversion_error(Column::OperationalStatus, e))?,
        ares: row.get("ares")?,
        races: row.get("races")?,
        skywarn: row.get("skywarn")?,
        canwarn: row.get("canwarn")?,
        allstar_node: row.get("allstar_node")?,
        echolink_node: row.get("echolink_node")?,
        irlp_node: row.get("irlp_node")?,
        wires_node: row.get("wires_node")?,
        analog_capable: row.get("analog_capable")?,
        fm_bandwidth: row.get("fm_bandwidth")?,
        dmr_capable: row.get("dmr_capable")?,
        dmr_color_code: row.get("dmr_color_code")?,
        dmr_id: row.get("dmr_id")?,
        d_star_capable: row.get("d_star_capable")?,
        nxdn_capable: row.get("nxdn_capable")?,
        apco_p_25_capable: row.get("apco_p_25_capable")?,
        p_25_nac: row.get("p_25_nac")?,
        m17_capable: row.get("m17_capable")?,
        m17_can: row.get("m17_can")?,
        tetra_capable: row.get("tetra_capable")?,
        tetra_mcc: row.get("tetra_mcc")?,
        tetra_mnc: row.get("tetra_mnc")?,
        yaesu_system_fusion_capable: row.get("yaesu_system_fusion_capable")?,
        ysf_digital_id_uplink: row.get("ysf_digital_id_uplink")?,
        ysf_digital_id_downlink: row.get("ysf_digital_id_downlink")?,
        ysf_dsc: row.get("ysf_dsc")?,
        notes: row.get("notes")?,
        last_update,
    })
}
