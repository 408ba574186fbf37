//! Endpoint selection and canonical request parameters.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Country, ExportQuery};

/// Upstream export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// `export.php`: United States, Canada and Mexico.
    NorthAmerica,
    /// `exportROW.php`: every other country.
    RestOfWorld,
}

impl Endpoint {
    /// Path below the service base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::NorthAmerica => "api/export.php",
            Endpoint::RestOfWorld => "api/exportROW.php",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// The set of endpoints a query must be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndpointSet {
    north_america: bool,
    rest_of_world: bool,
}

impl EndpointSet {
    pub const NORTH_AMERICA: Self = Self { north_america: true, rest_of_world: false };
    pub const REST_OF_WORLD: Self = Self { north_america: false, rest_of_world: true };
    pub const BOTH: Self = Self { north_america: true, rest_of_world: true };

    pub fn contains(&self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::NorthAmerica => self.north_america,
            Endpoint::RestOfWorld => self.rest_of_world,
        }
    }

    pub fn len(&self) -> usize {
        usize::from(self.north_america) + usize::from(self.rest_of_world)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Endpoints in a fixed order: North America first.
    pub fn iter(&self) -> impl Iterator<Item = Endpoint> + '_ {
        [Endpoint::NorthAmerica, Endpoint::RestOfWorld].into_iter().filter(|e| self.contains(*e))
    }
}

/// Decide which endpoint(s) `query` must be sent to.
///
/// Rules, first match wins:
/// 1. a North-America-only field is set: North America
/// 2. a rest-of-world-only field is set: rest of world
/// 3. every country is North American: North America
/// 4. no country is North American: rest of world
/// 5. mixed countries or nothing discriminating: both
pub fn route(query: &ExportQuery) -> EndpointSet {
    if query.has_north_america_fields() {
        return EndpointSet::NORTH_AMERICA;
    }
    if query.has_rest_of_world_fields() {
        return EndpointSet::REST_OF_WORLD;
    }
    if !query.countries.is_empty() {
        let na = query.countries.iter().filter(|c| c.is_north_america()).count();
        if na == query.countries.len() {
            return EndpointSet::NORTH_AMERICA;
        }
        if na == 0 {
            return EndpointSet::REST_OF_WORLD;
        }
    }
    EndpointSet::BOTH
}

/// Canonical query-string parameters of `query` for `endpoint`.
///
/// Only parameters the endpoint's schema understands are emitted. Countries
/// are split by endpoint; an endpoint with no country of its own receives the
/// full country set. The output is sorted by key then value, so it does not
/// depend on the order values were inserted.
pub fn endpoint_params(query: &ExportQuery, endpoint: Endpoint) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = Vec::new();

    text(&mut params, "callsign", &query.callsigns);
    text(&mut params, "city", &query.cities);
    text(&mut params, "landmark", &query.landmarks);
    params.extend(query.frequencies.iter().map(|f| ("frequency", f.to_string())));
    params.extend(query.modes.iter().map(|m| ("mode", m.as_param().to_string())));

    let wants_na = endpoint == Endpoint::NorthAmerica;
    let own: Vec<&Country> = query.countries.iter().filter(|c| c.is_north_america() == wants_na).collect();
    let countries: Vec<&Country> = if own.is_empty() { query.countries.iter().collect() } else { own };
    params.extend(countries.into_iter().map(|c| ("country", c.name().to_string())));

    match endpoint {
        Endpoint::NorthAmerica => {
            text(&mut params, "state_id", &query.state_ids);
            text(&mut params, "county", &query.counties);
            params.extend(query.emcomm.iter().map(|e| ("emcomm", e.as_param().to_string())));
            params.extend(query.stype.iter().map(|s| ("stype", s.as_param().to_string())));
        }
        Endpoint::RestOfWorld => {
            text(&mut params, "region", &query.regions);
        }
    }

    params.sort();
    params.dedup();
    params
}

fn text(params: &mut Vec<(&'static str, String)>, key: &'static str, values: &BTreeSet<String>) {
    params.extend(values.iter().map(|v| (key, v.trim().to_string())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Emergency, Mode, ServiceType};

    #[test]
    fn test_state_ids_route_north_america() {
        let query = ExportQuery::new().with_state_id("06");
        assert_eq!(route(&query), EndpointSet::NORTH_AMERICA);
    }

    #[test]
    fn test_na_only_fields_route_north_america() {
        let mut query = ExportQuery::new();
        query.emcomm.insert(Emergency::Ares);
        assert_eq!(route(&query), EndpointSet::NORTH_AMERICA);

        let mut query = ExportQuery::new();
        query.stype.insert(ServiceType::Gmrs);
        assert_eq!(route(&query), EndpointSet::NORTH_AMERICA);

        let mut query = ExportQuery::new();
        query.counties.insert("Los Angeles".into());
        assert_eq!(route(&query), EndpointSet::NORTH_AMERICA);
    }

    #[test]
    fn test_region_routes_rest_of_world() {
        let query = ExportQuery::new().with_region("South America");
        assert_eq!(route(&query), EndpointSet::REST_OF_WORLD);
    }

    #[test]
    fn test_na_fields_take_precedence_over_region() {
        let query = ExportQuery::new().with_state_id("06").with_region("Europe");
        assert_eq!(route(&query), EndpointSet::NORTH_AMERICA);
    }

    #[test]
    fn test_country_routing() {
        let na = ExportQuery::new().with_country(Country::united_states()).with_country(Country::canada());
        assert_eq!(route(&na), EndpointSet::NORTH_AMERICA);

        let row = ExportQuery::new().with_country(Country::new("Brazil")).with_country(Country::new("Germany"));
        assert_eq!(route(&row), EndpointSet::REST_OF_WORLD);

        let mixed = ExportQuery::new().with_country(Country::united_states()).with_country(Country::new("Germany"));
        assert_eq!(route(&mixed), EndpointSet::BOTH);
    }

    #[test]
    fn test_unconstrained_routes_both() {
        assert_eq!(route(&ExportQuery::default()), EndpointSet::BOTH);
        assert_eq!(route(&ExportQuery::new().with_mode(Mode::Dmr)), EndpointSet::BOTH);
    }

    #[test]
    fn test_endpoint_set_iteration_order() {
        let endpoints: Vec<Endpoint> = EndpointSet::BOTH.iter().collect();
        assert_eq!(endpoints, vec![Endpoint::NorthAmerica, Endpoint::RestOfWorld]);
        assert_eq!(EndpointSet::REST_OF_WORLD.len(), 1);
        assert!(EndpointSet::default().is_empty());
    }

    #[test]
    fn test_params_split_countries_by_endpoint() {
        let query = ExportQuery::new().with_country(Country::united_states()).with_country(Country::new("Germany"));

        let na = endpoint_params(&query, Endpoint::NorthAmerica);
        assert_eq!(na, vec![("country", "United States".to_string())]);

        let row = endpoint_params(&query, Endpoint::RestOfWorld);
        assert_eq!(row, vec![("country", "Germany".to_string())]);
    }

    #[test]
    fn test_params_only_schema_fields() {
        let query = ExportQuery::new().with_state_id("06").with_region("Europe").with_mode(Mode::Dmr);

        let na = endpoint_params(&query, Endpoint::NorthAmerica);
        assert!(na.contains(&("state_id", "06".to_string())));
        assert!(na.contains(&("mode", "DMR".to_string())));
        assert!(!na.iter().any(|(k, _)| *k == "region"));

        let row = endpoint_params(&query, Endpoint::RestOfWorld);
        assert!(row.contains(&("region", "Europe".to_string())));
        assert!(!row.iter().any(|(k, _)| *k == "state_id"));
    }

    #[test]
    fn test_params_are_order_independent() {
        let mut a = ExportQuery::new();
        a.frequencies = vec![146.94, 442.1];
        a.callsigns.insert("W6ABC".into());
        a.callsigns.insert("K6XYZ".into());

        let mut b = ExportQuery::new();
        b.frequencies = vec![442.1, 146.94];
        b.callsigns.insert("K6XYZ".into());
        b.callsigns.insert("W6ABC".into());

        assert_eq!(endpoint_params(&a, Endpoint::RestOfWorld), endpoint_params(&b, Endpoint::RestOfWorld));
    }
}
