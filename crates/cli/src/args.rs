//! Command line definition.

use clap::{Args, Parser, Subcommand};

use rptrbook_core::{Band, Country, DistanceUnit, Emergency, ExportQuery, LatLon, Mode, Radius, ServiceType};

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "rptrbook")]
#[command(version, about = "Download and query RepeaterBook repeater listings")]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download repeaters and merge them into the local database
    Sync(SyncArgs),

    /// List stored repeaters within a radius of a point, nearest first
    Near(NearArgs),

    /// Print one stored repeater
    Show {
        /// Repeater id
        id: i64,
    },

    /// Delete cached responses older than the configured maximum age
    PurgeCache,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Country to download (repeatable)
    #[arg(long = "country", value_parser = parse_country)]
    pub countries: Vec<Country>,

    /// State/province id, North America only (repeatable)
    #[arg(long = "state-id")]
    pub state_ids: Vec<String>,

    /// County, North America only (repeatable)
    #[arg(long = "county")]
    pub counties: Vec<String>,

    /// Region, rest of world only (repeatable)
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// Callsign (repeatable)
    #[arg(long = "callsign")]
    pub callsigns: Vec<String>,

    /// Nearest city (repeatable)
    #[arg(long = "city")]
    pub cities: Vec<String>,

    /// Output frequency in MHz (repeatable)
    #[arg(long = "frequency")]
    pub frequencies: Vec<f64>,

    /// Operating mode: analog, dmr, nxdn, p25, tetra (repeatable)
    #[arg(long = "mode", value_parser = parse_mode)]
    pub modes: Vec<Mode>,

    /// Emergency service: ares, races, skywarn, canwarn (repeatable)
    #[arg(long = "emcomm", value_parser = parse_emergency)]
    pub emcomm: Vec<Emergency>,

    /// Restrict to GMRS repeaters, North America only
    #[arg(long)]
    pub gmrs: bool,
}

impl SyncArgs {
    pub fn to_query(&self) -> ExportQuery {
        let mut query = ExportQuery::new();
        query.countries.extend(self.countries.iter().cloned());
        query.state_ids.extend(self.state_ids.iter().cloned());
        query.counties.extend(self.counties.iter().cloned());
        query.regions.extend(self.regions.iter().cloned());
        query.callsigns.extend(self.callsigns.iter().cloned());
        query.cities.extend(self.cities.iter().cloned());
        query.frequencies.extend(self.frequencies.iter().copied());
        query.modes.extend(self.modes.iter().copied());
        query.emcomm.extend(self.emcomm.iter().copied());
        if self.gmrs {
            query.stype.insert(ServiceType::Gmrs);
        }
        query
    }
}

#[derive(Debug, Args)]
pub struct NearArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Search radius
    #[arg(long)]
    pub radius: f64,

    /// Unit of the radius: km, m, mi, nmi
    #[arg(long, default_value = "km", value_parser = parse_unit)]
    pub unit: DistanceUnit,

    /// Only repeaters transmitting in this band, e.g. 2m or 70cm (repeatable)
    #[arg(long = "band", value_parser = parse_band)]
    pub bands: Vec<Band>,

    /// Only repeaters reported on air
    #[arg(long)]
    pub on_air: bool,
}

impl NearArgs {
    pub fn radius(&self) -> Radius {
        Radius::new(LatLon::new(self.lat, self.lon), self.radius, self.unit)
    }
}

fn parse_country(s: &str) -> Result<Country, String> {
    s.parse::<Country>().map_err(|e| e.to_string())
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>().map_err(|e| e.to_string())
}

fn parse_unit(s: &str) -> Result<DistanceUnit, String> {
    s.parse::<DistanceUnit>().map_err(|e| e.to_string())
}

fn parse_band(s: &str) -> Result<Band, CliError> {
    Band::from_label(s).ok_or_else(|| CliError::InvalidInput(format!("unknown band: {s}")))
}

fn parse_emergency(s: &str) -> Result<Emergency, CliError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "ares" => Ok(Emergency::Ares),
        "races" => Ok(Emergency::Races),
        "skywarn" => Ok(Emergency::Skywarn),
        "canwarn" => Ok(Emergency::Canwarn),
        other => Err(CliError::InvalidInput(format!("unknown emergency service: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_args_build_query() {
        let cli = Cli::try_parse_from([
            "rptrbook",
            "sync",
            "--country",
            "Canada",
            "--country",
            "Germany",
            "--state-id",
            "06",
            "--mode",
            "dmr",
            "--emcomm",
            "ares",
            "--gmrs",
        ])
        .unwrap();
        let Command::Sync(args) = cli.command else { panic!("expected sync") };

        let query = args.to_query();
        assert!(query.countries.contains(&Country::canada()));
        assert!(query.countries.contains(&Country::new("Germany")));
        assert!(query.state_ids.contains("06"));
        assert!(query.modes.contains(&Mode::Dmr));
        assert!(query.emcomm.contains(&Emergency::Ares));
        assert!(query.stype.contains(&ServiceType::Gmrs));
        assert!(query.regions.is_empty());
    }

    #[test]
    fn test_near_args() {
        let cli = Cli::try_parse_from([
            "rptrbook",
            "--json-logs",
            "near",
            "--lat",
            "34.05",
            "--lon",
            "-118.24",
            "--radius",
            "25",
            "--unit",
            "mi",
            "--band",
            "2m",
            "--band",
            "70cm",
        ])
        .unwrap();
        assert!(cli.json_logs);
        let Command::Near(args) = cli.command else { panic!("expected near") };

        let radius = args.radius();
        assert_eq!(radius.origin, LatLon::new(34.05, -118.24));
        assert_eq!(radius.unit, DistanceUnit::Miles);
        assert_eq!(args.bands, vec![Band::M2, Band::Cm70]);
        assert!(!args.on_air);
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(Cli::try_parse_from(["rptrbook", "sync", "--mode", "fax"]).is_err());
        assert!(Cli::try_parse_from(["rptrbook", "sync", "--emcomm", "cert"]).is_err());
        assert!(
            Cli::try_parse_from(["rptrbook", "near", "--lat", "1", "--lon", "2", "--radius", "3", "--band", "11m"])
                .is_err()
        );
    }

    #[test]
    fn test_show_takes_id() {
        let cli = Cli::try_parse_from(["rptrbook", "show", "42"]).unwrap();
        assert!(matches!(cli.command, Command::Show { id: 42 }));
    }
}
