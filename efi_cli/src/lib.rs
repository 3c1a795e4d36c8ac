//! # Serial CLI command language
//!
//! Line-oriented command parsing and CSV stream-row formatting for the
//! serial maintenance CLI. Parsing and formatting only — no serial I/O,
//! matching the teacher's interface-only bridges.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TablesAction {
    List,
    Show { table: String },
    Get { table: String, cell: String },
    Set { table: String, cell: String, value: String },
    Save,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    List,
    Get { key: String },
    Set { key: String, value: String },
    Save,
    Load,
    Defaults,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagAction {
    Errors,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamAction {
    Start { interval_ms: Option<u32> },
    Stop,
    Csv,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResetTarget {
    Config,
    Tables,
    Ltft,
    All,
}

/// One parsed CLI command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Sensors { watch: bool },
    Tables(TablesAction),
    Config(ConfigAction),
    Limits { set: Option<(String, String)> },
    Diag(DiagAction),
    Stream(StreamAction),
    Reset { target: ResetTarget, confirmed: bool },
    Version,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliError(pub String);

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cli parse error: {}", self.0)
    }
}

impl std::error::Error for CliError {}

fn err(msg: impl Into<String>) -> CliError {
    CliError(msg.into())
}

/// Parse one line of CLI input. Whitespace-separated, case-sensitive on the
/// leading command word, trailing whitespace ignored.
pub fn parse_line(line: &str) -> Result<Command, CliError> {
    let mut words = line.split_whitespace();
    let head = words.next().ok_or_else(|| err("empty command"))?;
    let rest: Vec<&str> = words.collect();

    match head {
        "help" => Ok(Command::Help),
        "status" => Ok(Command::Status),
        "version" => Ok(Command::Version),
        "sensors" => match rest.as_slice() {
            [] => Ok(Command::Sensors { watch: false }),
            ["watch"] => Ok(Command::Sensors { watch: true }),
            _ => Err(err("usage: sensors [watch]")),
        },
        "tables" => parse_tables(&rest).map(Command::Tables),
        "config" => parse_config(&rest).map(Command::Config),
        "limits" => match rest.as_slice() {
            [] => Ok(Command::Limits { set: None }),
            ["set", k, v] => Ok(Command::Limits { set: Some((k.to_string(), v.to_string())) }),
            _ => Err(err("usage: limits [set k v]")),
        },
        "diag" => match rest.as_slice() {
            ["errors"] => Ok(Command::Diag(DiagAction::Errors)),
            ["reset"] => Ok(Command::Diag(DiagAction::Reset)),
            _ => Err(err("usage: diag {errors|reset}")),
        },
        "stream" => parse_stream(&rest).map(Command::Stream),
        "reset" => parse_reset(&rest),
        _ => Err(err(format!("unknown command '{head}'"))),
    }
}

fn parse_tables(rest: &[&str]) -> Result<TablesAction, CliError> {
    match rest {
        ["list"] => Ok(TablesAction::List),
        ["show", table] => Ok(TablesAction::Show { table: table.to_string() }),
        ["get", table, cell] => Ok(TablesAction::Get { table: table.to_string(), cell: cell.to_string() }),
        ["set", table, cell, value] => Ok(TablesAction::Set {
            table: table.to_string(),
            cell: cell.to_string(),
            value: value.to_string(),
        }),
        ["save"] => Ok(TablesAction::Save),
        _ => Err(err("usage: tables {list|show|get|set|save}")),
    }
}

fn parse_config(rest: &[&str]) -> Result<ConfigAction, CliError> {
    match rest {
        ["list"] => Ok(ConfigAction::List),
        ["get", key] => Ok(ConfigAction::Get { key: key.to_string() }),
        ["set", key, value] => Ok(ConfigAction::Set { key: key.to_string(), value: value.to_string() }),
        ["save"] => Ok(ConfigAction::Save),
        ["load"] => Ok(ConfigAction::Load),
        ["defaults"] => Ok(ConfigAction::Defaults),
        _ => Err(err("usage: config {list|get|set|save|load|defaults}")),
    }
}

fn parse_stream(rest: &[&str]) -> Result<StreamAction, CliError> {
    match rest {
        ["start"] => Ok(StreamAction::Start { interval_ms: None }),
        ["start", ms] => {
            let interval_ms = ms.parse().map_err(|_| err("interval must be an integer"))?;
            Ok(StreamAction::Start { interval_ms: Some(interval_ms) })
        }
        ["stop"] => Ok(StreamAction::Stop),
        ["csv"] => Ok(StreamAction::Csv),
        ["json"] => Ok(StreamAction::Json),
        _ => Err(err("usage: stream {start [ms]|stop|csv|json}")),
    }
}

fn parse_reset(rest: &[&str]) -> Result<Command, CliError> {
    let (target_word, confirmed) = match rest {
        [target] => (*target, false),
        [target, "confirm"] => (*target, true),
        _ => return Err(err("usage: reset {config|tables|ltft|all} [confirm]")),
    };
    let target = match target_word {
        "config" => ResetTarget::Config,
        "tables" => ResetTarget::Tables,
        "ltft" => ResetTarget::Ltft,
        "all" => ResetTarget::All,
        _ => return Err(err("usage: reset {config|tables|ltft|all}")),
    };
    Ok(Command::Reset { target, confirmed })
}

/// Column header for the default CSV stream framing.
pub const STREAM_CSV_HEADER: &str = "time,rpm,map,tps,clt,iat,advance,pw,lambda";

/// One row of the default CSV stream, matching [`STREAM_CSV_HEADER`]'s
/// column order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSample {
    pub time_s: f64,
    pub rpm: u32,
    pub map_kpa: f64,
    pub tps_pct: f64,
    pub clt_c: i32,
    pub iat_c: i32,
    pub advance_deg: f64,
    pub pw_us: u32,
    pub lambda: f64,
}

impl StreamSample {
    pub fn to_csv_row(&self) -> String {
        format!(
            "{:.3},{},{:.1},{:.1},{},{},{:.1},{},{:.3}",
            self.time_s, self.rpm, self.map_kpa, self.tps_pct, self.clt_c, self.iat_c, self.advance_deg, self.pw_us, self.lambda
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_line("help").unwrap(), Command::Help);
        assert_eq!(parse_line("status").unwrap(), Command::Status);
        assert_eq!(parse_line("version").unwrap(), Command::Version);
    }

    #[test]
    fn parses_sensors_with_optional_watch() {
        assert_eq!(parse_line("sensors").unwrap(), Command::Sensors { watch: false });
        assert_eq!(parse_line("sensors watch").unwrap(), Command::Sensors { watch: true });
    }

    #[test]
    fn parses_tables_subcommands() {
        assert_eq!(parse_line("tables list").unwrap(), Command::Tables(TablesAction::List));
        assert_eq!(
            parse_line("tables set ve 12 85").unwrap(),
            Command::Tables(TablesAction::Set {
                table: "ve".to_string(),
                cell: "12".to_string(),
                value: "85".to_string(),
            })
        );
    }

    #[test]
    fn parses_limits_set() {
        assert_eq!(
            parse_line("limits set max_rpm 9000").unwrap(),
            Command::Limits { set: Some(("max_rpm".to_string(), "9000".to_string())) }
        );
        assert_eq!(parse_line("limits").unwrap(), Command::Limits { set: None });
    }

    #[test]
    fn parses_stream_start_with_interval() {
        assert_eq!(
            parse_line("stream start 50").unwrap(),
            Command::Stream(StreamAction::Start { interval_ms: Some(50) })
        );
        assert_eq!(parse_line("stream stop").unwrap(), Command::Stream(StreamAction::Stop));
    }

    #[test]
    fn reset_requires_confirm_flag_to_be_marked_confirmed() {
        assert_eq!(
            parse_line("reset all").unwrap(),
            Command::Reset { target: ResetTarget::All, confirmed: false }
        );
        assert_eq!(
            parse_line("reset all confirm").unwrap(),
            Command::Reset { target: ResetTarget::All, confirmed: true }
        );
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line("").is_err());
    }

    #[test]
    fn stream_sample_formats_as_documented_csv_header_order() {
        let sample = StreamSample {
            time_s: 1.5,
            rpm: 3200,
            map_kpa: 65.0,
            tps_pct: 12.0,
            clt_c: 87,
            iat_c: 25,
            advance_deg: 22.0,
            pw_us: 4200,
            lambda: 0.987,
        };
        assert_eq!(sample.to_csv_row(), "1.500,3200,65.0,12.0,87,25,22.0,4200,0.987");
        assert_eq!(STREAM_CSV_HEADER.split(',').count(), sample.to_csv_row().split(',').count());
    }
}
