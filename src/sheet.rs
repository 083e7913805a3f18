use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Record, Table};

const PLAYER_COLUMNS: &[&str] = &["player", "player name", "name", "athlete"];
const TEAM_COLUMNS: &[&str] = &["team", "team name"];
const DATE_COLUMNS: &[&str] = &["date", "test date"];
const AGE_COLUMNS: &[&str] = &["age"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("sheet is missing a {0} column")]
    MissingColumn(&'static str),

    #[error("failed to read sheet: {0}")]
    Csv(#[from] csv::Error),
}

/// A loaded table together with the row-level problems that were skipped.
#[derive(Debug, Default)]
pub struct SheetLoad {
    pub table: Table,
    /// Age cell of each record, in record order.
    pub ages: Vec<Option<i32>>,
    pub warnings: Vec<String>,
}

pub fn load_csv(path: &Path) -> Result<SheetLoad, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result?;
        rows.push(row.iter().map(str::to_string).collect::<Vec<_>>());
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "read sheet export");
    from_rows(&header, &rows)
}

/// Builds a table from a header row and data rows, the shape a sheet range is
/// returned in.
pub fn from_rows(header: &[String], rows: &[Vec<String>]) -> Result<SheetLoad, LoadError> {
    let player_idx = find_column(header, PLAYER_COLUMNS).ok_or(LoadError::MissingColumn("player"))?;
    let date_idx = find_column(header, DATE_COLUMNS).ok_or(LoadError::MissingColumn("date"))?;
    let team_idx = find_column(header, TEAM_COLUMNS);
    let age_idx = find_column(header, AGE_COLUMNS);

    let metric_columns: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.trim().is_empty() && !is_identity_column(name))
        .map(|(idx, name)| (idx, name.trim().to_string()))
        .collect();

    let mut records = Vec::new();
    let mut ages = Vec::new();
    let mut warnings = Vec::new();

    for (line, row) in rows.iter().enumerate() {
        // header is line 1
        let line = line + 2;
        let cell = |idx: usize| row.get(idx).map(|value| value.trim()).unwrap_or("");

        let player = cell(player_idx);
        if player.is_empty() {
            warnings.push(format!("row {line}: missing player name, skipped"));
            continue;
        }

        let Some(date) = parse_date(cell(date_idx)) else {
            warnings.push(format!(
                "row {line}: unreadable date '{}' for {player}, skipped",
                cell(date_idx)
            ));
            continue;
        };

        let mut metrics = BTreeMap::new();
        for (idx, name) in &metric_columns {
            let raw = cell(*idx);
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    metrics.insert(name.clone(), value);
                }
                _ => warnings.push(format!("row {line}: {name} value '{raw}' is not a number")),
            }
        }

        let age = match age_idx.map(cell).filter(|raw| !raw.is_empty()) {
            Some(raw) => match raw.parse::<i32>() {
                Ok(age) if age > 0 => Some(age),
                _ => {
                    warnings.push(format!("row {line}: age '{raw}' is not a whole number"));
                    None
                }
            },
            None => None,
        };

        records.push(Record {
            player: player.to_string(),
            team: team_idx.map(cell).unwrap_or("").to_string(),
            date,
            metrics,
        });
        ages.push(age);
    }

    let metrics = metric_columns.into_iter().map(|(_, name)| name).collect();
    Ok(SheetLoad {
        table: Table::new(records, metrics),
        ages,
        warnings,
    })
}

/// Columns that describe who and when rather than a measurement.
fn is_identity_column(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    [PLAYER_COLUMNS, TEAM_COLUMNS, DATE_COLUMNS, AGE_COLUMNS]
        .iter()
        .any(|aliases| aliases.contains(&name.as_str()))
}

fn find_column(header: &[String], candidates: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|name| candidates.contains(&name.trim().to_lowercase().as_str()))
}

/// Accepts ISO dates and the US `month/day/year` form with a two or four
/// digit year.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let format = match raw.rsplit_once('/') {
        Some((_, year)) if year.len() == 2 => "%m/%d/%y",
        Some(_) => "%m/%d/%Y",
        None => "%Y-%m-%d",
    };
    NaiveDate::parse_from_str(raw, format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn splits_identity_columns_from_metrics() {
        let header = strings(&["Player", "Team", "Date", "40-Yard Dash", "Broad Jump"]);
        let rows = vec![
            strings(&["John Doe", "Baseball U", "2024-03-01", "5.1", "96"]),
            strings(&["John Doe", "Baseball U", "04/02/2024", "4.9", ""]),
        ];

        let load = from_rows(&header, &rows).unwrap();
        assert!(load.warnings.is_empty());
        assert_eq!(load.table.metrics, vec!["40-Yard Dash", "Broad Jump"]);
        assert_eq!(load.table.records.len(), 2);

        let second = &load.table.records[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
        assert_eq!(second.metric("40-Yard Dash"), Some(4.9));
        assert_eq!(second.metric("Broad Jump"), None);
    }

    #[test]
    fn header_matching_ignores_case_and_aliases() {
        let header = strings(&["athlete", "TEST DATE", "Push-Ups"]);
        let rows = vec![strings(&["Mike Smith", "2024-01-05", "42"])];

        let load = from_rows(&header, &rows).unwrap();
        let record = &load.table.records[0];
        assert_eq!(record.player, "Mike Smith");
        assert_eq!(record.team, "");
        assert_eq!(record.metric("Push-Ups"), Some(42.0));
    }

    #[test]
    fn missing_player_column_is_an_error() {
        let header = strings(&["Team", "Date", "Broad Jump"]);
        let err = from_rows(&header, &[]).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("player")));
    }

    #[test]
    fn bad_rows_become_warnings() {
        let header = strings(&["Player", "Date", "Broad Jump"]);
        let rows = vec![
            strings(&["", "2024-01-01", "90"]),
            strings(&["John Doe", "yesterday", "90"]),
            strings(&["John Doe", "2024-01-02", "far"]),
        ];

        let load = from_rows(&header, &rows).unwrap();
        assert_eq!(load.warnings.len(), 3);
        assert_eq!(load.table.records.len(), 1);
        assert!(load.table.records[0].metrics.is_empty());
    }

    #[test]
    fn duplicate_identity_aliases_are_not_metrics() {
        let header = strings(&["Player", "Name", "Date", "Team Name", "Broad Jump"]);
        let rows = vec![strings(&["John Doe", "John Doe", "2024-03-01", "Baseball U", "96"])];

        let load = from_rows(&header, &rows).unwrap();
        assert_eq!(load.table.metrics, vec!["Broad Jump"]);
        assert!(load.warnings.is_empty());
        assert_eq!(load.table.records[0].team, "Baseball U");
    }

    #[test]
    fn age_is_kept_apart_from_metrics() {
        let header = strings(&["Player", "Date", "Age", "Exit Velocity"]);
        let rows = vec![
            strings(&["John Doe", "2024-03-01", "14", "85"]),
            strings(&["Mike Smith", "2024-03-01", "", "92"]),
            strings(&["Ava Cruz", "2024-03-01", "teen", "96"]),
        ];

        let load = from_rows(&header, &rows).unwrap();
        assert_eq!(load.table.metrics, vec!["Exit Velocity"]);
        assert_eq!(load.ages, vec![Some(14), None, None]);
        assert!(load.table.records.iter().all(|record| record.metric("Age").is_none()));
        assert_eq!(load.warnings.len(), 1);
    }

    #[test]
    fn parses_sheet_date_styles() {
        let expected = NaiveDate::from_ymd_opt(2025, 2, 15);
        assert_eq!(parse_date("2025-02-15"), expected);
        assert_eq!(parse_date("02/15/2025"), expected);
        assert_eq!(parse_date("2/15/25"), expected);
        assert_eq!(parse_date("15.02.2025"), None);
    }

    #[test]
    fn reads_csv_export() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Player,Team,Date,Exit Velocity").unwrap();
        writeln!(file, "John Doe,Baseball U,2024-03-01,85").unwrap();
        writeln!(file, "Mike Smith,Baseball U,2024-03-01, 92 ").unwrap();

        let load = load_csv(file.path()).unwrap();
        assert_eq!(load.table.records.len(), 2);
        assert_eq!(load.table.records[1].metric("Exit Velocity"), Some(92.0));
    }

    #[test]
    fn empty_sheet_loads_as_empty_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Player,Team,Date").unwrap();

        let load = load_csv(file.path()).unwrap();
        assert!(load.table.is_empty());
    }
}
