use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AlertStatus, Record, Table, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// Thresholds for the three upper tiers of one metric. Anything short of
/// `developing` is Foundation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierScale {
    pub metric: String,
    pub direction: Direction,
    pub developing: f64,
    pub advanced: f64,
    pub elite: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ScaleError {
    #[error("{0}: thresholds must be finite")]
    NotFinite(String),

    #[error("{0}: thresholds are not ordered in the direction of improvement")]
    Unordered(String),
}

impl TierScale {
    pub fn new(metric: &str, direction: Direction, developing: f64, advanced: f64, elite: f64) -> Self {
        Self {
            metric: metric.to_string(),
            direction,
            developing,
            advanced,
            elite,
        }
    }

    pub fn validate(&self) -> Result<(), ScaleError> {
        let bounds = [self.developing, self.advanced, self.elite];
        if bounds.iter().any(|bound| !bound.is_finite()) {
            return Err(ScaleError::NotFinite(self.metric.clone()));
        }
        let ordered = match self.direction {
            Direction::HigherIsBetter => self.developing < self.advanced && self.advanced < self.elite,
            Direction::LowerIsBetter => self.developing > self.advanced && self.advanced > self.elite,
        };
        if ordered {
            Ok(())
        } else {
            Err(ScaleError::Unordered(self.metric.clone()))
        }
    }
}

pub fn classify_tier(scale: &TierScale, value: f64) -> Tier {
    if !value.is_finite() {
        return Tier::Foundation;
    }
    let reaches = |bound: f64| match scale.direction {
        Direction::HigherIsBetter => value >= bound,
        Direction::LowerIsBetter => value <= bound,
    };

    if reaches(scale.elite) {
        Tier::Elite
    } else if reaches(scale.advanced) {
        Tier::Advanced
    } else if reaches(scale.developing) {
        Tier::Developing
    } else {
        Tier::Foundation
    }
}

/// Tier scales keyed by metric name.
#[derive(Debug, Clone)]
pub struct TierScales {
    scales: BTreeMap<String, TierScale>,
}

impl Default for TierScales {
    fn default() -> Self {
        // 40-yard dash is a time, so faster (lower) ranks higher.
        Self::from_scales(vec![
            TierScale::new("40-Yard Dash", Direction::LowerIsBetter, 5.3, 4.9, 4.6),
            TierScale::new("Exit Velocity", Direction::HigherIsBetter, 75.0, 85.0, 95.0),
            TierScale::new("Throwing Velocity", Direction::HigherIsBetter, 70.0, 80.0, 90.0),
            TierScale::new("Broad Jump", Direction::HigherIsBetter, 90.0, 100.0, 110.0),
            TierScale::new("Push-Ups", Direction::HigherIsBetter, 30.0, 40.0, 50.0),
        ])
        .unwrap_or_else(|_| Self { scales: BTreeMap::new() })
    }
}

impl TierScales {
    pub fn from_scales(scales: Vec<TierScale>) -> Result<Self, ScaleError> {
        let mut map = BTreeMap::new();
        for scale in scales {
            scale.validate()?;
            map.insert(scale.metric.clone(), scale);
        }
        Ok(Self { scales: map })
    }

    /// Reads a JSON array of scales.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tier scales from {}", path.display()))?;
        let scales: Vec<TierScale> =
            serde_json::from_str(&raw).context("tier scale file is not valid JSON")?;
        Ok(Self::from_scales(scales)?)
    }

    pub fn get(&self, metric: &str) -> Option<&TierScale> {
        self.scales.get(metric)
    }

    pub fn classify(&self, metric: &str, value: f64) -> Option<Tier> {
        self.get(metric).map(|scale| classify_tier(scale, value))
    }
}

/// A rise in the measured value counts as declining.
pub fn alert_status(previous: f64, latest: f64) -> AlertStatus {
    if latest > previous {
        AlertStatus::Declining
    } else if latest < previous {
        AlertStatus::Improving
    } else {
        AlertStatus::NoChange
    }
}

pub fn alert_for_series(points: &[SeriesPoint]) -> Option<AlertStatus> {
    match points {
        [.., previous, latest] => Some(alert_status(previous.value, latest.value)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// The player's values for one metric in date order; rows on the same date
/// keep their load order.
pub fn series(table: &Table, player: &str, metric: &str) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = table
        .for_player(player)
        .filter_map(|record| {
            record.metric(metric).map(|value| SeriesPoint {
                date: record.date,
                value,
            })
        })
        .collect();
    points.sort_by_key(|point| point.date);
    points
}

/// Most recent record by date, with the later row winning a tie.
pub fn latest_record<'a>(table: &'a Table, player: &str) -> Option<&'a Record> {
    table
        .records
        .iter()
        .filter(|record| record.player == player)
        .fold(None, |latest: Option<&Record>, record| match latest {
            Some(current) if current.date > record.date => Some(current),
            _ => Some(record),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player: String,
    pub team: String,
    pub date: NaiveDate,
    pub value: f64,
}

pub fn leaderboard<'a, I>(records: I, metric: &str, top: Option<usize>) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut rows: Vec<(&Record, f64)> = records
        .into_iter()
        .filter_map(|record| record.metric(metric).map(|value| (record, value)))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    rows.into_iter()
        .take(top.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(idx, (record, value))| LeaderboardEntry {
            rank: idx + 1,
            player: record.player.clone(),
            team: record.team.clone(),
            date: record.date,
            value,
        })
        .collect()
}

pub fn team_leaderboard(table: &Table, team: &str, metric: &str, top: Option<usize>) -> Vec<LeaderboardEntry> {
    leaderboard(table.for_team(team), metric, top)
}

pub fn global_leaderboard(table: &Table, metric: &str, top: Option<usize>) -> Vec<LeaderboardEntry> {
    leaderboard(&table.records, metric, top)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(player: &str, team: &str, day: u32, metrics: &[(&str, f64)]) -> Record {
        Record {
            player: player.to_string(),
            team: team.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            metrics: metrics
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    fn sample_table() -> Table {
        Table::new(
            vec![
                record("John Doe", "Baseball U", 8, &[("Broad Jump", 98.0)]),
                record("John Doe", "Baseball U", 1, &[("Broad Jump", 94.0)]),
                record("Mike Smith", "Baseball U", 1, &[("Broad Jump", 104.0)]),
                record("Ava Cruz", "Rivals", 2, &[("Broad Jump", 112.0)]),
                record("Ava Cruz", "Rivals", 9, &[]),
            ],
            vec!["Broad Jump".to_string()],
        )
    }

    #[test]
    fn alert_follows_direction_of_change() {
        assert_eq!(alert_status(5.1, 5.3), AlertStatus::Declining);
        assert_eq!(alert_status(5.1, 4.9), AlertStatus::Improving);
        assert_eq!(alert_status(5.1, 5.1), AlertStatus::NoChange);
    }

    #[test]
    fn alert_uses_two_most_recent_points() {
        let table = Table::new(
            vec![
                record("John Doe", "Baseball U", 10, &[("40-Yard Dash", 5.0)]),
                record("John Doe", "Baseball U", 1, &[("40-Yard Dash", 5.4)]),
                record("John Doe", "Baseball U", 5, &[("40-Yard Dash", 5.2)]),
            ],
            vec!["40-Yard Dash".to_string()],
        );
        let points = series(&table, "John Doe", "40-Yard Dash");
        assert_eq!(alert_for_series(&points), Some(AlertStatus::Improving));
        assert_eq!(alert_for_series(&points[..1]), None);
    }

    #[test]
    fn tiers_cover_both_directions() {
        let dash = TierScale::new("40-Yard Dash", Direction::LowerIsBetter, 5.3, 4.9, 4.6);
        assert_eq!(classify_tier(&dash, 4.5), Tier::Elite);
        assert_eq!(classify_tier(&dash, 4.6), Tier::Elite);
        assert_eq!(classify_tier(&dash, 4.8), Tier::Advanced);
        assert_eq!(classify_tier(&dash, 5.3), Tier::Developing);
        assert_eq!(classify_tier(&dash, 5.8), Tier::Foundation);

        let jump = TierScale::new("Broad Jump", Direction::HigherIsBetter, 90.0, 100.0, 110.0);
        assert_eq!(classify_tier(&jump, 120.0), Tier::Elite);
        assert_eq!(classify_tier(&jump, 100.0), Tier::Advanced);
        assert_eq!(classify_tier(&jump, 95.0), Tier::Developing);
        assert_eq!(classify_tier(&jump, 60.0), Tier::Foundation);
        assert_eq!(classify_tier(&jump, f64::NAN), Tier::Foundation);
    }

    #[test]
    fn tiers_never_decrease_as_performance_improves() {
        let jump = TierScale::new("Broad Jump", Direction::HigherIsBetter, 90.0, 100.0, 110.0);
        let mut previous = Tier::Foundation;
        for inches in 50..150 {
            let tier = classify_tier(&jump, inches as f64);
            assert!(tier >= previous);
            previous = tier;
        }
        assert_eq!(previous, Tier::Elite);
    }

    #[test]
    fn inverted_scales_are_rejected() {
        let scale = TierScale::new("40-Yard Dash", Direction::HigherIsBetter, 5.3, 4.9, 4.6);
        assert_eq!(
            scale.validate(),
            Err(ScaleError::Unordered("40-Yard Dash".to_string()))
        );
        assert!(TierScales::from_scales(vec![scale]).is_err());
    }

    #[test]
    fn default_scales_cover_dashboard_metrics() {
        let scales = TierScales::default();
        assert_eq!(scales.classify("40-Yard Dash", 4.7), Some(Tier::Advanced));
        assert_eq!(scales.classify("Exit Velocity", 92.0), Some(Tier::Advanced));
        assert_eq!(scales.classify("Sit-and-Reach", 10.0), None);
    }

    #[test]
    fn series_is_chronological_and_skips_missing() {
        let table = sample_table();
        let points = series(&table, "John Doe", "Broad Jump");
        let values: Vec<f64> = points.iter().map(|point| point.value).collect();
        assert_eq!(values, vec![94.0, 98.0]);
        assert_eq!(series(&table, "Ava Cruz", "Broad Jump").len(), 1);
    }

    #[test]
    fn latest_record_prefers_date_then_load_order() {
        let table = sample_table();
        let latest = latest_record(&table, "John Doe").unwrap();
        assert_eq!(latest.metric("Broad Jump"), Some(98.0));

        let tied = Table::new(
            vec![
                record("Mike Smith", "Baseball U", 4, &[("Push-Ups", 30.0)]),
                record("Mike Smith", "Baseball U", 4, &[("Push-Ups", 35.0)]),
            ],
            vec!["Push-Ups".to_string()],
        );
        assert_eq!(latest_record(&tied, "Mike Smith").unwrap().metric("Push-Ups"), Some(35.0));
        assert!(latest_record(&tied, "Nobody").is_none());
    }

    #[test]
    fn team_leaderboard_is_descending_and_scoped() {
        let table = sample_table();
        let board = team_leaderboard(&table, "Baseball U", "Broad Jump", None);

        let players: Vec<&str> = board.iter().map(|entry| entry.player.as_str()).collect();
        assert_eq!(players, vec!["Mike Smith", "John Doe", "John Doe"]);
        assert!(board.iter().all(|entry| entry.team == "Baseball U"));
        assert!(board.windows(2).all(|pair| pair[0].value >= pair[1].value));
        assert_eq!(board.iter().map(|entry| entry.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn global_leaderboard_covers_all_rows_with_the_metric() {
        let table = sample_table();
        let board = global_leaderboard(&table, "Broad Jump", None);
        assert_eq!(board.len(), 4);
        assert_eq!(board[0].player, "Ava Cruz");

        let top_two = global_leaderboard(&table, "Broad Jump", Some(2));
        assert_eq!(top_two.len(), 2);
        assert!(global_leaderboard(&table, "Push-Ups", None).is_empty());
    }

    #[test]
    fn leaderboard_ties_keep_load_order() {
        let table = Table::new(
            vec![
                record("Mike Smith", "Baseball U", 1, &[("Push-Ups", 40.0)]),
                record("John Doe", "Baseball U", 1, &[("Push-Ups", 40.0)]),
            ],
            vec!["Push-Ups".to_string()],
        );
        let board = global_leaderboard(&table, "Push-Ups", None);
        assert_eq!(board[0].player, "Mike Smith");
        assert_eq!(board[1].player, "John Doe");
    }

    #[test]
    fn lookups_do_not_borrow_the_player_name() {
        let table = sample_table();
        let (latest, points) = {
            let name = String::from("Mike Smith");
            (latest_record(&table, &name), series(&table, &name, "Broad Jump"))
        };
        assert_eq!(latest.map(|record| record.team.as_str()), Some("Baseball U"));
        assert_eq!(points.len(), 1);

        let board = {
            let team = String::from("Rivals");
            team_leaderboard(&table, &team, "Broad Jump", None)
        };
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn non_finite_thresholds_are_rejected() {
        let scale = TierScale::new("Broad Jump", Direction::HigherIsBetter, 90.0, f64::NAN, 110.0);
        assert_eq!(scale.validate(), Err(ScaleError::NotFinite("Broad Jump".to_string())));

        let scale = TierScale::new("Push-Ups", Direction::HigherIsBetter, 30.0, 40.0, f64::INFINITY);
        assert!(TierScales::from_scales(vec![scale]).is_err());
    }

    #[test]
    fn scales_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"[{ "metric": "Sit-and-Reach", "direction": "higher_is_better",
                  "developing": 5, "advanced": 10, "elite": 15 }]"#,
        )
        .unwrap();

        let scales = TierScales::from_file(file.path()).unwrap();
        assert_eq!(scales.classify("Sit-and-Reach", 12.0), Some(Tier::Advanced));
        assert_eq!(scales.classify("40-Yard Dash", 4.7), None);
    }

    #[test]
    fn bundled_tier_file_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/tiers.json");
        let scales = TierScales::from_file(&path).unwrap();
        let defaults = TierScales::default();

        for (metric, value) in [("40-Yard Dash", 4.7), ("Exit Velocity", 92.0), ("Push-Ups", 55.0)] {
            assert_eq!(scales.classify(metric, value), defaults.classify(metric, value));
        }
        assert_eq!(scales.classify("40-Yard Dash", 4.7), Some(Tier::Advanced));
    }

    #[test]
    fn bad_tier_files_are_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"not json").unwrap();
        assert!(TierScales::from_file(file.path()).is_err());

        let inverted = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            inverted.path(),
            r#"[{ "metric": "40-Yard Dash", "direction": "higher_is_better",
                 "developing": 5.3, "advanced": 4.9, "elite": 4.6 }]"#,
        )
        .unwrap();
        assert!(TierScales::from_file(inverted.path()).is_err());
        assert!(TierScales::from_file(Path::new("/nonexistent/tiers.json")).is_err());
    }
}
