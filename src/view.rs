use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::metrics::{self, LeaderboardEntry, SeriesPoint, TierScales};
use crate::models::{AlertStatus, Record, Table, Tier};

#[derive(Debug, Error, PartialEq)]
pub enum ViewError {
    #[error("No data available. Load test results before building a report.")]
    NoData,

    #[error("No records found for player '{0}'.")]
    UnknownPlayer(String),
}

/// Everything the dashboard shows for one player and one ranking metric.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub player: String,
    pub team: String,
    pub ranking_metric: String,
    pub latest: Record,
    pub series: BTreeMap<String, Vec<SeriesPoint>>,
    pub tiers: BTreeMap<String, Tier>,
    pub alerts: BTreeMap<String, AlertStatus>,
    pub team_leaderboard: Vec<LeaderboardEntry>,
    pub global_leaderboard: Vec<LeaderboardEntry>,
    pub warnings: Vec<String>,
}

pub struct ViewRequest<'a> {
    pub player: &'a str,
    pub metric: &'a str,
    pub top: Option<usize>,
}

pub fn build_view(
    table: &Table,
    request: &ViewRequest<'_>,
    scales: &TierScales,
) -> Result<PlayerView, ViewError> {
    if table.is_empty() {
        return Err(ViewError::NoData);
    }
    let latest = metrics::latest_record(table, request.player)
        .ok_or_else(|| ViewError::UnknownPlayer(request.player.to_string()))?;

    let mut warnings = Vec::new();
    let mut series = BTreeMap::new();
    let mut alerts = BTreeMap::new();
    for metric in &table.metrics {
        let points = metrics::series(table, request.player, metric);
        if points.is_empty() {
            continue;
        }
        if let Some(alert) = metrics::alert_for_series(&points) {
            alerts.insert(metric.clone(), alert);
        }
        series.insert(metric.clone(), points);
    }

    let tiers = latest
        .metrics
        .iter()
        .filter_map(|(metric, value)| {
            scales
                .classify(metric, *value)
                .map(|tier| (metric.clone(), tier))
        })
        .collect();

    let (team_leaderboard, global_leaderboard) = if table.has_metric(request.metric) {
        (
            metrics::team_leaderboard(table, &latest.team, request.metric, request.top),
            metrics::global_leaderboard(table, request.metric, request.top),
        )
    } else {
        warnings.push(format!(
            "Metric '{}' is not present in the loaded data; leaderboards are empty.",
            request.metric
        ));
        (Vec::new(), Vec::new())
    };

    if latest.metric(request.metric).is_none() && table.has_metric(request.metric) {
        warnings.push(format!(
            "{} has no {} result in the latest session.",
            request.player, request.metric
        ));
    }

    Ok(PlayerView {
        player: latest.player.clone(),
        team: latest.team.clone(),
        ranking_metric: request.metric.to_string(),
        latest: latest.clone(),
        series,
        tiers,
        alerts,
        team_leaderboard,
        global_leaderboard,
        warnings,
    })
}
