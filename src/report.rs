use std::fmt::Write;

use crate::metrics::LeaderboardEntry;
use crate::models::{Player, Team};
use crate::view::PlayerView;

pub fn build_report(view: &PlayerView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Player Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}), ranked by {}",
        view.player,
        team_label(&view.team),
        view.ranking_metric
    );

    if !view.warnings.is_empty() {
        let _ = writeln!(output);
        for warning in &view.warnings {
            let _ = writeln!(output, "> Warning: {warning}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Session ({})", view.latest.date);
    if view.latest.metrics.is_empty() {
        let _ = writeln!(output, "No metrics recorded in the latest session.");
    } else {
        let _ = writeln!(output, "| Metric | Value | Tier | Trend |");
        let _ = writeln!(output, "|---|---|---|---|");
        for (metric, value) in &view.latest.metrics {
            let tier = view
                .tiers
                .get(metric)
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string());
            let trend = view
                .alerts
                .get(metric)
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(output, "| {metric} | {value:.2} | {tier} | {trend} |");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## History");
    if view.series.is_empty() {
        let _ = writeln!(output, "No history recorded for this player.");
    }
    for (metric, points) in &view.series {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {metric}");
        let _ = writeln!(output, "| Date | Value |");
        let _ = writeln!(output, "|---|---|");
        for point in points {
            let _ = writeln!(output, "| {} | {:.2} |", point.date, point.value);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## {} Leaderboard: {}",
        team_label(&view.team),
        view.ranking_metric
    );
    write_leaderboard_rows(&mut output, &view.team_leaderboard);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Global Leaderboard: {}", view.ranking_metric);
    write_leaderboard_rows(&mut output, &view.global_leaderboard);

    output
}

pub fn build_leaderboard(title: &str, entries: &[LeaderboardEntry]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## {title}");
    write_leaderboard_rows(&mut output, entries);
    output
}

fn write_leaderboard_rows(output: &mut String, entries: &[LeaderboardEntry]) {
    if entries.is_empty() {
        let _ = writeln!(output, "No results recorded for this metric.");
        return;
    }
    let _ = writeln!(output, "| Rank | Player | Team | Date | Value |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for entry in entries {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {:.2} |",
            entry.rank,
            entry.player,
            team_label(&entry.team),
            entry.date,
            entry.value
        );
    }
}

/// The coach-facing team table: name, age and the two velocity readings.
pub fn build_roster(team: Option<&Team>, players: &[Player]) -> String {
    let mut output = String::new();
    let title = team
        .map(|team| format!("{} Player Dashboard", team.name))
        .unwrap_or_else(|| "BATPATH Player Dashboard".to_string());

    let _ = writeln!(output, "# {title}");
    if players.is_empty() {
        let _ = writeln!(output, "No players on this roster.");
        return output;
    }
    let _ = writeln!(output, "| Name | Age | Exit Velocity | Throwing Velocity |");
    let _ = writeln!(output, "|---|---|---|---|");
    for player in players {
        let _ = writeln!(
            output,
            "| {} | {} | {} mph | {} mph |",
            player.name, player.age, player.exit_velocity, player.throwing_velocity
        );
    }
    output
}

fn team_label(team: &str) -> &str {
    if team.is_empty() {
        "Unassigned"
    } else {
        team
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TierScales;
    use crate::models::{Record, Table};
    use crate::view::{build_view, ViewRequest};
    use chrono::NaiveDate;

    fn table() -> Table {
        let record = |day: u32, dash: f64| Record {
            player: "John Doe".to_string(),
            team: "Baseball U".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            metrics: [("40-Yard Dash".to_string(), dash)].into_iter().collect(),
        };
        Table::new(vec![record(1, 5.2), record(8, 4.8)], vec!["40-Yard Dash".to_string()])
    }

    #[test]
    fn report_lists_every_section() {
        let request = ViewRequest {
            player: "John Doe",
            metric: "40-Yard Dash",
            top: None,
        };
        let view = build_view(&table(), &request, &TierScales::default()).unwrap();
        let report = build_report(&view);

        assert!(report.contains("# Player Performance Report"));
        assert!(report.contains("| 40-Yard Dash | 4.80 | Advanced | Improving |"));
        assert!(report.contains("### 40-Yard Dash"));
        assert!(report.contains("| 2024-06-01 | 5.20 |"));
        assert!(report.contains("## Baseball U Leaderboard: 40-Yard Dash"));
        assert!(report.contains("## Global Leaderboard: 40-Yard Dash"));
        assert!(!report.contains("Warning"));
    }

    #[test]
    fn empty_leaderboard_has_placeholder() {
        let output = build_leaderboard("Global Leaderboard: Push-Ups", &[]);
        assert!(output.contains("No results recorded for this metric."));
    }

    #[test]
    fn roster_shows_velocities_in_mph() {
        let team = Team {
            id: 1,
            name: "Baseball U".to_string(),
        };
        let players = vec![Player {
            id: 1,
            name: "John Doe".to_string(),
            age: 14,
            exit_velocity: 85,
            throwing_velocity: 78,
            team_id: Some(1),
        }];

        let output = build_roster(Some(&team), &players);
        assert!(output.starts_with("# Baseball U Player Dashboard"));
        assert!(output.contains("| John Doe | 14 | 85 mph | 78 mph |"));
        assert!(build_roster(None, &[]).contains("BATPATH Player Dashboard"));
    }
}
