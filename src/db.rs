use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::models::{Coach, Player, Record, Table, Team};
use crate::sheet;

const UNASSIGNED_TEAM: &str = "Unassigned";
const EXIT_VELOCITY: &str = "Exit Velocity";
const THROWING_VELOCITY: &str = "Throwing Velocity";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read access to teams, coaches, players and their test sessions.
#[async_trait]
pub trait Roster: Send + Sync {
    async fn find_coach_by_email(&self, email: &str) -> Result<Option<Coach>, StoreError>;
    async fn fetch_team(&self, id: i32) -> Result<Option<Team>, StoreError>;
    async fn fetch_players_by_team(&self, team_id: i32) -> Result<Vec<Player>, StoreError>;
    async fn fetch_records(&self) -> Result<Table, StoreError>;
}

pub struct PgRoster {
    pool: PgPool,
}

impl PgRoster {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Roster for PgRoster {
    async fn find_coach_by_email(&self, email: &str) -> Result<Option<Coach>, StoreError> {
        let coach = sqlx::query_as::<_, Coach>("SELECT id, email, team_id FROM coaches WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coach)
    }

    async fn fetch_team(&self, id: i32) -> Result<Option<Team>, StoreError> {
        let team = sqlx::query_as::<_, Team>("SELECT id, name FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(team)
    }

    async fn fetch_players_by_team(&self, team_id: i32) -> Result<Vec<Player>, StoreError> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT id, name, age, exit_velocity, throwing_velocity, team_id \
             FROM players WHERE team_id = $1 ORDER BY id",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }

    async fn fetch_records(&self) -> Result<Table, StoreError> {
        let rows = sqlx::query(
            "SELECT p.name AS player, COALESCE(t.name, '') AS team, \
             pt.tested_on, pt.metric, pt.value \
             FROM player_tests pt \
             JOIN players p ON p.id = pt.player_id \
             LEFT JOIN teams t ON t.id = p.team_id \
             ORDER BY pt.id",
        )
        .fetch_all(&self.pool)
        .await?;

        let tests = rows
            .into_iter()
            .map(|row| TestRow {
                player: row.get("player"),
                team: row.get("team"),
                tested_on: row.get("tested_on"),
                metric: row.get("metric"),
                value: row.get("value"),
            })
            .collect();

        Ok(pivot_tests(tests))
    }
}

/// One metric reading as stored in `player_tests`.
#[derive(Debug, Clone)]
pub struct TestRow {
    pub player: String,
    pub team: String,
    pub tested_on: NaiveDate,
    pub metric: String,
    pub value: f64,
}

/// Folds long-format readings into one record per player, team and date,
/// ordered by each session's first reading.
pub fn pivot_tests(tests: Vec<TestRow>) -> Table {
    let mut table = Table::default();
    let mut sessions: HashMap<(String, String, NaiveDate), usize> = HashMap::new();

    for test in tests {
        if !table.has_metric(&test.metric) {
            table.metrics.push(test.metric.clone());
        }
        let key = (test.player.clone(), test.team.clone(), test.tested_on);
        let idx = *sessions.entry(key).or_insert_with(|| {
            table.records.push(Record {
                player: test.player.clone(),
                team: test.team.clone(),
                date: test.tested_on,
                metrics: Default::default(),
            });
            table.records.len() - 1
        });
        table.records[idx].metrics.insert(test.metric, test.value);
    }

    table
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let team_id = upsert_team(pool, "Baseball U").await?;

    sqlx::query(
        r#"
        INSERT INTO coaches (email, team_id)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE SET team_id = EXCLUDED.team_id
        "#,
    )
    .bind("deweeseperformance@gmail.com")
    .bind(team_id)
    .execute(pool)
    .await?;

    let players = vec![("John Doe", 14, 85, 78), ("Mike Smith", 16, 92, 84)];
    let mut player_ids = HashMap::new();
    for (name, age, exit_velocity, throwing_velocity) in players {
        let id: i32 = sqlx::query(
            r#"
            INSERT INTO players (name, age, exit_velocity, throwing_velocity, team_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name, team_id) DO UPDATE
            SET age = EXCLUDED.age,
                exit_velocity = EXCLUDED.exit_velocity,
                throwing_velocity = EXCLUDED.throwing_velocity
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(age)
        .bind(exit_velocity)
        .bind(throwing_velocity)
        .bind(team_id)
        .fetch_one(pool)
        .await?
        .get("id");
        player_ids.insert(name, id);
    }

    let first = NaiveDate::from_ymd_opt(2025, 1, 15).context("invalid date")?;
    let second = NaiveDate::from_ymd_opt(2025, 2, 15).context("invalid date")?;
    let tests = vec![
        ("John Doe", first, "40-Yard Dash", 5.21),
        ("John Doe", first, "Exit Velocity", 82.0),
        ("John Doe", first, "Throwing Velocity", 76.0),
        ("John Doe", second, "40-Yard Dash", 5.05),
        ("John Doe", second, "Exit Velocity", 85.0),
        ("John Doe", second, "Throwing Velocity", 78.0),
        ("Mike Smith", first, "40-Yard Dash", 4.88),
        ("Mike Smith", first, "Exit Velocity", 90.0),
        ("Mike Smith", first, "Throwing Velocity", 84.0),
        ("Mike Smith", second, "40-Yard Dash", 4.93),
        ("Mike Smith", second, "Exit Velocity", 92.0),
        ("Mike Smith", second, "Throwing Velocity", 84.0),
    ];

    for (name, tested_on, metric, value) in tests {
        let player_id = player_ids
            .get(name)
            .copied()
            .with_context(|| format!("seed player {name} missing"))?;
        insert_test(pool, player_id, tested_on, metric, value).await?;
    }

    Ok(())
}

/// Imports a sheet export into `player_tests`, creating teams and players as
/// needed. Returns the number of new readings and the rows that were skipped.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<(usize, Vec<String>)> {
    let load = sheet::load_csv(csv_path)
        .with_context(|| format!("failed to load {}", csv_path.display()))?;
    let mut team_ids: HashMap<String, i32> = HashMap::new();
    let mut player_ids: HashMap<(String, String), i32> = HashMap::new();

    for card in roster_cards(&load.table, &load.ages) {
        let team_id = match team_ids.get(&card.team) {
            Some(id) => *id,
            None => {
                let id = upsert_team(pool, &card.team).await?;
                team_ids.insert(card.team.clone(), id);
                id
            }
        };

        let player_id: i32 = sqlx::query(
            r#"
            INSERT INTO players (name, age, exit_velocity, throwing_velocity, team_id)
            VALUES ($1, COALESCE($2, 0), COALESCE($3, 0), COALESCE($4, 0), $5)
            ON CONFLICT (name, team_id) DO UPDATE SET age = COALESCE($2, players.age)
            RETURNING id
            "#,
        )
        .bind(&card.player)
        .bind(card.age)
        .bind(card.exit_velocity)
        .bind(card.throwing_velocity)
        .bind(team_id)
        .fetch_one(pool)
        .await?
        .get("id");
        player_ids.insert((card.player, card.team), player_id);
    }

    let mut inserted = 0usize;
    for record in &load.table.records {
        let key = (record.player.clone(), roster_team(&record.team).to_string());
        let player_id = player_ids
            .get(&key)
            .copied()
            .with_context(|| format!("no roster entry for {}", record.player))?;

        for (metric, value) in &record.metrics {
            if insert_test(pool, player_id, record.date, metric, *value).await? {
                inserted += 1;
            }
        }
    }

    for player_id in player_ids.values() {
        sync_roster_velocities(pool, *player_id).await?;
    }

    Ok((inserted, load.warnings))
}

/// What the roster table holds for one player after an import: the newest age
/// and velocity readings the sheet has for them.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterCard {
    pub player: String,
    pub team: String,
    pub age: Option<i32>,
    pub exit_velocity: Option<i32>,
    pub throwing_velocity: Option<i32>,
}

/// One card per player and team, in first-seen order. Each field comes from
/// the latest-dated row that carries it; a later row wins a date tie.
pub fn roster_cards(table: &Table, ages: &[Option<i32>]) -> Vec<RosterCard> {
    #[derive(Default)]
    struct Newest {
        age: Option<(NaiveDate, i32)>,
        exit_velocity: Option<(NaiveDate, i32)>,
        throwing_velocity: Option<(NaiveDate, i32)>,
    }

    fn keep_newest(slot: &mut Option<(NaiveDate, i32)>, date: NaiveDate, value: Option<i32>) {
        let Some(value) = value else { return };
        if slot.map_or(true, |(seen, _)| date >= seen) {
            *slot = Some((date, value));
        }
    }

    let mut order: Vec<(String, String)> = Vec::new();
    let mut newest: HashMap<(String, String), Newest> = HashMap::new();

    for (idx, record) in table.records.iter().enumerate() {
        let key = (record.player.clone(), roster_team(&record.team).to_string());
        if !newest.contains_key(&key) {
            order.push(key.clone());
        }
        let entry = newest.entry(key).or_default();

        let velocity = |metric: &str| record.metric(metric).map(|value| value.round() as i32);
        keep_newest(&mut entry.age, record.date, ages.get(idx).copied().flatten());
        keep_newest(&mut entry.exit_velocity, record.date, velocity(EXIT_VELOCITY));
        keep_newest(&mut entry.throwing_velocity, record.date, velocity(THROWING_VELOCITY));
    }

    order
        .into_iter()
        .map(|key| {
            let entry = newest.remove(&key).unwrap_or_default();
            RosterCard {
                player: key.0,
                team: key.1,
                age: entry.age.map(|(_, value)| value),
                exit_velocity: entry.exit_velocity.map(|(_, value)| value),
                throwing_velocity: entry.throwing_velocity.map(|(_, value)| value),
            }
        })
        .collect()
}

fn roster_team(team: &str) -> &str {
    if team.is_empty() {
        UNASSIGNED_TEAM
    } else {
        team
    }
}

/// Points the roster card at the newest stored velocity readings, whichever
/// import they came from.
async fn sync_roster_velocities(pool: &PgPool, player_id: i32) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE players p SET
            exit_velocity = COALESCE((
                SELECT ROUND(pt.value)::INT FROM player_tests pt
                WHERE pt.player_id = p.id AND pt.metric = $2
                ORDER BY pt.tested_on DESC, pt.id DESC LIMIT 1
            ), p.exit_velocity),
            throwing_velocity = COALESCE((
                SELECT ROUND(pt.value)::INT FROM player_tests pt
                WHERE pt.player_id = p.id AND pt.metric = $3
                ORDER BY pt.tested_on DESC, pt.id DESC LIMIT 1
            ), p.throwing_velocity)
        WHERE p.id = $1
        "#,
    )
    .bind(player_id)
    .bind(EXIT_VELOCITY)
    .bind(THROWING_VELOCITY)
    .execute(pool)
    .await?;
    Ok(())
}

async fn upsert_team(pool: &PgPool, name: &str) -> anyhow::Result<i32> {
    let id: i32 = sqlx::query(
        r#"
        INSERT INTO teams (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn insert_test(
    pool: &PgPool,
    player_id: i32,
    tested_on: NaiveDate,
    metric: &str,
    value: f64,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO player_tests (player_id, tested_on, metric, value)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (player_id, tested_on, metric) DO NOTHING
        "#,
    )
    .bind(player_id)
    .bind(tested_on)
    .bind(metric)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
