use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One player's test session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub player: String,
    pub team: String,
    pub date: NaiveDate,
    pub metrics: BTreeMap<String, f64>,
}

impl Record {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Records in load order plus the metric columns seen while loading.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub records: Vec<Record>,
    pub metrics: Vec<String>,
}

impl Table {
    pub fn new(records: Vec<Record>, metrics: Vec<String>) -> Self {
        Self { records, metrics }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_metric(&self, name: &str) -> bool {
        self.metrics.iter().any(|metric| metric == name)
    }

    pub fn for_player<'a, 'p>(&'a self, player: &'p str) -> impl Iterator<Item = &'a Record> + 'p
    where
        'a: 'p,
    {
        self.records.iter().filter(move |record| record.player == player)
    }

    pub fn for_team<'a, 'p>(&'a self, team: &'p str) -> impl Iterator<Item = &'a Record> + 'p
    where
        'a: 'p,
    {
        self.records.iter().filter(move |record| record.team == team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Foundation,
    Developing,
    Advanced,
    Elite,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Foundation => "Foundation",
            Tier::Developing => "Developing",
            Tier::Advanced => "Advanced",
            Tier::Elite => "Elite",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    Improving,
    #[serde(rename = "No Change")]
    NoChange,
    Declining,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertStatus::Improving => "Improving",
            AlertStatus::NoChange => "No Change",
            AlertStatus::Declining => "Declining",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coach {
    pub id: i32,
    pub email: String,
    pub team_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub exit_velocity: i32,
    pub throwing_velocity: i32,
    pub team_id: Option<i32>,
}
