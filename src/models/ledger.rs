use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RakeSplitRecord {
    /// UTC day of the split, `YYYY-MM-DD`
    pub date: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JackpotWinner {
    /// ISO week of the draw, `YYYY-WW`
    pub week: String,
    pub address: String,
    pub amount: f64,
    pub claimed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingEntry {
    pub address: String,
    /// Amount wagered during the current week
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JackpotStatus {
    pub accumulated_amount: f64,
    /// Milliseconds since the epoch of the next weekly draw
    pub next_draw: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardData {
    pub rake_splits: Vec<RakeSplitRecord>,
    pub jackpot_status: JackpotStatus,
    pub weekly_ranking: Vec<RankingEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JackpotOverview {
    pub status: JackpotStatus,
    pub recent_winners: Vec<JackpotWinner>,
}
