pub mod game;
pub mod ledger;
pub mod player;

pub use game::{BetLimits, GameKind, GameLimits, GamePools, GameTableInfo, PoolInfo};
pub use ledger::{
    AdminDashboardData, JackpotOverview, JackpotStatus, JackpotWinner, RakeSplitRecord,
    RankingEntry,
};
pub use player::{PlayerStats, RoundRecord};
