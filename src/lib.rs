pub mod leaderboard;
pub mod replay;
