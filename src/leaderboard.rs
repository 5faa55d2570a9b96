use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use thiserror::Error;

pub use self::{clock::*, codec::*, index::*, key::*, table::*};

mod clock;
mod codec;
mod index;
mod key;
mod table;

pub type RankingResult<T> = Result<T, RankingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankingError {
    #[error("player {0} not found")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("internal invariant violated: {0}")]
    InvariantViolation(#[from] IndexError),
}

impl RankingError {
    /// Whether the error points at a bug in the board rather than at the
    /// caller's input.
    pub fn is_internal(&self) -> bool {
        matches!(self, RankingError::InvariantViolation(_))
    }
}

/// One row of a ranking.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Standing {
    pub rank: usize,
    pub id: Arc<str>,
    pub score: i64,
}

/// The operations a leaderboard offers to whatever sits in front of it.
pub trait Ranking {
    fn update_score(&self, id: &str, score: i64) -> RankingResult<()>;
    fn rank(&self, id: &str) -> RankingResult<(usize, i64)>;
    fn top(&self, n: i64) -> RankingResult<Vec<Standing>>;
    fn around(&self, id: &str, n: i64) -> RankingResult<Vec<Standing>>;
    fn remove(&self, id: &str) -> RankingResult<Player>;
    fn player(&self, id: &str) -> Option<Player>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Board {
    players: PlayerTable,
    index: OrderedIndex,
}

impl Board {
    fn update(&mut self, id: &str, score: i64, now: Attainment) -> RankingResult<Upsert> {
        let upsert = self.players.upsert(id, score, now);
        if !upsert.changed() {
            return Ok(upsert);
        }

        let indexed = match &upsert {
            Upsert::Unchanged(_) => Ok(()),
            Upsert::Created(player) => self.index.insert(player.key()),
            Upsert::Changed { previous, current } => self.reindex(previous, current),
        };

        if let Err(err) = indexed {
            tracing::error!("failed to index player {id}: {err}");
            match upsert {
                Upsert::Created(_) => {
                    self.players.remove(id);
                }
                Upsert::Changed { previous, .. } => self.players.restore(previous),
                Upsert::Unchanged(_) => {}
            }
            return Err(err.into());
        }

        Ok(upsert)
    }

    fn reindex(&mut self, previous: &Player, current: &Player) -> Result<(), IndexError> {
        self.index.delete(&previous.key())?;

        if let Err(err) = self.index.insert(current.key()) {
            if let Err(restore) = self.index.insert(previous.key()) {
                tracing::error!(
                    "failed to restore ordering key of player {}: {restore}",
                    previous.id
                );
            }
            return Err(err);
        }

        Ok(())
    }

    fn remove(&mut self, id: &str) -> RankingResult<Player> {
        let player = self
            .players
            .remove(id)
            .ok_or_else(|| RankingError::NotFound(id.to_owned()))?;

        if let Err(err) = self.index.delete(&player.key()) {
            tracing::error!("failed to unindex player {id}: {err}");
            self.players.restore(player);
            return Err(err.into());
        }

        Ok(player)
    }

    fn player(&self, id: &str) -> RankingResult<&Player> {
        self.players
            .get(id)
            .ok_or_else(|| RankingError::NotFound(id.to_owned()))
    }

    fn rank(&self, id: &str) -> RankingResult<(usize, i64)> {
        let player = self.player(id)?;
        let key = player.key();

        let rank = self
            .index
            .rank_of(&key)
            .ok_or(IndexError::MissingKey(key))?;

        Ok((rank, player.score))
    }

    fn position(&self, id: &str) -> RankingResult<usize> {
        let key = self.player(id)?.key();

        Ok(self
            .index
            .position_of(&key)
            .ok_or(IndexError::MissingKey(key))?)
    }

    /// Up to `count` standings starting at 1-based position `start`.
    ///
    /// The first row asks the index for its competition rank; after that a
    /// row shares the previous rank when the scores tie and otherwise takes
    /// its own position.
    fn standings(&self, start: usize, count: usize) -> Vec<Standing> {
        let keys = self.index.range_by_position(start, count);
        let mut standings: Vec<Standing> = Vec::with_capacity(keys.len());

        for (offset, key) in keys.into_iter().enumerate() {
            let rank = match standings.last() {
                Some(previous) if previous.score == key.score => previous.rank,
                Some(_) => start + offset,
                None => self.index.rank_of_score(key.score),
            };

            standings.push(Standing {
                rank,
                id: key.id.clone(),
                score: key.score,
            });
        }

        standings
    }

    /// A window of `n` positions centred on `position`, pulled back from the
    /// bottom edge so it stays full whenever the population allows.
    fn window(&self, position: usize, n: usize) -> Vec<Standing> {
        let len = self.index.len();

        let mut start = position.saturating_sub(n / 2).max(1);
        let end = start.saturating_add(n - 1);
        if end > len {
            start = (len.saturating_sub(n) + 1).max(1);
        }

        self.standings(start, n)
    }
}

fn positive(n: i64) -> RankingResult<usize> {
    if n <= 0 {
        return Err(RankingError::InvalidArgument("n must be greater than 0"));
    }

    Ok(usize::try_from(n).unwrap_or(usize::MAX))
}

/// Thread-safe leaderboard over a player table and its ordered index.
///
/// Both structures sit behind one reader/writer lock, so readers never see a
/// score change half applied.
#[derive(Debug)]
pub struct Leaderboard<C = MonotonicClock> {
    board: RwLock<Board>,
    clock: C,
}

impl Leaderboard {
    pub fn new() -> Self {
        Leaderboard::with_clock(MonotonicClock::new())
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Leaderboard::new()
    }
}

impl<C: Clock> Leaderboard<C> {
    pub fn with_clock(clock: C) -> Self {
        Leaderboard {
            board: RwLock::new(Board::default()),
            clock,
        }
    }

    /// Sets a player's score, creating the player if needed.
    ///
    /// Re-submitting the current score changes nothing, so whoever reached a
    /// score first stays ahead of later arrivals at the same score.
    #[tracing::instrument(skip(self))]
    pub fn update_score(&self, id: &str, score: i64) -> RankingResult<()> {
        let mut board = self.board.write();
        let now = self.clock.now();

        match board.update(id, score, now)? {
            Upsert::Created(_) => tracing::debug!("player {id} joined with score {score}"),
            Upsert::Changed { previous, .. } => {
                tracing::trace!("player {id} moved from {} to {score}", previous.score)
            }
            Upsert::Unchanged(_) => tracing::trace!("player {id} resubmitted the same score"),
        }

        Ok(())
    }

    /// Competition rank and score of a player.
    pub fn rank(&self, id: &str) -> RankingResult<(usize, i64)> {
        self.board.read().rank(id)
    }

    /// Ranks several players against one consistent snapshot.
    pub fn ranks<S: AsRef<str> + Sync>(&self, ids: &[S]) -> Vec<RankingResult<(usize, i64)>> {
        let guard = self.board.read();
        let board: &Board = &guard;

        ids.par_iter().map(|id| board.rank(id.as_ref())).collect()
    }

    pub fn player(&self, id: &str) -> Option<Player> {
        self.board.read().players.get(id).cloned()
    }

    /// The best `n` standings, or all of them if fewer exist.
    pub fn top(&self, n: i64) -> RankingResult<Vec<Standing>> {
        let n = positive(n)?;
        let standings = self.board.read().standings(1, n);
        tracing::trace!("top {n} returned {} standings", standings.len());

        Ok(standings)
    }

    /// `n` consecutive standings around a player, the player included.
    pub fn around(&self, id: &str, n: i64) -> RankingResult<Vec<Standing>> {
        let n = positive(n)?;

        let board = self.board.read();
        let position = board.position(id)?;
        tracing::trace!("player {id} sits at position {position}");

        Ok(board.window(position, n))
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&self, id: &str) -> RankingResult<Player> {
        let player = self.board.write().remove(id)?;
        tracing::debug!("player {id} removed with score {}", player.score);

        Ok(player)
    }

    /// Number of players with a score in `min..=max`.
    pub fn count_in_score_range(&self, min: i64, max: i64) -> usize {
        self.board.read().index.count_in_score_range(min, max)
    }

    pub fn len(&self) -> usize {
        self.board.read().players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock> Ranking for Leaderboard<C> {
    fn update_score(&self, id: &str, score: i64) -> RankingResult<()> {
        Leaderboard::update_score(self, id, score)
    }

    fn rank(&self, id: &str) -> RankingResult<(usize, i64)> {
        Leaderboard::rank(self, id)
    }

    fn top(&self, n: i64) -> RankingResult<Vec<Standing>> {
        Leaderboard::top(self, n)
    }

    fn around(&self, id: &str, n: i64) -> RankingResult<Vec<Standing>> {
        Leaderboard::around(self, id, n)
    }

    fn remove(&self, id: &str) -> RankingResult<Player> {
        Leaderboard::remove(self, id)
    }

    fn player(&self, id: &str) -> Option<Player> {
        Leaderboard::player(self, id)
    }

    fn len(&self) -> usize {
        Leaderboard::len(self)
    }
}
