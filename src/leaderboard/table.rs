use std::{collections::HashMap, sync::Arc};

use time::OffsetDateTime;

use super::{clock::Attainment, key::OrderingKey};

/// A player's current standing data. Identity never changes once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: Arc<str>,
    pub score: i64,
    pub attained: Attainment,
    /// Wall-clock time of the last score change. Display only.
    pub updated_at: OffsetDateTime,
}

impl Player {
    pub fn key(&self) -> OrderingKey {
        OrderingKey::new(self.score, self.attained, self.id.clone())
    }
}

/// Outcome of [`PlayerTable::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    Created(Player),
    Changed { previous: Player, current: Player },
    Unchanged(Player),
}

impl Upsert {
    pub fn player(&self) -> &Player {
        match self {
            Upsert::Created(player)
            | Upsert::Changed {
                current: player, ..
            }
            | Upsert::Unchanged(player) => player,
        }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, Upsert::Unchanged(_))
    }
}

/// Owns every player record, keyed by identifier.
#[derive(Debug, Default, Clone)]
pub struct PlayerTable {
    players: HashMap<Arc<str>, Player>,
}

impl PlayerTable {
    pub fn new() -> Self {
        PlayerTable::default()
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// Creates or updates a player. The attainment time only moves when the
    /// score actually changes.
    pub fn upsert(&mut self, id: &str, score: i64, now: Attainment) -> Upsert {
        match self.players.get_mut(id) {
            Some(player) if player.score == score => Upsert::Unchanged(player.clone()),
            Some(player) => {
                let previous = player.clone();
                player.score = score;
                player.attained = now;
                player.updated_at = OffsetDateTime::now_utc();

                Upsert::Changed {
                    previous,
                    current: player.clone(),
                }
            }
            None => {
                let id: Arc<str> = Arc::from(id);
                let player = Player {
                    id: id.clone(),
                    score,
                    attained: now,
                    updated_at: OffsetDateTime::now_utc(),
                };
                self.players.insert(id, player.clone());

                Upsert::Created(player)
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Player> {
        self.players.remove(id)
    }

    /// Puts a record back exactly as it was, undoing a failed write.
    pub fn restore(&mut self, player: Player) {
        self.players.insert(player.id.clone(), player);
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
