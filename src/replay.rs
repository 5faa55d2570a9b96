//! Replays a log of score events into a leaderboard and renders standings.

use std::{fmt, fmt::Write as _, str::FromStr};

use serde::Deserialize;
use serde_with::DeserializeFromStr;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use yansi::Paint;

use crate::leaderboard::{Ranking, RankingError, RankingResult, Standing};

pub use self::loader::*;

mod loader;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "defaults::top")]
    pub top: i64,
    #[serde(default = "defaults::window")]
    pub window: i64,
    #[serde(default = "defaults::color")]
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            top: defaults::top(),
            window: defaults::window(),
            color: defaults::color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub name: String,
    pub events: Vec<Event>,
    pub around: Vec<String>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, DeserializeFromStr)]
pub enum Event {
    Set { id: String, score: i64 },
    Remove { id: String },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Set { id, score } => write!(f, "set {id} {score}"),
            Event::Remove { id } => write!(f, "remove {id}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid event: {0}")]
pub struct InvalidEvent(String);

impl FromStr for Event {
    type Err = InvalidEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidEvent(s.to_owned());
        let mut words = s.split_whitespace();

        let event = match (words.next(), words.next(), words.next()) {
            (Some(action), Some(id), Some(score)) if action.eq_ignore_ascii_case("set") => {
                Event::Set {
                    id: id.to_owned(),
                    score: score.parse().map_err(|_| invalid())?,
                }
            }
            (Some(action), Some(id), None) if action.eq_ignore_ascii_case("remove") => {
                Event::Remove { id: id.to_owned() }
            }
            _ => return Err(invalid()),
        };

        if words.next().is_some() {
            return Err(invalid());
        }

        Ok(event)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub skipped: usize,
}

impl Replay {
    /// Feeds every event to the board in order. Removing an unknown player
    /// is skipped; anything else that fails stops the replay.
    #[tracing::instrument(skip_all, fields(name = %self.name), err)]
    pub fn apply(&self, board: &impl Ranking) -> RankingResult<Summary> {
        let mut summary = Summary::default();

        for event in &self.events {
            let result = match event {
                Event::Set { id, score } => board.update_score(id, *score),
                Event::Remove { id } => board.remove(id).map(|_| ()),
            };

            match result {
                Ok(()) => summary.applied += 1,
                Err(RankingError::NotFound(id)) => {
                    tracing::warn!("skipping '{event}': player {id} is not on the board");
                    summary.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(
            "applied {} events, skipped {}",
            summary.applied,
            summary.skipped
        );
        Ok(summary)
    }

    /// Top standings followed by a window around each player of interest.
    pub fn report(&self, board: &impl Ranking, config: &Config) -> RankingResult<String> {
        let mut out = String::new();

        heading(&mut out, &format!("{} ({} players)", self.name, board.len()));
        for standing in board.top(config.top)? {
            let updated_at = board.player(&standing.id).map(|p| p.updated_at);
            row(&mut out, &standing, updated_at, false);
        }

        for id in &self.around {
            out.push('\n');
            heading(&mut out, &format!("around {id}"));

            match board.around(id, config.window) {
                Ok(window) => {
                    for standing in window {
                        let focus = *standing.id == **id;
                        let updated_at = board.player(&standing.id).map(|p| p.updated_at);
                        row(&mut out, &standing, updated_at, focus);
                    }
                }
                Err(RankingError::NotFound(_)) => {
                    writeln!(out, "  {}", Paint::red("not ranked")).ok();
                }
                Err(err) => return Err(err),
            }
        }

        Ok(out)
    }
}

fn heading(out: &mut String, title: &str) {
    writeln!(out, "{}", Paint::new(title).bold()).ok();
}

fn row(out: &mut String, standing: &Standing, updated_at: Option<OffsetDateTime>, focus: bool) {
    let id = format!("{:<24}", standing.id);
    let id = if focus {
        Paint::cyan(id).bold()
    } else {
        Paint::new(id)
    };

    let updated_at = updated_at
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| String::from("-"));

    writeln!(
        out,
        "{} {} {:>12}  {}",
        fmt_rank(standing.rank),
        id,
        standing.score,
        Paint::new(updated_at).dimmed()
    )
    .ok();
}

fn fmt_rank(rank: usize) -> impl fmt::Display {
    let text = format!("{rank:>5}.");
    match rank {
        1 => Paint::yellow(text).bold(),
        2 => Paint::white(text).bold(),
        3 => Paint::red(text).bold(),
        _ => Paint::new(text),
    }
}

mod defaults {
    pub fn top() -> i64 {
        10
    }

    pub fn window() -> i64 {
        5
    }

    pub fn color() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{Leaderboard, SequenceClock};

    fn set(id: &str, score: i64) -> Event {
        Event::Set {
            id: id.to_owned(),
            score,
        }
    }

    fn remove(id: &str) -> Event {
        Event::Remove { id: id.to_owned() }
    }

    #[test]
    fn parse_events() {
        assert_eq!("set alice 100".parse(), Ok(set("alice", 100)));
        assert_eq!("SET bob -7".parse(), Ok(set("bob", -7)));
        assert_eq!("  remove   carol ".parse(), Ok(remove("carol")));

        for bad in ["", "set alice", "set alice x", "remove", "remove a b", "add a 1"] {
            assert_eq!(
                bad.parse::<Event>(),
                Err(InvalidEvent(bad.to_owned())),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn event_display_parses_back() {
        for event in [set("alice", i64::MIN), remove("bob")] {
            assert_eq!(event.to_string().parse(), Ok(event));
        }
    }

    #[test]
    fn apply() {
        let replay = Replay {
            name: String::from("weekly"),
            events: vec![
                set("alice", 100),
                set("bob", 200),
                set("carol", 100),
                remove("dave"),
                remove("bob"),
                set("alice", 100),
            ],
            around: vec![],
        };

        let board = Leaderboard::with_clock(SequenceClock::new());
        assert_eq!(
            replay.apply(&board),
            Ok(Summary {
                applied: 5,
                skipped: 1
            })
        );
        assert_eq!(board.len(), 2);
        assert_eq!(board.rank("alice"), Ok((1, 100)));
        assert_eq!(board.rank("carol"), Ok((1, 100)));
    }

    /// Drops `ESC [ ... m` colour sequences.
    fn plain(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                chars.by_ref().find(|&c| c == 'm');
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn report() {
        let replay = Replay {
            name: String::from("weekly"),
            events: vec![set("alice", 100), set("bob", 200), set("carol", 100)],
            around: vec![String::from("carol"), String::from("dave")],
        };

        let board = Leaderboard::with_clock(SequenceClock::new());
        replay.apply(&board).unwrap();

        let config = Config {
            top: 2,
            window: 1,
            color: false,
        };
        let report = plain(&replay.report(&board, &config).unwrap());
        let lines: Vec<_> = report.lines().map(str::trim_end).collect();

        let bob_updated = board
            .player("bob")
            .unwrap()
            .updated_at
            .format(&Rfc3339)
            .unwrap();

        assert_eq!(lines[0], "weekly (3 players)");
        assert!(lines[1].starts_with("    1. bob"));
        assert!(lines[1].ends_with(&format!(" 200  {bob_updated}")));
        assert!(lines[2].starts_with("    2. alice"));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "around carol");
        assert!(lines[5].starts_with("    2. carol"));
        assert_eq!(lines[7], "around dave");
        assert_eq!(lines[8], "  not ranked");
    }
}
