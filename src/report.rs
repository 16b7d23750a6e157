//! Human readable files returned by the TCP commands.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::game::{Game, Mode, DATE_FORMAT, TIME_FORMAT};
use crate::score::LeaderboardEntry;
use crate::store::Inspection;

/// Upper bound of a file name on the wire.
pub const FILE_NAME_MAX: usize = 24;

#[derive(Clone, Debug, PartialEq)]
pub struct ReportFile {
    pub name: String,
    pub data: Bytes,
}

/// Describes the player's active game, or the last one they finished.
/// The secret key of an active game is only shown in debug mode.
pub fn game_state(inspection: &Inspection) -> ReportFile {
    let plid = match inspection {
        Inspection::Active { game, .. } | Inspection::Finished(game) => game.plid,
    };

    ReportFile {
        name: format!("STATE_{}.txt", plid),
        data: Bytes::from(GameState(inspection).to_string()),
    }
}

/// Renders the leaderboard as a ranked table.
pub fn scoreboard(entries: &[LeaderboardEntry], now: DateTime<Utc>) -> ReportFile {
    ReportFile {
        name: format!("TOPSCORES_{}.txt", now.timestamp()),
        data: Bytes::from(Leaderboard(entries).to_string()),
    }
}

struct GameState<'a>(&'a Inspection);

impl fmt::Display for GameState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Inspection::Active { game, remaining } => {
                writeln!(f, "Active game found for player {}", game.plid)?;
                write_header(f, game, game.mode == Mode::Debug)?;
                write_attempts(f, game)?;
                writeln!(f, "  -- {} seconds remaining to be completed --", remaining)
            }
            Inspection::Finished(game) => {
                writeln!(f, "Last finalized game for player {}", game.plid)?;
                write_header(f, game, true)?;
                write_attempts(f, game)?;
                match &game.end {
                    Some(end) => writeln!(
                        f,
                        "     Termination: {} at {} {}, Duration: {}s",
                        end.ending.label(),
                        end.ended_at.format(DATE_FORMAT),
                        end.ended_at.format(TIME_FORMAT),
                        end.used
                    ),
                    None => Ok(()),
                }
            }
        }
    }
}

fn write_header(f: &mut fmt::Formatter<'_>, game: &Game, reveal: bool) -> fmt::Result {
    writeln!(
        f,
        "Game initiated: {} {} with {} seconds to be completed",
        game.started_at.format(DATE_FORMAT),
        game.started_at.format(TIME_FORMAT),
        game.max_play_time
    )?;
    if reveal {
        writeln!(f, "Mode: {}  Secret code: {}", game.mode.label(), game.key)?;
    } else {
        writeln!(f, "Mode: {}  Secret code: ****", game.mode.label())?;
    }
    writeln!(f)
}

fn write_attempts(f: &mut fmt::Formatter<'_>, game: &Game) -> fmt::Result {
    if game.attempts.is_empty() {
        writeln!(f, "     Game started - no transactions found")?;
    } else {
        writeln!(f, "     --- Transactions found: {} ---", game.attempts.len())?;
        for attempt in &game.attempts {
            writeln!(
                f,
                "     Trial: {}, nB: {}, nW: {} at {:3}s",
                attempt.key, attempt.pegs.blacks, attempt.pegs.whites, attempt.elapsed
            )?;
        }
    }
    writeln!(f)
}

struct Leaderboard<'a>(&'a [LeaderboardEntry]);

impl fmt::Display for Leaderboard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-------------------------------- TOP 10 SCORES --------------------------------")?;
        writeln!(f)?;
        writeln!(f, "                 SCORE PLAYER     CODE    NO TRIALS   MODE")?;
        writeln!(f)?;
        for (rank, entry) in self.0.iter().enumerate() {
            writeln!(
                f,
                "            {:>2} - {:>4}  {}     {}        {}       {}",
                rank + 1,
                entry.score,
                entry.plid,
                entry.key,
                entry.attempts,
                entry.mode.label()
            )?;
        }
        Ok(())
    }
}
