use chrono::{DateTime, Utc};
use glob_match::glob_match;
use itertools::Itertools;
use std::cmp::Reverse;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{debug, info, warn};

use crate::config::GameRules;
use crate::game::{Attempt, Ending, Game, GameEnd, Key, Mode, Pegs, Plid, RecordError};
use crate::score::{self, LeaderboardEntry};

const GAMES_DIR: &str = "GAMES";
const SCORES_DIR: &str = "SCORES";
const ARCHIVE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";
const ARCHIVE_PATTERN: &str =
    "[0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9]_[0-9][0-9][0-9][0-9][0-9][0-9]_[0-9][0-9][0-9]_[WLQT].txt";

/// Leaderboard entries returned by [`InnerStore::scoreboard`].
pub const SCOREBOARD_LEN: usize = 10;

/// The Store owns every game file and leaderboard entry. It keeps one active
/// game file per player, moves the file into the player's history directory
/// once the game finishes, and writes a leaderboard entry for every win.
///
/// The store holds no lock over the files: operations on different players
/// never touch the same file, and retransmitted tries for the same player are
/// absorbed by the idempotent replay rule of [`InnerStore::record_attempt`].
/// It is cheap to clone and can be shared across tasks.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    /// Opens the store rooted at `root`, creating its directories if needed.
    pub fn open(root: impl Into<PathBuf>, rules: GameRules) -> Result<Store, GameError> {
        let root = root.into();
        fs::create_dir_all(root.join(GAMES_DIR))?;
        fs::create_dir_all(root.join(SCORES_DIR))?;
        debug!(root = %root.display(), "opened game store");

        Ok(Store {
            inner: Arc::new(InnerStore { root, rules }),
        })
    }
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct InnerStore {
    root: PathBuf,
    rules: GameRules,
}

/// State of a player's active game slot at a given instant.
#[derive(Debug, PartialEq)]
pub enum Expiry {
    NoSession,
    /// The game ran out of time and has just been closed.
    Expired(Key),
    Active { game: Game, remaining: u32 },
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Ongoing,
    Won { score: u32 },
    /// The attempt budget is exhausted; carries the revealed key.
    Lost(Key),
}

#[derive(Debug, PartialEq)]
pub struct AttemptResult {
    pub pegs: Pegs,
    /// Number of attempts recorded after this call.
    pub trial: u32,
    pub outcome: Outcome,
}

#[derive(Debug, PartialEq)]
pub enum Inspection {
    Active { game: Game, remaining: u32 },
    Finished(Game),
}

impl InnerStore {
    /// Closes the player's game if it ran out of time at `now`.
    pub fn check_expiry(&self, plid: Plid, now: DateTime<Utc>) -> Result<Expiry, GameError> {
        let Some(game) = self.load_active(plid)? else {
            return Ok(Expiry::NoSession);
        };

        if game.is_expired(now) {
            let ended_at = game.deadline();
            self.finalize(&game, Ending::Timeout, ended_at, game.max_play_time)?;
            info!(%plid, key = %game.key, "game timed out");
            return Ok(Expiry::Expired(game.key));
        }

        let remaining = game.remaining(now);
        Ok(Expiry::Active { game, remaining })
    }

    /// Starts a new game. `debug_key` selects debug mode with a chosen key,
    /// otherwise a random key is drawn.
    pub fn create_game(
        &self,
        plid: Plid,
        now: DateTime<Utc>,
        max_play_time: u32,
        debug_key: Option<Key>,
    ) -> Result<Key, GameError> {
        if max_play_time == 0 || max_play_time > self.rules.max_play_time {
            return Err(GameError::InvalidPlayTime {
                requested: max_play_time,
                max: self.rules.max_play_time,
            });
        }
        if let Expiry::Active { .. } = self.check_expiry(plid, now)? {
            return Err(GameError::OngoingGame(plid));
        }

        let (mode, key) = match debug_key {
            Some(key) => (Mode::Debug, key),
            None => (Mode::Play, Key::random()),
        };

        let game = Game::new(plid, mode, key, max_play_time, now);
        fs::write(self.active_path(plid), game.header())?;

        Ok(key)
    }

    /// Records trial number `trial` with guess `key`.
    ///
    /// Resending the last recorded trial with the same key replays its result
    /// without writing anything.
    pub fn record_attempt(
        &self,
        plid: Plid,
        now: DateTime<Utc>,
        key: Key,
        trial: u32,
    ) -> Result<AttemptResult, GameError> {
        let game = match self.check_expiry(plid, now)? {
            Expiry::NoSession => return Err(GameError::UncontextualizedSession(plid)),
            Expiry::Expired(key) => return Err(GameError::TimedOut { plid, key }),
            Expiry::Active { game, .. } => game,
        };

        let recorded = game.attempts.len() as u32;
        let last = game.attempts.last().map(|attempt| attempt.key);

        if trial == recorded && last == Some(key) {
            return Ok(AttemptResult {
                pegs: game.key.evaluate(&key),
                trial: recorded,
                outcome: Outcome::Ongoing,
            });
        }
        if trial == recorded || trial != recorded + 1 {
            return Err(GameError::InvalidTrial {
                plid,
                trial,
                expected: recorded + 1,
            });
        }
        if game.attempts.iter().any(|attempt| attempt.key == key) {
            return Err(GameError::DuplicateTrial { plid, key });
        }

        let elapsed = game.elapsed(now);
        let pegs = game.key.evaluate(&key);
        let attempt = Attempt {
            key,
            pegs,
            elapsed,
        };
        self.append(&self.active_path(plid), &attempt.line())?;

        let trial = recorded + 1;
        let outcome = if pegs.is_solved() {
            self.finalize(&game, Ending::Win, now, elapsed)?;
            let score = self.save_score(&game, trial, elapsed, now)?;
            Outcome::Won { score }
        } else if trial >= self.rules.max_trials {
            self.finalize(&game, Ending::Lost, now, elapsed)?;
            Outcome::Lost(game.key)
        } else {
            Outcome::Ongoing
        };

        Ok(AttemptResult {
            pegs,
            trial,
            outcome,
        })
    }

    /// Gives up the player's active game and returns its key.
    pub fn quit_game(&self, plid: Plid, now: DateTime<Utc>) -> Result<Key, GameError> {
        let game = match self.check_expiry(plid, now)? {
            Expiry::Active { game, .. } => game,
            Expiry::NoSession | Expiry::Expired(_) => {
                return Err(GameError::UncontextualizedSession(plid))
            }
        };

        self.finalize(&game, Ending::Quit, now, game.elapsed(now))?;
        Ok(game.key)
    }

    /// Returns the active game, or the most recently finished one.
    pub fn inspect_last_game(
        &self,
        plid: Plid,
        now: DateTime<Utc>,
    ) -> Result<Inspection, GameError> {
        if let Expiry::Active { game, remaining } = self.check_expiry(plid, now)? {
            return Ok(Inspection::Active { game, remaining });
        }

        let path = self
            .last_finished_game(plid)?
            .ok_or(GameError::NeverPlayed(plid))?;
        let game = self.load(&path)?;

        Ok(Inspection::Finished(game))
    }

    /// Best scores first; equal scores keep the order they were achieved in.
    pub fn scoreboard(&self) -> Result<Vec<LeaderboardEntry>, GameError> {
        let dir = self.root.join(SCORES_DIR);
        let mut entries = Vec::new();

        for file_name in list_files(&dir, LeaderboardEntry::FILE_PATTERN)? {
            let path = dir.join(&file_name);
            let text = fs::read_to_string(&path)?;
            let entry = LeaderboardEntry::parse(&file_name, &text)
                .map_err(|source| GameError::Corrupt { path, source })?;
            entries.push((entry, file_name));
        }

        if entries.is_empty() {
            return Err(GameError::EmptyLeaderboard);
        }

        // Wins within the same second fall back to their file sequence number.
        Ok(entries
            .into_iter()
            .sorted_by(|(a, a_name), (b, b_name)| {
                (Reverse(a.score), a.won_at, a_name).cmp(&(Reverse(b.score), b.won_at, b_name))
            })
            .map(|(entry, _)| entry)
            .take(SCOREBOARD_LEN)
            .collect())
    }

    /// Moves the active game file into the player's history directory and
    /// appends the trailer there. Until the rename succeeds the game stays
    /// active and untouched.
    fn finalize(
        &self,
        game: &Game,
        ending: Ending,
        ended_at: DateTime<Utc>,
        used: u32,
    ) -> Result<(), GameError> {
        let end = GameEnd {
            ending,
            ended_at,
            used,
        };
        let archived = self.archive(game.plid, &end)?;
        self.append(&archived, &end.line())?;

        debug!(plid = %game.plid, path = %archived.display(), "archived game");
        Ok(())
    }

    /// Renames the active game file to `<end time>_<seq>_<ending>.txt`, where
    /// `seq` is the first number not taken by another game of the player
    /// that ended in the same second. Names keep sorting by end time.
    fn archive(&self, plid: Plid, end: &GameEnd) -> Result<PathBuf, GameError> {
        let history = self.history_dir(plid);
        fs::create_dir_all(&history)?;

        let stamp = end.ended_at.format(ARCHIVE_TIME_FORMAT).to_string();
        let mut seq = 0;
        let archived = loop {
            let path = history.join(format!("{}_{:03}_{}.txt", stamp, seq, end.ending));
            if !path.exists() {
                break path;
            }
            seq += 1;
        };

        fs::rename(self.active_path(plid), &archived)?;
        Ok(archived)
    }

    fn save_score(
        &self,
        game: &Game,
        attempts: u32,
        used: u32,
        won_at: DateTime<Utc>,
    ) -> Result<u32, GameError> {
        let entry = LeaderboardEntry {
            score: score::score(&self.rules, attempts, used),
            plid: game.plid,
            key: game.key,
            attempts,
            mode: game.mode,
            won_at,
        };

        let dir = self.root.join(SCORES_DIR);
        let mut seq = 0;
        let mut file = loop {
            let path = dir.join(entry.file_name(seq));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => seq += 1,
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(entry.line().as_bytes())?;

        Ok(entry.score)
    }

    fn last_finished_game(&self, plid: Plid) -> Result<Option<PathBuf>, GameError> {
        let dir = self.history_dir(plid);
        if !dir.is_dir() {
            return Ok(None);
        }

        // Archive names start with the end time, so the newest sorts last.
        let last = list_files(&dir, ARCHIVE_PATTERN)?.into_iter().max();
        Ok(last.map(|file_name| dir.join(file_name)))
    }

    /// Loads the player's active game. An active file that already carries
    /// a trailer was finished but never archived; it is archived now.
    fn load_active(&self, plid: Plid) -> Result<Option<Game>, GameError> {
        let path = self.active_path(plid);
        let game = match fs::read_to_string(&path) {
            Ok(text) => {
                Game::parse(&text).map_err(|source| GameError::Corrupt { path, source })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if let Some(end) = &game.end {
            let archived = self.archive(plid, end)?;
            warn!(%plid, path = %archived.display(), "archived a finished game left active");
            return Ok(None);
        }

        Ok(Some(game))
    }

    fn load(&self, path: &Path) -> Result<Game, GameError> {
        let text = fs::read_to_string(path)?;
        Game::parse(&text).map_err(|source| GameError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    fn append(&self, path: &Path, record: &str) -> Result<(), GameError> {
        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(record.as_bytes())?;
        Ok(())
    }

    fn active_path(&self, plid: Plid) -> PathBuf {
        self.root.join(GAMES_DIR).join(format!("GAME_{}.txt", plid))
    }

    fn history_dir(&self, plid: Plid) -> PathBuf {
        self.root.join(GAMES_DIR).join(plid.to_string())
    }
}

fn list_files(dir: &Path, pattern: &str) -> Result<Vec<String>, GameError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if glob_match(pattern, name) {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

#[derive(Debug, ThisError)]
pub enum GameError {
    #[error("player {0} has an ongoing game")]
    OngoingGame(Plid),
    #[error("play time of {requested}s is outside 1..={max}s")]
    InvalidPlayTime { requested: u32, max: u32 },
    #[error("player {0} has no ongoing game")]
    UncontextualizedSession(Plid),
    #[error("game of player {plid} timed out, key was {key}")]
    TimedOut { plid: Plid, key: Key },
    #[error("player {plid} sent trial {trial}, expected {expected}")]
    InvalidTrial { plid: Plid, trial: u32, expected: u32 },
    #[error("player {plid} already tried {key}")]
    DuplicateTrial { plid: Plid, key: Key },
    #[error("player {0} has never played")]
    NeverPlayed(Plid),
    #[error("the scoreboard is empty")]
    EmptyLeaderboard,
    #[error("corrupt record {}: {source}", .path.display())]
    Corrupt { path: PathBuf, source: RecordError },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl GameError {
    /// Infrastructure failures, as opposed to a request breaking a game rule.
    pub fn is_internal(&self) -> bool {
        matches!(self, GameError::Corrupt { .. } | GameError::Io(_))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    pub(crate) fn key(s: &str) -> Key {
        s.parse().unwrap()
    }

    pub(crate) fn plid(id: u32) -> Plid {
        Plid::new(id).unwrap()
    }

    pub(crate) fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), GameRules::default()).unwrap();
        (dir, store)
    }

    fn history(dir: &TempDir, plid: Plid) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir.path().join(GAMES_DIR).join(plid.to_string()))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn active_text(dir: &TempDir, plid: Plid) -> String {
        fs::read_to_string(dir.path().join(GAMES_DIR).join(format!("GAME_{}.txt", plid))).unwrap()
    }

    #[test]
    fn create_game_rejects_ongoing_game() {
        let (_dir, store) = open_store();
        let p = plid(1);

        store.create_game(p, at(0), 60, None).unwrap();
        let err = store.create_game(p, at(10), 60, None).unwrap_err();

        assert!(matches!(err, GameError::OngoingGame(_)));
    }

    #[test]
    fn create_game_replaces_expired_game() {
        let (dir, store) = open_store();
        let p = plid(1);

        store.create_game(p, at(0), 60, Some(key("RGBY"))).unwrap();
        let new_key = store.create_game(p, at(60), 60, Some(key("OPOP"))).unwrap();

        assert_eq!(new_key, key("OPOP"));
        assert_eq!(history(&dir, p), vec!["20231114_221420_000_T.txt"]);
        assert!(active_text(&dir, p).contains("OPOP"));
    }

    #[test]
    fn play_mode_draws_random_key() {
        let (dir, store) = open_store();
        let p = plid(7);

        let secret = store.create_game(p, at(0), 600, None).unwrap();

        let game = Game::parse(&active_text(&dir, p)).unwrap();
        assert_eq!(game.key, secret);
        assert_eq!(game.mode, Mode::Play);
    }

    #[test]
    fn record_attempt_scores_guess() {
        let (dir, store) = open_store();
        let p = plid(106485);
        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();

        let result = store.record_attempt(p, at(5), key("GROG"), 1).unwrap();

        assert_eq!(
            result,
            AttemptResult {
                pegs: Pegs {
                    blacks: 0,
                    whites: 2
                },
                trial: 1,
                outcome: Outcome::Ongoing,
            }
        );
        assert!(active_text(&dir, p).ends_with("T: GROG 0 2 5\n"));
    }

    #[test]
    fn record_attempt_replays_last_trial() {
        let (dir, store) = open_store();
        let p = plid(2);
        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();

        let first = store.record_attempt(p, at(5), key("RGOO"), 1).unwrap();
        let replay = store.record_attempt(p, at(6), key("RGOO"), 1).unwrap();

        assert_eq!(first, replay);
        let game = Game::parse(&active_text(&dir, p)).unwrap();
        assert_eq!(game.attempts.len(), 1);
    }

    #[test]
    fn record_attempt_rejects_out_of_order_trials() {
        let (_dir, store) = open_store();
        let p = plid(3);
        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();

        for trial in [0, 2, 5] {
            let err = store.record_attempt(p, at(1), key("OOOO"), trial).unwrap_err();
            assert!(matches!(err, GameError::InvalidTrial { .. }), "trial {trial}");
        }

        store.record_attempt(p, at(2), key("OOOO"), 1).unwrap();

        // Same trial number with a different key.
        let err = store.record_attempt(p, at(3), key("PPPP"), 1).unwrap_err();
        assert!(matches!(err, GameError::InvalidTrial { .. }));
        let err = store.record_attempt(p, at(3), key("PPPP"), 3).unwrap_err();
        assert!(matches!(err, GameError::InvalidTrial { .. }));
    }

    #[test]
    fn record_attempt_rejects_repeated_guess() {
        let (_dir, store) = open_store();
        let p = plid(4);
        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();

        store.record_attempt(p, at(1), key("OOOO"), 1).unwrap();
        store.record_attempt(p, at(2), key("PPPP"), 2).unwrap();
        let err = store.record_attempt(p, at(3), key("OOOO"), 3).unwrap_err();

        assert!(matches!(err, GameError::DuplicateTrial { .. }));
    }

    #[test]
    fn invalid_trial_takes_precedence_over_duplicate() {
        let (_dir, store) = open_store();
        let p = plid(4);
        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();

        store.record_attempt(p, at(1), key("OOOO"), 1).unwrap();
        store.record_attempt(p, at(2), key("PPPP"), 2).unwrap();
        let err = store.record_attempt(p, at(3), key("OOOO"), 2).unwrap_err();

        assert!(matches!(err, GameError::InvalidTrial { .. }));
    }

    #[test]
    fn winning_attempt_finishes_game_and_scores() {
        let (dir, store) = open_store();
        let p = plid(5);
        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();

        let result = store.record_attempt(p, at(0), key("RGBY"), 1).unwrap();

        assert_eq!(result.trial, 1);
        assert_eq!(result.outcome, Outcome::Won { score: 999 });
        assert_eq!(history(&dir, p), vec!["20231114_221320_000_W.txt"]);

        let board = store.scoreboard().unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].score, 999);
        assert_eq!(board[0].plid, p);
        assert_eq!(board[0].mode, Mode::Debug);

        // The game is archived, nothing is left to play.
        let err = store.record_attempt(p, at(1), key("RGBY"), 1).unwrap_err();
        assert!(matches!(err, GameError::UncontextualizedSession(_)));
    }

    #[test]
    fn eighth_miss_loses_game() {
        let (dir, store) = open_store();
        let p = plid(6);
        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();

        let guesses = ["OOOO", "PPPP", "RRRR", "GGGG", "BBBB", "YYYY", "OOPP", "PPOO"];
        for (i, guess) in guesses.iter().enumerate() {
            let trial = i as u32 + 1;
            let result = store.record_attempt(p, at(trial as i64), key(guess), trial).unwrap();
            assert_eq!(result.trial, trial);
            if trial < 8 {
                assert_eq!(result.outcome, Outcome::Ongoing);
            } else {
                assert_eq!(result.outcome, Outcome::Lost(key("RGBY")));
            }
        }

        assert_eq!(history(&dir, p), vec!["20231114_221328_000_L.txt"]);
        assert!(matches!(store.scoreboard(), Err(GameError::EmptyLeaderboard)));
    }

    #[test]
    fn eighth_attempt_may_still_win() {
        let (_dir, store) = open_store();
        let p = plid(6);
        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();

        let guesses = ["OOOO", "PPPP", "RRRR", "GGGG", "BBBB", "YYYY", "OOPP"];
        for (i, guess) in guesses.iter().enumerate() {
            store.record_attempt(p, at(1), key(guess), i as u32 + 1).unwrap();
        }
        let result = store.record_attempt(p, at(2), key("RGBY"), 8).unwrap();

        assert!(matches!(result.outcome, Outcome::Won { .. }));
    }

    #[test]
    fn attempt_after_deadline_times_out() {
        let (dir, store) = open_store();
        let p = plid(8);
        store.create_game(p, at(0), 30, Some(key("RGBY"))).unwrap();

        let err = store.record_attempt(p, at(30), key("OOOO"), 1).unwrap_err();

        assert!(matches!(err, GameError::TimedOut { key: k, .. } if k == key("RGBY")));
        let archived = history(&dir, p);
        assert_eq!(archived, vec!["20231114_221350_000_T.txt"]);

        let text = fs::read_to_string(
            dir.path().join(GAMES_DIR).join(p.to_string()).join(&archived[0]),
        )
        .unwrap();
        let game = Game::parse(&text).unwrap();
        let end = game.end.unwrap();
        assert_eq!(end.ending, Ending::Timeout);
        assert_eq!(end.used, 30);
    }

    #[test]
    fn check_expiry_reports_remaining_time() {
        let (_dir, store) = open_store();
        let p = plid(9);
        store.create_game(p, at(0), 100, Some(key("RGBY"))).unwrap();

        match store.check_expiry(p, at(40)).unwrap() {
            Expiry::Active { remaining, .. } => assert_eq!(remaining, 60),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            store.check_expiry(p, at(100)).unwrap(),
            Expiry::Expired(key("RGBY"))
        );
        assert_eq!(store.check_expiry(p, at(101)).unwrap(), Expiry::NoSession);
    }

    #[test]
    fn quit_reveals_key() {
        let (dir, store) = open_store();
        let p = plid(10);
        store.create_game(p, at(0), 600, Some(key("YYBB"))).unwrap();

        assert_eq!(store.quit_game(p, at(12)).unwrap(), key("YYBB"));
        assert_eq!(history(&dir, p), vec!["20231114_221332_000_Q.txt"]);
        assert!(matches!(
            store.quit_game(p, at(13)),
            Err(GameError::UncontextualizedSession(_))
        ));
    }

    #[test]
    fn quit_after_deadline_has_no_game() {
        let (dir, store) = open_store();
        let p = plid(11);
        store.create_game(p, at(0), 10, Some(key("YYBB"))).unwrap();

        assert!(matches!(
            store.quit_game(p, at(15)),
            Err(GameError::UncontextualizedSession(_))
        ));
        assert_eq!(history(&dir, p), vec!["20231114_221330_000_T.txt"]);
    }

    #[test]
    fn inspect_returns_active_or_last_finished_game() {
        let (_dir, store) = open_store();
        let p = plid(12);

        assert!(matches!(
            store.inspect_last_game(p, at(0)),
            Err(GameError::NeverPlayed(_))
        ));

        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();
        store.record_attempt(p, at(3), key("RGOO"), 1).unwrap();
        match store.inspect_last_game(p, at(10)).unwrap() {
            Inspection::Active { game, remaining } => {
                assert_eq!(game.attempts.len(), 1);
                assert_eq!(remaining, 590);
            }
            other => panic!("unexpected {:?}", other),
        }

        store.quit_game(p, at(20)).unwrap();
        store.create_game(p, at(30), 600, Some(key("OOOO"))).unwrap();
        store.quit_game(p, at(40)).unwrap();

        match store.inspect_last_game(p, at(50)).unwrap() {
            Inspection::Finished(game) => {
                assert_eq!(game.key, key("OOOO"));
                assert_eq!(game.end.unwrap().ending, Ending::Quit);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn inspect_closes_expired_game() {
        let (_dir, store) = open_store();
        let p = plid(13);
        store.create_game(p, at(0), 10, Some(key("RGBY"))).unwrap();

        match store.inspect_last_game(p, at(10)).unwrap() {
            Inspection::Finished(game) => {
                assert_eq!(game.end.unwrap().ending, Ending::Timeout);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn scoreboard_keeps_ten_best_in_order() {
        let (dir, store) = open_store();

        for id in 0..12u32 {
            let p = plid(id);
            store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();
            // Later players take longer, so they score lower.
            store
                .record_attempt(p, at(i64::from(id) * 10), key("RGBY"), 1)
                .unwrap();
        }
        // A stray file in the scores directory is not an entry.
        fs::write(dir.path().join(SCORES_DIR).join("notes.txt"), "hello").unwrap();

        let board = store.scoreboard().unwrap();

        assert_eq!(board.len(), SCOREBOARD_LEN);
        assert!(board.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(board[0].plid, plid(0));
    }

    #[test]
    fn scoreboard_ties_keep_win_order() {
        let (_dir, store) = open_store();

        for (id, offset) in [(1u32, 100i64), (2, 0)] {
            let p = plid(id);
            store.create_game(p, at(offset), 600, Some(key("RGBY"))).unwrap();
            store.record_attempt(p, at(offset), key("RGBY"), 1).unwrap();
        }

        let board = store.scoreboard().unwrap();

        assert_eq!(board[0].score, board[1].score);
        assert_eq!(board[0].plid, plid(2));
        assert_eq!(board[1].plid, plid(1));
    }

    #[test]
    fn games_ending_in_the_same_second_are_all_kept() {
        let (dir, store) = open_store();
        let p = plid(14);

        store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();
        store.quit_game(p, at(0)).unwrap();
        store.create_game(p, at(0), 600, Some(key("OOOO"))).unwrap();
        store.quit_game(p, at(0)).unwrap();

        assert_eq!(
            history(&dir, p),
            vec!["20231114_221320_000_Q.txt", "20231114_221320_001_Q.txt"]
        );
        // The newest archive is the one reported as the last game.
        match store.inspect_last_game(p, at(1)).unwrap() {
            Inspection::Finished(game) => assert_eq!(game.key, key("OOOO")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn equal_wins_in_the_same_second_get_their_own_entries() {
        let (_dir, store) = open_store();
        let p = plid(15);

        for _ in 0..2 {
            store.create_game(p, at(0), 600, Some(key("RGBY"))).unwrap();
            store.record_attempt(p, at(0), key("RGBY"), 1).unwrap();
        }

        let board = store.scoreboard().unwrap();
        assert_eq!(board.len(), 2);
        assert!(board.iter().all(|entry| entry.score == 999 && entry.plid == p));
    }

    #[test]
    fn custom_rules_bound_play_time_and_scores() {
        let dir = TempDir::new().unwrap();
        let rules = GameRules {
            max_trials: 10,
            max_play_time: 300,
        };
        let store = Store::open(dir.path(), rules).unwrap();
        let p = plid(16);

        assert!(matches!(
            store.create_game(p, at(0), 301, None),
            Err(GameError::InvalidPlayTime { requested: 301, max: 300 })
        ));
        assert!(matches!(
            store.create_game(p, at(0), 0, None),
            Err(GameError::InvalidPlayTime { .. })
        ));

        store.create_game(p, at(0), 300, Some(key("RGBY"))).unwrap();
        let result = store.record_attempt(p, at(0), key("RGBY"), 1).unwrap();
        assert_eq!(result.outcome, Outcome::Won { score: 1002 });

        let board = store.scoreboard().unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].score, 1002);
    }

    #[test]
    fn finished_game_left_active_is_archived_on_load() {
        let (dir, store) = open_store();
        let p = plid(17);

        let game = Game::new(p, Mode::Debug, key("RGBY"), 600, at(0));
        let attempt = Attempt {
            key: key("OOOO"),
            pegs: Pegs::default(),
            elapsed: 5,
        };
        let end = GameEnd {
            ending: Ending::Quit,
            ended_at: at(10),
            used: 10,
        };
        let text = format!("{}{}{}", game.header(), attempt.line(), end.line());
        fs::write(dir.path().join(GAMES_DIR).join(format!("GAME_{}.txt", p)), text).unwrap();

        assert_eq!(store.check_expiry(p, at(20)).unwrap(), Expiry::NoSession);
        assert_eq!(history(&dir, p), vec!["20231114_221330_000_Q.txt"]);

        store.create_game(p, at(30), 600, Some(key("PPPP"))).unwrap();
        let result = store.record_attempt(p, at(31), key("OOOO"), 1).unwrap();
        assert_eq!(result.trial, 1);
        match store.inspect_last_game(p, at(32)).unwrap() {
            Inspection::Active { game, .. } => assert_eq!(game.key, key("PPPP")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
