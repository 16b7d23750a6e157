use chrono::{DateTime, NaiveDateTime, Utc};

use crate::config::GameRules;
use crate::game::{Fields, Key, Mode, Plid, RecordError};

const FILE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Score of a won game.
///
/// `701 + ((T - a²) * 100) / T + ((S - s) * 211) / S` where `T` is the
/// attempt budget, `a` the attempts used, `S` the maximum play time and `s`
/// the seconds used. Division truncates towards zero.
pub fn score(rules: &GameRules, attempts: u32, used: u32) -> u32 {
    let max_trials = i64::from(rules.max_trials.max(1));
    let max_time = i64::from(rules.max_play_time.max(1));
    let attempts = i64::from(attempts);
    let used = i64::from(used);

    let score = 701
        + ((max_trials - attempts * attempts) * 100) / max_trials
        + ((max_time - used) * 211) / max_time;

    u32::try_from(score.max(0)).unwrap_or(0)
}

/// A won game as recorded on the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub score: u32,
    pub plid: Plid,
    pub key: Key,
    pub attempts: u32,
    pub mode: Mode,
    pub won_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    /// Glob matching the file names produced by [`LeaderboardEntry::file_name`].
    /// Scores above 999 are possible under custom rules, so the score part
    /// has no fixed width.
    pub const FILE_PATTERN: &'static str =
        "[0-9]*_[0-9][0-9][0-9][0-9][0-9][0-9]_[0-9]*_[0-9]*_[0-9]*.txt";

    /// Entries are named after their score first, so a plain listing already
    /// groups them by score. `seq` tells apart wins of the same player in the
    /// same second.
    pub fn file_name(&self, seq: u32) -> String {
        format!(
            "{:03}_{}_{}_{:03}.txt",
            self.score,
            self.plid,
            self.won_at.format(FILE_TIME_FORMAT),
            seq
        )
    }

    pub fn line(&self) -> String {
        format!(
            "{} {} {} {} {}\n",
            self.score, self.plid, self.key, self.attempts, self.mode
        )
    }

    /// Parses an entry from its file name and its contents. The win time is
    /// only recorded in the file name.
    pub fn parse(file_name: &str, text: &str) -> Result<LeaderboardEntry, RecordError> {
        let stamp = file_name
            .strip_suffix(".txt")
            .and_then(|stem| stem.splitn(3, '_').nth(2))
            .and_then(|rest| rest.rsplit_once('_'))
            .map(|(stamp, _seq)| stamp)
            .ok_or_else(|| RecordError::InvalidField {
                field: "file name",
                value: file_name.to_string(),
            })?;
        let won_at = NaiveDateTime::parse_from_str(stamp, FILE_TIME_FORMAT)
            .map_err(|_| RecordError::InvalidField {
                field: "win time",
                value: stamp.to_string(),
            })?
            .and_utc();

        let mut fields = Fields::new(text.trim());
        let score = fields.number("score")?;
        let plid = fields.next("plid")?.parse()?;
        let key = fields.next("key")?.parse()?;
        let attempts = fields.number("attempts")?;
        let mode = fields.enumeration("mode")?;
        fields.finish()?;

        Ok(LeaderboardEntry {
            score,
            plid,
            key,
            attempts,
            mode,
            won_at,
        })
    }
}
