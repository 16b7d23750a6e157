use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use itertools::Itertools;
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter, EnumString};
use thiserror::Error as ThisError;

/// Number of colors in a secret key.
pub const KEY_LEN: usize = 4;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S";

/// Player identifier. Always rendered as 6 zero-padded digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Plid(u32);

impl Plid {
    pub const MAX: u32 = 999_999;
    pub const LEN: usize = 6;

    pub fn new(id: u32) -> Option<Plid> {
        (id <= Self::MAX).then_some(Plid(id))
    }
}

impl fmt::Display for Plid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl FromStr for Plid {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RecordError::InvalidField {
                field: "plid",
                value: s.to_string(),
            });
        }
        // Six digits always fit below `MAX`.
        s.parse().map(Plid).map_err(|_| RecordError::InvalidField {
            field: "plid",
            value: s.to_string(),
        })
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, EnumCountMacro,
)]
pub enum Color {
    #[strum(serialize = "R")]
    Red,
    #[strum(serialize = "G")]
    Green,
    #[strum(serialize = "B")]
    Blue,
    #[strum(serialize = "Y")]
    Yellow,
    #[strum(serialize = "O")]
    Orange,
    #[strum(serialize = "P")]
    Purple,
}

impl Color {
    /// Maps a single wire byte to a color. Only uppercase codes are accepted.
    pub fn from_byte(byte: u8) -> Option<Color> {
        match byte {
            b'R' => Some(Color::Red),
            b'G' => Some(Color::Green),
            b'B' => Some(Color::Blue),
            b'Y' => Some(Color::Yellow),
            b'O' => Some(Color::Orange),
            b'P' => Some(Color::Purple),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Mastermind peg feedback for one guess.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pegs {
    pub blacks: u8,
    pub whites: u8,
}

impl Pegs {
    pub fn is_solved(&self) -> bool {
        self.blacks as usize == KEY_LEN
    }
}

/// A sequence of four colors, used both for secret keys and for guesses.
///
/// `Display` renders the compact form (`RGBY`) used in game files, while
/// [`Key::spaced`] renders the space separated form used on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key([Color; KEY_LEN]);

impl Key {
    pub fn new(colors: [Color; KEY_LEN]) -> Key {
        Key(colors)
    }

    /// Draws a key from the operating system's random source.
    pub fn random() -> Key {
        let palette: Vec<Color> = Color::iter().collect();
        let mut rng = OsRng;
        let mut colors = [Color::Red; KEY_LEN];
        for color in colors.iter_mut() {
            *color = palette[rng.gen_range(0..Color::COUNT)];
        }
        Key(colors)
    }

    pub fn spaced(&self) -> String {
        self.0.iter().join(" ")
    }

    /// Scores `guess` against this key.
    ///
    /// Blacks count exact positional matches. Among the remaining positions,
    /// each color contributes the smaller of its unmatched counts in the key
    /// and in the guess as whites.
    pub fn evaluate(&self, guess: &Key) -> Pegs {
        let mut key_count = [0u8; Color::COUNT];
        let mut guess_count = [0u8; Color::COUNT];
        let mut blacks = 0;

        for (secret, guessed) in self.0.iter().zip(guess.0.iter()) {
            if secret == guessed {
                blacks += 1;
            } else {
                key_count[secret.index()] += 1;
                guess_count[guessed.index()] += 1;
            }
        }

        let whites = key_count
            .iter()
            .zip(guess_count.iter())
            .map(|(k, g)| *k.min(g))
            .sum();

        Pegs { blacks, whites }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for color in self.0.iter() {
            write!(f, "{}", color)?;
        }
        Ok(())
    }
}

impl FromStr for Key {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RecordError::InvalidField {
            field: "key",
            value: s.to_string(),
        };

        let bytes = s.as_bytes();
        if bytes.len() != KEY_LEN {
            return Err(invalid());
        }

        let mut colors = [Color::Red; KEY_LEN];
        for (color, byte) in colors.iter_mut().zip(bytes) {
            *color = Color::from_byte(*byte).ok_or_else(invalid)?;
        }
        Ok(Key(colors))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
pub enum Mode {
    #[strum(serialize = "P")]
    Play,
    #[strum(serialize = "D")]
    Debug,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Play => "PLAY",
            Mode::Debug => "DEBUG",
        }
    }
}

/// Reason a game was closed. The `Display` form is the one-letter code used in
/// archived file names and trailers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
pub enum Ending {
    #[strum(serialize = "W")]
    Win,
    #[strum(serialize = "L")]
    Lost,
    #[strum(serialize = "Q")]
    Quit,
    #[strum(serialize = "T")]
    Timeout,
}

impl Ending {
    pub fn label(&self) -> &'static str {
        match self {
            Ending::Win => "WIN",
            Ending::Lost => "FAIL",
            Ending::Quit => "QUIT",
            Ending::Timeout => "TIMEOUT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    pub key: Key,
    pub pegs: Pegs,
    /// Seconds since the game started.
    pub elapsed: u32,
}

impl Attempt {
    const PREFIX: &'static str = "T:";

    pub fn line(&self) -> String {
        format!(
            "{} {} {} {} {}\n",
            Self::PREFIX,
            self.key,
            self.pegs.blacks,
            self.pegs.whites,
            self.elapsed
        )
    }

    fn parse(line: &str) -> Result<Attempt, RecordError> {
        let mut fields = Fields::new(line);
        fields.expect(Self::PREFIX)?;
        let key = fields.next("key")?.parse()?;
        let blacks = fields.number("blacks")?;
        let whites = fields.number("whites")?;
        let elapsed = fields.number("elapsed")?;
        fields.finish()?;

        Ok(Attempt {
            key,
            pegs: Pegs { blacks, whites },
            elapsed,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameEnd {
    pub ending: Ending,
    pub ended_at: DateTime<Utc>,
    /// Seconds the player spent on the game.
    pub used: u32,
}

impl GameEnd {
    pub fn line(&self) -> String {
        format!(
            "{} {} {} {}\n",
            self.ended_at.format(DATE_FORMAT),
            self.ended_at.format(TIME_FORMAT),
            self.used,
            self.ending
        )
    }

    fn parse(line: &str) -> Result<GameEnd, RecordError> {
        let mut fields = Fields::new(line);
        let ended_at = fields.datetime()?;
        let used = fields.number("used")?;
        let ending = fields.enumeration("ending")?;
        fields.finish()?;

        Ok(GameEnd {
            ending,
            ended_at,
            used,
        })
    }
}

/// One game session as it is stored in a game file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    pub plid: Plid,
    pub mode: Mode,
    pub key: Key,
    pub max_play_time: u32,
    pub started_at: DateTime<Utc>,
    pub attempts: Vec<Attempt>,
    pub end: Option<GameEnd>,
}

impl Game {
    pub fn new(
        plid: Plid,
        mode: Mode,
        key: Key,
        max_play_time: u32,
        started_at: DateTime<Utc>,
    ) -> Game {
        Game {
            plid,
            mode,
            key,
            max_play_time,
            started_at,
            attempts: Vec::new(),
            end: None,
        }
    }

    pub fn header(&self) -> String {
        format!(
            "{} {} {} {} {} {} {}\n",
            self.plid,
            self.mode,
            self.key,
            self.max_play_time,
            self.started_at.format(DATE_FORMAT),
            self.started_at.format(TIME_FORMAT),
            self.started_at.timestamp()
        )
    }

    /// Seconds between the game start and `now`, clamped at zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> u32 {
        let secs = (now - self.started_at).num_seconds();
        u32::try_from(secs.max(0)).unwrap_or(u32::MAX)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.elapsed(now) >= self.max_play_time
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> u32 {
        self.max_play_time.saturating_sub(self.elapsed(now))
    }

    /// The instant the play time runs out.
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::seconds(i64::from(self.max_play_time))
    }

    pub fn parse(text: &str) -> Result<Game, RecordError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = lines.next().ok_or(RecordError::MissingHeader)?;

        let mut fields = Fields::new(header);
        let plid = fields.next("plid")?.parse()?;
        let mode = fields.enumeration("mode")?;
        let key = fields.next("key")?.parse()?;
        let max_play_time = fields.number("max_play_time")?;
        // The pretty date and time are informative; the unix timestamp is
        // authoritative.
        fields.next("date")?;
        fields.next("time")?;
        let timestamp: i64 = fields.number("timestamp")?;
        fields.finish()?;

        let started_at = DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
            RecordError::InvalidField {
                field: "timestamp",
                value: timestamp.to_string(),
            }
        })?;

        let mut game = Game::new(plid, mode, key, max_play_time, started_at);
        for line in lines {
            if game.end.is_some() {
                return Err(RecordError::TrailingRecord(line.to_string()));
            }
            if line.starts_with(Attempt::PREFIX) {
                game.attempts.push(Attempt::parse(line)?);
            } else {
                game.end = Some(GameEnd::parse(line)?);
            }
        }

        Ok(game)
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum RecordError {
    #[error("record is missing its header line")]
    MissingHeader,
    #[error("record is missing the {0} field")]
    MissingField(&'static str),
    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("unexpected trailing data: {0:?}")]
    TrailingRecord(String),
}

/// Whitespace separated field reader shared by the record parsers.
pub(crate) struct Fields<'a> {
    parts: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(line: &'a str) -> Fields<'a> {
        Fields {
            parts: line.split_whitespace(),
        }
    }

    pub(crate) fn next(&mut self, field: &'static str) -> Result<&'a str, RecordError> {
        self.parts.next().ok_or(RecordError::MissingField(field))
    }

    fn expect(&mut self, token: &'static str) -> Result<(), RecordError> {
        match self.next(token)? {
            value if value == token => Ok(()),
            value => Err(RecordError::InvalidField {
                field: token,
                value: value.to_string(),
            }),
        }
    }

    pub(crate) fn number<T: FromStr>(&mut self, field: &'static str) -> Result<T, RecordError> {
        let value = self.next(field)?;
        value.parse().map_err(|_| RecordError::InvalidField {
            field,
            value: value.to_string(),
        })
    }

    pub(crate) fn enumeration<T: FromStr>(
        &mut self,
        field: &'static str,
    ) -> Result<T, RecordError> {
        self.number(field)
    }

    fn datetime(&mut self) -> Result<DateTime<Utc>, RecordError> {
        let date = self.next("date")?;
        let time = self.next("time")?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| {
            RecordError::InvalidField {
                field: "date",
                value: date.to_string(),
            }
        })?;
        let time = NaiveTime::parse_from_str(time, TIME_FORMAT).map_err(|_| {
            RecordError::InvalidField {
                field: "time",
                value: time.to_string(),
            }
        })?;
        Ok(date.and_time(time).and_utc())
    }

    pub(crate) fn finish(mut self) -> Result<(), RecordError> {
        match self.parts.next() {
            None => Ok(()),
            Some(extra) => Err(RecordError::TrailingRecord(extra.to_string())),
        }
    }
}
