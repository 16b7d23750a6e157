pub mod debug_game;
pub mod executable;
pub mod quit;
pub mod scoreboard;
pub mod show_trials;
pub mod start_game;
pub mod try_;

use bytes::Buf;
use chrono::{DateTime, Utc};
use std::io::Cursor;
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::game::{Color, Key, Plid, KEY_LEN};
use crate::reply::{QuitStatus, Status, TcpReply, TryStatus, UdpReply};
use crate::store::Store;
use crate::Error;

use debug_game::DebugGame;
use quit::Quit;
use scoreboard::Scoreboard;
use show_trials::ShowTrials;
use start_game::StartGame;
use try_::Try;

/// Length of every command and reply identifier.
pub const COMMAND_ID_LEN: usize = 3;

/// Gameplay commands, received as UDP datagrams.
#[derive(Debug, PartialEq)]
pub enum UdpCommand {
    StartGame(StartGame),
    Try(Try),
    Quit(Quit),
    DebugGame(DebugGame),
}

impl Executable for UdpCommand {
    type Reply = UdpReply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<UdpReply, Error> {
        match self {
            UdpCommand::StartGame(cmd) => cmd.exec(store, now),
            UdpCommand::Try(cmd) => cmd.exec(store, now),
            UdpCommand::Quit(cmd) => cmd.exec(store, now),
            UdpCommand::DebugGame(cmd) => cmd.exec(store, now),
        }
    }
}

impl TryFrom<&[u8]> for UdpCommand {
    type Error = CommandParserError;

    fn try_from(packet: &[u8]) -> Result<Self, Self::Error> {
        let parser = &mut CommandParser::new(packet);
        let command_name = parser.parse_command_name()?;

        match &command_name[..] {
            StartGame::ID => parser
                .parse(StartGame::ID, |p| StartGame::try_from(p))
                .map(UdpCommand::StartGame),
            Try::ID => parser
                .parse(Try::ID, |p| Try::try_from(p))
                .map(UdpCommand::Try),
            Quit::ID => parser
                .parse(Quit::ID, |p| Quit::try_from(p))
                .map(UdpCommand::Quit),
            DebugGame::ID => parser
                .parse(DebugGame::ID, |p| DebugGame::try_from(p))
                .map(UdpCommand::DebugGame),
            _ => Err(CommandParserError::UnknownCommand {
                command: command_name,
            }),
        }
    }
}

/// Reporting commands, received over short lived TCP connections.
#[derive(Debug, PartialEq)]
pub enum TcpCommand {
    ShowTrials(ShowTrials),
    Scoreboard(Scoreboard),
}

impl Executable for TcpCommand {
    type Reply = TcpReply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<TcpReply, Error> {
        match self {
            TcpCommand::ShowTrials(cmd) => cmd.exec(store, now),
            TcpCommand::Scoreboard(cmd) => cmd.exec(store, now),
        }
    }
}

impl TryFrom<&[u8]> for TcpCommand {
    type Error = CommandParserError;

    fn try_from(request: &[u8]) -> Result<Self, Self::Error> {
        let parser = &mut CommandParser::new(request);
        let command_name = parser.parse_command_name()?;

        match &command_name[..] {
            ShowTrials::ID => parser
                .parse(ShowTrials::ID, |p| ShowTrials::try_from(p))
                .map(TcpCommand::ShowTrials),
            Scoreboard::ID => parser
                .parse(Scoreboard::ID, |p| Scoreboard::try_from(p))
                .map(TcpCommand::Scoreboard),
            _ => Err(CommandParserError::UnknownCommand {
                command: command_name,
            }),
        }
    }
}

/// Reads the fields of a single request line.
///
/// Every request is `ID[ ARG]*\n`: arguments are preceded by exactly one
/// space, and nothing may follow the newline.
pub struct CommandParser<'a> {
    src: Cursor<&'a [u8]>,
}

impl<'a> CommandParser<'a> {
    fn new(src: &'a [u8]) -> CommandParser<'a> {
        CommandParser {
            src: Cursor::new(src),
        }
    }

    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        let remaining = self.src.chunk();
        let name = &remaining[..remaining.len().min(COMMAND_ID_LEN)];

        let command = String::from_utf8_lossy(name).into_owned();
        if name.len() != COMMAND_ID_LEN {
            return Err(CommandParserError::UnknownCommand { command });
        }

        self.src.advance(COMMAND_ID_LEN);
        Ok(command)
    }

    /// Runs a command's argument parser and checks the request ends right
    /// after it.
    fn parse<T>(
        &mut self,
        command: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, CommandParserError> {
        f(self)
            .and_then(|value| self.finish().map(|_| value))
            .map_err(|source| CommandParserError::Malformed { command, source })
    }

    pub(crate) fn next_plid(&mut self) -> Result<Plid, SyntaxError> {
        self.next_delimiter()?;
        let digits = self.next_digits("player id", Plid::LEN)?;
        if digits.len() != Plid::LEN {
            return Err(SyntaxError::InvalidArgument {
                argument: "player id",
                value: digits,
            });
        }
        digits
            .parse()
            .ok()
            .and_then(Plid::new)
            .ok_or(SyntaxError::InvalidArgument {
                argument: "player id",
                value: digits,
            })
    }

    /// An unsigned decimal integer of at most `u32::MAX`.
    pub(crate) fn next_integer(&mut self, argument: &'static str) -> Result<u32, SyntaxError> {
        self.next_delimiter()?;
        let digits = self.next_digits(argument, 10)?;
        digits.parse().map_err(|_| SyntaxError::InvalidArgument {
            argument,
            value: digits,
        })
    }

    /// A positive play time in seconds. The upper bound is a game rule and
    /// is checked by the store.
    pub(crate) fn next_play_time(&mut self) -> Result<u32, SyntaxError> {
        let seconds = self.next_integer("max play time")?;
        if seconds == 0 {
            return Err(SyntaxError::InvalidArgument {
                argument: "max play time",
                value: seconds.to_string(),
            });
        }
        Ok(seconds)
    }

    /// Four space separated colors.
    pub(crate) fn next_key(&mut self) -> Result<Key, SyntaxError> {
        let mut colors = [Color::Red; KEY_LEN];
        for color in colors.iter_mut() {
            self.next_delimiter()?;
            let byte = self.next_byte("color")?;
            *color = Color::from_byte(byte).ok_or(SyntaxError::Unexpected {
                expected: "color",
                actual: char::from(byte),
            })?;
        }
        Ok(Key::new(colors))
    }

    fn next_digits(
        &mut self,
        argument: &'static str,
        max_len: usize,
    ) -> Result<String, SyntaxError> {
        let mut digits = String::new();
        while self.src.has_remaining() && self.src.chunk()[0].is_ascii_digit() {
            if digits.len() == max_len {
                return Err(SyntaxError::InvalidArgument {
                    argument,
                    value: digits,
                });
            }
            digits.push(char::from(self.src.get_u8()));
        }

        if digits.is_empty() {
            let actual = self.next_byte(argument)?;
            return Err(SyntaxError::Unexpected {
                expected: argument,
                actual: char::from(actual),
            });
        }
        Ok(digits)
    }

    fn next_delimiter(&mut self) -> Result<(), SyntaxError> {
        self.expect_byte(b' ', "space")
    }

    fn finish(&mut self) -> Result<(), SyntaxError> {
        self.expect_byte(b'\n', "newline")?;
        if self.src.has_remaining() {
            return Err(SyntaxError::TrailingData(self.src.remaining()));
        }
        Ok(())
    }

    fn expect_byte(&mut self, byte: u8, expected: &'static str) -> Result<(), SyntaxError> {
        match self.next_byte(expected)? {
            actual if actual == byte => Ok(()),
            actual => Err(SyntaxError::Unexpected {
                expected,
                actual: char::from(actual),
            }),
        }
    }

    fn next_byte(&mut self, expected: &'static str) -> Result<u8, SyntaxError> {
        if !self.src.has_remaining() {
            return Err(SyntaxError::EndOfStream { expected });
        }
        Ok(self.src.get_u8())
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum SyntaxError {
    #[error("expected {expected}, got {actual:?}")]
    Unexpected { expected: &'static str, actual: char },
    #[error("invalid {argument} {value:?}")]
    InvalidArgument {
        argument: &'static str,
        value: String,
    },
    #[error("request ended while expecting {expected}")]
    EndOfStream { expected: &'static str },
    #[error("{0} bytes after the end of the request")]
    TrailingData(usize),
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("protocol error; unknown command {command:?}")]
    UnknownCommand { command: String },
    #[error("protocol error; malformed {command} request: {source}")]
    Malformed {
        command: &'static str,
        source: SyntaxError,
    },
}

impl CommandParserError {
    /// The reply owed to a UDP client whose request could not be decoded.
    /// Known commands answer with their own reply and an `ERR` status.
    pub fn udp_reply(&self) -> UdpReply {
        match self {
            CommandParserError::Malformed { command, .. } => match *command {
                StartGame::ID => UdpReply::StartGame(Status::Err),
                Try::ID => UdpReply::Try(TryStatus::Err),
                Quit::ID => UdpReply::Quit(QuitStatus::Err),
                DebugGame::ID => UdpReply::DebugGame(Status::Err),
                _ => UdpReply::Error,
            },
            CommandParserError::UnknownCommand { .. } => UdpReply::Error,
        }
    }
}
