use std::fmt;
use strum_macros::Display;

use crate::game::{Key, Pegs};
use crate::report::ReportFile;

/// Status shared by the start and debug replies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Status {
    Ok,
    /// The player already has a game in progress.
    Nok,
    Err,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TryStatus {
    Ok { trial: u32, pegs: Pegs },
    /// The guess was already tried in this game.
    Dup,
    /// The trial number is out of sequence.
    Inv,
    /// No game in progress.
    Nok,
    /// Out of attempts; carries the secret key.
    Ent(Key),
    /// Out of time; carries the secret key.
    Etm(Key),
    Err,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum QuitStatus {
    Ok(Key),
    Nok,
    Err,
}

/// Replies sent back over UDP, one per received datagram.
#[derive(Clone, Debug, PartialEq)]
pub enum UdpReply {
    StartGame(Status),
    Try(TryStatus),
    Quit(QuitStatus),
    DebugGame(Status),
    /// Answer to a datagram whose command is not recognized.
    Error,
}

impl UdpReply {
    pub fn serialize(&self) -> Vec<u8> {
        format!("{}\n", self).into_bytes()
    }
}

impl From<UdpReply> for Vec<u8> {
    fn from(reply: UdpReply) -> Self {
        reply.serialize()
    }
}

impl fmt::Display for UdpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UdpReply::StartGame(status) => write!(f, "RSG {}", status),
            UdpReply::DebugGame(status) => write!(f, "RDB {}", status),
            UdpReply::Try(status) => {
                write!(f, "RTR {}", status)?;
                match status {
                    TryStatus::Ok { trial, pegs } => {
                        write!(f, " {} {} {}", trial, pegs.blacks, pegs.whites)
                    }
                    TryStatus::Ent(key) | TryStatus::Etm(key) => write!(f, " {}", key.spaced()),
                    _ => Ok(()),
                }
            }
            UdpReply::Quit(status) => {
                write!(f, "RQT {}", status)?;
                match status {
                    QuitStatus::Ok(key) => write!(f, " {}", key.spaced()),
                    _ => Ok(()),
                }
            }
            UdpReply::Error => write!(f, "ERR"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Display)]
pub enum TrialsReply {
    #[strum(serialize = "ACT")]
    Active(ReportFile),
    #[strum(serialize = "FIN")]
    Finished(ReportFile),
    #[strum(serialize = "NOK")]
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Display)]
pub enum ScoreboardReply {
    #[strum(serialize = "OK")]
    Ok(ReportFile),
    #[strum(serialize = "EMPTY")]
    Empty,
}

/// Replies sent back over TCP. Successful replies carry a report file,
/// framed as `<name> <size> <data>` because the data spans several lines.
#[derive(Clone, Debug, PartialEq)]
pub enum TcpReply {
    Trials(TrialsReply),
    Scoreboard(ScoreboardReply),
    Error,
}

impl TcpReply {
    fn file(&self) -> Option<&ReportFile> {
        match self {
            TcpReply::Trials(TrialsReply::Active(file) | TrialsReply::Finished(file)) => {
                Some(file)
            }
            TcpReply::Scoreboard(ScoreboardReply::Ok(file)) => Some(file),
            _ => None,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let header = self.to_string();
        let data_len = self.file().map_or(0, |file| file.data.len() + 1);

        let mut bytes = Vec::with_capacity(header.len() + data_len + 1);
        bytes.extend_from_slice(header.as_bytes());
        if let Some(file) = self.file() {
            bytes.push(b' ');
            bytes.extend_from_slice(&file.data);
        }
        bytes.push(b'\n');
        bytes
    }
}

impl From<TcpReply> for Vec<u8> {
    fn from(reply: TcpReply) -> Self {
        reply.serialize()
    }
}

/// Everything up to the file data, which is left out to keep logs readable.
impl fmt::Display for TcpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TcpReply::Trials(status) => write!(f, "RST {}", status)?,
            TcpReply::Scoreboard(status) => write!(f, "RSS {}", status)?,
            TcpReply::Error => return write!(f, "ERR"),
        }
        if let Some(file) = self.file() {
            write!(f, " {} {}", file.name, file.data.len())?;
        }
        Ok(())
    }
}
