use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, SyntaxError};
use crate::game::{Key, Plid};
use crate::reply::{Status, UdpReply};
use crate::store::{GameError, Store};
use crate::Error;

/// Starts a game in debug mode: the client picks the secret key. Debug games
/// are scored like any other, but the key shows up in the state report while
/// the game is still being played.
#[derive(Debug, PartialEq)]
pub struct DebugGame {
    pub plid: Plid,
    pub max_play_time: u32,
    pub key: Key,
}

impl DebugGame {
    pub const ID: &'static str = "DBG";
}

impl Executable for DebugGame {
    type Reply = UdpReply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<UdpReply, Error> {
        match store.create_game(self.plid, now, self.max_play_time, Some(self.key)) {
            Ok(key) => {
                info!(plid = %self.plid, %key, max_play_time = self.max_play_time, "debug game started");
                Ok(UdpReply::DebugGame(Status::Ok))
            }
            Err(e @ GameError::OngoingGame(_)) => {
                warn!("{}", e);
                Ok(UdpReply::DebugGame(Status::Nok))
            }
            Err(e @ GameError::InvalidPlayTime { .. }) => {
                warn!("{}", e);
                Ok(UdpReply::DebugGame(Status::Err))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl TryFrom<&mut CommandParser<'_>> for DebugGame {
    type Error = SyntaxError;

    fn try_from(parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        let plid = parser.next_plid()?;
        let max_play_time = parser.next_play_time()?;
        let key = parser.next_key()?;

        Ok(Self {
            plid,
            max_play_time,
            key,
        })
    }
}
