use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, SyntaxError};
use crate::game::Plid;
use crate::reply::{QuitStatus, UdpReply};
use crate::store::{GameError, Store};
use crate::Error;

/// Gives up the player's ongoing game. The reply reveals the secret key.
#[derive(Debug, PartialEq)]
pub struct Quit {
    pub plid: Plid,
}

impl Quit {
    pub const ID: &'static str = "QUT";
}

impl Executable for Quit {
    type Reply = UdpReply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<UdpReply, Error> {
        match store.quit_game(self.plid, now) {
            Ok(key) => {
                info!(plid = %self.plid, %key, "game quit");
                Ok(UdpReply::Quit(QuitStatus::Ok(key)))
            }
            Err(e @ GameError::UncontextualizedSession(_)) => {
                warn!("{}", e);
                Ok(UdpReply::Quit(QuitStatus::Nok))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl TryFrom<&mut CommandParser<'_>> for Quit {
    type Error = SyntaxError;

    fn try_from(parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        let plid = parser.next_plid()?;
        Ok(Self { plid })
    }
}
