use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, SyntaxError};
use crate::game::Plid;
use crate::reply::{Status, UdpReply};
use crate::store::{GameError, Store};
use crate::Error;

/// Starts a game in play mode for `plid`, with a randomly drawn secret key
/// and `max_play_time` seconds to solve it.
///
/// A game whose time has run out is closed first, so it does not block the
/// new one.
#[derive(Debug, PartialEq)]
pub struct StartGame {
    pub plid: Plid,
    pub max_play_time: u32,
}

impl StartGame {
    pub const ID: &'static str = "SNG";
}

impl Executable for StartGame {
    type Reply = UdpReply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<UdpReply, Error> {
        match store.create_game(self.plid, now, self.max_play_time, None) {
            Ok(_) => {
                info!(plid = %self.plid, max_play_time = self.max_play_time, "game started");
                Ok(UdpReply::StartGame(Status::Ok))
            }
            Err(e @ GameError::OngoingGame(_)) => {
                warn!("{}", e);
                Ok(UdpReply::StartGame(Status::Nok))
            }
            Err(e @ GameError::InvalidPlayTime { .. }) => {
                warn!("{}", e);
                Ok(UdpReply::StartGame(Status::Err))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl TryFrom<&mut CommandParser<'_>> for StartGame {
    type Error = SyntaxError;

    fn try_from(parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        let plid = parser.next_plid()?;
        let max_play_time = parser.next_play_time()?;

        Ok(Self {
            plid,
            max_play_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::UdpCommand;
    use crate::store::tests::{at, open_store, plid};

    #[test]
    fn new_game() {
        let cmd = UdpCommand::try_from(&b"SNG 106485 120\n"[..]).unwrap();

        assert_eq!(
            cmd,
            UdpCommand::StartGame(StartGame {
                plid: plid(106485),
                max_play_time: 120,
            })
        );

        let (_dir, store) = open_store();
        let result = cmd.exec(&store, at(0)).unwrap();

        assert_eq!(result, UdpReply::StartGame(Status::Ok));
    }

    #[test]
    fn ongoing_game() {
        let (_dir, store) = open_store();
        let cmd = || StartGame {
            plid: plid(106485),
            max_play_time: 60,
        };

        cmd().exec(&store, at(0)).unwrap();
        let result = cmd().exec(&store, at(59)).unwrap();
        assert_eq!(result, UdpReply::StartGame(Status::Nok));

        let result = cmd().exec(&store, at(60)).unwrap();
        assert_eq!(result, UdpReply::StartGame(Status::Ok));
    }

    #[test]
    fn zero_play_time() {
        let err = UdpCommand::try_from(&b"SNG 106485 0\n"[..]).unwrap_err();
        assert_eq!(err.udp_reply(), UdpReply::StartGame(Status::Err));
    }

    #[test]
    fn play_time_over_the_rules() {
        let (_dir, store) = open_store();

        let cmd = UdpCommand::try_from(&b"SNG 106485 601\n"[..]).unwrap();
        let result = cmd.exec(&store, at(0)).unwrap();
        assert_eq!(result, UdpReply::StartGame(Status::Err));

        let cmd = UdpCommand::try_from(&b"SNG 106485 600\n"[..]).unwrap();
        let result = cmd.exec(&store, at(0)).unwrap();
        assert_eq!(result, UdpReply::StartGame(Status::Ok));
    }
}
