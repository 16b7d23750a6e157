use chrono::{DateTime, Utc};

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, SyntaxError};
use crate::reply::{ScoreboardReply, TcpReply};
use crate::report;
use crate::store::{GameError, Store};
use crate::Error;

/// Returns the best winning games across all players.
#[derive(Debug, PartialEq)]
pub struct Scoreboard;

impl Scoreboard {
    pub const ID: &'static str = "SSB";
}

impl Executable for Scoreboard {
    type Reply = TcpReply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<TcpReply, Error> {
        match store.scoreboard() {
            Ok(entries) => {
                let file = report::scoreboard(&entries, now);
                Ok(TcpReply::Scoreboard(ScoreboardReply::Ok(file)))
            }
            Err(GameError::EmptyLeaderboard) => Ok(TcpReply::Scoreboard(ScoreboardReply::Empty)),
            Err(e) => Err(e.into()),
        }
    }
}

impl TryFrom<&mut CommandParser<'_>> for Scoreboard {
    type Error = SyntaxError;

    fn try_from(_parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::TcpCommand;
    use crate::store::tests::{at, key, open_store, plid};

    #[test]
    fn empty() {
        let (_dir, store) = open_store();

        let result = Scoreboard.exec(&store, at(0)).unwrap();

        assert_eq!(result, TcpReply::Scoreboard(ScoreboardReply::Empty));
    }

    #[test]
    fn best_scores() {
        let cmd = TcpCommand::try_from(&b"SSB\n"[..]).unwrap();
        assert_eq!(cmd, TcpCommand::Scoreboard(Scoreboard));

        let (_dir, store) = open_store();
        store
            .create_game(plid(106485), at(0), 600, Some(key("RGBY")))
            .unwrap();
        store
            .record_attempt(plid(106485), at(0), key("RGBY"), 1)
            .unwrap();

        let result = cmd.exec(&store, at(20)).unwrap();

        match result {
            TcpReply::Scoreboard(ScoreboardReply::Ok(file)) => {
                assert_eq!(file.name, "TOPSCORES_1700000020.txt");
                let text = String::from_utf8(file.data.to_vec()).unwrap();
                assert!(text.contains("999  106485     RGBY"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
