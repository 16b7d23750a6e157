use chrono::{DateTime, Utc};
use tracing::warn;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, SyntaxError};
use crate::game::Plid;
use crate::reply::{TcpReply, TrialsReply};
use crate::report;
use crate::store::{GameError, Inspection, Store};
use crate::Error;

/// Returns a report of the player's ongoing game, or of the most recently
/// finished one when no game is in progress.
#[derive(Debug, PartialEq)]
pub struct ShowTrials {
    pub plid: Plid,
}

impl ShowTrials {
    pub const ID: &'static str = "STR";
}

impl Executable for ShowTrials {
    type Reply = TcpReply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<TcpReply, Error> {
        let inspection = match store.inspect_last_game(self.plid, now) {
            Ok(inspection) => inspection,
            Err(e @ GameError::NeverPlayed(_)) => {
                warn!("{}", e);
                return Ok(TcpReply::Trials(TrialsReply::NotFound));
            }
            Err(e) => return Err(e.into()),
        };

        let file = report::game_state(&inspection);
        let reply = match inspection {
            Inspection::Active { .. } => TrialsReply::Active(file),
            Inspection::Finished(_) => TrialsReply::Finished(file),
        };

        Ok(TcpReply::Trials(reply))
    }
}

impl TryFrom<&mut CommandParser<'_>> for ShowTrials {
    type Error = SyntaxError;

    fn try_from(parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        let plid = parser.next_plid()?;
        Ok(Self { plid })
    }
}
