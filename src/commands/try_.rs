use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, SyntaxError};
use crate::game::{Key, Plid};
use crate::reply::{TryStatus, UdpReply};
use crate::store::{AttemptResult, GameError, Outcome, Store};
use crate::Error;

/// Submits guess `key` as attempt number `trial` of the player's game.
///
/// Trials are numbered from 1 and must arrive in order. Resending the last
/// trial with the same key returns the original answer again, which lets a
/// client retransmit a request whose reply was lost.
#[derive(Debug, PartialEq)]
pub struct Try {
    pub plid: Plid,
    pub key: Key,
    pub trial: u32,
}

impl Try {
    pub const ID: &'static str = "TRY";
}

impl Executable for Try {
    type Reply = UdpReply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<UdpReply, Error> {
        let status = match store.record_attempt(self.plid, now, self.key, self.trial) {
            Ok(AttemptResult {
                outcome: Outcome::Lost(key),
                ..
            }) => {
                info!(plid = %self.plid, %key, "game lost");
                TryStatus::Ent(key)
            }
            Ok(AttemptResult {
                outcome: Outcome::Won { score },
                trial,
                pegs,
            }) => {
                info!(plid = %self.plid, trial, score, "game won");
                TryStatus::Ok { trial, pegs }
            }
            Ok(AttemptResult {
                outcome: Outcome::Ongoing,
                trial,
                pegs,
            }) => {
                info!(plid = %self.plid, trial, blacks = pegs.blacks, whites = pegs.whites, "trial");
                TryStatus::Ok { trial, pegs }
            }
            Err(GameError::TimedOut { key, .. }) => TryStatus::Etm(key),
            Err(e @ GameError::UncontextualizedSession(_)) => {
                warn!("{}", e);
                TryStatus::Nok
            }
            Err(e @ GameError::InvalidTrial { .. }) => {
                warn!("{}", e);
                TryStatus::Inv
            }
            Err(e @ GameError::DuplicateTrial { .. }) => {
                warn!("{}", e);
                TryStatus::Dup
            }
            Err(e) => return Err(e.into()),
        };

        Ok(UdpReply::Try(status))
    }
}

impl TryFrom<&mut CommandParser<'_>> for Try {
    type Error = SyntaxError;

    fn try_from(parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        let plid = parser.next_plid()?;
        let key = parser.next_key()?;
        let trial = parser.next_integer("trial")?;

        Ok(Self { plid, key, trial })
    }
}
