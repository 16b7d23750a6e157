use chrono::{DateTime, Utc};

use crate::store::Store;
use crate::Error;

/// A decoded request that can run against the store.
///
/// `now` is sampled once per request, so every step of a command agrees on
/// whether the player's game has run out of time. Game rule violations are
/// answered through `Reply`; `Err` is reserved for failures of the server
/// itself.
pub trait Executable {
    type Reply;

    fn exec(self, store: &Store, now: DateTime<Utc>) -> Result<Self::Reply, Error>;
}
