use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 58065;
pub const DEFAULT_DATA_DIR: &str = ".data";
pub const DEFAULT_WORKERS: usize = 5;

/// Constants of the game itself. They also feed the scoring formula, so
/// changing them changes every score computed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameRules {
    /// Attempts a player gets before the game is lost.
    pub max_trials: u32,
    /// Upper bound for the play time a player may request, in seconds.
    pub max_play_time: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_trials: 8,
            max_play_time: 600,
        }
    }
}

/// Runtime settings of the game server.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: IpAddr,
    /// Shared by the UDP and the TCP listener.
    pub port: u16,
    pub data_dir: PathBuf,
    pub verbose: bool,
    /// Size of the TCP worker pool.
    pub workers: usize,
    /// How long the listeners block before checking for shutdown.
    pub recv_timeout: Duration,
    /// Read and write deadline on an accepted TCP connection.
    pub connection_timeout: Duration,
    pub rules: GameRules,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            verbose: false,
            workers: DEFAULT_WORKERS,
            recv_timeout: Duration::from_secs(5),
            connection_timeout: Duration::from_secs(5),
            rules: GameRules::default(),
        }
    }
}
