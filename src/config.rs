//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment
//! (including a `.env` file loaded at startup).

use crate::store::{CsvFileBackend, StatsStore};
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// CSV file holding one row per (university, course)
    #[arg(long = "store", env = "STATS_STORE_PATH", default_value = "database.csv")]
    pub path: PathBuf,

    /// Seconds a loaded record set may be served before re-reading
    #[arg(long, env = "STATS_CACHE_TTL_SECS", default_value_t = 30)]
    pub cache_ttl_secs: u64,
}

impl StoreArgs {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn open(&self) -> StatsStore {
        StatsStore::new(CsvFileBackend::new(&self.path), self.cache_ttl())
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:5000")]
    pub addr: SocketAddr,

    /// Course shown on the index page; all records when unset
    #[arg(long, env = "DEFAULT_COURSE")]
    pub default_course: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        server: ServerArgs,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "test",
            "--store",
            "/tmp/stats.csv",
            "--cache-ttl-secs",
            "5",
            "--addr",
            "0.0.0.0:8080",
            "--default-course",
            "MBA",
        ]);

        assert_eq!(cli.store.path, PathBuf::from("/tmp/stats.csv"));
        assert_eq!(cli.store.cache_ttl(), Duration::from_secs(5));
        assert_eq!(cli.server.addr.port(), 8080);
        assert_eq!(cli.server.default_course.as_deref(), Some("MBA"));
    }
}
