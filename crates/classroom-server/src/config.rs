//! Server configuration from command-line arguments and environment.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use classroom_coordination::events::DEFAULT_CAPACITY;
use classroom_coordination::state::InMemorySessionStore;
use classroom_coordination::{Classroom, EventBus, ScenarioConfig, SharedClassroom};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Classroom role-play coordinator", long_about = None)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "CLASSROOM_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CLASSROOM_PORT", default_value_t = 3040)]
    pub port: u16,

    /// TOML file with scenario defaults for new sessions
    #[arg(long, env = "CLASSROOM_SCENARIO")]
    pub scenario: Option<PathBuf>,

    /// Seed for role shuffles and mechanism coin flips
    #[arg(long, env = "CLASSROOM_SEED")]
    pub seed: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Undelivered events buffered per subscriber before it must resync
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub event_capacity: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Scenario defaults: the TOML file if given, built-in values otherwise.
    pub fn scenario_defaults(&self) -> anyhow::Result<ScenarioConfig> {
        match &self.scenario {
            Some(path) => ScenarioConfig::load(path)
                .with_context(|| format!("loading scenario {}", path.display())),
            None => Ok(ScenarioConfig::default()),
        }
    }

    pub fn build_classroom(&self) -> anyhow::Result<SharedClassroom> {
        let defaults = self.scenario_defaults()?;
        let bus = EventBus::with_capacity(self.event_capacity)?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Classroom::new(InMemorySessionStore::new().shared(), bus.shared(), defaults, rng).shared())
    }
}
