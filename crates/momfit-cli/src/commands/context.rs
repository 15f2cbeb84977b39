use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use momfit_auth::{RoleResolver, RoleStore, SqliteRoleStore};
use momfit_core::config::MomfitConfig;
use momfit_core::{Clock, SystemClock};
use momfit_events::{ChatIntentPipeline, EventScheduler, SqliteEventStore};
use momfit_intent::{IntentDetector, create_intent_detector};

/// Everything a command needs, wired against the configured database.
pub struct App {
    pub config: MomfitConfig,
    pub roles: Arc<SqliteRoleStore>,
    pub resolver: Arc<RoleResolver>,
    pub scheduler: Arc<EventScheduler>,
    pub detector: Arc<IntentDetector>,
    pub pipeline: ChatIntentPipeline,
    pub clock: Arc<dyn Clock>,
}

impl App {
    /// Load config from `base_dir` and open the database. Run `momfit init` first.
    pub async fn open(base_dir: &Path) -> Result<Self> {
        let config_path = MomfitConfig::default_path(base_dir);
        let config = MomfitConfig::load(&config_path)
            .with_context(|| format!("loading {} (run `momfit init`?)", config_path.display()))?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let roles =
            Arc::new(SqliteRoleStore::open(&config.momfit.db_path)?.with_clock(clock.clone()));
        roles.migrate().await?;
        let events = Arc::new(SqliteEventStore::open(&config.momfit.db_path)?);
        events.migrate()?;

        let resolver = Arc::new(RoleResolver::new(roles.clone(), clock.clone()));
        let scheduler = Arc::new(EventScheduler::new(
            events.clone(),
            events.clone(),
            resolver.clone(),
            clock.clone(),
            config.scheduler.clone(),
        ));
        let detector = Arc::new(create_intent_detector(&config.intent, clock.clone())?);
        let pipeline = ChatIntentPipeline::new(
            detector.clone(),
            scheduler.clone(),
            events.clone(),
            resolver.clone(),
            clock.clone(),
        );

        Ok(Self {
            config,
            roles,
            resolver,
            scheduler,
            detector,
            pipeline,
            clock,
        })
    }
}
