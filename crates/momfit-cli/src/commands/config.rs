use anyhow::Result;
use std::path::Path;

use momfit_core::config::MomfitConfig;

pub fn run(base_dir: &Path) -> Result<()> {
    let config_path = MomfitConfig::default_path(base_dir);
    let config = MomfitConfig::load(&config_path)?;

    println!("Config: {}", config_path.display());
    println!();
    println!("  DB path:          {}", config.momfit.db_path);
    println!("  Intent provider:  {}", config.intent.provider);
    if config.intent.provider == "openai" {
        let key_state = match std::env::var(&config.intent.api_key_env) {
            Ok(v) if !v.trim().is_empty() => "set",
            _ => "NOT SET",
        };
        println!("  Endpoint:         {}", config.intent.endpoint);
        println!("  Model:            {}", config.intent.model);
        println!("  API key env:      {} ({key_state})", config.intent.api_key_env);
        println!("  Timeout:          {}s", config.intent.timeout_secs);
    }
    println!("  Announce events:  {}", config.scheduler.announce_events);
    println!("  Upcoming limit:   {}", config.scheduler.upcoming_limit);

    Ok(())
}
