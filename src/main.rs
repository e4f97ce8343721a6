use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::Path;

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let cfg = voice_visualizer::config::Config::parse();
    init_logging(cfg.log_file.as_deref())?;

    if cfg.list_devices {
        voice_visualizer::audio::list_input_devices()?;
        return Ok(());
    }

    voice_visualizer::app::run(cfg)
}
