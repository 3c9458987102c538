//! VocalSwap - Voice Swap Job Runner

use anyhow::{bail, Context};
use clap::Parser;
use std::process;
use vocalswap::{init_logging, Args, Config, JobService, JobStatus};

fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns `false` when the submitted job failed.
fn run(args: Args) -> anyhow::Result<bool> {
    if args.verbose {
        println!("{}", vocalswap::get_library_info());
        println!();
    }

    if let Some(path) = &args.write_config {
        Config::create_default_config(path)?;
        println!("Default config written to {}", path.display());
        return Ok(true);
    }

    let config = Config::from_args_and_config(&args)?;

    if args.test_only {
        return run_test_mode(&config);
    }

    let (Some(song), Some(voice)) = (&args.song, &args.voice) else {
        bail!("Both --song and --voice are required");
    };
    if !song.exists() {
        bail!("Song file does not exist: {}", song.display());
    }
    if !voice.exists() {
        bail!("Voice sample does not exist: {}", voice.display());
    }

    let mut service = JobService::from_config(&config).context("Failed to start job service")?;

    println!("=== VocalSwap ===");
    println!("Song:  {}", song.display());
    println!("Voice: {}", voice.display());
    println!("=================\n");

    let id = service.submit(song, voice, args.accept_consent)?;
    service.shutdown();

    let view = service.status(id)?;
    println!("{}", toml::to_string_pretty(&view).context("Failed to render job status")?);

    Ok(view.status == JobStatus::Completed)
}

fn run_test_mode(config: &Config) -> anyhow::Result<bool> {
    println!("=== Test Mode ===");
    let mut service = JobService::from_config(config)?;
    println!("✅ Config OK");
    println!("{}", service.capabilities());
    service.shutdown();
    println!("✅ Ready for processing");
    Ok(true)
}
