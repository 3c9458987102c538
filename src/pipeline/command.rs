//! Stage adapters backed by external command-line tools
//!
//! Each adapter is checked once when the service starts. A program that cannot
//! be found becomes `Capability::Unavailable` instead of failing at call time.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::audio::Waveform;
use crate::config::{ConverterConfig, SeparationConfig};
use crate::error::{Result, VocalSwapError};
use super::adapters::{
    Capability, ConversionRequest, ConversionService, SeparatedTracks, SeparationService,
};

pub const VOCALS_FILE: &str = "vocals.wav";
pub const INSTRUMENTAL_FILE: &str = "instrumental.wav";
pub const CONVERTED_VOCALS_FILE: &str = "converted_vocals.wav";

/// Resolve `program` to an executable path, searching `PATH` for bare names.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Run a command to completion, turning a non-zero exit into an error that
/// carries the tail of stderr.
pub fn run_command(command: &mut Command, what: &str) -> Result<()> {
    debug!("Running {}: {:?}", what, command);
    let output = command
        .output()
        .map_err(|e| VocalSwapError::processing(format!("Cannot start {}: {}", what, e)))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
    let tail: Vec<&str> = tail.into_iter().rev().collect();
    Err(VocalSwapError::processing(format!(
        "{} exited with {}: {}",
        what,
        output.status,
        tail.join(" | ")
    )))
}

fn locate_program(program: Option<&Path>, what: &str) -> std::result::Result<PathBuf, String> {
    let program = program.ok_or_else(|| format!("no {} program configured", what))?;
    resolve_program(program).ok_or_else(|| format!("{} program not found: {}", what, program.display()))
}

/// Runs `<program> <song> <work_dir> <model_name>`.
#[derive(Debug, Clone)]
pub struct CommandSeparator {
    program: PathBuf,
    model_name: String,
}

impl CommandSeparator {
    pub fn new<P: Into<PathBuf>>(program: P, model_name: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model_name: model_name.into(),
        }
    }

    pub fn detect(config: &SeparationConfig) -> Capability<Arc<dyn SeparationService>> {
        match locate_program(config.program.as_deref(), "separation") {
            Ok(program) => {
                info!("Separation backend: {} ({})", program.display(), config.model_name);
                Capability::Available(Arc::new(Self::new(program, config.model_name.clone())))
            }
            Err(reason) => {
                warn!("Separation disabled: {}", reason);
                Capability::Unavailable(reason)
            }
        }
    }

    /// Find a separated track, accepting both the canonical name and the
    /// `<stem>_<suffix>.wav` names separation tools commonly produce.
    fn collect_track(work_dir: &Path, stem: &str, canonical: &str, suffixes: &[&str]) -> Result<PathBuf> {
        let target = work_dir.join(canonical);
        if target.is_file() {
            return Ok(target);
        }

        for suffix in suffixes {
            let candidate = work_dir.join(format!("{}_{}.wav", stem, suffix));
            if candidate.is_file() {
                std::fs::rename(&candidate, &target)?;
                return Ok(target);
            }
        }

        Err(VocalSwapError::processing(format!(
            "Separator produced no {} track in {}",
            canonical,
            work_dir.display()
        )))
    }
}

impl SeparationService for CommandSeparator {
    fn separate(&self, song: &Path, work_dir: &Path) -> Result<SeparatedTracks> {
        std::fs::create_dir_all(work_dir)?;

        run_command(
            Command::new(&self.program)
                .arg(song)
                .arg(work_dir)
                .arg(&self.model_name),
            "separator",
        )?;

        let stem = song.file_stem().and_then(OsStr::to_str).unwrap_or("song");
        Ok(SeparatedTracks {
            vocals: Self::collect_track(work_dir, stem, VOCALS_FILE, &["vocals"])?,
            instrumental: Self::collect_track(work_dir, stem, INSTRUMENTAL_FILE, &["no_vocals", "instrumental"])?,
        })
    }
}

/// Runs `<program> --input .. --voice .. --model .. --output ..` plus one flag
/// per conversion parameter, then reads the produced WAV.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: PathBuf,
}

impl CommandConverter {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self { program: program.into() }
    }

    pub fn detect(config: &ConverterConfig) -> Capability<Arc<dyn ConversionService>> {
        match locate_program(config.program.as_deref(), "conversion") {
            Ok(program) => {
                info!("Conversion backend: {}", program.display());
                Capability::Available(Arc::new(Self::new(program)))
            }
            Err(reason) => {
                warn!("Conversion disabled: {}", reason);
                Capability::Unavailable(reason)
            }
        }
    }

    fn build_command(&self, request: &ConversionRequest<'_>, output: &Path) -> Command {
        let params = request.params;
        let mut command = Command::new(&self.program);
        command
            .arg("--input").arg(request.vocals)
            .arg("--voice").arg(request.voice_sample)
            .arg("--model").arg(request.model.path())
            .arg("--output").arg(output)
            .arg("--speaker-id").arg(params.speaker_id.to_string())
            .arg("--f0-up-key").arg(params.f0_up_key.to_string())
            .arg("--f0-method").arg(&params.f0_method)
            .arg("--index-rate").arg(params.index_rate.to_string())
            .arg("--filter-radius").arg(params.filter_radius.to_string())
            .arg("--resample-sr").arg(params.resample_sr.to_string())
            .arg("--rms-mix-rate").arg(params.rms_mix_rate.to_string())
            .arg("--protect").arg(params.protect.to_string());
        command
    }
}

impl ConversionService for CommandConverter {
    fn convert(&self, request: &ConversionRequest<'_>) -> Result<Waveform> {
        let output = request.work_dir.join(CONVERTED_VOCALS_FILE);
        run_command(&mut self.build_command(request, &output), "converter")?;

        if !output.is_file() {
            return Err(VocalSwapError::processing(format!(
                "Converter produced no output at {}",
                output.display()
            )));
        }
        Waveform::from_file(&output)
    }
}
