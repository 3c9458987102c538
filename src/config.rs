//! Configuration management for the voice-swap service

use crate::audio::MixGains;
use crate::error::{Result, VocalSwapError};
use crate::pipeline::ConversionParams;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub conversion: ConversionParams,
    pub separation: SeparationConfig,
    pub converter: ConverterConfig,
    pub mixer: MixGains,
    pub encoder: EncoderConfig,
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Parent of the per-job scratch workspaces
    pub processing_root: PathBuf,
    /// Where finished results are stored
    pub output_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Load the voice model at startup instead of on the first job
    pub preload: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    pub program: Option<PathBuf>,
    pub model_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub program: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub program: PathBuf,
    pub codec: String,
    pub bitrate: String,
    /// Fail the job on encoder errors instead of delivering the WAV mix
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub count: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            processing_root: PathBuf::from("./media/processing"),
            output_root: PathBuf::from("./media/outputs"),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./models/rvc_model.pth"),
            preload: true,
        }
    }
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            program: None,
            model_name: "UVR-MDX-NET-Voc_FT".to_string(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            codec: "mp3".to_string(),
            bitrate: "192k".to_string(),
            strict: false,
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { count: 2 }
    }
}

impl Config {
    /// Get model path (convenience method)
    pub fn model_path(&self) -> &Path {
        &self.model.path
    }

    pub fn processing_root(&self) -> &Path {
        &self.storage.processing_root
    }

    pub fn output_root(&self) -> &Path {
        &self.storage.output_root
    }

    /// Get worker thread count (convenience method)
    pub fn worker_count(&self) -> usize {
        self.workers.count
    }

    pub fn strict_encoder(&self) -> bool {
        self.encoder.strict
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "vocalswap", about = "Re-sing a song's vocals in a target voice", version, author)]
pub struct Args {
    #[arg(long = "song", help = "Song to process (WAV or any format the separator accepts)")]
    pub song: Option<PathBuf>,

    #[arg(long = "voice", help = "Reference recording of the target voice")]
    pub voice: Option<PathBuf>,

    #[arg(long = "accept-consent", help = "Confirm consent to clone the target voice")]
    pub accept_consent: bool,

    #[arg(short = 'c', long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(short = 'm', long = "model", help = "Voice model file path")]
    pub model: Option<PathBuf>,

    #[arg(long = "workers", help = "Number of worker threads")]
    pub workers: Option<usize>,

    #[arg(long = "processing-root", help = "Directory for per-job scratch workspaces")]
    pub processing_root: Option<PathBuf>,

    #[arg(long = "output-root", help = "Directory for finished results")]
    pub output_root: Option<PathBuf>,

    #[arg(long = "vocal-gain", allow_negative_numbers = true, help = "Gain applied to converted vocals")]
    pub vocal_gain: Option<f32>,

    #[arg(long = "instrumental-gain", allow_negative_numbers = true, help = "Gain applied to the instrumental")]
    pub instrumental_gain: Option<f32>,

    #[arg(long = "pitch", allow_negative_numbers = true, help = "Pitch shift in semitones (-24 to 24)")]
    pub pitch: Option<i32>,

    #[arg(long = "strict-encoder", help = "Fail the job when encoding fails instead of keeping the WAV mix")]
    pub strict_encoder: bool,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,

    #[arg(long = "test-only", help = "Print the capability report and exit")]
    pub test_only: bool,

    #[arg(long = "write-config", value_name = "PATH", help = "Write the default config to PATH and exit")]
    pub write_config: Option<PathBuf>,
}

impl Config {
    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: &Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        if let Some(model) = &args.model {
            config.model.path = model.clone();
        }
        if let Some(workers) = args.workers {
            config.workers.count = workers;
        }
        if let Some(root) = &args.processing_root {
            config.storage.processing_root = root.clone();
        }
        if let Some(root) = &args.output_root {
            config.storage.output_root = root.clone();
        }
        if let Some(gain) = args.vocal_gain {
            config.mixer.vocal_gain = gain;
        }
        if let Some(gain) = args.instrumental_gain {
            config.mixer.instrumental_gain = gain;
        }
        if let Some(pitch) = args.pitch {
            config.conversion.f0_up_key = pitch;
        }
        if args.strict_encoder {
            config.encoder.strict = true;
        }

        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VocalSwapError::config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        for (name, gain) in [
            ("Vocal gain", self.mixer.vocal_gain),
            ("Instrumental gain", self.mixer.instrumental_gain),
        ] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(VocalSwapError::config(format!("{} must be a finite value >= 0", name)));
            }
        }

        if self.workers.count == 0 {
            return Err(VocalSwapError::config("Worker count must be greater than 0"));
        }
        if self.workers.count > num_cpus::get() * 2 {
            return Err(VocalSwapError::config("Worker count cannot exceed 2x logical CPU cores"));
        }

        self.conversion.validate()?;

        if self.encoder.codec.trim().is_empty() {
            return Err(VocalSwapError::config("Encoder codec must not be empty"));
        }
        if self.encoder.bitrate.trim().is_empty() {
            return Err(VocalSwapError::config("Encoder bitrate must not be empty"));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VocalSwapError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VocalSwapError::config(format!("Failed to write config file: {}", e)))
    }

    /// Create default config file
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("vocalswap").chain(extra.iter().copied()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.processing_root(), Path::new("./media/processing"));
        assert_eq!(config.output_root(), Path::new("./media/outputs"));
        assert_eq!(config.model_path(), Path::new("./models/rvc_model.pth"));
        assert!(config.model.preload);
        assert_eq!(config.worker_count(), 2);
        assert_eq!(config.encoder.codec, "mp3");
        assert_eq!(config.encoder.bitrate, "192k");
        assert!(!config.strict_encoder());
        assert_eq!(config.separation.model_name, "UVR-MDX-NET-Voc_FT");
        assert!(config.separation.program.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.mixer.vocal_gain = -0.5;
        assert!(config.validate().is_err());
        config.mixer.vocal_gain = f32::NAN;
        assert!(config.validate().is_err());
        config.mixer.vocal_gain = 1.0;

        config.mixer.instrumental_gain = f32::INFINITY;
        assert!(config.validate().is_err());
        config.mixer.instrumental_gain = 0.0;
        assert!(config.validate().is_ok());

        config.workers.count = 0;
        assert!(config.validate().is_err());
        config.workers.count = num_cpus::get() * 2 + 1;
        assert!(config.validate().is_err());
        config.workers.count = 1;

        config.conversion.protect = 0.9;
        assert!(config.validate().is_err());
        config.conversion.protect = 0.33;

        config.encoder.codec = " ".to_string();
        assert!(config.validate().is_err());
        config.encoder.codec = "mp3".to_string();

        config.encoder.bitrate.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.mixer.vocal_gain = 0.8;
        config.conversion.f0_up_key = -3;
        config.separation.program = Some(PathBuf::from("/opt/separator"));

        assert!(config.save_to_file(&config_path).is_ok());
        assert!(config_path.exists());

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.mixer, config.mixer);
        assert_eq!(loaded.conversion, config.conversion);
        assert_eq!(loaded.separation.program, config.separation.program);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[mixer]\nvocal_gain = 0.5\n\n[workers]\ncount = 1\n").unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.mixer.vocal_gain, 0.5);
        assert_eq!(config.mixer.instrumental_gain, 1.0);
        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.encoder.codec, "mp3");
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[mixer\nvocal_gain = ").unwrap();

        assert!(matches!(Config::from_file(&config_path), Err(VocalSwapError::Config { .. })));
    }

    #[test]
    fn test_args_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[mixer]\nvocal_gain = 0.5\ninstrumental_gain = 0.7\n").unwrap();

        let args = args(&[
            "-c", config_path.to_str().unwrap(),
            "--vocal-gain", "0.9",
            "--pitch", "-5",
            "--workers", "1",
            "--strict-encoder",
        ]);
        let config = Config::from_args_and_config(&args).unwrap();

        assert_eq!(config.mixer.vocal_gain, 0.9);
        assert_eq!(config.mixer.instrumental_gain, 0.7);
        assert_eq!(config.conversion.f0_up_key, -5);
        assert_eq!(config.worker_count(), 1);
        assert!(config.strict_encoder());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        assert!(Config::from_args_and_config(&args(&["--pitch", "40"])).is_err());
        assert!(Config::from_args_and_config(&args(&["--workers", "0"])).is_err());
    }

    #[test]
    fn test_create_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("vocalswap.toml");

        Config::create_default_config(&config_path).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[storage]"));
        assert!(content.contains("[encoder]"));
        assert!(Config::from_file(&config_path).is_ok());
    }
}
