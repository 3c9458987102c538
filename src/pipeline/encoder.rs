//! Distribution-format encoder backed by an external transcoder

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::EncoderConfig;
use crate::error::{Result, VocalSwapError};
use super::adapters::Encoder;
use super::command::run_command;

/// Invokes `<program> -i <in> -codec:a <codec> -b:a <bitrate> <out> -y`.
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    program: PathBuf,
    codec: String,
    bitrate: String,
    extension: String,
}

impl CommandEncoder {
    pub fn new<P: Into<PathBuf>>(program: P, codec: impl Into<String>, bitrate: impl Into<String>) -> Self {
        let codec = codec.into();
        let extension = extension_for_codec(&codec).to_string();
        Self {
            program: program.into(),
            codec,
            bitrate: bitrate.into(),
            extension,
        }
    }

    pub fn from_config(config: &EncoderConfig) -> Self {
        Self::new(config.program.clone(), config.codec.clone(), config.bitrate.clone())
    }

    fn build_command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-i").arg(input)
            .arg("-codec:a").arg(&self.codec)
            .arg("-b:a").arg(&self.bitrate)
            .arg(output)
            .arg("-y");
        command
    }
}

impl Encoder for CommandEncoder {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn encode(&self, input: &Path, output: &Path) -> Result<()> {
        run_command(&mut self.build_command(input, output), "encoder")?;

        let produced = std::fs::metadata(output).map(|m| m.len() > 0).unwrap_or(false);
        if !produced {
            return Err(VocalSwapError::encoding(format!(
                "Encoder produced no output at {}",
                output.display()
            )));
        }
        Ok(())
    }
}

pub fn extension_for_codec(codec: &str) -> &str {
    match codec {
        "mp3" | "libmp3lame" => "mp3",
        "aac" | "libfdk_aac" => "m4a",
        "libopus" | "opus" => "opus",
        "libvorbis" | "vorbis" => "ogg",
        "flac" => "flac",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for_codec("mp3"), "mp3");
        assert_eq!(extension_for_codec("libmp3lame"), "mp3");
        assert_eq!(extension_for_codec("aac"), "m4a");
        assert_eq!(extension_for_codec("flac"), "flac");
    }

    #[test]
    fn test_command_line() {
        let encoder = CommandEncoder::new("ffmpeg", "mp3", "192k");
        let command = encoder.build_command(Path::new("mixed.wav"), Path::new("output.mp3"));
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["-i", "mixed.wav", "-codec:a", "mp3", "-b:a", "192k", "output.mp3", "-y"]);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let dir = TempDir::new().unwrap();
        let encoder = CommandEncoder::new("/nonexistent/bin/ffmpeg", "mp3", "192k");
        let result = encoder.encode(&dir.path().join("mixed.wav"), &dir.path().join("output.mp3"));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_without_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        let encoder = CommandEncoder::new("true", "mp3", "192k");
        let result = encoder.encode(&dir.path().join("mixed.wav"), &dir.path().join("output.mp3"));
        assert!(matches!(result, Err(VocalSwapError::EncodingFailed { .. })));
    }
}
