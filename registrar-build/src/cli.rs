//! Command line interface

use clap::Parser;
use registrar_core::RegistrarConfig;
use std::path::PathBuf;

/// Wire registries to their components by rewriting compiled modules.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "registrar")]
#[command(about = "Build-time registration wiring for compiled modules")]
pub struct Cli {
    /// TOML configuration file; flags below extend it
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Input root (repeatable, paired with --output by position)
    #[arg(short, long = "input", value_name = "DIR")]
    pub inputs: Vec<PathBuf>,

    /// Output root (repeatable)
    #[arg(short, long = "output", value_name = "DIR")]
    pub outputs: Vec<PathBuf>,

    /// Read-only root consulted for metadata (repeatable)
    #[arg(long = "classpath", value_name = "DIR")]
    pub classpath: Vec<PathBuf>,

    /// Read-only root holding base modules (repeatable)
    #[arg(long = "bootpath", value_name = "DIR")]
    pub bootpath: Vec<PathBuf>,

    /// Extension of module entries
    #[arg(long, value_name = "EXT")]
    pub module_extension: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Write the run summary as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,
}

impl Cli {
    /// File configuration (if any) extended by the flags.
    pub fn into_config(self) -> Result<RegistrarConfig, registrar_core::ConfigError> {
        let mut config = match &self.config {
            Some(path) => RegistrarConfig::from_path(path)?,
            None => RegistrarConfig::default(),
        };
        config.inputs.extend(self.inputs);
        config.outputs.extend(self.outputs);
        config.classpath.extend(self.classpath);
        config.bootpath.extend(self.bootpath);
        if let Some(ext) = self.module_extension {
            config.module_extension = ext;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_build_config() {
        let cli = Cli::try_parse_from([
            "registrar", "-i", "in1", "-o", "out1", "--input", "in2", "--output", "out2",
            "--classpath", "lib", "--json-logs",
        ])
        .unwrap();
        assert!(cli.json_logs);
        assert_eq!(cli.log_level, "info");
        let config = cli.into_config().unwrap();
        assert_eq!(config.inputs, vec![PathBuf::from("in1"), PathBuf::from("in2")]);
        assert_eq!(config.outputs, vec![PathBuf::from("out1"), PathBuf::from("out2")]);
        assert_eq!(config.classpath, vec![PathBuf::from("lib")]);
        assert_eq!(config.module_extension, "rmod");
    }

    #[test]
    fn test_flags_extend_file_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "inputs = [\"a\"]\noutputs = [\"b\"]\nbootpath = [\"boot\"]").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::try_parse_from(["registrar", "--config", &path, "--bootpath", "more"]).unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.inputs, vec![PathBuf::from("a")]);
        assert_eq!(config.bootpath, vec![PathBuf::from("boot"), PathBuf::from("more")]);
    }
}
