//! Run configuration.
//!
//! Roots are positional: `inputs[i]` is rewritten into `outputs[i]`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Extension of binary module entries when none is configured.
pub const DEFAULT_MODULE_EXTENSION: &str = "rmod";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrarConfig {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    /// Read-only roots consulted for metadata and hierarchy; never rewritten.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    /// Read-only roots holding the platform's base modules.
    #[serde(default)]
    pub bootpath: Vec<PathBuf>,
    #[serde(default = "default_module_extension")]
    pub module_extension: String,
}

fn default_module_extension() -> String {
    DEFAULT_MODULE_EXTENSION.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            classpath: Vec::new(),
            bootpath: Vec::new(),
            module_extension: default_module_extension(),
        }
    }
}

impl RegistrarConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: RegistrarConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "inputs",
                reason: "at least one input root is required".to_string(),
            });
        }
        if self.inputs.len() != self.outputs.len() {
            return Err(ConfigError::InvalidValue {
                field: "outputs",
                reason: format!(
                    "expected {} output roots to match inputs, got {}",
                    self.inputs.len(),
                    self.outputs.len()
                ),
            });
        }
        if let Some(output) = self.outputs.iter().find(|o| self.inputs.contains(o)) {
            return Err(ConfigError::InvalidValue {
                field: "outputs",
                reason: format!("{} is also an input root", output.display()),
            });
        }
        for (i, output) in self.outputs.iter().enumerate() {
            if self.outputs[..i].contains(output) {
                return Err(ConfigError::InvalidValue {
                    field: "outputs",
                    reason: format!("{} is listed more than once", output.display()),
                });
            }
        }
        let ext = self.module_extension.as_str();
        if ext.is_empty() || ext.starts_with('.') || ext.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(ConfigError::InvalidValue {
                field: "module_extension",
                reason: "must be a bare extension such as \"rmod\"".to_string(),
            });
        }
        Ok(())
    }

    /// Input and output roots paired by position.
    pub fn root_pairs(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.inputs
            .iter()
            .map(PathBuf::as_path)
            .zip(self.outputs.iter().map(PathBuf::as_path))
    }

    /// Classpath followed by bootpath roots.
    pub fn reference_roots(&self) -> impl Iterator<Item = &Path> {
        self.classpath
            .iter()
            .chain(self.bootpath.iter())
            .map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(inputs: &[&str], outputs: &[&str]) -> RegistrarConfig {
        RegistrarConfig {
            inputs: inputs.iter().map(PathBuf::from).collect(),
            outputs: outputs.iter().map(PathBuf::from).collect(),
            ..RegistrarConfig::default()
        }
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = RegistrarConfig::from_toml(
            r#"
inputs = ["build/classes"]
outputs = ["build/patched"]
"#,
        )
        .expect("parse");
        assert_eq!(config.module_extension, "rmod");
        assert!(config.classpath.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RegistrarConfig::from_toml("inputs = []\noutputs = []\nextra = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_mismatched_roots_rejected() {
        let err = config(&["a", "b"], &["out"]).validate().unwrap_err();
        assert!(err.to_string().contains("expected 2 output roots"));
    }

    #[test]
    fn test_output_equal_to_input_rejected() {
        assert!(config(&["a"], &["a"]).validate().is_err());
    }

    #[test]
    fn test_shared_output_rejected() {
        let err = config(&["a", "b"], &["out", "out"]).validate().unwrap_err();
        assert!(err.to_string().contains("listed more than once"));
    }

    #[test]
    fn test_extension_validated_as_matched() {
        for bad in ["", ".rmod", " rmod", "rmod ", "a/b"] {
            let mut cfg = config(&["a"], &["b"]);
            cfg.module_extension = bad.to_string();
            assert!(cfg.validate().is_err(), "{bad:?} should be rejected");
        }
        let mut cfg = config(&["a"], &["b"]);
        cfg.module_extension = "mod2".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(config(&[], &[]).validate().is_err());
    }

    #[test]
    fn test_root_pairs_are_positional() {
        let config = config(&["a", "b"], &["x", "y"]);
        let pairs: Vec<_> = config.root_pairs().collect();
        assert_eq!(pairs[1], (Path::new("b"), Path::new("y")));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "inputs = [\"in\"]\noutputs = [\"out\"]\nbootpath = [\"boot\"]").unwrap();
        let config = RegistrarConfig::from_path(file.path()).unwrap();
        assert_eq!(config.reference_roots().count(), 1);
    }
}
