use serde::Deserialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{DumpError, Result};
use crate::template::Boilerplate;

/// Rows per `INSERT` statement unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Options of one dump run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Bracket each table's data section in `LOCK TABLES` / `UNLOCK TABLES`
    pub lock_tables: bool,
    /// Maximum rows per `INSERT` statement
    pub batch_size: usize,
    /// Output file; stdout when unset
    pub output: Option<PathBuf>,
    #[serde(skip)]
    pub boilerplate: Boilerplate,
}

impl Default for DumpConfig {
    fn default() -> Self {
        DumpConfig {
            lock_tables: false,
            batch_size: DEFAULT_BATCH_SIZE,
            output: None,
            boilerplate: Boilerplate::default(),
        }
    }
}

impl DumpConfig {
    pub fn with_lock_tables(mut self, lock_tables: bool) -> Self {
        self.lock_tables = lock_tables;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Rejects option combinations the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DumpError::Config("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Opens the configured destination for writing.
    ///
    /// A file destination is created or truncated.
    pub fn open_output(&self) -> Result<Box<dyn Write>> {
        match &self.output {
            Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
            None => Ok(Box::new(BufWriter::new(io::stdout()))),
        }
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    dump: DumpConfig,
}

/// Parses and validates configuration from TOML text.
pub fn parse_config(content: &str) -> Result<DumpConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    file.dump.validate()?;
    Ok(file.dump)
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = sqldump::config::load_config("dump.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DumpConfig> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
