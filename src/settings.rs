use std::{fs::File, io::BufReader, path::{Path, PathBuf}};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{numeric::DecimalSymbol, store::StoreKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub missing_token: String,
    pub decimal_symbol: DecimalSymbol,
    pub max_uniques: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            missing_token: "NA".to_string(),
            decimal_symbol: DecimalSymbol::Dot,
            max_uniques: 49,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteBufferSettings {
    pub max_items: usize,
}

impl Default for WriteBufferSettings {
    fn default() -> Self {
        Self { max_items: 1000 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub import: ImportSettings,
    pub write_buffer: WriteBufferSettings,
    pub store: StoreSettings,
}

impl EngineSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening settings file {path:?}"))?;
        let settings: EngineSettings =
            serde_yaml::from_reader(BufReader::new(file)).context("Parsing settings YAML")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.write_buffer.max_items >= 1,
            "write_buffer.max_items must be at least 1"
        );
        ensure!(
            !self.import.missing_token.trim().is_empty(),
            "import.missing_token must not be blank"
        );
        Ok(())
    }
}
