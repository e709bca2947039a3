//! Deployment settings loaded from TOML
//!
//! ```toml
//! [network]
//! name = "mainnet"
//! controller = "0x9f828ac3baa9003e8a4e0b24bcae7b027b6740b0"
//! explorer = "https://etherscan.io"
//!
//! [token]
//! symbol = "DXD"
//! decimals = 18
//! ```

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, Result};
use crate::proposal::Address;
use crate::units::DEFAULT_DECIMALS;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub token: TokenSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub name: String,
    /// Controller whose generic calls get decoded
    pub controller: Address,
    /// Block explorer base URL
    pub explorer: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name: "mainnet".to_string(),
            controller: Address::new("0x0000000000000000000000000000000000000000"),
            explorer: "https://etherscan.io".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub symbol: String,
    pub decimals: u32,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            symbol: "DXD".to_string(),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

impl Settings {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(contents).map_err(|e| GovernanceError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&contents)?;
        info!(
            "Loaded settings from {} (network {}, token {})",
            path.display(),
            settings.network.name,
            settings.token.symbol
        );
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        // 10^77 is the largest power of ten below 2^256
        if self.token.decimals > 77 {
            return Err(GovernanceError::Settings(format!(
                "token decimals {} out of range",
                self.token.decimals
            )));
        }
        if self.token.symbol.trim().is_empty() {
            return Err(GovernanceError::Settings("token symbol is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_sections_missing() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.token.decimals, 18);
    }

    #[test]
    fn test_partial_sections() {
        let settings = Settings::from_toml_str(
            r#"
            [network]
            controller = "0xABCDEF"

            [token]
            symbol = "GLD"
            "#,
        )
        .unwrap();
        assert_eq!(settings.network.controller, Address::new("0xabcdef"));
        assert_eq!(settings.network.name, "mainnet");
        assert_eq!(settings.token.symbol, "GLD");
        assert_eq!(settings.token.decimals, 18);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Settings::from_toml_str("[token]\ndecimals = 90").is_err());
        assert!(Settings::from_toml_str("[token]\nsymbol = \"  \"").is_err());
        assert!(Settings::from_toml_str("[network\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network]\nname = \"xdai\"\nexplorer = \"https://blockscout.com/xdai/mainnet\"").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.network.name, "xdai");
        assert!(matches!(
            Settings::load("/nonexistent/settings.toml"),
            Err(GovernanceError::Io(_))
        ));
    }
}
