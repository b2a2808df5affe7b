//! Provider registry that maps a configured [`ProviderId`] to a concrete provider.

use std::{fmt, str::FromStr};

use market_data_ingestor::providers::{
    DataProvider, ProviderInitError, alpaca_rest::AlpacaProvider,
};
use serde::{Deserialize, Serialize};

/// Which upstream to use (serde snake_case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Alpaca market data REST API.
    Alpaca,
}

impl ProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Alpaca => "alpaca",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alpaca" => Ok(ProviderId::Alpaca),
            other => Err(format!("unknown provider `{other}`")),
        }
    }
}

/// Build and return a boxed data provider corresponding to the supplied ProviderId.
///
/// Credentials are read from the environment by the provider itself.
pub fn build_provider(
    id: ProviderId,
) -> Result<Box<dyn DataProvider + Send + Sync>, ProviderInitError> {
    match id {
        ProviderId::Alpaca => {
            let p = AlpacaProvider::new()?;
            Ok(Box::new(p))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_parses_case_insensitively() {
        assert_eq!(" Alpaca ".parse::<ProviderId>(), Ok(ProviderId::Alpaca));
        assert!("polygon".parse::<ProviderId>().is_err());
        assert_eq!(ProviderId::Alpaca.to_string(), "alpaca");
    }
}
