use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::models::bar::Bar;

#[derive(Deserialize, Debug)]
pub(crate) struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
    #[serde(rename = "n", default)]
    pub trade_count: Option<u64>,
    #[serde(rename = "vw", default)]
    pub vwap: Option<f64>,
}

impl From<AlpacaBar> for Bar {
    fn from(ab: AlpacaBar) -> Self {
        Bar {
            timestamp: ab.timestamp,
            open: ab.open,
            high: ab.high,
            low: ab.low,
            close: ab.close,
            volume: ab.volume,
            trade_count: ab.trade_count,
            vwap: ab.vwap,
        }
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct AlpacaResponse {
    /// Alpaca sends `null` rather than `{}` when nothing matched.
    #[serde(default)]
    pub bars: Option<IndexMap<String, Vec<AlpacaBar>>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_page_of_bars() {
        let body = r#"{
            "bars": {
                "AAPL": [
                    {"t":"2023-01-03T05:00:00Z","o":130.28,"h":130.9,"l":124.17,"c":125.07,"v":112117471,"n":1021065,"vw":125.725},
                    {"t":"2023-01-04T05:00:00Z","o":126.89,"h":128.66,"l":125.08,"c":126.36,"v":89100633}
                ]
            },
            "next_page_token": "QUFQTHxEfDIwMjMtMDEtMDQ="
        }"#;
        let parsed: AlpacaResponse = serde_json::from_str(body).unwrap();
        let bars = parsed.bars.unwrap();
        assert_eq!(bars["AAPL"].len(), 2);
        assert_eq!(bars["AAPL"][0].trade_count, Some(1_021_065));
        assert_eq!(bars["AAPL"][1].vwap, None);
        assert!(parsed.next_page_token.is_some());

        let bar: Bar = bars.into_values().flatten().next().unwrap().into();
        assert_eq!(bar.close, 125.07);
    }

    #[test]
    fn null_bars_is_an_empty_page() {
        let parsed: AlpacaResponse =
            serde_json::from_str(r#"{"bars":null,"next_page_token":null}"#).unwrap();
        assert!(parsed.bars.is_none());
        assert!(parsed.next_page_token.is_none());
    }
}
