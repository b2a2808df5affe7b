use serde::{Deserialize, Serialize};

use crate::{
    models::request_params::{DailyBarsRequest, ProviderParams},
    providers::ProviderError,
    tz::{self, EXCHANGE_TZ},
};

/// Page size requested from Alpaca; the API maximum.
const PAGE_LIMIT: u32 = 10_000;

/// Specifies the corporate action adjustment for stock data.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    #[default]
    Raw,
    Split,
    Dividend,
    All,
}

impl Adjustment {
    fn as_str(self) -> &'static str {
        match self {
            Adjustment::Raw => "raw",
            Adjustment::Split => "split",
            Adjustment::Dividend => "dividend",
            Adjustment::All => "all",
        }
    }
}

/// Specifies the source feed for stock data.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    #[default]
    Sip,
    Iex,
    Otc,
}

impl Feed {
    fn as_str(self) -> &'static str {
        match self {
            Feed::Sip => "sip",
            Feed::Iex => "iex",
            Feed::Otc => "otc",
        }
    }
}

/// Alpaca-specific parameters for a bars request.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AlpacaBarsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<Adjustment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<Feed>,
}

pub(crate) fn validate_request(request: &DailyBarsRequest) -> Result<(), ProviderError> {
    if request.symbol.trim().is_empty() {
        return Err(ProviderError::Validation("symbol must not be empty".into()));
    }
    if request.start > request.end {
        return Err(ProviderError::Validation(format!(
            "start {} is after end {}",
            request.start, request.end
        )));
    }
    Ok(())
}

/// Builds the query string for one page of a daily bars request.
///
/// Alpaca's `end` is an instant; the request's inclusive end date is sent as the
/// first instant of the following exchange day, so the last requested day is in
/// range and the next one is not.
pub(crate) fn construct_params(request: &DailyBarsRequest) -> Vec<(String, String)> {
    let start = tz::local_day_start_utc(request.start, EXCHANGE_TZ);
    let end_exclusive = request
        .end
        .succ_opt()
        .map(|next| tz::local_day_start_utc(next, EXCHANGE_TZ))
        .unwrap_or_else(|| tz::local_day_start_utc(request.end, EXCHANGE_TZ));

    let mut query = vec![
        ("symbols".to_string(), request.symbol.clone()),
        ("timeframe".to_string(), "1Day".to_string()),
        ("start".to_string(), tz::to_rfc3339_secs(start)),
        ("end".to_string(), tz::to_rfc3339_secs(end_exclusive)),
        ("limit".to_string(), PAGE_LIMIT.to_string()),
        ("sort".to_string(), "asc".to_string()),
    ];

    if let ProviderParams::Alpaca(alpaca) = &request.provider_specific {
        if let Some(adjustment) = alpaca.adjustment {
            query.push(("adjustment".to_string(), adjustment.as_str().to_string()));
        }
        if let Some(feed) = alpaca.feed {
            query.push(("feed".to_string(), feed.as_str().to_string()));
        }
    }

    query
}
