use reqwest::{blocking::Client, header};
use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::get_env_var;

use crate::{
    models::{bar::Bar, bar_series::BarSeries, request_params::DailyBarsRequest},
    providers::{
        DataProvider, ProviderError, ProviderInitError,
        alpaca_rest::{
            params::{construct_params, validate_request},
            response::AlpacaResponse,
        },
    },
};

const BASE_URL: &str = "https://data.alpaca.markets/v2/stocks/bars";

const KEY_ID_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_KEY_HEADER: &str = "APCA-API-SECRET-KEY";

pub struct AlpacaProvider {
    client: Client,
    base_url: String,
    _api_key: SecretString,
    _secret_key: SecretString,
}

impl AlpacaProvider {
    /// Creates a new Alpaca provider.
    ///
    /// Reads API keys from the `APCA_API_KEY_ID` and `APCA_API_SECRET_KEY`
    /// environment variables.
    pub fn new() -> Result<Self, ProviderInitError> {
        let api_key = SecretString::from(get_env_var("APCA_API_KEY_ID")?);
        let secret_key = SecretString::from(get_env_var("APCA_API_SECRET_KEY")?);
        Self::with_keys(api_key, secret_key)
    }

    /// Creates a provider from explicit credentials.
    pub fn with_keys(
        api_key: SecretString,
        secret_key: SecretString,
    ) -> Result<Self, ProviderInitError> {
        let mut headers = header::HeaderMap::new();
        let mut key_value = header::HeaderValue::from_str(api_key.expose_secret())?;
        key_value.set_sensitive(true);
        headers.insert(KEY_ID_HEADER, key_value);
        let mut secret_value = header::HeaderValue::from_str(secret_key.expose_secret())?;
        secret_value.set_sensitive(true);
        headers.insert(SECRET_KEY_HEADER, secret_value);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            _api_key: api_key,
            _secret_key: secret_key,
        })
    }

    /// Points the provider at a different endpoint (e.g. a sandbox or a proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl DataProvider for AlpacaProvider {
    fn fetch_daily_bars(&self, request: &DailyBarsRequest) -> Result<BarSeries, ProviderError> {
        validate_request(request)?;

        let mut bars: Vec<Bar> = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let mut query_params = construct_params(request);
            if let Some(token) = &next_page_token {
                query_params.push(("page_token".to_string(), token.clone()));
            }

            let response = self.client.get(&self.base_url).query(&query_params).send()?;

            let status = response.status();
            if !status.is_success() {
                let message = response
                    .text()
                    .unwrap_or_else(|_| "Unknown API error".to_string());
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let page = response.json::<AlpacaResponse>()?;

            // The endpoint is multi-symbol; only ours was requested, but the map is
            // keyed by whatever casing Alpaca normalized it to.
            for (_, page_bars) in page.bars.unwrap_or_default() {
                bars.extend(page_bars.into_iter().map(Bar::from));
            }

            match page.next_page_token {
                Some(token) => next_page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(symbol = %request.symbol, bars = bars.len(), "fetched daily bars from alpaca");
        Ok(BarSeries::new(request.symbol.clone(), bars))
    }
}
