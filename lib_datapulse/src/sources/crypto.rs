use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::configs::Settings;
use crate::error::{PipelineError, Result};
use crate::loggers::DiagnosticSink;
use crate::records::{RowRecord, ToRow};
use crate::retrieve::JsonFetch;
use crate::store::FileStore;

use super::{lenient_f64, now_iso, save_capture, Source};

pub const BASE_URL: &str = "https://api.coingecko.com/api/v3/";
const PRICE_PATH: &str = "simple/price";

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default, deserialize_with = "lenient_f64")]
    usd: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    usd_market_cap: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    usd_24h_change: f64,
}

/// Price snapshot of one coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoRecord {
    pub coin: String,
    pub price_usd: f64,
    pub market_cap: f64,
    pub change_24h: f64,
    pub collected_at: String,
}

impl ToRow for CryptoRecord {
    fn to_row(&self) -> RowRecord {
        RowRecord::new()
            .with("coin", self.coin.as_str())
            .with("price_usd", self.price_usd)
            .with("market_cap", self.market_cap)
            .with("change_24h", self.change_24h)
            .with("collected_at", self.collected_at.as_str())
    }
}

/// `{ "<coin>": { "usd": .., "usd_market_cap": .., "usd_24h_change": .. } }`
/// into records ordered by coin id. Missing numbers are zero.
pub fn parse_prices(body: Value) -> Result<Vec<CryptoRecord>> {
    let quotes: BTreeMap<String, Quote> = serde_json::from_value(body)
        .map_err(|e| PipelineError::Payload(format!("CoinGecko: {e}")))?;
    let collected_at = now_iso();
    Ok(quotes
        .into_iter()
        .map(|(coin, q)| CryptoRecord {
            coin,
            price_usd: q.usd,
            market_cap: q.usd_market_cap,
            change_24h: q.usd_24h_change,
            collected_at: collected_at.clone(),
        })
        .collect())
}

async fn fetch_crypto<F: JsonFetch>(api: &F, settings: &Settings) -> Result<Vec<CryptoRecord>> {
    let query = [
        ("ids", settings.crypto_ids.join(",")),
        ("vs_currencies", "usd".to_string()),
        ("include_24hr_change", "true".to_string()),
        ("include_market_cap", "true".to_string()),
    ];
    let body = api.get_json(PRICE_PATH, &query).await?;
    parse_prices(body)
}

/// Collects coin prices and saves a raw capture.
pub async fn collect_crypto<F: JsonFetch>(
    api: &F,
    store: &FileStore,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
) -> Vec<CryptoRecord> {
    let stage = Source::Crypto.name();
    sink.info(stage, "Collecting cryptocurrency data...", None);

    let coins = match fetch_crypto(api, settings).await {
        Ok(coins) => coins,
        Err(e) => {
            sink.error(
                stage,
                &format!("Error collecting crypto data: {e}"),
                Some(json!({ "source": Source::Crypto.label() })),
            );
            return Vec::new();
        }
    };

    if let Err(e) = save_capture(store, Source::Crypto, &coins, sink) {
        sink.error(stage, &format!("Error saving crypto data: {e}"), None);
        return Vec::new();
    }
    coins
}
