//! Context providers: live solar market figures and a static fallback.
//!
//! `SolarMarketProvider` combines NREL irradiance with the latest EIA
//! real-time price and derives production and avoided CO2. Each upstream call
//! falls back to a fixed value on its own, so the provider only fails if
//! something other than the HTTP calls goes wrong.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::ContextProvider;
use crate::domain::ContextData;

const NREL_URL: &str = "https://developer.nrel.gov/api/solar/solar_resource/v1.json";
const EIA_URL: &str = "https://api.eia.gov/v2/electricity/rto/price-data";

/// Irradiance used when NREL is unavailable (W/m2)
pub const DEFAULT_IRRADIANCE: f64 = 800.0;

/// Price used when EIA is unavailable ($/MWh)
pub const DEFAULT_MARKET_PRICE: f64 = 50.0;

/// Approximate installed US solar capacity (MW)
pub const ESTIMATED_CAPACITY_MW: f64 = 150_000.0;

const PANEL_EFFICIENCY: f64 = 0.20;
const AREA_FACTOR: f64 = 0.0001;
const GRID_EMISSIONS_KG_PER_KWH: f64 = 0.85;
const SOLAR_EMISSIONS_KG_PER_KWH: f64 = 0.05;

// Geographic centre of the contiguous US
const SAMPLE_LAT: f64 = 39.8283;
const SAMPLE_LON: f64 = -98.5795;

/// Live solar production and market data
pub struct SolarMarketProvider {
    nrel_api_key: String,
    eia_api_key: String,
    client: reqwest::Client,
}

impl SolarMarketProvider {
    pub fn new(nrel_api_key: impl Into<String>, eia_api_key: impl Into<String>) -> Self {
        Self {
            nrel_api_key: nrel_api_key.into(),
            eia_api_key: eia_api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Global horizontal irradiance at the sample location
    async fn irradiance(&self) -> f64 {
        let lat = SAMPLE_LAT.to_string();
        let lon = SAMPLE_LON.to_string();
        let result = self
            .client
            .get(NREL_URL)
            .query(&[
                ("api_key", self.nrel_api_key.as_str()),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
            ])
            .send()
            .await;

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = %r.status(), "NREL API error");
                return DEFAULT_IRRADIANCE;
            }
            Err(e) => {
                warn!(error = %e, "Error fetching solar irradiance");
                return DEFAULT_IRRADIANCE;
            }
        };

        match response.json::<Value>().await {
            Ok(data) => data["outputs"]["ghi"].as_f64().unwrap_or(0.0),
            Err(e) => {
                warn!(error = %e, "Unreadable NREL response");
                DEFAULT_IRRADIANCE
            }
        }
    }

    /// Latest real-time market price
    async fn market_price(&self) -> f64 {
        let result = self
            .client
            .get(EIA_URL)
            .query(&[
                ("api_key", self.eia_api_key.as_str()),
                ("frequency", "hourly"),
                ("data[]", "value"),
                ("facets[type][]", "RTPD"),
                ("sort[0][column]", "period"),
                ("sort[0][direction]", "desc"),
                ("offset", "0"),
                ("length", "1"),
            ])
            .send()
            .await;

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = %r.status(), "EIA API error");
                return DEFAULT_MARKET_PRICE;
            }
            Err(e) => {
                warn!(error = %e, "Error fetching energy market data");
                return DEFAULT_MARKET_PRICE;
            }
        };

        match response.json::<Value>().await {
            Ok(data) => {
                let value = &data["response"]["data"][0]["value"];
                value
                    .as_f64()
                    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                    .unwrap_or(DEFAULT_MARKET_PRICE)
            }
            Err(e) => {
                warn!(error = %e, "Unreadable EIA response");
                DEFAULT_MARKET_PRICE
            }
        }
    }
}

#[async_trait]
impl ContextProvider for SolarMarketProvider {
    fn name(&self) -> &str {
        "solar_market"
    }

    async fn fetch_context(&self) -> Result<ContextData> {
        let (irradiance, price) = tokio::join!(self.irradiance(), self.market_price());

        let production = solar_production_mw(irradiance, ESTIMATED_CAPACITY_MW, PANEL_EFFICIENCY);
        let carbon = carbon_saved_tons(production, 1.0);

        info!(
            production_mw = production,
            market_price = price,
            "Collected solar data"
        );

        Ok(solar_context(production, ESTIMATED_CAPACITY_MW, PANEL_EFFICIENCY, price, carbon))
    }
}

/// Fixed context values (from config, or for tests)
#[derive(Debug, Clone, Default)]
pub struct StaticContextProvider {
    context: ContextData,
}

impl StaticContextProvider {
    pub fn new(context: ContextData) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ContextProvider for StaticContextProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_context(&self) -> Result<ContextData> {
        Ok(self.context.clone())
    }
}

/// Production from irradiance, capacity and efficiency (never negative)
pub fn solar_production_mw(irradiance: f64, capacity_mw: f64, efficiency: f64) -> f64 {
    (irradiance * capacity_mw * efficiency * AREA_FACTOR).max(0.0)
}

/// Avoided CO2 in tons for `hours` of production
pub fn carbon_saved_tons(production_mw: f64, hours: f64) -> f64 {
    let savings_per_kwh = GRID_EMISSIONS_KG_PER_KWH - SOLAR_EMISSIONS_KG_PER_KWH;
    let kwh_produced = production_mw * 1000.0 * hours;
    kwh_produced * savings_per_kwh / 1000.0
}

/// Format the figures the way prompts expect them
pub fn solar_context(
    production_mw: f64,
    capacity_mw: f64,
    efficiency: f64,
    price: f64,
    carbon_tons: f64,
) -> ContextData {
    ContextData::new()
        .with("current_production_mw", group_thousands(production_mw))
        .with("total_capacity_mw", group_thousands(capacity_mw))
        .with("efficiency_percent", format!("{:.1}%", efficiency * 100.0))
        .with("market_price", format!("${:.1}", price))
        .with("carbon_saved_tons", group_thousands(carbon_tons))
}

/// Round to an integer and insert thousands separators
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
