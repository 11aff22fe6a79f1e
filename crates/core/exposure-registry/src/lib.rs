//! Closed registry of supported providers.
//!
//! The set of providers is a statically-enumerated table: adding one means
//! adding a variant here, so the compiler checks every dispatch site. Runs
//! can be scoped to a subset; the default is all registered providers.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use exposure_adapter_ethena::EthenaAdapter;
use exposure_adapter_gauntlet::GauntletAdapter;
use exposure_adapter_midas::MidasAdapter;
use exposure_adapter_morpho::MorphoAdapter;
use exposure_adapter_resolv::ResolvAdapter;
use exposure_adapter_sky::SkyAdapter;
use exposure_common::dune::DuneClient;
use exposure_common::JsonClient;
use exposure_core::RunnableAdapter;
use exposure_resolver_debank::DebankClient;

/// Credentials shared by provider integrations.
#[derive(Clone, Debug, Default)]
pub struct RegistryConfig {
    /// Debank pro-openapi access key (midas, resolv).
    pub debank_access_key: Option<String>,
    /// Dune Analytics API key (resolv).
    pub dune_api_key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Ethena,
    Gauntlet,
    Midas,
    Morpho,
    Resolv,
    Sky,
}

impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::Ethena,
        Provider::Gauntlet,
        Provider::Midas,
        Provider::Morpho,
        Provider::Resolv,
        Provider::Sky,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::Ethena => "ethena",
            Provider::Gauntlet => "gauntlet",
            Provider::Midas => "midas",
            Provider::Morpho => "morpho",
            Provider::Resolv => "resolv",
            Provider::Sky => "sky",
        }
    }

    /// Instantiate this provider's adapter.
    pub fn create(
        &self,
        client: &JsonClient,
        config: &RegistryConfig,
    ) -> Result<Arc<dyn RunnableAdapter>> {
        let debank = || DebankClient::new(client.clone(), config.debank_access_key.clone());

        let adapter: Arc<dyn RunnableAdapter> = match self {
            Provider::Ethena => Arc::new(EthenaAdapter::new(client.clone())),
            Provider::Gauntlet => Arc::new(GauntletAdapter::new(client.clone())),
            Provider::Midas => Arc::new(MidasAdapter::new(client.clone(), debank())),
            Provider::Morpho => Arc::new(MorphoAdapter::new(client.clone())),
            Provider::Resolv => {
                let api_key = config
                    .dune_api_key
                    .clone()
                    .context("resolv requires a Dune API key")?;
                Arc::new(ResolvAdapter::new(
                    DuneClient::new(client.clone(), api_key),
                    debank(),
                ))
            }
            Provider::Sky => Arc::new(SkyAdapter::new(client.clone())),
        };

        Ok(adapter)
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Provider::ALL
            .iter()
            .find(|provider| provider.id() == value.to_lowercase())
            .copied()
            .with_context(|| {
                let known: Vec<_> = Provider::ALL.iter().map(Provider::id).collect();
                format!("unknown provider '{value}' (known: {})", known.join(", "))
            })
    }
}

/// Build adapters for the requested providers, sharing one HTTP client pool.
pub fn build_adapters(
    providers: &[Provider],
    config: &RegistryConfig,
) -> Result<Vec<Arc<dyn RunnableAdapter>>> {
    let client = JsonClient::new();
    providers
        .iter()
        .map(|provider| provider.create(&client, config))
        .collect()
}
