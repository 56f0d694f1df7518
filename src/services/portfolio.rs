//! Wallet balance aggregation across chains.
//!
//! A chain balance combines the native coin, tokens resolved from CoinGecko
//! ids and explicitly requested ERC-20 contracts, each priced in USD.
//! Upstream failures never abort the computation, they are reported in the
//! result's `errors` list and the affected balance counts as zero.

use crate::{
    errors::ApiError,
    models::{ChainBalance, Market, MultiBalanceResponse, NativeBalance, TokenBalance, TokenSpec},
    services::{
        chain_registry::{
            chain_for_platform, is_evm_chain, native_chain_for_coin, native_coin_for_chain,
            platform_for_chain, ChainRegistry, SOLANA_CHAIN,
        },
        coingecko::CoinGeckoClient,
        evm::EvmClient,
        solana::get_solana_balance,
    },
    validation::dedup_ids,
    Result,
};
use futures::stream::{self, StreamExt};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, info, warn};

/// Coin ids resolved concurrently per chain
const COIN_LOOKUP_CONCURRENCY: usize = 4;
/// Chains computed concurrently by the multi-chain endpoint
const MAX_CONCURRENT_CHAINS: usize = 4;

/// Which coin-id entries a chain balance reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinScope {
    /// Every requested coin, priced even when no balance can be read
    All,
    /// Only coins whose contract lives on the computed chain, so a
    /// multi-chain total does not count a token once per chain
    MatchingChain,
}

#[derive(Clone)]
pub struct PortfolioService {
    registry: Arc<ChainRegistry>,
    coingecko: CoinGeckoClient,
    evm: EvmClient,
}

impl PortfolioService {
    pub fn new(registry: Arc<ChainRegistry>, coingecko: CoinGeckoClient, evm: EvmClient) -> Self {
        Self {
            registry,
            coingecko,
            evm,
        }
    }

    pub async fn compute_balance_for_chain(
        &self,
        chain: &str,
        address: &str,
        coin_ids: &[String],
        tokens: &[TokenSpec],
        scope: CoinScope,
    ) -> ChainBalance {
        info!("Computing {} balance for {}", chain, address);
        let mut result = ChainBalance::new(chain, address);

        result.native = Some(self.native_entry(chain, address, &mut result.errors).await);

        let coin_ids = dedup_ids(coin_ids);
        let markets: HashMap<String, Market> = self
            .coingecko
            .markets(&coin_ids)
            .await
            .into_iter()
            .filter(|market| !market.id.is_empty())
            .map(|market| (market.id.clone(), market))
            .collect();

        let coin_futures: Vec<_> = coin_ids
            .iter()
            .filter(|coin_id| native_chain_for_coin(coin_id) != Some(chain))
            .map(|coin_id| self.coin_entry(chain, address, coin_id, markets.get(coin_id), scope))
            .collect();
        let coin_entries: Vec<_> = stream::iter(coin_futures)
            .buffered(COIN_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        for (entry, error) in coin_entries.into_iter().flatten() {
            result.tokens.push(entry);
            result.errors.extend(error);
        }

        for token in tokens {
            if let Some((entry, error)) = self.token_entry(chain, address, token).await {
                result.tokens.push(entry);
                result.errors.extend(error);
            }
        }

        result.update_total();
        result
    }

    /// Computes every `(chain, address)` pair and sums their USD totals
    pub async fn compute_multi(
        &self,
        addresses: &BTreeMap<String, String>,
        coin_ids: &[String],
        tokens: &[TokenSpec],
    ) -> MultiBalanceResponse {
        let mut seen = HashSet::new();
        let pairs: Vec<(String, String)> = addresses
            .iter()
            .map(|(chain, address)| (chain.trim().to_lowercase(), address.trim().to_string()))
            .filter(|(chain, address)| !chain.is_empty() && !address.is_empty())
            .filter(|(chain, _)| seen.insert(chain.clone()))
            .collect();

        let results: BTreeMap<String, ChainBalance> = stream::iter(pairs)
            .map(|(chain, address)| async move {
                let chain_tokens: Vec<TokenSpec> = tokens
                    .iter()
                    .filter(|token| token_chain(token).map_or(is_evm_chain(&chain), |c| c == chain))
                    .cloned()
                    .collect();
                let balance = self
                    .compute_balance_for_chain(
                        &chain,
                        &address,
                        coin_ids,
                        &chain_tokens,
                        CoinScope::MatchingChain,
                    )
                    .await;
                (chain, balance)
            })
            .buffer_unordered(MAX_CONCURRENT_CHAINS)
            .collect()
            .await;

        let total_usd = results.values().map(|balance| balance.total_usd).sum();
        MultiBalanceResponse { results, total_usd }
    }

    async fn native_entry(
        &self,
        chain: &str,
        address: &str,
        errors: &mut Vec<String>,
    ) -> NativeBalance {
        let rpc_url = self.registry.rpc_url(chain).await;

        let (balance, coin_id) = match (chain, rpc_url) {
            (SOLANA_CHAIN, rpc_url) => {
                let rpc_url = rpc_url.ok_or_else(|| ApiError::UnknownChain(chain.to_string()));
                let balance = match rpc_url {
                    Ok(url) => get_solana_balance(&url, address).await,
                    Err(err) => Err(err),
                };
                (balance, Some(SOLANA_CHAIN))
            }
            (_, Some(url)) if is_evm_chain(chain) => (
                self.evm.native_balance(&url, address).await,
                native_coin_for_chain(chain),
            ),
            _ => {
                debug!("No RPC configured for chain {}", chain);
                return NativeBalance {
                    symbol: chain.to_uppercase(),
                    balance: 0.0,
                    usd_price: None,
                    usd_value: 0.0,
                    price_change_24h: None,
                };
            }
        };

        let balance = balance.unwrap_or_else(|err| {
            warn!("Native balance error for {} @ {}: {}", chain, address, err);
            errors.push(format!("native_balance_error: {err}"));
            0.0
        });

        let market = match coin_id {
            Some(coin_id) => self
                .coingecko
                .markets(&[coin_id.to_string()])
                .await
                .into_iter()
                .next(),
            None => None,
        };

        let symbol = if chain == SOLANA_CHAIN {
            "SOL".to_string()
        } else {
            coin_id.unwrap_or(chain).to_uppercase()
        };
        let usd_price = market.as_ref().map(Market::price_or_zero);

        NativeBalance {
            symbol,
            balance,
            usd_price,
            usd_value: balance * usd_price.unwrap_or(0.0),
            price_change_24h: market.and_then(|m| m.price_change_percentage_24h),
        }
    }

    /// Entry for a CoinGecko id plus an optional error message.
    /// `None` when the scope excludes the coin.
    async fn coin_entry(
        &self,
        chain: &str,
        address: &str,
        coin_id: &str,
        market: Option<&Market>,
        scope: CoinScope,
    ) -> Option<(TokenBalance, Option<String>)> {
        let symbol = market
            .and_then(Market::upper_symbol)
            .unwrap_or_else(|| coin_id.to_uppercase());
        let name = market
            .and_then(|m| m.name.clone())
            .unwrap_or_else(|| coin_id.to_string());
        let logo = market.and_then(|m| m.image.clone());
        let price_change_24h = market.and_then(|m| m.price_change_percentage_24h);

        let Some(found) = self.coingecko.find_contract(coin_id).await else {
            if scope == CoinScope::MatchingChain {
                return None;
            }
            return Some((
                TokenBalance {
                    coin_id: Some(coin_id.to_string()),
                    symbol,
                    name,
                    contract: None,
                    platform: None,
                    chain: None,
                    balance: 0.0,
                    usd_price: market.map(Market::price_or_zero),
                    price_change_24h,
                    usd_value: 0.0,
                    logo,
                },
                None,
            ));
        };

        let token_chain = chain_for_platform(&found.platform);
        if scope == CoinScope::MatchingChain && token_chain != Some(chain) {
            return None;
        }

        let (balance, error) = match token_chain {
            Some(token_chain) if is_evm_chain(token_chain) => {
                match self.registry.rpc_url(token_chain).await {
                    Some(url) => settle_balance(
                        self.evm.erc20_balance(&url, &found.contract, address).await,
                        coin_id,
                    ),
                    None => (0.0, None),
                }
            }
            _ => (0.0, None),
        };
        let error = error.map(|err| format!("token_error:{coin_id}: {err}"));

        let usd_price = market.map_or(0.0, Market::price_or_zero);
        Some((
            TokenBalance {
                coin_id: Some(coin_id.to_string()),
                symbol,
                name,
                contract: Some(found.contract),
                platform: Some(found.platform),
                chain: token_chain.map(ToOwned::to_owned),
                balance,
                usd_price: Some(usd_price),
                price_change_24h,
                usd_value: balance * usd_price,
                logo,
            },
            error,
        ))
    }

    /// Entry for an explicitly requested contract plus an optional error message.
    /// `None` when it has no contract. An unreadable balance counts as zero and
    /// the entry is still priced.
    async fn token_entry(
        &self,
        chain: &str,
        address: &str,
        token: &TokenSpec,
    ) -> Option<(TokenBalance, Option<String>)> {
        let contract = token
            .contract
            .as_deref()
            .map(str::trim)
            .filter(|contract| !contract.is_empty())?;
        let token_chain = token_chain(token).unwrap_or_else(|| chain.to_string());

        let balance = match self.registry.rpc_url(&token_chain).await {
            Some(_) if !is_evm_chain(&token_chain) => Ok(0.0),
            Some(url) => self.evm.erc20_balance(&url, contract, address).await,
            None => Err(ApiError::UnknownChain(token_chain.clone())),
        };
        let (balance, error) = settle_balance(balance, contract);
        let error = error.map(|err| format!("token_error:{err}"));

        let platform = platform_for_chain(&token_chain);
        let info = match platform {
            Some(platform) => self.coingecko.token_by_contract(platform, contract).await,
            None => None,
        };

        let usd_price = info
            .as_ref()
            .and_then(|info| info.usd_price())
            .filter(|price| *price != 0.0);
        let symbol = info
            .as_ref()
            .and_then(|info| info.symbol.clone())
            .filter(|symbol| !symbol.is_empty())
            .or_else(|| token.symbol.clone().filter(|symbol| !symbol.is_empty()))
            .map(|symbol| symbol.to_uppercase())
            .unwrap_or_else(|| contract.chars().take(6).collect());
        let name = info
            .as_ref()
            .and_then(|info| info.name.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| token.name.clone().filter(|name| !name.is_empty()))
            .unwrap_or_else(|| contract.to_string());

        let entry = TokenBalance {
            coin_id: None,
            symbol,
            name,
            contract: Some(contract.to_string()),
            platform: platform.map(ToOwned::to_owned),
            chain: Some(token_chain),
            balance,
            usd_price,
            price_change_24h: info.as_ref().and_then(|info| info.price_change_24h()),
            usd_value: balance * usd_price.unwrap_or(0.0),
            logo: info.as_ref().and_then(|info| info.logo()),
        };
        Some((entry, error))
    }
}

/// Zero for an unreadable balance, with the failure message unless the
/// address belongs to another chain family
fn settle_balance(balance: Result<f64>, label: &str) -> (f64, Option<String>) {
    match balance {
        Ok(balance) => (balance, None),
        Err(ApiError::InvalidInput(err)) => {
            debug!("Skipping {} balance: {}", label, err);
            (0.0, None)
        }
        Err(err) => {
            warn!("Balance read failed for {}: {}", label, err);
            (0.0, Some(err.to_string()))
        }
    }
}

/// Normalized chain key of a token spec, if it names one
fn token_chain(token: &TokenSpec) -> Option<String> {
    token
        .chain
        .as_deref()
        .map(|chain| chain.trim().to_lowercase())
        .filter(|chain| !chain.is_empty())
}
