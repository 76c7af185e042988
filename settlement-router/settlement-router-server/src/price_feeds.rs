//! Oracle price feed selection and conversion
//!
//! Every feed quotes a currency against USD, so converting between two
//! non-USD currencies takes a pair of feeds pivoting through USD

use alloy::{providers::DynProvider, sol};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use settlement_router_api::{
    invoice::Invoice,
    payment::{PaymentType, PriceFeedDetails, APPROXIMATE_RATE_DECIMALS},
    token::{currency, TokenInfo},
};
use tracing::{info, instrument};

use crate::{
    chain::{ChainInfo, RouterVersion},
    error::SettlementError,
    fixed_point::{pow10, scale_minor_units},
    payload::abi::{IYodlRouterV1, IYodlRouterV2},
};

sol! {
    #[sol(rpc)]
    interface AggregatorV3Interface {
        function decimals() external view returns (uint8);
        function latestRoundData()
            external
            view
            returns (
                uint80 roundId,
                int256 answer,
                uint256 startedAt,
                uint256 updatedAt,
                uint80 answeredInRound
            );
    }
}

// ----------------
// | Feed Reading |
// ----------------

/// Reads oracle prices and the router's feed-based conversion
#[async_trait]
pub trait PriceFeedReader: Send + Sync {
    /// The latest answer of a feed and its decimals
    async fn latest_rate(&self, feed: Address) -> Result<(U256, u8), SettlementError>;

    /// Convert `amount` through a feed pair using the router's own
    /// conversion
    async fn exchange_rate(
        &self,
        router: Address,
        version: RouterVersion,
        feeds: [Address; 2],
        amount: U256,
    ) -> Result<U256, SettlementError>;
}

/// A feed reader backed by an RPC provider
#[derive(Clone)]
pub struct OnChainPriceFeedReader {
    /// The RPC provider
    provider: DynProvider,
}

impl OnChainPriceFeedReader {
    /// Create a new reader
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl PriceFeedReader for OnChainPriceFeedReader {
    async fn latest_rate(&self, feed: Address) -> Result<(U256, u8), SettlementError> {
        let aggregator = AggregatorV3Interface::new(feed, self.provider.clone());
        let round = aggregator.latestRoundData().call().await.map_err(|e| {
            SettlementError::onchain(format!("Failed to fetch latestRoundData from feed. {e}"))
        })?;
        let decimals = aggregator.decimals().call().await.map_err(|e| {
            SettlementError::onchain(format!(
                "Failed to fetch exchange rate decimals from feed. {e}"
            ))
        })?;

        if round.answer.is_negative() {
            return Err(SettlementError::onchain(format!("negative answer from feed {feed:#x}")));
        }
        Ok((round.answer.into_raw(), decimals))
    }

    async fn exchange_rate(
        &self,
        router: Address,
        version: RouterVersion,
        feeds: [Address; 2],
        amount: U256,
    ) -> Result<U256, SettlementError> {
        let converted = match version {
            RouterVersion::V1 => {
                // The legacy router takes a single-feed dynamic array
                let contract = IYodlRouterV1::new(router, self.provider.clone());
                contract.exchangeRate(vec![feeds[0]], amount).call().await.map(|r| r.converted)
            },
            RouterVersion::V2 => {
                let contract = IYodlRouterV2::new(router, self.provider.clone());
                contract.exchangeRate(feeds, amount).call().await.map(|r| r.converted)
            },
        }
        .map_err(SettlementError::onchain)?;

        Ok(converted)
    }
}

// ------------------
// | Feed Selection |
// ------------------

/// Select the feeds converting between the invoice currency and a token
///
/// Direct payments convert the invoice currency into the token paid; swaps
/// convert the swap's output token into the invoice currency. An empty
/// result means no conversion applies
pub fn get_price_feeds(
    chain: &ChainInfo,
    invoice_currency: &str,
    token: &TokenInfo,
    payment_type: PaymentType,
) -> Result<Vec<Address>, SettlementError> {
    let token_currency = match token.currency.as_deref() {
        Some(ccy) if ccy != invoice_currency => ccy,
        _ => return Ok(vec![]),
    };

    if chain.price_feeds.is_empty() {
        return Err(SettlementError::validation(format!(
            "Chain {} does not have any price feeds.",
            chain.chain_id
        )));
    }

    let feed = |ccy: &str| chain.price_feeds.get(ccy).copied();
    let direct = payment_type == PaymentType::Direct;
    let only_if = |cond: bool, addr: Address| if cond { addr } else { Address::ZERO };

    if invoice_currency == currency::USD {
        let token_feed = feed(token_currency).ok_or_else(|| {
            SettlementError::validation(format!("Price feed for {token_currency} not present."))
        })?;
        return Ok(vec![only_if(!direct, token_feed), only_if(direct, token_feed)]);
    }

    if token_currency == currency::USD {
        let invoice_feed = feed(invoice_currency).ok_or_else(|| {
            SettlementError::validation(format!("Price feed for {invoice_currency} not present."))
        })?;
        return Ok(vec![only_if(direct, invoice_feed), only_if(!direct, invoice_feed)]);
    }

    // Pivot through USD
    let (Some(token_feed), Some(invoice_feed)) = (feed(token_currency), feed(invoice_currency))
    else {
        return Err(SettlementError::validation(format!(
            "Price feeds not present for {token_currency} and {invoice_currency}."
        )));
    };

    Ok(match payment_type {
        PaymentType::Direct => vec![invoice_feed, token_feed],
        PaymentType::Swap => vec![token_feed, invoice_feed],
    })
}

/// Build the oracle conversion attached to a payment in `token`
///
/// For a direct payment `token` is the token paid; for a swap it is the
/// swap's output token. Swap feeds are reversed for the conversion call,
/// since the output amount is worked backwards from the invoice currency
#[instrument(skip_all, fields(currency = %invoice.currency, token = %token.symbol))]
pub async fn resolve_price_feed_details(
    reader: &dyn PriceFeedReader,
    chain: &ChainInfo,
    router_version: RouterVersion,
    invoice: &Invoice,
    token: &TokenInfo,
    payment_type: PaymentType,
) -> Result<PriceFeedDetails, SettlementError> {
    // Native-denominated direct payments are priced at native precision
    let native_invoice =
        payment_type == PaymentType::Direct && invoice.currency == chain.native_currency.symbol;
    let decimals = if native_invoice { chain.native_currency.decimals } else { token.decimals };
    let amount = scale_minor_units(invoice.amount_in_minor, decimals);

    let feed_addresses = get_price_feeds(chain, &invoice.currency, token, payment_type)?;
    if feed_addresses.is_empty() {
        return Ok(PriceFeedDetails {
            feed_addresses: vec![Address::ZERO, Address::ZERO],
            approximate_rate: pow10(APPROXIMATE_RATE_DECIMALS),
            converted_amount: amount,
            decimals,
        });
    }

    if amount.is_zero() {
        return Err(SettlementError::validation("Invoice amount must be positive."));
    }
    if router_version == RouterVersion::V1 && feed_addresses.get(1).is_some_and(|f| !f.is_zero())
    {
        return Err(SettlementError::validation(
            "Router V0.1 does not support inverse or multiple price feeds.",
        ));
    }

    let router = chain.router_address(router_version).ok_or_else(|| {
        SettlementError::config("Could not fetch YODL router address for the given chain.")
    })?;

    let mut call_feeds = [Address::ZERO; 2];
    for (slot, feed) in call_feeds.iter_mut().zip(feed_addresses.iter()) {
        *slot = *feed;
    }
    if payment_type == PaymentType::Swap {
        call_feeds.reverse();
    }

    let converted = reader.exchange_rate(router, router_version, call_feeds, amount).await?;
    let approximate_rate = converted * pow10(APPROXIMATE_RATE_DECIMALS) / amount;
    info!("converted {amount} {} to {converted} at rate {approximate_rate}", invoice.currency);

    Ok(PriceFeedDetails { feed_addresses, approximate_rate, converted_amount: converted, decimals })
}
