pub mod bridge;
pub mod swap;
pub mod transfer;

mod routing;

pub use bridge::{BridgeAction, BridgeOptions, BridgeParams, BridgeTokens};
pub use swap::{SwapAction, SwapOptions, SwapParams, SwapTokens};
pub use transfer::{TransferAction, TransferOptions, TransferParams, TransferTokens};

use alloy::primitives::utils::parse_units;
use alloy::primitives::{Address, B256, U256};

use crate::error::{Error, Result};
use crate::registry::ChainMetadata;
use crate::route::is_native_token;
use crate::types::TxStatus;
use crate::wallet::WalletProvider;

/// Receipt-based status of `hash` on `chain`; no receipt yet means pending.
pub async fn transaction_status(wallet: &WalletProvider, hash: B256, chain: &str) -> Result<TxStatus> {
    let client = wallet.public_client(chain)?;
    let receipt = client.get_receipt_status(hash).await?;
    Ok(TxStatus::from_receipt(receipt))
}

/// Amount option given either as a string or a JSON number.
pub(crate) fn amount_option(value: Option<&serde_json::Value>) -> Result<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Ok(match n.as_f64() {
            // f64 Display never uses exponent notation
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        }),
        _ => Err(Error::InvalidParams("amount is required".into())),
    }
}

pub(crate) fn address_option(name: &str, value: Option<&str>) -> Result<Option<Address>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e| Error::InvalidParams(format!("invalid {name} {v:?}: {e}")))
        })
        .transpose()
}

/// Converts a human decimal amount into the token's smallest unit.
pub(crate) fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.starts_with('-') {
        return Err(Error::InvalidParams(format!(
            "amount must not be negative: {amount}"
        )));
    }
    let parsed = parse_units(amount, decimals)
        .map_err(|e| Error::InvalidParams(format!("invalid amount {amount:?}: {e}")))?;
    Ok(parsed.get_absolute())
}

pub(crate) async fn token_decimals(
    wallet: &WalletProvider,
    chain: &ChainMetadata,
    token: Address,
) -> Result<u8> {
    if is_native_token(&token) {
        return Ok(chain.native_currency.decimals);
    }
    if let Some(known) = chain.token(&token) {
        return Ok(known.decimals);
    }
    wallet.public_client(&chain.id)?.get_token_decimals(token).await
}
