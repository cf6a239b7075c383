use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A transaction accepted by the network on behalf of the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// Balance and valuation of one token held by the wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub symbol: String,
    pub decimals: u8,
    pub address: Address,
    pub name: String,
    /// USD price as reported by the price source, `"0"` when unavailable.
    pub price: String,
    pub balance: U256,
    pub value_usd: f64,
}

impl TokenBalance {
    pub fn formatted_balance(&self) -> String {
        format_amount(self.balance, self.decimals)
    }
}

/// Non-zero token balances of the wallet on one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub chain: String,
    pub address: Address,
    #[serde(rename = "totalValueUSD")]
    pub total_value_usd: String,
    pub tokens: Vec<TokenBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletStatus {
    pub connected: bool,
    pub balance: String,
    pub address: Address,
    pub chain: String,
}

/// Confirmation state of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
    Pending,
}

impl TxStatus {
    pub fn from_receipt(status: Option<bool>) -> Self {
        match status {
            None => TxStatus::Pending,
            Some(true) => TxStatus::Success,
            Some(false) => TxStatus::Failed,
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
            TxStatus::Pending => "pending",
        };
        f.write_str(s)
    }
}

/// Outcome of a gas estimate. Hard failures are reported as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasEstimate {
    Estimated(u64),
    Unavailable { reason: String },
}

impl GasEstimate {
    pub fn gas(&self) -> Option<u64> {
        match self {
            GasEstimate::Estimated(gas) => Some(*gas),
            GasEstimate::Unavailable { .. } => None,
        }
    }
}

/// Format an integer amount with proper decimal places
pub fn format_amount(value: U256, decimals: u8) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let fractional = value % divisor;

    if fractional.is_zero() {
        format!("{}", whole)
    } else {
        let digits = fractional.to_string();
        let frac_str = format!("{}{}", "0".repeat(decimals as usize - digits.len()), digits);
        let trimmed = frac_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_amount(U256::from(2_000_000u64), 6), "2");
        assert_eq!(format_amount(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_amount(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_tx_status_from_receipt() {
        assert_eq!(TxStatus::from_receipt(None), TxStatus::Pending);
        assert_eq!(TxStatus::from_receipt(Some(true)), TxStatus::Success);
        assert_eq!(TxStatus::from_receipt(Some(false)), TxStatus::Failed);
        assert_eq!(TxStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn test_gas_estimate_is_not_zero_when_unknown() {
        let unknown = GasEstimate::Unavailable {
            reason: "no route".into(),
        };
        assert_eq!(unknown.gas(), None);
        assert_eq!(GasEstimate::Estimated(21_000).gas(), Some(21_000));
    }
}
