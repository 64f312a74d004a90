//! Read-only contract calls: the single capability every oracle adapter depends on.

use num_bigint::BigInt;
use thiserror::Error;

pub use ethabi::Address;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("call reverted")]
    Reverted,
    #[error("decode {call}: {reason}")]
    Decode { call: &'static str, reason: String },
    #[error("encode {call}: {reason}")]
    Encode { call: &'static str, reason: String },
    #[error("transport: {0}")]
    Transport(String),
    #[error("unexpected return type for {0}")]
    UnexpectedValue(&'static str),
}

/// One contract read. Each variant maps to exactly one ABI function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Call {
    /// ERC-20 `decimals()`.
    Decimals,
    /// Feed registry `latestRoundData(base, quote)`; yields the answer only.
    FeedLatestAnswer { base: Address, quote: Address },
    /// Feed registry `decimals(base, quote)`.
    FeedDecimals { base: Address, quote: Address },
    /// Lens oracle `getPriceUsdcRecommended(token)`.
    PriceUsdcRecommended { token: Address },
    /// Curve calculations `getCurvePriceUsdc(lp)`.
    CurvePriceUsdc { lp: Address },
    /// Sushi calculations `getPriceUsdc(token)`.
    PriceUsdc { token: Address },
    /// Lending oracle `getAssetPrice(asset)`.
    AssetPrice { asset: Address },
    /// Router `getAmountsOut(amountIn, path)`.
    AmountsOut { amount_in: BigInt, path: Vec<Address> },
    /// Curve registry `get_pool_from_lp_token(lp)`.
    PoolFromLpToken { lp: Address },
    /// Curve registry `get_virtual_price_from_lp_token(lp)`.
    VirtualPriceFromLpToken { lp: Address },
    /// Curve registry `get_underlying_coins(pool)`.
    UnderlyingCoins { pool: Address },
    /// Pair `factory()`; only Uniswap V2 style pairs answer.
    Factory,
    /// Pair `token0()`.
    Token0,
    /// Pair `token1()`.
    Token1,
    /// Pair `getReserves()`; yields `[reserve0, reserve1, timestamp]`.
    Reserves,
    /// ERC-20 `totalSupply()`.
    TotalSupply,
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Decimals => "decimals",
            Call::FeedLatestAnswer { .. } => "latestRoundData",
            Call::FeedDecimals { .. } => "decimals",
            Call::PriceUsdcRecommended { .. } => "getPriceUsdcRecommended",
            Call::CurvePriceUsdc { .. } => "getCurvePriceUsdc",
            Call::PriceUsdc { .. } => "getPriceUsdc",
            Call::AssetPrice { .. } => "getAssetPrice",
            Call::AmountsOut { .. } => "getAmountsOut",
            Call::PoolFromLpToken { .. } => "get_pool_from_lp_token",
            Call::VirtualPriceFromLpToken { .. } => "get_virtual_price_from_lp_token",
            Call::UnderlyingCoins { .. } => "get_underlying_coins",
            Call::Factory => "factory",
            Call::Token0 => "token0",
            Call::Token1 => "token1",
            Call::Reserves => "getReserves",
            Call::TotalSupply => "totalSupply",
        }
    }
}

/// Decoded return value of a [`Call`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallValue {
    Int(BigInt),
    Ints(Vec<BigInt>),
    Address(Address),
    Addresses(Vec<Address>),
}

impl CallValue {
    pub fn into_int(self) -> Result<BigInt, CallError> {
        match self {
            CallValue::Int(v) => Ok(v),
            _ => Err(CallError::UnexpectedValue("int")),
        }
    }

    pub fn into_ints(self) -> Result<Vec<BigInt>, CallError> {
        match self {
            CallValue::Ints(v) => Ok(v),
            _ => Err(CallError::UnexpectedValue("int[]")),
        }
    }

    pub fn into_address(self) -> Result<Address, CallError> {
        match self {
            CallValue::Address(v) => Ok(v),
            _ => Err(CallError::UnexpectedValue("address")),
        }
    }

    pub fn into_addresses(self) -> Result<Vec<Address>, CallError> {
        match self {
            CallValue::Addresses(v) => Ok(v),
            _ => Err(CallError::UnexpectedValue("address[]")),
        }
    }
}

/// Read access to chain state. `block: None` reads the latest state.
///
/// Implementations must be deterministic for a pinned block and must never
/// panic on a revert; every failure is an `Err`.
pub trait ContractReader {
    fn try_call(
        &self,
        contract: Address,
        call: &Call,
        block: Option<u64>,
    ) -> Result<CallValue, CallError>;
}

impl<R: ContractReader + ?Sized> ContractReader for &R {
    fn try_call(
        &self,
        contract: Address,
        call: &Call,
        block: Option<u64>,
    ) -> Result<CallValue, CallError> {
        (**self).try_call(contract, call, block)
    }
}

/// Reader that reverts every call. Backs the template configuration and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReader;

impl ContractReader for NullReader {
    fn try_call(&self, _: Address, _: &Call, _: Option<u64>) -> Result<CallValue, CallError> {
        Err(CallError::Reverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reader_always_reverts() {
        let r = NullReader;
        let err = r
            .try_call(Address::zero(), &Call::Decimals, Some(1))
            .unwrap_err();
        assert_eq!(err, CallError::Reverted);
    }

    #[test]
    fn value_accessors_reject_wrong_shape() {
        let v = CallValue::Address(Address::repeat_byte(1));
        assert!(v.clone().into_int().is_err());
        assert_eq!(v.into_address().unwrap(), Address::repeat_byte(1));
    }
}
