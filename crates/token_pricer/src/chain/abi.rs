//! ABI encoding of [`Call`]s and decoding of their return data.

use crate::chain::call::{Call, CallError, CallValue};
use ethabi::{ParamType, Token, Uint};
use num_bigint::{BigInt, Sign};

const CURVE_MAX_COINS: usize = 8;

fn input_types(call: &Call) -> Vec<ParamType> {
    match call {
        Call::Decimals
        | Call::Factory
        | Call::Token0
        | Call::Token1
        | Call::Reserves
        | Call::TotalSupply => vec![],
        Call::FeedLatestAnswer { .. } | Call::FeedDecimals { .. } => {
            vec![ParamType::Address, ParamType::Address]
        }
        Call::AmountsOut { .. } => vec![
            ParamType::Uint(256),
            ParamType::Array(Box::new(ParamType::Address)),
        ],
        Call::PriceUsdcRecommended { .. }
        | Call::CurvePriceUsdc { .. }
        | Call::PriceUsdc { .. }
        | Call::AssetPrice { .. }
        | Call::PoolFromLpToken { .. }
        | Call::VirtualPriceFromLpToken { .. }
        | Call::UnderlyingCoins { .. } => vec![ParamType::Address],
    }
}

fn output_types(call: &Call) -> Vec<ParamType> {
    match call {
        Call::Decimals | Call::FeedDecimals { .. } => vec![ParamType::Uint(8)],
        Call::FeedLatestAnswer { .. } => vec![
            ParamType::Uint(80),
            ParamType::Int(256),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Uint(80),
        ],
        Call::AmountsOut { .. } => vec![ParamType::Array(Box::new(ParamType::Uint(256)))],
        Call::PoolFromLpToken { .. } | Call::Factory | Call::Token0 | Call::Token1 => {
            vec![ParamType::Address]
        }
        Call::Reserves => vec![
            ParamType::Uint(112),
            ParamType::Uint(112),
            ParamType::Uint(32),
        ],
        Call::UnderlyingCoins { .. } => vec![ParamType::FixedArray(
            Box::new(ParamType::Address),
            CURVE_MAX_COINS,
        )],
        Call::PriceUsdcRecommended { .. }
        | Call::CurvePriceUsdc { .. }
        | Call::PriceUsdc { .. }
        | Call::AssetPrice { .. }
        | Call::VirtualPriceFromLpToken { .. }
        | Call::TotalSupply => vec![ParamType::Uint(256)],
    }
}

fn input_tokens(call: &Call) -> Result<Vec<Token>, CallError> {
    let tokens = match call {
        Call::Decimals
        | Call::Factory
        | Call::Token0
        | Call::Token1
        | Call::Reserves
        | Call::TotalSupply => vec![],
        Call::FeedLatestAnswer { base, quote } | Call::FeedDecimals { base, quote } => {
            vec![Token::Address(*base), Token::Address(*quote)]
        }
        Call::AmountsOut { amount_in, path } => vec![
            Token::Uint(bigint_to_uint(amount_in).ok_or_else(|| CallError::Encode {
                call: call.name(),
                reason: format!("amount {} does not fit uint256", amount_in),
            })?),
            Token::Array(path.iter().copied().map(Token::Address).collect()),
        ],
        Call::PriceUsdcRecommended { token } | Call::PriceUsdc { token } => {
            vec![Token::Address(*token)]
        }
        Call::CurvePriceUsdc { lp }
        | Call::PoolFromLpToken { lp }
        | Call::VirtualPriceFromLpToken { lp } => vec![Token::Address(*lp)],
        Call::AssetPrice { asset } => vec![Token::Address(*asset)],
        Call::UnderlyingCoins { pool } => vec![Token::Address(*pool)],
    };
    Ok(tokens)
}

/// Calldata for `call`: 4-byte selector followed by the encoded arguments.
pub fn encode_call(call: &Call) -> Result<Vec<u8>, CallError> {
    let selector = ethabi::short_signature(call.name(), &input_types(call));
    let mut data = selector.to_vec();
    data.extend(ethabi::encode(&input_tokens(call)?));
    Ok(data)
}

/// Decode return data of `call`. Empty data (a call to an address with no code) is an error.
pub fn decode_return(call: &Call, data: &[u8]) -> Result<CallValue, CallError> {
    let decode_err = |reason: String| CallError::Decode {
        call: call.name(),
        reason,
    };
    if data.is_empty() {
        return Err(decode_err("empty return data".to_string()));
    }
    let mut tokens =
        ethabi::decode(&output_types(call), data).map_err(|e| decode_err(e.to_string()))?;

    let value = match call {
        Call::FeedLatestAnswer { .. } => {
            if tokens.len() < 2 {
                return Err(decode_err("short round data".to_string()));
            }
            let answer = tokens
                .swap_remove(1)
                .into_int()
                .ok_or_else(|| decode_err("answer is not int".to_string()))?;
            CallValue::Int(int_to_bigint(answer))
        }
        Call::AmountsOut { .. } => {
            let items = first(tokens)
                .and_then(Token::into_array)
                .ok_or_else(|| decode_err("amounts is not an array".to_string()))?;
            let amounts = items
                .into_iter()
                .map(|t| t.into_uint().map(|u| uint_to_bigint(&u)))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| decode_err("amount is not uint".to_string()))?;
            CallValue::Ints(amounts)
        }
        Call::Reserves => CallValue::Ints(
            tokens
                .into_iter()
                .map(|t| t.into_uint().map(|u| uint_to_bigint(&u)))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| decode_err("reserve is not uint".to_string()))?,
        ),
        Call::PoolFromLpToken { .. } | Call::Factory | Call::Token0 | Call::Token1 => {
            CallValue::Address(
                first(tokens)
                    .and_then(Token::into_address)
                    .ok_or_else(|| decode_err("not an address".to_string()))?,
            )
        }
        Call::UnderlyingCoins { .. } => {
            let items = first(tokens)
                .and_then(Token::into_fixed_array)
                .ok_or_else(|| decode_err("coins is not a fixed array".to_string()))?;
            let coins = items
                .into_iter()
                .map(Token::into_address)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| decode_err("coin is not an address".to_string()))?;
            CallValue::Addresses(coins)
        }
        _ => CallValue::Int(uint_to_bigint(
            &first(tokens)
                .and_then(Token::into_uint)
                .ok_or_else(|| decode_err("not a uint".to_string()))?,
        )),
    };
    Ok(value)
}

fn first(tokens: Vec<Token>) -> Option<Token> {
    tokens.into_iter().next()
}

pub fn uint_to_bigint(value: &Uint) -> BigInt {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigInt::from_bytes_be(Sign::Plus, &buf)
}

/// Two's-complement int256 to a signed integer.
pub fn int_to_bigint(value: Uint) -> BigInt {
    if value.bit(255) {
        let magnitude = (!value).overflowing_add(Uint::one()).0;
        -uint_to_bigint(&magnitude)
    } else {
        uint_to_bigint(&value)
    }
}

pub fn bigint_to_uint(value: &BigInt) -> Option<Uint> {
    let (sign, bytes) = value.to_bytes_be();
    if sign == Sign::Minus || bytes.len() > 32 {
        return None;
    }
    Some(Uint::from_big_endian(&bytes))
}
