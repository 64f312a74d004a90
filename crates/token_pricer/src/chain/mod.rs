//! Contract-call boundary: call model, ABI codec, JSON-RPC reader and response cache.

pub mod abi;
mod cache;
pub mod call;
mod normalize;
mod rpc;

pub use cache::{CacheError, CallCache};
pub use call::{Address, Call, CallError, CallValue, ContractReader, NullReader};
pub use normalize::{block_tag, format_address, parse_address, parse_block, NormalizeError};
pub use rpc::{RpcConfig, RpcError, RpcReader};

pub(crate) use cache::open_db;
