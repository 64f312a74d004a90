//! Ethereum mainnet oracle tables.

use super::{
    default_oracle_order, BlockRange, ChainConfig, OracleContract, OracleOverride, ETH_SENTINEL,
};
use crate::chain::Address;
use crate::price::{OracleOrder, OracleType, DEFAULT_USDC_DECIMALS};
use ethabi::ethereum_types::H160;
use hex_literal::hex;
use std::collections::HashSet;

pub const WETH: Address = H160(hex!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"));
pub const USDC: Address = H160(hex!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"));

const YEARN_LENS: OracleContract =
    OracleContract::new(H160(hex!("83d95e0d5f402511db06817aff3f9ea88224b030")), 12242339);
const CHAINLINK_FEED_REGISTRY: OracleContract =
    OracleContract::new(H160(hex!("47fb2585d2c56fe188d0e6ec628a38b74fceeedf")), 12864088);
const SUSHI_CALCULATIONS: OracleContract =
    OracleContract::new(H160(hex!("8263e161a855b644f582d9c164c66aabee53f927")), 12692284);
const CURVE_CALCULATIONS: OracleContract =
    OracleContract::new(H160(hex!("25bf7b72815476dd515044f9650bf79bad0df655")), 12370088);

const CURVE_REGISTRIES: [OracleContract; 4] = [
    OracleContract::new(H160(hex!("7d86446ddb609ed0f5f8684acf30380a356b2b4c")), 11154794),
    OracleContract::new(H160(hex!("90e00ace148ca3b23ac1bc8c240c2a7dd9c2d7f5")), 12195750),
    OracleContract::new(H160(hex!("8f942c20d02befc377d41445793068908e2250d0")), 13986752),
    OracleContract::new(H160(hex!("f98b45fa17de75fb1ad0e7afd971b0ca00e379fc")), 15732062),
];

const UNISWAP_FORKS: [OracleContract; 2] = [
    // SushiSwap
    OracleContract::new(H160(hex!("d9e1ce17f2641f24ae83637ab66a2cca9c378b9f")), 10794261),
    // Uniswap V2
    OracleContract::new(H160(hex!("7a250d5630b4cf539739df2c5dacb4c659f2488d")), 10207858),
];

const YEARN_LENS_BLACKLIST: [[u8; 20]; 4] = [
    hex!("5f98805a4e8be255a32880fdec7f6728c6568ba0"), // LUSD
    hex!("8daebade922df735c38c80c7ebd708af50815faa"), // tBTC
    hex!("0316eb71485b0ab14103307bf65a021042c6d380"), // HBTC
    hex!("ca3d75ac011bf5ad07a98d02f18225f9bd9a6bdf"), // crvTriCrypto
];

const CURVE_CALCULATIONS_BLACKLIST: [[u8; 20]; 2] = [
    hex!("ca3d75ac011bf5ad07a98d02f18225f9bd9a6bdf"), // crvTriCrypto
    hex!("c4ad29ba4b3c580e6d59105fff484999997675ff"), // crv3Crypto
];

const HARDCODED_STABLES: [[u8; 20]; 30] = [
    hex!("d632f22692fac7611d2aa1c0d552930d43caed3b"),
    hex!("99d8a9c45b2eca8864373a26d1459e3dff1e17f3"),
    hex!("5a6a4d54456819380173272a5e8e9b9904bdf41b"),
    hex!("bc6da0fe9ad5f3b0d58160288917aa56653660e9"),
    hex!("43b4fdfd4ff969587185cdb6f0bd875c5fc83f8c"),
    hex!("57ab1ec28d129707052df4df418d58a2d46d5f51"),
    hex!("c25a3a3b969415c80451098fa907ec722572917f"),
    hex!("0000000000085d4780b73119b644ae5ecd22b376"),
    hex!("ecd5e75afb02efa118af914515d6521aabd189f1"),
    hex!("fd2a8fa60abd58efe3eee34dd494cd491dc14900"),
    hex!("8ee017541375f6bcd802ba119bddc94dad6911a1"),
    hex!("5b3b5df2bf2b6543f78e053bd91c4bdd820929f1"),
    hex!("04b727c7e246ca70d496ecf52e6b6280f3c8077d"),
    hex!("3175df0976dfa876431c2e9ee6bc45b65d3473cc"),
    hex!("bcb91e689114b9cc865ad7871845c95241df4105"),
    hex!("26ea744e5b887e5205727f55dfbe8685e3b21951"),
    hex!("c2cb1040220768554cf699b0d863a3cd4324ce32"),
    hex!("04bc0ab673d88ae9dbc9da2380cb6b79c4bca9ae"),
    hex!("e6354ed5bc4b393a5aad09f21c46e101e692d447"),
    hex!("3b3ac5386837dc563660fb6a0937dfaa5924333b"),
    hex!("c2f5fea5197a3d92736500fd7733fcc7a3bbdf3f"),
    hex!("0c10bf8fcb7bf5412187a595ab97a3609160b5c6"),
    hex!("028171bca77440897b824ca71d1c56cac55b68a3"),
    hex!("3ed3b47dd13ec9a98b44e6204a523e766b225811"),
    hex!("bcca60bb61934080951369a648fb03df4f96263c"),
    hex!("6c5024cd4f8a59110119c56f8933403a539555eb"),
    hex!("d71ecff9342a5ced620049e616c5035f1db98620"),
    hex!("fc2838a17d8e8b1d5456e0a351b0708a09211147"),
    hex!("5ca135cb8527d76e932f34b5145575f9d8cbe08e"),
    hex!("f939e0a03fb07f59a73314e73794be0e57ac1b4e"),
];

/// Tokens never priced: rebasing or illiquid tokens with misleading quotes.
const IGNORE_LIST: [[u8; 20]; 29] = [
    hex!("ea6b6a4b813d1436a75883fcc789121e4b3f0465"),
    hex!("761d38e5ddf6ccf6cf7c55759d5210750b5d60f3"),
    hex!("fad45e47083e4607302aa43c65fb3106f1cd7607"),
    hex!("9d3ee6b64e69ebe12a4bf0b01d031cb80f556ee4"),
    hex!("922ac473a3cc241fd3a0049ed14536452d58d73c"),
    hex!("cae72a7a0fd9046cf6b165ca54c9e3a3872109e0"),
    hex!("9695e0114e12c0d3a3636fab5a18e6b737529023"),
    hex!("cc4ae94372da236e9b113132e0c46c68704246b9"),
    hex!("676cdc3312d0350749bed17cd3eb3b90e5917f42"),
    hex!("591975253e25101f6e6f0383e13e82b7601d8c59"),
    hex!("7b6bbbeac6a7f5681ec8e250b9aeb45a42bdc2cf"),
    hex!("e17093967e43d37ad615a64cb86ae11826d6e58b"),
    hex!("a6f7645ed967faf708a614a2fca8d4790138586f"),
    hex!("2baac9330cf9ac479d819195794d79ad0c7616e3"),
    hex!("38b0e3a59183814957d83df2a97492aed1f003e2"),
    hex!("0ff80a1708191c0da8aa600fa487f7ac81d7818c"),
    hex!("2596825a84888e8f24b747df29e11b5dd03c81d7"),
    hex!("9559aaa82d9649c7a7b220e7c461d2e74c9a3593"),
    hex!("c5a1973e1f736e2ad991573f3649f4f4a44c3028"),
    hex!("cdb9d30a3ba48cdfcb0ecbe19317e6cf783672f1"),
    hex!("d9016a907dc0ecfa3ca425ab20b6b785b42f2373"),
    hex!("03042482d64577a7bdb282260e2ea4c8a89c064b"),
    hex!("bca3c97837a39099ec3082df97e28ce91be14472"),
    hex!("9783b81438c24848f85848f8df31845097341771"),
    hex!("4e08f03079c5cd3083ea331ec61bcc87538b7665"),
    hex!("09617f6fd6cf8a71278ec86e23bbab29c04353a7"),
    hex!("fd957f21bd95e723645c07c48a2d8acb8ffb3794"),
    hex!("5aa7c403c7de4b3bb0cc07079a03e389671a4771"),
    hex!("31903e333809897ee57af57567f4377a1a78756c"),
];

const SPELL: [u8; 20] = hex!("090185f2135308bad17527004364ebcc2d37e5f6");
const STETH: [u8; 20] = hex!("ae7ab96520de3a18e5e111b5eaab095312d7fe84");
const BAXA: [u8; 20] = hex!("91b08f4a7c1251dfccf5440f8894f8daa10c8de5");

/// Curve factory pool LP tokens, priced from their pools first.
const CURVE_FACTORY_POOLS: [[u8; 20]; 15] = [
    hex!("ed4064f376cb8d68f770fb1ff088a3d0f3ff5c4d"),
    hex!("f985005a3793dba4cce241b3c19ddcd3fe069ff4"),
    hex!("971add32ea87f10bd192671630be3be8a11b8623"),
    hex!("137469b55d1f15651ba46a89d0588e97dd0b6562"),
    hex!("4647b6d835f3b393c7a955df51eefcf0db961606"),
    hex!("6359b6d3e327c497453d4376561ee276c6933323"),
    hex!("2889302a794da87fbf1d6db415c1492194663d13"),
    hex!("7f86bf177dd4f3494b841a37e810a34dd56c829b"),
    hex!("f5f5b97624542d72a9e06f04804bf81baa15e2b4"),
    hex!("4ebdf703948ddcea3b11f675b4d1fba9d2414a14"),
    hex!("f3a43307dcafa93275993862aae628fcb50dc768"),
    hex!("b79565c01b7ae53618d9b847b9443aaf4f9011e7"),
    hex!("4704ab1fb693ce163f7c9d3a31b3ff4eaf797714"),
    hex!("390f3595bca2df7d23783dfd126427cceb997bf4"),
    hex!("4dece678ceceb27446b35c672dc7d61f30bad69e"),
];

const PREFER_UNISWAP: [[u8; 20]; 4] = [
    hex!("dbdb4d16eda451d0503b854cf79d55697f90c8df"), // ALCX
    hex!("62b9c7356a2dc64a1969e19c23e4f579f9810aa7"), // cvxCRV
    hex!("1ceb5cb57c4d4e2b2433641b95dd330a33185a44"), // KP3R
    hex!("73968b9a57c6e53d41345fd57a6e6ae27d6cdb2f"), // SDT
];

fn set(raw: &[[u8; 20]]) -> HashSet<Address> {
    raw.iter().copied().map(H160).collect()
}

fn rule(
    label: &str,
    tokens: &[[u8; 20]],
    blocks: Option<BlockRange>,
    order: [OracleType; 6],
) -> OracleOverride {
    OracleOverride {
        label: label.to_string(),
        tokens: set(tokens),
        blocks,
        order: OracleOrder::first_success(order.to_vec()),
    }
}

fn overrides() -> Vec<OracleOverride> {
    use OracleType::*;
    let chainlink_first = [
        ChainlinkFeed,
        CurveCalculations,
        SushiCalculations,
        CurveRouter,
        UniswapForksRouter,
        YearnLensOracle,
    ];
    vec![
        rule("spell", &[SPELL], None, chainlink_first),
        rule(
            "steth",
            &[STETH],
            Some(BlockRange {
                start: 14019700,
                end: 14941265,
            }),
            chainlink_first,
        ),
        rule(
            "baxa",
            &[BAXA],
            None,
            [
                UniswapForksRouter,
                YearnLensOracle,
                ChainlinkFeed,
                CurveCalculations,
                CurveRouter,
                SushiCalculations,
            ],
        ),
        rule(
            "curve_factory_pools",
            &CURVE_FACTORY_POOLS,
            None,
            [
                CurveRouter,
                UniswapForksRouter,
                ChainlinkFeed,
                CurveCalculations,
                SushiCalculations,
                YearnLensOracle,
            ],
        ),
        rule(
            "prefer_uniswap",
            &PREFER_UNISWAP,
            None,
            [
                UniswapForksRouter,
                CurveCalculations,
                ChainlinkFeed,
                SushiCalculations,
                CurveRouter,
                YearnLensOracle,
            ],
        ),
    ]
}

pub fn config() -> ChainConfig {
    ChainConfig {
        network: super::MAINNET.to_string(),
        yearn_lens: Some(YEARN_LENS),
        chainlink: Some(CHAINLINK_FEED_REGISTRY),
        aave_oracle: None,
        curve_calculations: Some(CURVE_CALCULATIONS),
        sushi_calculations: Some(SUSHI_CALCULATIONS),
        curve_registries: CURVE_REGISTRIES.to_vec(),
        uniswap_forks: UNISWAP_FORKS.to_vec(),
        yearn_lens_blacklist: set(&YEARN_LENS_BLACKLIST),
        aave_oracle_blacklist: HashSet::new(),
        curve_calculations_blacklist: set(&CURVE_CALCULATIONS_BLACKLIST),
        sushi_calculations_blacklist: HashSet::new(),
        hardcoded_stables: set(&HARDCODED_STABLES),
        ignore_list: set(&IGNORE_LIST),
        eth_address: ETH_SENTINEL,
        weth_address: WETH,
        usdc_address: USDC,
        usdc_decimals: DEFAULT_USDC_DECIMALS,
        default_order: default_oracle_order(),
        overrides: overrides(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_have_no_duplicates() {
        let c = config();
        assert_eq!(c.hardcoded_stables.len(), HARDCODED_STABLES.len());
        assert_eq!(c.ignore_list.len(), IGNORE_LIST.len());
        assert!(c.hardcoded_stables.is_disjoint(&c.ignore_list));
    }

    #[test]
    fn steth_override_is_block_scoped() {
        let c = config();
        let steth = H160(STETH);
        assert_eq!(
            c.oracle_override(Some(&steth), Some(14019700))
                .map(|o| o.label.as_str()),
            Some("steth")
        );
        assert!(c.oracle_override(Some(&steth), Some(14941265)).is_none());
        assert!(c.oracle_override(Some(&steth), None).is_none());
        assert_eq!(c.effective_order(&steth, Some(14941265)), &c.default_order);
    }

    #[test]
    fn curve_pools_try_router_first() {
        let c = config();
        let lp = H160(CURVE_FACTORY_POOLS[0]);
        assert_eq!(c.effective_order(&lp, None).order[0], OracleType::CurveRouter);
    }
}
