//! Midas product curator registry.
//!
//! The allocations API does not expose curators; this table is maintained by
//! hand against the Midas product pages. Symbol casing varies between API
//! responses, hence the near-duplicate keys.

const CURATOR_BY_ASSET: &[(&str, &str)] = &[
    ("mEDGE", "EdgeCapital"),
    ("mMEV", "MEVcapital"),
    ("mRe7Yield", "Re7Capital"),
    ("mRE7Yield", "Re7Capital"),
    ("mRe7YIELD", "Re7Capital"),
    ("mTBILL", "Superstate"),
    ("mBASIS", "EdgeCapital"),
    ("mRE7SOL", "Re7Capital"),
    ("mRe7SOL", "Re7Capital"),
    ("mF-ONE", "FasanaraCapital"),
    ("mHYPER", "Hyperithm"),
    ("mAPOLLO", "ApolloCrypto"),
    ("mFARM", "FarmCapital"),
    ("mevBTC", "MEVcapital"),
    ("mBTC", "LeadingPrimeBrokers"),
    ("msyrupUSDp", "EdgeCapital"),
    ("msyrupUSD", "M1Capital"),
    ("mXRP", "Hyperithm"),
    ("mRe7BTC", "Re7Capital"),
    ("mHyperETH", "Hyperithm"),
    ("mHyperBTC", "Hyperithm"),
];

pub fn curator_for_asset(asset: &str) -> Option<String> {
    CURATOR_BY_ASSET
        .iter()
        .find(|(symbol, _)| *symbol == asset)
        .map(|(_, curator)| (*curator).to_string())
}
