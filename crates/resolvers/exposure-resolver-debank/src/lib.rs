//! Shared Debank wallet position resolution.
//!
//! Several providers publish only the wallets their capital sits in; this
//! resolver expands such a wallet into graph contributions by walking
//! Debank's portfolio views (protocol positions, app-chain positions, plain
//! token balances). It is shared across adapters so the same wallet shape
//! always produces the same canonical nodes.

mod fetcher;
mod resolver;
mod types;

pub use fetcher::DebankClient;
pub use resolver::{
    app_item_id, process_app_items, process_protocol_items, process_token_balances,
    resolve_wallet, resolve_wallet_portfolio, token_usd_value,
};
pub use types::{
    AppProtocolItem, BundleWallet, ComplexProtocolItem, PortfolioBase, PortfolioDetail,
    PortfolioItem, PortfolioPool, PortfolioStats, TokenObject,
};
