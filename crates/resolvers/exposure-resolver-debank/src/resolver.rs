//! Turns Debank portfolio payloads into graph contributions.
//!
//! All processing is pure; the `resolve_*` wrappers pair one fetch with its
//! processing step so adapters can join exactly the categories they need.

use exposure_common::num::round_to_two_decimals;
use exposure_core::eligibility::is_allocation_usd_eligible;
use exposure_core::ident::{canonicalize_chain, canonicalize_protocol, composite_id, slugify};
use exposure_core::{Edge, GraphResult, LendingPosition, Node, NodeDetails};
use futures::try_join;

use crate::fetcher::DebankClient;
use crate::types::{AppProtocolItem, ComplexProtocolItem, PortfolioItem, TokenObject};

/// Composite id for app-chain items, which carry no pool object:
/// `<protocol>:<description>:<resource>[:<resource2>]`.
pub fn app_item_id(
    protocol: &str,
    description: &str,
    resource: &str,
    secondary: Option<&str>,
) -> String {
    let mut id = format!(
        "{}:{}:{}",
        canonicalize_protocol(protocol),
        slugify(description),
        slugify(resource)
    );

    if let Some(secondary) = secondary {
        let segment = slugify(secondary);
        if !segment.is_empty() {
            id.push(':');
            id.push_str(&segment);
        }
    }

    id
}

/// USD value of one token balance.
pub fn token_usd_value(token: &TokenObject) -> f64 {
    round_to_two_decimals(token.amount.unwrap_or(0.0) * token.price)
}

fn process_common_item(item: &PortfolioItem, root_id: &str, details: NodeDetails) -> GraphResult {
    let mut result = GraphResult::default();

    let allocation_usd = item.stats.net_usd_value;
    if !is_allocation_usd_eligible(allocation_usd) {
        return result;
    }

    let Some(pool) = &item.pool else {
        return result;
    };

    let node_id = composite_id(&pool.chain, &pool.project_id, &pool.id, &[]);
    let description = item.detail.description.clone().unwrap_or_default();
    let name = if description.is_empty() {
        item.detail
            .supply_token_list
            .first()
            .and_then(|token| token.name.clone())
            .unwrap_or_default()
    } else {
        description
    };

    result.nodes.push(Node {
        chain: Some(canonicalize_chain(&pool.chain)),
        protocol: Some(canonicalize_protocol(&pool.project_id)),
        details: Some(details),
        ..Node::new(node_id.clone(), name)
    });
    result.edges.push(Edge {
        from: root_id.to_string(),
        to: node_id,
        allocation_usd,
        lending_position: None,
    });

    result
}

fn process_liquidity_pool_item(item: &PortfolioItem, root_id: &str) -> GraphResult {
    let mut result = GraphResult::default();

    let Some(pool) = &item.pool else {
        return result;
    };

    let allocation_usd = item.stats.net_usd_value;
    if !is_allocation_usd_eligible(allocation_usd) {
        return result;
    }

    let token_name = |index: usize| -> String {
        item.detail
            .supply_token_list
            .get(index)
            .and_then(|token| token.name.clone())
            .unwrap_or_default()
    };
    let name0 = token_name(0);
    let name1 = token_name(1);
    let pool_name = if !name0.is_empty() && !name1.is_empty() {
        format!("{name0}/{name1}")
    } else {
        name0
    };

    let node_id = composite_id(&pool.chain, &pool.project_id, &pool.id, &[]);

    result.nodes.push(Node {
        chain: Some(canonicalize_chain(&pool.chain)),
        protocol: Some(canonicalize_protocol(&pool.project_id)),
        details: Some(NodeDetails::LiquidityPool),
        ..Node::new(node_id.clone(), pool_name)
    });
    result.edges.push(Edge {
        from: root_id.to_string(),
        to: node_id,
        allocation_usd,
        lending_position: None,
    });

    result
}

fn process_lending_item(item: &PortfolioItem, root_id: &str, wallet: &str) -> GraphResult {
    let mut result = GraphResult::default();

    let Some(pool) = &item.pool else {
        return result;
    };

    let allocation_usd = item.stats.net_usd_value;
    if !is_allocation_usd_eligible(allocation_usd) {
        return result;
    }

    let chain_slug = canonicalize_chain(&pool.chain);
    let position_id = composite_id(
        &pool.chain,
        &pool.project_id,
        wallet,
        &[item.position_index.as_deref().unwrap_or("")],
    );

    result.nodes.push(Node {
        chain: Some(chain_slug.clone()),
        protocol: Some(canonicalize_protocol(&pool.project_id)),
        details: Some(NodeDetails::Lending {
            collateral_usd: item.stats.asset_usd_value,
            debt_usd: item.stats.debt_usd_value,
            net_usd: item.stats.net_usd_value,
            health_rate: item.detail.health_rate.unwrap_or(0.0),
        }),
        ..Node::new(position_id.clone(), "LendingPosition")
    });
    result.edges.push(Edge {
        from: root_id.to_string(),
        to: position_id.clone(),
        allocation_usd,
        lending_position: None,
    });

    // Token nodes stay sparse placeholders: market detail is not knowable
    // from the wallet view and is filled in by whichever adapter describes
    // the token's own market.
    let mut push_token_leg = |token: &TokenObject, position: LendingPosition| {
        let token_id = composite_id(&pool.chain, &token.protocol_id, &token.id, &[]);
        result.nodes.push(Node {
            chain: Some(chain_slug.clone()),
            protocol: Some(canonicalize_protocol(&token.protocol_id)),
            ..Node::new(token_id.clone(), token.name.clone().unwrap_or_default())
        });
        result.edges.push(Edge {
            from: position_id.clone(),
            to: token_id,
            allocation_usd: token_usd_value(token),
            lending_position: Some(position),
        });
    };

    for token in &item.detail.supply_token_list {
        push_token_leg(token, LendingPosition::Collateral);
    }
    for token in &item.detail.borrow_token_list {
        push_token_leg(token, LendingPosition::Borrow);
    }

    result
}

fn process_app_common_item(
    item: &PortfolioItem,
    root_id: &str,
    details: NodeDetails,
) -> GraphResult {
    let mut result = GraphResult::default();

    // App-chain items have no pool object; anything that carries one came
    // from the protocol list and is handled there.
    if item.pool.is_some() {
        return result;
    }
    let Some(base) = &item.base else {
        return result;
    };

    let Some(token0) = item.detail.supply_token_list.first() else {
        return result;
    };
    let allocation_usd = item.stats.net_usd_value;
    if !is_allocation_usd_eligible(allocation_usd) {
        return result;
    }

    let description = item.detail.description.clone().unwrap_or_default();
    let node_id = app_item_id(&base.app_id, &description, &token0.id, None);
    let name = format!(
        "{description}:{}",
        token0.name.clone().unwrap_or_default()
    );

    result.nodes.push(Node {
        chain: Some(base.app_id.clone()),
        protocol: Some(base.app_id.clone()),
        details: Some(details),
        ..Node::new(node_id.clone(), name)
    });
    result.edges.push(Edge {
        from: root_id.to_string(),
        to: node_id,
        allocation_usd,
        lending_position: None,
    });

    result
}

fn process_perpetual_item(item: &PortfolioItem, root_id: &str) -> GraphResult {
    let mut result = GraphResult::default();

    let Some(base) = &item.base else {
        return result;
    };
    let (Some(position_token), Some(margin_token)) =
        (&item.detail.position_token, &item.detail.margin_token)
    else {
        return result;
    };
    let description = item.detail.description.clone().unwrap_or_default();
    if description.is_empty() {
        return result;
    }

    let allocation_usd = item.stats.net_usd_value;
    if !is_allocation_usd_eligible(allocation_usd) {
        return result;
    }

    let node_id = app_item_id(
        &base.app_id,
        &description,
        &position_token.id,
        Some(&margin_token.id),
    );
    let name = format!(
        "{}/{}",
        position_token.name.clone().unwrap_or_default(),
        margin_token.name.clone().unwrap_or_default()
    );

    result.nodes.push(Node {
        chain: Some(base.app_id.clone()),
        protocol: Some(base.app_id.clone()),
        details: Some(NodeDetails::Perpetuals),
        ..Node::new(node_id.clone(), name)
    });
    result.edges.push(Edge {
        from: root_id.to_string(),
        to: node_id,
        allocation_usd,
        lending_position: None,
    });

    result
}

/// Process one wallet's protocol positions into graph contributions.
pub fn process_protocol_items(
    protocols: &[ComplexProtocolItem],
    root_id: &str,
    wallet: &str,
) -> GraphResult {
    let mut result = GraphResult::default();

    for protocol in protocols {
        for item in &protocol.portfolio_item_list {
            match item.name.as_str() {
                "Yield" => result.merge(process_common_item(
                    item,
                    root_id,
                    NodeDetails::Yield { curator: None },
                )),
                "Deposit" => {
                    result.merge(process_common_item(item, root_id, NodeDetails::Deposit))
                }
                "Staked" => result.merge(process_common_item(item, root_id, NodeDetails::Staked)),
                "Lending" => result.merge(process_lending_item(item, root_id, wallet)),
                "Liquidity Pool" => result.merge(process_liquidity_pool_item(item, root_id)),
                _ => {}
            }
        }
    }

    result
}

/// Process one wallet's app-chain positions into graph contributions.
pub fn process_app_items(apps: &[AppProtocolItem], root_id: &str) -> GraphResult {
    let mut result = GraphResult::default();

    for app in apps {
        for item in &app.portfolio_item_list {
            match item.name.as_str() {
                "Deposit" => {
                    result.merge(process_app_common_item(item, root_id, NodeDetails::Deposit))
                }
                "Perpetuals" => result.merge(process_perpetual_item(item, root_id)),
                _ => {}
            }
        }
    }

    result
}

/// Process one wallet's plain token balances into graph contributions.
pub fn process_token_balances(tokens: &[TokenObject], root_id: &str) -> GraphResult {
    let mut result = GraphResult::default();

    for token in tokens {
        let Some(symbol) = token.symbol.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        if token.id.is_empty() {
            continue;
        }

        let allocation_usd = token_usd_value(token);
        if !is_allocation_usd_eligible(allocation_usd) {
            continue;
        }

        let token_id = composite_id(&token.chain, &token.protocol_id, &token.id, &[]);
        let name = token
            .name
            .clone()
            .unwrap_or_else(|| symbol.to_string());

        result.nodes.push(Node {
            chain: Some(canonicalize_chain(&token.chain)),
            protocol: Some(canonicalize_protocol(&token.protocol_id)),
            ..Node::new(token_id.clone(), name)
        });
        result.edges.push(Edge {
            from: root_id.to_string(),
            to: token_id,
            allocation_usd,
            lending_position: None,
        });
    }

    result
}

/// Resolve one wallet's protocol positions and app positions.
///
/// The two categories are independent and fetched as a joined group; the
/// first failure aborts the resolution.
pub async fn resolve_wallet_portfolio(
    client: &DebankClient,
    wallet: &str,
    root_id: &str,
) -> Result<GraphResult, exposure_common::ClientError> {
    let (protocols, apps) = try_join!(
        client.complex_protocol_list(wallet),
        client.complex_app_list(wallet)
    )?;

    let mut result = process_protocol_items(&protocols, root_id, wallet);
    result.merge(process_app_items(&apps, root_id));
    Ok(result)
}

/// Resolve one wallet's full holdings: protocol positions, app positions,
/// and plain token balances, fetched as one joined group.
pub async fn resolve_wallet(
    client: &DebankClient,
    wallet: &str,
    root_id: &str,
) -> Result<GraphResult, exposure_common::ClientError> {
    let (protocols, apps, tokens) = try_join!(
        client.complex_protocol_list(wallet),
        client.complex_app_list(wallet),
        client.all_token_list(wallet)
    )?;

    let mut result = process_protocol_items(&protocols, root_id, wallet);
    result.merge(process_app_items(&apps, root_id));
    result.merge(process_token_balances(&tokens, root_id));
    Ok(result)
}
