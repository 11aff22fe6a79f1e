//! Canonical identity scheme for graph nodes.
//!
//! Providers spell the same chain, protocol, and resource in wildly different
//! ways. Everything that becomes part of a node id passes through these
//! functions so that the same real-world instrument reported by two providers
//! produces byte-identical ids and merges into one node.
//!
//! All functions are pure, case-insensitive, and idempotent on already
//! canonical input.

/// Chain tags recognized when stripping provider chain prefixes from
/// protocol identifiers.
const KNOWN_CHAINS: &[&str] = &[
    "eth",
    "arb",
    "op",
    "polygon",
    "base",
    "hyper",
    "hyperliquid",
    "uni",
    "katana",
    "monad",
    "plume",
    "plasma",
    "stable",
    "lighter",
    "global",
];

/// Lowercase, trim, collapse runs of non-alphanumeric characters to a single
/// hyphen, and strip leading/trailing hyphens.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Canonicalize a chain identifier so node ids stay stable across sources.
///
/// Example: "Ethereum", "mainnet", "homestead" all map to `eth`. Unrecognized
/// chains fall back to their slug, so a newly listed chain degrades to a
/// stable-but-unmapped tag instead of failing.
pub fn canonicalize_chain(value: &str) -> String {
    let slug = slugify(value);

    let tag = match slug.as_str() {
        "ethereum" | "ethereum-mainnet" | "mainnet" | "homestead" | "eth" => "eth",
        "arbitrum" | "arbitrum-one" | "arb" => "arb",
        "optimism" | "op" => "op",
        "polygon" | "matic" => "polygon",
        "unichain" | "uni" => "uni",
        _ => return slug,
    };

    tag.to_string()
}

/// Canonicalize a protocol identifier so the same on-chain object merges
/// across adapters and resolvers (e.g. Debank's "morphoblue" and Morpho's own
/// "morpho-v2" naming).
///
/// Some providers prefix protocols with the chain ("arb_euler2",
/// "plasma_maple"). The first hyphen-separated segment is dropped iff it
/// canonicalizes to a known chain tag; the remainder is then mapped through
/// the spelling-variant table. "morpho" and "morphoblue" intentionally map to
/// distinct tags: they are different protocol versions, not spellings.
pub fn canonicalize_protocol(value: &str) -> String {
    let slug = slugify(value);

    let without_chain_prefix = match slug.split_once('-') {
        Some((first, rest)) if !first.is_empty() && !rest.is_empty() => {
            let maybe_chain = canonicalize_chain(first);
            if KNOWN_CHAINS.contains(&maybe_chain.as_str()) {
                rest.to_string()
            } else {
                slug
            }
        }
        _ => slug,
    };

    let tag = match without_chain_prefix.as_str() {
        "pendle2" | "pendle-v2" | "pendlev2" => "pendlev2",
        "euler2" | "euler-v2" | "eulerv2" => "euler",
        "aave3" | "aave-v3" | "aavev3" => "aavev3",
        "morpho" => "morpho-v1",
        "morphoblue" | "morpho-blue" | "morpho-blue-vault" => "morpho-v2",
        _ => return without_chain_prefix,
    };

    tag.to_string()
}

/// Join canonical chain, canonical protocol, and slugified resource into a
/// composite node id, with optional suffix segments disambiguating
/// otherwise-colliding keys (e.g. several lending positions of one wallet in
/// one protocol).
///
/// Empty suffixes are omitted so callers can pass optional identifiers
/// unconditionally.
pub fn composite_id(chain: &str, protocol: &str, resource: &str, suffixes: &[&str]) -> String {
    let mut id = format!(
        "{}:{}:{}",
        canonicalize_chain(chain),
        canonicalize_protocol(protocol),
        slugify(resource)
    );

    for suffix in suffixes {
        let segment = slugify(suffix);
        if !segment.is_empty() {
            id.push(':');
            id.push_str(&segment);
        }
    }

    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("  Gauntlet  USD__Alpha  "), "gauntlet-usd-alpha");
        assert_eq!(slugify("0xAbC123"), "0xabc123");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn slugify_is_idempotent() {
        let once = slugify("Morpho Blue: wstETH/USDC");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn chain_aliases_collapse() {
        assert_eq!(canonicalize_chain("Ethereum"), "eth");
        assert_eq!(canonicalize_chain("mainnet"), "eth");
        assert_eq!(canonicalize_chain("homestead"), "eth");
        assert_eq!(canonicalize_chain("arbitrum-one"), "arb");
        assert_eq!(canonicalize_chain("matic"), "polygon");
        assert_eq!(canonicalize_chain("unichain"), "uni");
    }

    #[test]
    fn unknown_chain_falls_back_to_slug() {
        assert_eq!(canonicalize_chain("Berachain"), "berachain");
        assert_eq!(canonicalize_chain(canonicalize_chain("Berachain").as_str()), "berachain");
    }

    #[test]
    fn protocol_chain_prefix_is_stripped() {
        assert_eq!(canonicalize_protocol("arb_euler2"), "euler");
        assert_eq!(canonicalize_protocol("plasma_maple"), "maple");
        assert_eq!(canonicalize_protocol("hyper_pendle2"), "pendlev2");
    }

    #[test]
    fn protocol_variants_collapse() {
        assert_eq!(canonicalize_protocol("euler-v2"), "euler");
        assert_eq!(canonicalize_protocol("aave3"), "aavev3");
        assert_eq!(canonicalize_protocol("Pendle V2"), "pendlev2");
    }

    #[test]
    fn morpho_versions_stay_distinct() {
        assert_eq!(canonicalize_protocol("morpho"), "morpho-v1");
        assert_eq!(canonicalize_protocol("morphoblue"), "morpho-v2");
        assert_eq!(canonicalize_protocol("morpho-blue-vault"), "morpho-v2");
        assert_ne!(
            canonicalize_protocol("morpho"),
            canonicalize_protocol("morphoblue")
        );
    }

    #[test]
    fn canonical_protocols_pass_through() {
        assert_eq!(canonicalize_protocol("morpho-v1"), "morpho-v1");
        assert_eq!(canonicalize_protocol("morpho-v2"), "morpho-v2");
        assert_eq!(canonicalize_protocol("spark"), "spark");
    }

    #[test]
    fn composite_id_joins_canonical_segments() {
        assert_eq!(
            composite_id("Ethereum", "morphoblue", "0xABC", &[]),
            "eth:morpho-v2:0xabc"
        );
    }

    #[test]
    fn composite_id_appends_non_empty_suffixes() {
        assert_eq!(
            composite_id("eth", "aave3", "0xwallet", &["3"]),
            "eth:aavev3:0xwallet:3"
        );
        assert_eq!(
            composite_id("eth", "aave3", "0xwallet", &[""]),
            "eth:aavev3:0xwallet"
        );
    }
}
