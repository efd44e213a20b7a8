// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Destination name to base price lookup.
//!
//! Destination names arrive with inconsistent casing and prefixes
//! ("STATION SFAX", "Gare de Sousse", "sfax"), so lookups try three tiers
//! in order:
//! 1. Exact (case-insensitive, trimmed)
//! 2. Normalized: known prefixes stripped, whitespace collapsed
//! 3. Substring of the normalized forms, in either direction

use serde::{Deserialize, Serialize};

use crate::price::Price;

/// Prefixes stripped during normalization when none are configured.
pub const DEFAULT_PREFIXES: &[&str] = &["station de ", "station ", "gare de ", "gare ", "louage "];

/// A destination's configured fare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePrice {
    pub destination_name: String,
    pub base_price: Price,
}

impl RoutePrice {
    pub fn new(destination_name: impl Into<String>, base_price: Price) -> Self {
        RoutePrice { destination_name: destination_name.into(), base_price }
    }
}

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    Normalized,
    Substring,
}

/// Normalizes a destination name for comparison.
pub fn normalize_name(name: &str, prefixes: &[String]) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let mut rest = collapsed.as_str();
    // Strip repeatedly: "Station Gare X" loses both.
    loop {
        let before = rest;
        for prefix in prefixes {
            if let Some(stripped) = rest.strip_prefix(prefix.as_str()) {
                rest = stripped.trim_start();
            }
        }
        if before == rest {
            break;
        }
    }
    rest.to_string()
}

/// Finds the route for `name` using the three-tier strategy.
///
/// Within a tier the first configured route wins. The substring tier ignores
/// normalized names shorter than three characters to avoid matching noise.
pub fn match_route<'a>(
    name: &str,
    routes: &'a [RoutePrice],
    prefixes: &[String],
) -> Option<(MatchTier, &'a RoutePrice)> {
    let wanted = name.trim();
    if wanted.is_empty() {
        return None;
    }

    if let Some(route) =
        routes.iter().find(|r| r.destination_name.trim().eq_ignore_ascii_case(wanted))
    {
        return Some((MatchTier::Exact, route));
    }

    let wanted_norm = normalize_name(wanted, prefixes);
    let normalized: Vec<String> =
        routes.iter().map(|r| normalize_name(&r.destination_name, prefixes)).collect();

    if let Some(i) = normalized.iter().position(|n| !n.is_empty() && *n == wanted_norm) {
        return Some((MatchTier::Normalized, &routes[i]));
    }

    if wanted_norm.chars().count() < 3 {
        return None;
    }
    normalized
        .iter()
        .position(|n| {
            n.chars().count() >= 3 && (n.contains(&wanted_norm) || wanted_norm.contains(n.as_str()))
        })
        .map(|i| (MatchTier::Substring, &routes[i]))
}

/// Route/price reference table, read-only from the engine's perspective.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RoutePrice>,
    prefixes: Vec<String>,
}

impl RouteTable {
    /// Creates a table with the default prefix list.
    pub fn new(routes: Vec<RoutePrice>) -> Self {
        Self::with_prefixes(routes, DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect())
    }

    pub fn with_prefixes(routes: Vec<RoutePrice>, prefixes: Vec<String>) -> Self {
        let prefixes = prefixes
            .into_iter()
            .map(|p| {
                let p = p.to_lowercase();
                if p.ends_with(' ') {
                    p
                } else {
                    format!("{p} ")
                }
            })
            .collect();
        RouteTable { routes, prefixes }
    }

    pub fn routes(&self) -> &[RoutePrice] {
        &self.routes
    }

    pub fn lookup(&self, name: &str) -> Option<(MatchTier, &RoutePrice)> {
        match_route(name, &self.routes, &self.prefixes)
    }

    /// Base price for a destination name, if any tier matches.
    pub fn price_for(&self, name: &str) -> Option<Price> {
        self.lookup(name).map(|(_, r)| r.base_price)
    }
}

#[cfg(test)]
#[path = "route_tests.rs"]
mod tests;
