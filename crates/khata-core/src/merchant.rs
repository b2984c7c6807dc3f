//! Merchant mapping: rule matching and description normalization
//!
//! Matching is two-phase. Exact patterns (literal substrings or globs) win
//! outright with score 1.0; fuzzy token-set matching against rule names and
//! de-globbed patterns is the fallback, gated by each rule's threshold.
//! When no rule matches at all, `MerchantNormalizer` extracts a displayable
//! name heuristically so imported transactions never stay raw.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::MerchantRule;

/// A successful rule match
#[derive(Debug, Clone, Serialize)]
pub struct MerchantMatch {
    pub rule: MerchantRule,
    /// 1.0 for exact/glob hits, token-set similarity for fuzzy hits
    pub score: f64,
    /// The pattern that hit, for exact matches
    pub matched_pattern: Option<String>,
}

fn has_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Translate a glob pattern to an anchored regex
///
/// `*` matches any run, `?` a single character; everything else is literal.
/// Anchored at the start only, so `AMZN*` matches `AMZN MKTP IN` but not
/// `XAMZN`.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            _ => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    Ok(Regex::new(&re)?)
}

fn strip_glob(pattern: &str) -> String {
    pattern.replace(['*', '?'], " ")
}

/// Length of the longest common subsequence, on chars
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Indel similarity: 1 - distance/(len_a + len_b), where distance counts
/// inserts and deletes only
fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    let lcs = lcs_len(&a, &b);
    (2 * lcs) as f64 / total as f64
}

/// Token-set similarity of two strings, in [0, 1]
///
/// Order-insensitive and duplicate-insensitive: the token sets are compared
/// via their sorted intersection and differences, so "MKTP AMZN IN" scores
/// 1.0 against "AMZN MKTP IN".
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let sect = common.join(" ");
    let combined_a = if only_a.is_empty() {
        sect.clone()
    } else if sect.is_empty() {
        only_a.join(" ")
    } else {
        format!("{} {}", sect, only_a.join(" "))
    };
    let combined_b = if only_b.is_empty() {
        sect.clone()
    } else if sect.is_empty() {
        only_b.join(" ")
    } else {
        format!("{} {}", sect, only_b.join(" "))
    };

    let mut best = indel_ratio(&combined_a, &combined_b);
    if !sect.is_empty() {
        best = best
            .max(indel_ratio(&sect, &combined_a))
            .max(indel_ratio(&sect, &combined_b));
    }
    best
}

/// Matches descriptions against a user's merchant rules
pub struct MerchantMatcher<'a> {
    db: &'a Database,
}

impl<'a> MerchantMatcher<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Find the best rule for a description
    ///
    /// Rules are tried in id order. The first exact hit short-circuits; fuzzy
    /// candidates are collected across all rules and the best one above its
    /// rule's threshold wins.
    pub fn find_match(&self, user_id: i64, description: &str) -> Result<Option<MerchantMatch>> {
        let rules = self.db.list_merchant_rules(user_id)?;
        let desc_upper = description.to_uppercase();

        let mut best_fuzzy: Option<MerchantMatch> = None;

        for rule in rules {
            for pattern in &rule.patterns {
                let pattern_upper = pattern.to_uppercase();
                let hit = if has_glob(&pattern_upper) {
                    glob_to_regex(&pattern_upper)?.is_match(&desc_upper)
                } else {
                    desc_upper.contains(&pattern_upper)
                };
                if hit {
                    debug!(rule = %rule.normalized_name, pattern = %pattern, "Exact merchant match");
                    return Ok(Some(MerchantMatch {
                        matched_pattern: Some(pattern.clone()),
                        rule,
                        score: 1.0,
                    }));
                }
            }

            // Fuzzy: compare against the rule name and every pattern with
            // glob metacharacters stripped
            let mut targets = vec![(rule.normalized_name.to_uppercase(), None)];
            targets.extend(
                rule.patterns
                    .iter()
                    .map(|p| (strip_glob(&p.to_uppercase()), Some(p.clone()))),
            );

            for (target, pattern) in targets {
                let score = token_set_ratio(&desc_upper, &target);
                if score >= rule.fuzzy_threshold
                    && best_fuzzy.as_ref().map_or(true, |b| score > b.score)
                {
                    best_fuzzy = Some(MerchantMatch {
                        rule: rule.clone(),
                        score,
                        matched_pattern: pattern,
                    });
                }
            }
        }

        Ok(best_fuzzy)
    }

    /// Retroactively apply one rule to the user's transactions
    ///
    /// Exact and glob patterns only; fuzzy is too loose for bulk rewriting.
    /// Transactions already mapped to this merchant are skipped. Category is
    /// filled in only where the transaction has none. Returns the number of
    /// transactions updated.
    pub fn apply_rule(&self, user_id: i64, rule_id: i64, update_category: bool) -> Result<usize> {
        let rule = self
            .db
            .get_merchant_rule(user_id, rule_id)?
            .ok_or_else(|| crate::Error::NotFound(format!("Merchant rule {} not found", rule_id)))?;

        let transactions = self.db.all_transactions(user_id)?;
        let mut updated = 0;

        let patterns: Vec<(String, Option<Regex>)> = rule
            .patterns
            .iter()
            .map(|p| {
                let upper = p.to_uppercase();
                if has_glob(&upper) {
                    let re = glob_to_regex(&upper)?;
                    Ok((upper, Some(re)))
                } else {
                    Ok((upper, None))
                }
            })
            .collect::<Result<_>>()?;

        for tx in &transactions {
            if tx
                .merchant_name
                .as_deref()
                .map_or(false, |m| m.eq_ignore_ascii_case(&rule.normalized_name))
            {
                continue;
            }

            let desc_upper = tx.description.to_uppercase();
            let hit = patterns.iter().any(|(literal, re)| match re {
                Some(re) => re.is_match(&desc_upper),
                None => desc_upper.contains(literal.as_str()),
            });
            if !hit {
                continue;
            }

            let category = if update_category && tx.category.is_none() {
                rule.category.as_deref()
            } else {
                None
            };
            self.db
                .set_transaction_merchant(tx.id, &rule.normalized_name, category)?;
            updated += 1;
        }

        if updated > 0 {
            self.db.increment_rule_usage(rule_id, updated as i64)?;
        }

        debug!(rule = %rule.normalized_name, updated, "Applied merchant rule");
        Ok(updated)
    }
}

/// Payment-rail prefixes stripped before anything else
const RAIL_PREFIXES: [&str; 9] = [
    r"^UPI/", r"^NEFT/", r"^IMPS/", r"^RTGS/", r"^POS/", r"^ATM/", r"^CR/", r"^DR/", r"^TRF/",
];

/// Trailing noise: location tags, counters, transaction ids, reference
/// tails, UPI handles
const NOISE_SUFFIXES: [&str; 5] = [
    r"\*[A-Z]+\d*$",
    r"-\d+$",
    r"\s+\d{6,}$",
    r"/[A-Z0-9]+$",
    r"@[a-z]+$",
];

/// Well-known brands, matched case-insensitively on the cleaned description
const BRANDS: [(&str, &str); 26] = [
    (r"SWIGGY", "Swiggy"),
    (r"ZOMATO", "Zomato"),
    (r"AMAZON", "Amazon"),
    (r"FLIPKART", "Flipkart"),
    (r"UBER", "Uber"),
    (r"OLA", "Ola"),
    (r"NETFLIX", "Netflix"),
    (r"PRIME\s*VIDEO", "Amazon Prime"),
    (r"SPOTIFY", "Spotify"),
    (r"PAYTM", "Paytm"),
    (r"PHONEPE", "PhonePe"),
    (r"GPAY|GOOGLE\s*PAY", "Google Pay"),
    (r"BIGBASKET", "BigBasket"),
    (r"GROFERS|BLINKIT", "Blinkit"),
    (r"DUNZO", "Dunzo"),
    (r"ZEPTO", "Zepto"),
    (r"MYNTRA", "Myntra"),
    (r"AJIO", "Ajio"),
    (r"NYKAA", "Nykaa"),
    (r"BOOKMYSHOW|BMS", "BookMyShow"),
    (r"IRCTC", "IRCTC"),
    (r"MAKEMYTRIP|MMT", "MakeMyTrip"),
    (r"GOIBIBO", "Goibibo"),
    (r"AIRTEL", "Airtel"),
    (r"JIO", "Jio"),
    (r"VODAFONE|VI", "Vi"),
];

/// Longest merchant name the fallback will produce
const MAX_MERCHANT_LEN: usize = 50;

/// Heuristic merchant name extraction for descriptions no rule covers
///
/// Always produces something; the worst case is the truncated description
/// itself.
pub struct MerchantNormalizer {
    prefixes: Vec<Regex>,
    suffixes: Vec<Regex>,
    brands: Vec<(Regex, &'static str)>,
}

impl MerchantNormalizer {
    pub fn new() -> Result<Self> {
        let prefixes = RAIL_PREFIXES
            .iter()
            .map(|p| Ok(Regex::new(&format!("(?i){}", p))?))
            .collect::<Result<_>>()?;
        let suffixes = NOISE_SUFFIXES
            .iter()
            .map(|p| Ok(Regex::new(p)?))
            .collect::<Result<_>>()?;
        let brands = BRANDS
            .iter()
            .map(|(p, name)| Ok((Regex::new(&format!("(?i){}", p))?, *name)))
            .collect::<Result<_>>()?;
        Ok(Self {
            prefixes,
            suffixes,
            brands,
        })
    }

    pub fn normalize(&self, description: &str) -> String {
        let mut merchant = description.trim().to_string();

        for re in &self.prefixes {
            merchant = re.replace(&merchant, "").into_owned();
        }
        for re in &self.suffixes {
            merchant = re.replace(&merchant, "").into_owned();
        }
        merchant = merchant.split_whitespace().collect::<Vec<_>>().join(" ");

        for (re, name) in &self.brands {
            if re.is_match(&merchant) {
                return name.to_string();
            }
        }

        // Title-case, then drop special characters (keeping hyphens)
        let titled = title_case(&merchant);
        let cleaned: String = titled
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-' {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

        let result = if cleaned.is_empty() {
            description.trim().to_string()
        } else {
            cleaned
        };
        result.chars().take(MAX_MERCHANT_LEN).collect()
    }
}

/// Capitalize the first letter of each alphabetic run, lowercase the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
