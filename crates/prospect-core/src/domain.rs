//! Company domain heuristics.
//!
//! Everything here is pure; the async strategy chain that calls remote tools lives in
//! `prospect-local`. Registrable-domain trimming is a heuristic, not a public-suffix
//! lookup: a 2-letter TLD under a label of at most 3 chars (`co.uk`, `com.au`) keeps
//! three labels, everything else keeps two.

use serde_json::Value;

use crate::coalesce::at_path;
use crate::CompanyCandidate;

/// Hosts that are never a company's official site (matched with subdomains).
pub const BLOCKED_HOSTS: [&str; 9] = [
    "wikipedia.org",
    "linkedin.com",
    "crunchbase.com",
    "reddit.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "youtube.com",
];

/// `token.<tld>` exact-match scores, best first.
const TLD_SCORES: [(&str, u32); 6] = [
    ("com", 100),
    ("io", 96),
    ("co", 94),
    ("ai", 92),
    ("net", 90),
    ("org", 88),
];
const PREFIX_SCORE: u32 = 80;
const CONTAINS_SCORE: u32 = 60;

/// Lowercase, strip `www.`, keep the registrable part.
pub fn normalize_domain(input: &str) -> String {
    let lowered = input.to_lowercase();
    let trimmed = lowered.trim();
    let trimmed = trimmed.strip_prefix("www.").unwrap_or(trimmed);
    let parts: Vec<&str> = trimmed.split('.').filter(|p| !p.is_empty()).collect();
    if parts.len() <= 2 {
        return trimmed.to_string();
    }
    let last = parts[parts.len() - 1];
    let second_last = parts[parts.len() - 2];
    let keep = if last.len() == 2 && second_last.len() <= 3 {
        3
    } else {
        2
    };
    parts[parts.len() - keep..].join(".")
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Domain from a URL-like query, or empty when the query has no dot.
///
/// A missing scheme is assumed to be https. Unparseable input falls back to the text
/// before the first `/`.
pub fn extract_domain(query: &str) -> String {
    let trimmed = query.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('.') {
        return String::new();
    }
    let url = if trimmed.contains("://") {
        trimmed.clone()
    } else {
        format!("https://{trimmed}")
    };
    match host_of(&url) {
        Some(host) => normalize_domain(&host),
        None => normalize_domain(trimmed.split('/').next().unwrap_or(&trimmed)),
    }
}

/// Lowercase ASCII alphanumerics only.
pub fn slugify(query: &str) -> String {
    query
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Last-resort `.com` guess. Empty when the query has no usable characters.
pub fn guess_domain(query: &str) -> String {
    let slug = slugify(query);
    if slug.is_empty() {
        String::new()
    } else {
        format!("{slug}.com")
    }
}

/// Pick the best directory match for `query`.
///
/// Precedence: exact (normalized) domain, exact name, name containing the query, any
/// row with a domain, then the first row.
pub fn pick_company<'a>(
    companies: &'a [CompanyCandidate],
    query: &str,
) -> Option<&'a CompanyCandidate> {
    let q = query.trim().to_lowercase();
    let name_of = |c: &CompanyCandidate| c.company_name.as_deref().unwrap_or("").to_lowercase();

    companies
        .iter()
        .find(|c| normalize_domain(c.domain.as_deref().unwrap_or("")) == q)
        .or_else(|| companies.iter().find(|c| name_of(c) == q))
        .or_else(|| companies.iter().find(|c| name_of(c).contains(&q)))
        .or_else(|| {
            companies
                .iter()
                .find(|c| c.domain.as_deref().is_some_and(|d| !d.is_empty()))
        })
        .or_else(|| companies.first())
}

/// Directory rows from a company-search payload (`companies`, possibly still under
/// `structuredContent`). Rows that do not look like candidates are skipped.
pub fn companies_from_search(result: &Value) -> Vec<CompanyCandidate> {
    let rows = at_path(result, &["companies"])
        .or_else(|| at_path(result, &["structuredContent", "companies"]))
        .and_then(Value::as_array);
    rows.map(|rows| {
        rows.iter()
            .filter_map(|r| serde_json::from_value(r.clone()).ok())
            .collect()
    })
    .unwrap_or_default()
}

/// Tokens used to score web-search hosts: the full slug first, then every
/// alphanumeric word of at least 3 chars.
pub fn query_tokens(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut tokens: Vec<String> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_string)
        .collect();
    let slug = slugify(query);
    if !slug.is_empty() && !tokens.contains(&slug) {
        tokens.insert(0, slug);
    }
    tokens
}

fn score_for_token(domain: &str, token: &str) -> u32 {
    if let Some(rest) = domain.strip_prefix(token).and_then(|r| r.strip_prefix('.')) {
        if let Some((_, s)) = TLD_SCORES.iter().find(|(tld, _)| *tld == rest) {
            return *s;
        }
        return PREFIX_SCORE;
    }
    if domain.contains(token) {
        CONTAINS_SCORE
    } else {
        0
    }
}

/// Best score of `domain` across all tokens.
pub fn score_domain(domain: &str, tokens: &[String]) -> u32 {
    tokens
        .iter()
        .map(|t| score_for_token(domain, t))
        .max()
        .unwrap_or(0)
}

pub fn is_blocked_host(domain: &str) -> bool {
    BLOCKED_HOSTS
        .iter()
        .any(|b| domain == *b || domain.ends_with(&format!(".{b}")))
}

/// Result rows from a web-search payload: `results`, or `structuredContent.results` /
/// `structuredContent.items`.
fn search_rows(result: &Value) -> &[Value] {
    [
        &["results"][..],
        &["structuredContent", "results"][..],
        &["structuredContent", "items"][..],
    ]
    .into_iter()
    .find_map(|p| at_path(result, p))
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or(&[])
}

/// Most likely official domain among web-search results, or empty.
///
/// Highest score wins; on ties the first-seen domain is kept. Blocked hosts and
/// zero-scoring hosts never win.
pub fn domain_from_web_search(result: &Value, query: &str) -> String {
    let tokens = query_tokens(query);
    let mut best = String::new();
    let mut best_score = 0;

    for row in search_rows(result) {
        let url = ["url", "link", "href"]
            .iter()
            .find_map(|k| row.get(*k).filter(|v| !v.is_null()))
            .and_then(Value::as_str);
        let Some(host) = url.and_then(host_of) else {
            continue;
        };
        let domain = normalize_domain(&host);
        if is_blocked_host(&domain) {
            continue;
        }
        let score = score_domain(&domain, &tokens);
        if score > best_score {
            best_score = score;
            best = domain;
        }
    }
    best
}
