//! Content negotiation between the JSON response and the GraphiQL page.
//!
//! The page is only an option when the handler enables it and the client did
//! not opt out with `raw`. Beyond that, the `Accept` header decides: the page
//! is shown when `text/html` ranks strictly ahead of `application/json`.
//!
//! Ranking follows the usual negotiator rules. Each candidate takes the
//! matching accept range with the highest specificity (then quality, then
//! the later position). Candidates are then ordered by quality, specificity,
//! position of that range in the header and finally candidate order, with
//! JSON listed first so that it wins every tie.

use axum::http::{HeaderMap, header};

use crate::body::DecodedBody;
use crate::params::UrlParams;

const CANDIDATES: [(&str, &str); 2] = [("application", "json"), ("text", "html")];
const HTML: usize = 1;

/// Whether the interactive page may be shown for this request.
///
/// Runs before parameter extraction so that extraction failures can still be
/// reported on the page.
#[must_use]
pub fn may_show_interactive_page(
    headers: &HeaderMap,
    url: &UrlParams,
    body: &DecodedBody,
    graphiql: bool,
) -> bool {
    if !graphiql || url.contains("raw") || body.contains_key("raw") {
        return false;
    }
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("*/*");
    prefers_html(accept)
}

/// Whether `text/html` ranks ahead of `application/json` under `accept`.
#[must_use]
pub fn prefers_html(accept: &str) -> bool {
    preferred(&parse_accept(accept)) == Some(HTML)
}

#[derive(Debug, PartialEq)]
struct MediaRange {
    kind: String,
    subtype: String,
    params: Vec<(String, String)>,
    quality: f32,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
struct Priority {
    quality: f32,
    specificity: u8,
    index: usize,
    candidate: usize,
}

fn parse_accept(accept: &str) -> Vec<MediaRange> {
    accept
        .split(',')
        .enumerate()
        .filter_map(|(index, entry)| parse_range(entry, index))
        .collect()
}

fn parse_range(entry: &str, index: usize) -> Option<MediaRange> {
    let mut pieces = entry.split(';');
    let (kind, subtype) = pieces.next()?.trim().split_once('/')?;
    let (kind, subtype) = (kind.trim(), subtype.trim());
    if kind.is_empty() || subtype.is_empty() {
        return None;
    }

    let mut quality = 1.0;
    let mut params = Vec::new();
    for param in pieces {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim().trim_matches('"');
        if name == "q" {
            quality = value.parse().unwrap_or(1.0);
        } else {
            params.push((name, value.to_owned()));
        }
    }

    Some(MediaRange {
        kind: kind.to_ascii_lowercase(),
        subtype: subtype.to_ascii_lowercase(),
        params,
        quality,
        index,
    })
}

/// How specifically `range` matches a candidate, or `None` if it does not.
fn specificity(range: &MediaRange, kind: &str, subtype: &str) -> Option<u8> {
    let mut score = 0;
    if range.kind == kind {
        score |= 4;
    } else if range.kind != "*" {
        return None;
    }
    if range.subtype == subtype {
        score |= 2;
    } else if range.subtype != "*" {
        return None;
    }
    // Candidates carry no parameters, so only wildcard parameters can match.
    if !range.params.is_empty() {
        if range.params.iter().all(|(_, value)| value == "*") {
            score |= 1;
        } else {
            return None;
        }
    }
    Some(score)
}

fn priority(ranges: &[MediaRange], candidate: usize) -> Option<Priority> {
    let (kind, subtype) = CANDIDATES[candidate];
    ranges
        .iter()
        .filter_map(|range| {
            specificity(range, kind, subtype).map(|specificity| Priority {
                quality: range.quality,
                specificity,
                index: range.index,
                candidate,
            })
        })
        .max_by(|a, b| {
            a.specificity
                .cmp(&b.specificity)
                .then(a.quality.total_cmp(&b.quality))
                .then(a.index.cmp(&b.index))
        })
        .filter(|priority| priority.quality > 0.0)
}

fn preferred(ranges: &[MediaRange]) -> Option<usize> {
    (0..CANDIDATES.len())
        .filter_map(|candidate| priority(ranges, candidate))
        .min_by(|a, b| {
            b.quality
                .total_cmp(&a.quality)
                .then(b.specificity.cmp(&a.specificity))
                .then(a.index.cmp(&b.index))
                .then(a.candidate.cmp(&b.candidate))
        })
        .map(|priority| priority.candidate)
}
