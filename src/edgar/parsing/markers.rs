//! Declarative section-boundary rules for the MD&A scan.
//!
//! Every literal phrase the bounder reacts to lives in [`MARKER_RULES`].
//! Patterns are matched against [`marker_key`] output: lowercase, straight
//! apostrophes, markdown/table noise removed, whitespace collapsed.

use once_cell::sync::Lazy;
use regex::Regex;

pub use super::text::marker_key;

/// Annual filings carry MD&A under Item 7, quarterly ones under Item 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingKind {
    Annual,
    Quarterly,
}

/// Which family of headings closes the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndMarker {
    QuarterlyItems,
    AnnualItems,
    PartIv,
}

impl EndMarker {
    pub fn for_kind(kind: FilingKind) -> Self {
        match kind {
            FilingKind::Annual => EndMarker::AnnualItems,
            FilingKind::Quarterly => EndMarker::QuarterlyItems,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    Annual,
    Quarterly,
}

impl Scope {
    fn admits(&self, kind: FilingKind) -> bool {
        match self {
            Scope::Any => true,
            Scope::Annual => kind == FilingKind::Annual,
            Scope::Quarterly => kind == FilingKind::Quarterly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAction {
    /// The line is an MD&A heading.
    Start,
    /// A bare item number whose title follows on the next non-blank line.
    StartLead,
    /// Title text that completes a `StartLead`.
    StartTitle,
    /// Remainder of a heading wrapped onto the following line.
    StartTail,
    /// Closes the section when `expected_end` equals the marker.
    End(EndMarker),
    /// Cross-reference that moves the expected end.
    RedirectEnd(EndMarker),
}

#[derive(Debug, Clone, Copy)]
pub struct MarkerRule {
    pub name: &'static str,
    pub pattern: &'static str,
    pub scope: Scope,
    pub action: MarkerAction,
}

// Grown from observed filings; not exhaustive.
pub static MARKER_RULES: &[MarkerRule] = &[
    MarkerRule {
        name: "item2_mdna",
        pattern: r"^item\s*2\s*[.:\-]?\s*management'?s\s+discussion\s+and\s+analysis",
        scope: Scope::Quarterly,
        action: MarkerAction::Start,
    },
    MarkerRule {
        name: "item7_mdna",
        pattern: r"^item\s*7\s*[.:\-]?\s*management'?s\s+discussion\s+and\s+analysis",
        scope: Scope::Annual,
        action: MarkerAction::Start,
    },
    MarkerRule {
        name: "mdna_full_title",
        pattern: r"^management'?s\s+discussion\s+and\s+analysis\s+of\s+(?:the\s+)?(?:consolidated\s+)?(?:financial\s+condition\s+and\s+results\s+of\s+operations|results\s+of\s+operations\s+and\s+financial\s+condition)\.?$",
        scope: Scope::Any,
        action: MarkerAction::Start,
    },
    MarkerRule {
        name: "mdna_short_title",
        pattern: r"^management'?s\s+discussion\s+and\s+analysis(?:\s*\(md&a\))?\.?$",
        scope: Scope::Any,
        action: MarkerAction::Start,
    },
    MarkerRule {
        name: "item2_lead",
        pattern: r"^item\s*2\s*[.:\-]?$",
        scope: Scope::Quarterly,
        action: MarkerAction::StartLead,
    },
    MarkerRule {
        name: "item7_lead",
        pattern: r"^item\s*7\s*[.:\-]?$",
        scope: Scope::Annual,
        action: MarkerAction::StartLead,
    },
    MarkerRule {
        name: "mdna_title",
        pattern: r"^management'?s\s+discussion\s+and\s+analysis",
        scope: Scope::Any,
        action: MarkerAction::StartTitle,
    },
    MarkerRule {
        name: "mdna_title_tail",
        pattern: r"^(?:of\s+)?(?:the\s+)?(?:consolidated\s+)?(?:(?:financial\s+)?condition\s+and\s+results\s+of\s+operations|(?:and\s+)?results\s+of\s+operations(?:\s+and\s+financial\s+condition)?|(?:and\s+)?financial\s+condition)\.?$",
        scope: Scope::Any,
        action: MarkerAction::StartTail,
    },
    MarkerRule {
        name: "quarterly_next_item",
        pattern: r"^item\s*[3-6][a-z]?\s*(?:[.:\-]|\s|$)",
        scope: Scope::Quarterly,
        action: MarkerAction::End(EndMarker::QuarterlyItems),
    },
    MarkerRule {
        name: "quarterly_part_ii",
        pattern: r"^part\s+ii(?:\s*[.:\-]|\s+other\s+information|$)",
        scope: Scope::Quarterly,
        action: MarkerAction::End(EndMarker::QuarterlyItems),
    },
    MarkerRule {
        name: "annual_item_7a",
        pattern: r"^item\s*7a\b",
        scope: Scope::Annual,
        action: MarkerAction::End(EndMarker::AnnualItems),
    },
    MarkerRule {
        name: "annual_item_8",
        pattern: r"^item\s*8\s*(?:[.:\-]|\s|$)",
        scope: Scope::Annual,
        action: MarkerAction::End(EndMarker::AnnualItems),
    },
    MarkerRule {
        name: "annual_market_risk_title",
        pattern: r"^quantitative\s+and\s+qualitative\s+disclosures?\s+about\s+market\s+risks?\.?$",
        scope: Scope::Annual,
        action: MarkerAction::End(EndMarker::AnnualItems),
    },
    MarkerRule {
        name: "part_iv",
        pattern: r"^part\s+iv(?:\s*[.:\-]|\s|$)",
        scope: Scope::Any,
        action: MarkerAction::End(EndMarker::PartIv),
    },
    MarkerRule {
        name: "part_iv_cross_reference",
        pattern: r"\b(?:presented|included|contained|set\s+forth|located|found|appear)\s+(?:in|under)\s+part\s+iv\b",
        scope: Scope::Any,
        action: MarkerAction::RedirectEnd(EndMarker::PartIv),
    },
];

/// Headings are short; longer lines are prose that merely mention an item.
pub const MAX_HEADING_CHARS: usize = 160;

static COMPILED_RULES: Lazy<Vec<(&'static MarkerRule, Regex)>> = Lazy::new(|| {
    MARKER_RULES
        .iter()
        .map(|rule| {
            let re = Regex::new(rule.pattern).unwrap_or_else(|e| {
                panic!("marker rule {} has an invalid pattern: {}", rule.name, e)
            });
            (rule, re)
        })
        .collect()
});

static TOC_NEIGHBOUR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:item\s*\d+[a-z]?\b|part\s+[iv]+\b)")
        .expect("TOC_NEIGHBOUR_RE: hardcoded regex is valid")
});

static TRAILING_PAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\s|\.{2,})\d{1,3}$").expect("TRAILING_PAGE_RE: hardcoded regex is valid")
});

/// Rules admitted for `kind` whose pattern matches `key`, in table order.
pub fn matching_rules(key: &str, kind: FilingKind) -> impl Iterator<Item = &'static MarkerRule> + '_ {
    COMPILED_RULES
        .iter()
        .filter(move |(rule, _)| rule.scope.admits(kind))
        .filter(move |(rule, re)| {
            let heading_only = !matches!(rule.action, MarkerAction::RedirectEnd(_));
            (!heading_only || key.chars().count() <= MAX_HEADING_CHARS) && re.is_match(key)
        })
        .map(|(rule, _)| *rule)
}

pub fn has_action(key: &str, kind: FilingKind, wanted: impl Fn(MarkerAction) -> bool) -> bool {
    matching_rules(key, kind).any(|rule| wanted(rule.action))
}

pub fn is_start(key: &str, kind: FilingKind) -> bool {
    has_action(key, kind, |a| a == MarkerAction::Start)
}

pub fn is_start_lead(key: &str, kind: FilingKind) -> bool {
    has_action(key, kind, |a| a == MarkerAction::StartLead)
}

pub fn is_start_title(key: &str, kind: FilingKind) -> bool {
    has_action(key, kind, |a| {
        matches!(a, MarkerAction::Start | MarkerAction::StartTitle)
    })
}

pub fn is_start_tail(key: &str, kind: FilingKind) -> bool {
    has_action(key, kind, |a| a == MarkerAction::StartTail)
}

pub fn is_end(key: &str, kind: FilingKind, expected: EndMarker) -> bool {
    has_action(key, kind, |a| a == MarkerAction::End(expected))
}

pub fn redirect_target(key: &str, kind: FilingKind) -> Option<EndMarker> {
    matching_rules(key, kind).find_map(|rule| match rule.action {
        MarkerAction::RedirectEnd(target) => Some(target),
        _ => None,
    })
}

/// Looks like another item/part heading (used to spot table-of-contents runs).
pub fn is_toc_neighbour(key: &str) -> bool {
    TOC_NEIGHBOUR_RE.is_match(key)
}

/// Ends in a page number, as table-of-contents entries do.
pub fn has_trailing_page_number(key: &str) -> bool {
    TRAILING_PAGE_RE.is_match(key)
}
