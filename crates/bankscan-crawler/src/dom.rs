//! Small helpers over `scraper` element trees.

use scraper::{ElementRef, Selector};

/// Parses a static CSS selector. All selectors in this crate are
/// compile-time literals.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid css selector")
}

/// Collects an element's text with whitespace collapsed to single spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
