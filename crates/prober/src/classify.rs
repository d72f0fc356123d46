//! Tiered classification of the rendered result page.
//!
//! The portal marks the outcome with a colored indicator span; the color is
//! the authoritative signal and the localized label text the cross-check.
//! Classification is an ordered list of independent strategies composed
//! first-match-wins, so each can be tested on its own and the fallthrough
//! stays flat.

use scraper::{Html, Selector};

use keycheck_core::KeyStatus;

const ACTIVATED_HEX: &str = "#67c1f5";
const ACTIVATED_RGB: &str = "rgb(103, 193, 245)";
const NOT_ACTIVATED_HEX: &str = "#e24044";
const NOT_ACTIVATED_RGB: &str = "rgb(226, 64, 68)";

// Localized labels as the portal renders them
const ACTIVATED_TEXT: &str = "activée";
const NOT_ACTIVATED_TEXT: &str = "non activée";

trait ClassifyStrategy {
    fn name(&self) -> &'static str;
    fn classify(&self, doc: &Html) -> Option<KeyStatus>;
}

/// Classify rendered HTML, or `Status not found` when no strategy matches.
pub fn classify_page(html: &str) -> KeyStatus {
    let doc = Html::parse_document(html);
    let strategies: [&dyn ClassifyStrategy; 3] = [&ResultIndicator, &ColorScan, &CellScan];

    for strategy in strategies {
        if let Some(status) = strategy.classify(&doc) {
            tracing::debug!(strategy = strategy.name(), status = %status, "classified");
            return status;
        }
    }
    KeyStatus::NotFound
}

fn element_text(el: &scraper::ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// The dedicated result indicator: a colored span inside a result-table
/// cell. Color decides; an unrecognized color is surfaced with the raw
/// label rather than guessed at.
struct ResultIndicator;

impl ClassifyStrategy for ResultIndicator {
    fn name(&self) -> &'static str {
        "result_indicator"
    }

    fn classify(&self, doc: &Html) -> Option<KeyStatus> {
        let selector = Selector::parse("td > span[style*='color']").unwrap();
        let span = doc.select(&selector).next()?;
        let style = span.value().attr("style").unwrap_or("").to_lowercase();
        let text = element_text(&span);
        let text_lower = text.to_lowercase();

        if style.contains(ACTIVATED_HEX)
            || style.contains(ACTIVATED_RGB)
            || text_lower == ACTIVATED_TEXT
        {
            Some(KeyStatus::Activated)
        } else if style.contains(NOT_ACTIVATED_HEX)
            || style.contains(NOT_ACTIVATED_RGB)
            || text_lower == NOT_ACTIVATED_TEXT
        {
            Some(KeyStatus::NotActivated)
        } else {
            Some(KeyStatus::Unknown(text))
        }
    }
}

/// Any span carrying one of the known colors, text cross-checked against the
/// matching label so an unrelated element in the same style can't match.
/// Hex encodings first, then the rgb functional form of the same colors.
struct ColorScan;

impl ClassifyStrategy for ColorScan {
    fn name(&self) -> &'static str {
        "color_scan"
    }

    fn classify(&self, doc: &Html) -> Option<KeyStatus> {
        let variants: [(&str, KeyStatus); 4] = [
            (ACTIVATED_HEX, KeyStatus::Activated),
            (NOT_ACTIVATED_HEX, KeyStatus::NotActivated),
            (ACTIVATED_RGB, KeyStatus::Activated),
            (NOT_ACTIVATED_RGB, KeyStatus::NotActivated),
        ];
        let selector = Selector::parse("span[style]").unwrap();

        for (color, status) in variants {
            for span in doc.select(&selector) {
                let style = span.value().attr("style").unwrap_or("").to_lowercase();
                if !style.contains(color) {
                    continue;
                }
                let text = element_text(&span).to_lowercase();
                let matches = match status {
                    KeyStatus::Activated => {
                        text.contains(ACTIVATED_TEXT) && !text.contains(NOT_ACTIVATED_TEXT)
                    }
                    _ => text.contains(NOT_ACTIVATED_TEXT),
                };
                if matches {
                    return Some(status);
                }
            }
        }
        None
    }
}

/// Last resort: plain result-table cells, matched on label substrings.
struct CellScan;

impl ClassifyStrategy for CellScan {
    fn name(&self) -> &'static str {
        "cell_scan"
    }

    fn classify(&self, doc: &Html) -> Option<KeyStatus> {
        let selector = Selector::parse("td").unwrap();
        for cell in doc.select(&selector) {
            let text = element_text(&cell).to_lowercase();
            if text.contains(NOT_ACTIVATED_TEXT) {
                return Some(KeyStatus::NotActivated);
            } else if text.contains(ACTIVATED_TEXT) {
                return Some(KeyStatus::Activated);
            } else if text.contains("invalid") || text.contains("invalide") {
                return Some(KeyStatus::Invalid);
            }
        }
        None
    }
}
