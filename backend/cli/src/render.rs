//! Terminal rendering of a Wine Analysis Record.
//!
//! Every field goes through a defaulting accessor, so a record with nothing
//! in it still renders as a full page of placeholders. `render_safely`
//! additionally turns any panic during rendering into a visible notice.

use std::panic::{catch_unwind, AssertUnwindSafe};

use vinoscope_core::{
    display_list, display_number, display_text, Confidence, DrinkWindow, PriceEstimate,
    WineAnalysisRecord, PLACEHOLDER,
};

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Shown in place of the result when rendering fails.
pub const RENDER_FAILED_NOTICE: &str = "Render failed: the analysis could not be displayed.";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

/// Print a formatted INFO note to stdout.
pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

/// Print a formatted WARNING note.
pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Print a formatted SUCCESS note.
pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

/// Column alignment.
pub enum Align {
    Left,
    Right,
}

/// A table column definition.
pub struct Column {
    pub header: String,
    pub align: Align,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Left }
    }
    pub fn right(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Right }
    }
}

fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/// Render a table with given columns and rows. Missing cells render empty.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| visible_width(&c.header)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns.len()) {
            widths[i] = widths[i].max(visible_width(cell));
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| pad_cell(&col.header, widths[i], &col.align))
        .collect();
    out.push_str(&format!("  {}\n", header_cells.join("  ").trim_end()));

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", sep.join("  ")));

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                pad_cell(cell, widths[i], &col.align)
            })
            .collect();
        out.push_str(&format!("  {}\n", cells.join("  ").trim_end()));
    }

    out
}

fn pad_cell(s: &str, width: usize, align: &Align) -> String {
    let pad = width.saturating_sub(visible_width(s));
    match align {
        Align::Left => format!("{s}{}", " ".repeat(pad)),
        Align::Right => format!("{}{s}", " ".repeat(pad)),
    }
}

// ---------------------------------------------------------------------------
// Record view
// ---------------------------------------------------------------------------

struct Style {
    color: bool,
}

impl Style {
    fn heading(&self, title: &str) -> String {
        if self.color {
            format!("\n{BOLD}{title}{RESET}\n")
        } else {
            format!("\n{title}\n")
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            format!("{DIM}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

fn field(label: &str, value: impl AsRef<str>) -> String {
    format!("  {label:<14}{}\n", value.as_ref())
}

fn price_range(price: &PriceEstimate) -> String {
    let currency = price.currency.as_deref().map(str::trim).unwrap_or("");
    let amount = match (price.low, price.high) {
        (None, None) => return PLACEHOLDER.to_string(),
        (Some(low), Some(high)) if low == high => display_number(Some(low)),
        (low, high) => format!("{}–{}", display_number(low), display_number(high)),
    };
    if currency.is_empty() {
        amount
    } else {
        format!("{currency} {amount}")
    }
}

fn yes_no(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

fn span(from: Option<&str>, to: Option<&str>) -> String {
    let from = display_text(from);
    let to = display_text(to);
    if from == PLACEHOLDER && to == PLACEHOLDER {
        PLACEHOLDER.to_string()
    } else {
        format!("{from} – {to}")
    }
}

/// Render the full result view.
pub fn render_record(record: &WineAnalysisRecord, color: bool) -> String {
    let style = Style { color };
    let mut out = String::new();

    let label = record.recognized_label.clone().unwrap_or_default();
    out.push_str(&style.heading("Label"));
    out.push_str(&field("Producer", display_text(label.producer.as_deref())));
    out.push_str(&field("Wine", display_text(label.wine.as_deref())));
    out.push_str(&field("Appellation", display_text(label.appellation.as_deref())));
    out.push_str(&field("Region", display_text(label.region.as_deref())));
    out.push_str(&field("Country", display_text(label.country.as_deref())));
    out.push_str(&field(
        "Vintage",
        display_text(label.vintage.as_ref().map(|v| v.to_string()).as_deref()),
    ));
    out.push_str(&field(
        "ABV",
        match record.abv {
            Some(abv) => format!("{}%", display_number(Some(abv))),
            None => PLACEHOLDER.to_string(),
        },
    ));

    out.push_str(&style.heading("Grapes"));
    if record.grapes.is_empty() {
        out.push_str(&format!("  {PLACEHOLDER}\n"));
    } else {
        let rows: Vec<Vec<String>> = record
            .grapes
            .iter()
            .map(|g| {
                let percent = match g.percent {
                    Some(p) => format!("{}%", display_number(Some(p))),
                    None => PLACEHOLDER.to_string(),
                };
                vec![display_text(Some(&g.variety)), percent]
            })
            .collect();
        out.push_str(&render_table(&[Column::left("Variety"), Column::right("Share")], &rows));
    }

    let notes = record.tasting_notes.clone().unwrap_or_default();
    out.push_str(&style.heading("Tasting notes"));
    out.push_str(&field("Nose", display_list(&notes.nose)));
    out.push_str(&field("Palate", display_list(&notes.palate)));
    out.push_str(&field("Finish", display_text(notes.finish.as_deref())));

    let wset = notes.wset_level2.unwrap_or_default();
    out.push_str(&style.heading("WSET Level 2"));
    let rows = [
        ("Sweetness", &wset.sweetness),
        ("Acidity", &wset.acidity),
        ("Tannin", &wset.tannin),
        ("Body", &wset.body),
        ("Alcohol", &wset.alcohol),
        ("Finish length", &wset.finish_length),
    ]
    .into_iter()
    .map(|(name, value)| vec![name.to_string(), display_text(value.as_deref())])
    .collect::<Vec<_>>();
    out.push_str(&render_table(&[Column::left("Attribute"), Column::left("Level")], &rows));

    let aromas = record.aromas_and_flavours.clone().unwrap_or_default();
    out.push_str(&style.heading("Aromas & flavours"));
    out.push_str(&field("Primary", display_list(&aromas.primary)));
    out.push_str(&field("Secondary", display_list(&aromas.secondary)));
    out.push_str(&field("Tertiary", display_list(&aromas.tertiary)));

    let window: DrinkWindow = record.drink_window.clone().unwrap_or_default();
    out.push_str(&style.heading("Drink window"));
    out.push_str(&field("Drink now", yes_no(window.drink_now)));
    out.push_str(&field("Window", span(window.from.as_deref(), window.to.as_deref())));
    out.push_str(&field("Peak", span(window.peak_from.as_deref(), window.peak_to.as_deref())));
    out.push_str(&field("Decant", display_text(window.decant.as_deref())));

    let price = record.price_estimate.clone().unwrap_or_default();
    out.push_str(&style.heading("Price estimate"));
    out.push_str(&field("Range", price_range(&price)));
    out.push_str(&field(
        "Confidence",
        price
            .confidence
            .map(|c: Confidence| c.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
    ));
    out.push_str(&field("Note", display_text(price.note.as_deref())));

    out.push_str(&style.heading("Caveats"));
    if record.caveats.is_empty() {
        out.push_str(&format!("  {PLACEHOLDER}\n"));
    } else {
        for caveat in &record.caveats {
            out.push_str(&format!("  • {}\n", display_text(Some(caveat))));
        }
    }

    out.push_str(&style.heading("Sources"));
    if record.sources.is_empty() {
        out.push_str(&format!("  {PLACEHOLDER}\n"));
    } else {
        for (i, source) in record.sources.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {} {}\n",
                i + 1,
                display_text(Some(&source.title)),
                style.dim(&display_text(Some(&source.url)))
            ));
        }
    }

    out
}

/// Render, replacing any panic with [`RENDER_FAILED_NOTICE`].
pub fn render_safely(record: &WineAnalysisRecord, color: bool) -> String {
    guard(|| render_record(record, color))
}

fn guard(render: impl FnOnce() -> String) -> String {
    catch_unwind(AssertUnwindSafe(render)).unwrap_or_else(|_| {
        tracing::error!("Rendering the analysis panicked");
        format!("{RENDER_FAILED_NOTICE}\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_ansi() {
        let colored = format!("{GREEN}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn renders_table_with_multibyte_cells() {
        let cols = vec![Column::left("Variety"), Column::right("Share")];
        let rows = vec![
            vec!["Grüner Veltliner".to_string(), "100%".to_string()],
            vec!["Merlot".to_string(), PLACEHOLDER.to_string()],
        ];
        let table = render_table(&cols, &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2].chars().count(), lines[3].chars().count());
    }

    #[test]
    fn empty_record_renders_placeholders() {
        let out = render_record(&WineAnalysisRecord::default(), false);
        let lines: Vec<&str> = out.lines().collect();

        for label in [
            "Producer", "Wine", "Appellation", "Region", "Country", "Vintage", "ABV", "Nose",
            "Palate", "Finish", "Primary", "Secondary", "Tertiary", "Drink now", "Window", "Peak",
            "Decant", "Range", "Confidence", "Note",
        ] {
            let row = format!("  {label:<14}{PLACEHOLDER}");
            assert!(lines.contains(&row.as_str()), "missing placeholder row for {label}");
        }

        for attribute in ["Sweetness", "Acidity", "Tannin", "Body", "Alcohol", "Finish length"] {
            let row = lines
                .iter()
                .find(|l| l.trim_start().starts_with(attribute))
                .unwrap_or_else(|| panic!("missing WSET row {attribute}"));
            assert!(row.ends_with(PLACEHOLDER), "{attribute} row: {row}");
        }

        for section in ["Grapes", "Caveats", "Sources"] {
            let at = lines.iter().position(|l| *l == section).unwrap();
            assert_eq!(lines[at + 1], format!("  {PLACEHOLDER}"), "{section} section");
        }

        assert_eq!(out.matches(PLACEHOLDER).count(), 20 + 6 + 3);
        assert!(!out.contains(RENDER_FAILED_NOTICE));
    }

    #[test]
    fn malformed_record_renders_without_panicking() {
        let record = WineAnalysisRecord::from_value(json!({
            "recognizedLabel": [],
            "grapes": [{"percent": 40}, "Malbec"],
            "tastingNotes": {"wsetLevel2": "medium"},
            "priceEstimate": {"low": 20, "currency": "EUR"},
            "sources": [{"url": "https://vivino.com/x"}]
        }));
        let out = render_safely(&record, false);
        assert!(out.contains("Malbec"));
        assert!(out.contains("EUR 20–—"));
        assert!(out.contains("1. — https://vivino.com/x"));
    }

    #[test]
    fn full_record_renders_values() {
        let record = WineAnalysisRecord::from_value(json!({
            "recognizedLabel": {"producer": "Ridge", "vintage": 2019},
            "abv": 13.5,
            "grapes": [{"variety": "Zinfandel", "percent": 71}],
            "drinkWindow": {"drinkNow": true, "from": "2024", "to": "2035"},
            "priceEstimate": {"currency": "USD", "low": 40, "high": 55, "confidence": "medium"}
        }));
        let out = render_record(&record, false);
        assert!(out.contains("Vintage       2019"));
        assert!(out.contains("ABV           13.5%"));
        assert!(out.contains("71%"));
        assert!(out.contains("Window        2024 – 2035"));
        assert!(out.contains("Range         USD 40–55"));
        assert!(out.contains("Confidence    medium"));
    }

    #[test]
    fn panics_become_a_notice() {
        let out = guard(|| panic!("boom"));
        assert_eq!(out.trim_end(), RENDER_FAILED_NOTICE);
    }
}
