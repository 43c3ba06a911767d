//! The Wine Analysis Record and its lenient decoding.
//!
//! Model output is untrusted: any section may be missing, null, or the
//! wrong JSON type. Decoding never fails on shape; a malformed field falls
//! back to its default and the rest of the record survives. Legacy shapes
//! (plain-string grape lists, numeric strings) are normalized here, once,
//! so downstream code only ever sees the canonical types.

use std::fmt;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown wherever a field is absent.
pub const PLACEHOLDER: &str = "—";

/// Maximum number of sources kept on a record.
pub const MAX_SOURCES: usize = 5;

/// Structured tasting information for one wine label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WineAnalysisRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub recognized_label: Option<RecognizedLabel>,
    #[serde(default, deserialize_with = "grapes")]
    pub grapes: Vec<Grape>,
    #[serde(default, deserialize_with = "loose_number")]
    pub abv: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub tasting_notes: Option<TastingNotes>,
    #[serde(default, deserialize_with = "lenient")]
    pub drink_window: Option<DrinkWindow>,
    #[serde(default, deserialize_with = "lenient")]
    pub price_estimate: Option<PriceEstimate>,
    #[serde(default, deserialize_with = "lenient")]
    pub aromas_and_flavours: Option<AromasAndFlavours>,
    #[serde(default, deserialize_with = "loose_strings")]
    pub caveats: Vec<String>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedLabel {
    #[serde(default, deserialize_with = "loose_string")]
    pub producer: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub wine: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub appellation: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "loose_vintage")]
    pub vintage: Option<Vintage>,
}

impl RecognizedLabel {
    /// Non-blank identifying fields in query order: producer, wine,
    /// appellation, region, country, vintage.
    pub fn identifying_fields(&self) -> Vec<String> {
        let texts = [
            &self.producer,
            &self.wine,
            &self.appellation,
            &self.region,
            &self.country,
        ];
        let mut fields: Vec<String> = texts
            .into_iter()
            .filter_map(|f| f.as_deref().map(str::trim))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(vintage) = &self.vintage {
            let v = vintage.to_string();
            if !v.trim().is_empty() {
                fields.push(v.trim().to_string());
            }
        }
        fields
    }
}

/// A vintage as the model reported it: a year, or free text such as "NV".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Vintage {
    Year(i64),
    Text(String),
}

impl fmt::Display for Vintage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vintage::Year(y) => write!(f, "{y}"),
            Vintage::Text(t) => f.write_str(t),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grape {
    pub variety: String,
    pub percent: Option<f64>,
}

/// Wire shapes accepted for one `grapes` entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum GrapeEntry {
    Named(String),
    Detailed {
        #[serde(default, deserialize_with = "loose_string")]
        variety: Option<String>,
        #[serde(default, deserialize_with = "loose_number")]
        percent: Option<f64>,
    },
}

impl GrapeEntry {
    fn into_grape(self) -> Option<Grape> {
        let (variety, percent) = match self {
            GrapeEntry::Named(name) => (Some(name), None),
            GrapeEntry::Detailed { variety, percent } => (variety, percent),
        };
        let variety = variety?.trim().to_string();
        if variety.is_empty() {
            return None;
        }
        Some(Grape { variety, percent })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TastingNotes {
    #[serde(default, deserialize_with = "loose_strings")]
    pub nose: Vec<String>,
    #[serde(default, deserialize_with = "loose_strings")]
    pub palate: Vec<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub finish: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub wset_level2: Option<WsetLevel2>,
}

/// WSET Level 2 structural assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsetLevel2 {
    #[serde(default, deserialize_with = "loose_string")]
    pub sweetness: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub acidity: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub tannin: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub alcohol: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub finish_length: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrinkWindow {
    #[serde(default, deserialize_with = "lenient")]
    pub drink_now: Option<bool>,
    #[serde(default, deserialize_with = "loose_string")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub peak_from: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub peak_to: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub decant: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEstimate {
    #[serde(default, deserialize_with = "loose_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "loose_confidence")]
    pub confidence: Option<Confidence>,
    #[serde(default, deserialize_with = "loose_string")]
    pub note: Option<String>,
}

impl PriceEstimate {
    /// Append a sentence to `note`, keeping whatever the model wrote.
    pub fn append_note(&mut self, text: &str) {
        self.note = Some(match self.note.take() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim_end(), text)
            }
            _ => text.to_string(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AromasAndFlavours {
    #[serde(default, deserialize_with = "loose_strings")]
    pub primary: Vec<String>,
    #[serde(default, deserialize_with = "loose_strings")]
    pub secondary: Vec<String>,
    #[serde(default, deserialize_with = "loose_strings")]
    pub tertiary: Vec<String>,
}

/// A web page cited by the grounding stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, deserialize_with = "loose_text")]
    pub title: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub url: String,
}

impl WineAnalysisRecord {
    /// Decode a record from arbitrary JSON. Never fails: a value that is
    /// not an object yields an empty record.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Take price estimate, drink window and sources from a grounded
    /// record, leaving everything else as recognized from the label.
    pub fn apply_grounding(&mut self, grounded: WineAnalysisRecord) {
        if grounded.price_estimate.is_some() {
            self.price_estimate = grounded.price_estimate;
        }
        if grounded.drink_window.is_some() {
            self.drink_window = grounded.drink_window;
        }
        if !grounded.sources.is_empty() {
            self.sources = grounded.sources;
        }
        self.sources.truncate(MAX_SOURCES);
    }

    /// Mutable access to the price estimate, creating an empty one if absent.
    pub fn price_estimate_mut(&mut self) -> &mut PriceEstimate {
        self.price_estimate.get_or_insert_with(PriceEstimate::default)
    }
}

/// Text for display, or [`PLACEHOLDER`] when absent or blank.
pub fn display_text(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Comma-joined list for display, or [`PLACEHOLDER`] when empty.
pub fn display_list(values: &[String]) -> String {
    let items: Vec<&str> = values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        items.join(", ")
    }
}

/// Number for display without a trailing `.0`, or [`PLACEHOLDER`].
pub fn display_number(value: Option<f64>) -> String {
    match value {
        Some(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
        Some(n) => format!("{n}"),
        None => PLACEHOLDER.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn grapes<'de, D>(deserializer: D) -> Result<Vec<Grape>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        single @ (Value::String(_) | Value::Object(_)) => vec![single],
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<GrapeEntry>(item).ok())
        .filter_map(GrapeEntry::into_grape)
        .collect())
}

fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn string_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(string_from_value(&value))
}

pub(crate) fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(string_from_value(&value).unwrap_or_default())
}

fn loose_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(string_from_value).collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn loose_vintage<'de, D>(deserializer: D) -> Result<Option<Vintage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(year), _) => Some(Vintage::Year(year)),
            (None, Some(f)) if f.is_finite() && f.fract() == 0.0 => Some(Vintage::Year(f as i64)),
            _ => None,
        },
        Value::String(s) if !s.trim().is_empty() => Some(Vintage::Text(s.trim().to_string())),
        _ => None,
    })
}

fn loose_confidence<'de, D>(deserializer: D) -> Result<Option<Confidence>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("low") => Some(Confidence::Low),
        Some("medium") => Some(Confidence::Medium),
        Some("high") => Some(Confidence::High),
        _ => None,
    })
}
