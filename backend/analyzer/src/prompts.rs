//! Fixed instructions for the recognition and grounding passes.

use vinoscope_tools::Evidence;

/// Shape of the record the model must return. Kept as text so it can be
/// shown to the model verbatim.
pub const RECORD_SCHEMA: &str = r#"{
  "recognizedLabel": {
    "producer": "string|null",
    "wine": "string|null",
    "appellation": "string|null",
    "region": "string|null",
    "country": "string|null",
    "vintage": "number|string|null"
  },
  "grapes": [{ "variety": "string", "percent": "number|null" }],
  "abv": "number|null",
  "tastingNotes": {
    "nose": ["string"],
    "palate": ["string"],
    "finish": "string",
    "wsetLevel2": {
      "sweetness": "string",
      "acidity": "string",
      "tannin": "string",
      "body": "string",
      "alcohol": "string",
      "finishLength": "string"
    }
  },
  "drinkWindow": {
    "drinkNow": "boolean",
    "from": "string",
    "to": "string",
    "peakFrom": "string",
    "peakTo": "string",
    "decant": "string"
  },
  "priceEstimate": {
    "currency": "string",
    "low": "number|null",
    "high": "number|null",
    "confidence": "low|medium|high",
    "note": "string"
  },
  "aromasAndFlavours": {
    "primary": ["string"],
    "secondary": ["string"],
    "tertiary": ["string"]
  },
  "caveats": ["string"],
  "sources": [{ "title": "string", "url": "string" }]
}"#;

pub const RECOGNITION_SYSTEM_PROMPT: &str = "\
You are a sommelier reading a photograph of a wine label. \
Respond with ONLY a JSON object that conforms to the schema you are given, \
with no commentary and no Markdown. \
If a field cannot be read from the label or reliably inferred, use null or an empty list; \
never fabricate it. \
Do not invent numeric facts: ABV, grape percentages and vintage must come from the label \
or be clearly inferable from it, otherwise null. \
Tasting notes, drink window and price are estimates for the identified wine; \
set priceEstimate.confidence accordingly and leave sources empty.";

pub const GROUNDING_SYSTEM_PROMPT: &str = "\
You refine a wine analysis using web evidence. \
Update ONLY priceEstimate and drinkWindow, based on the evidence provided. \
When sources disagree, stay conservative: widen the price range and lower the confidence. \
Add up to 5 entries to sources, listing only evidence you actually used, as {title, url}. \
Leave every other field exactly as given. \
Respond with ONLY the complete JSON object in the same schema, with no commentary and no Markdown.";

/// User message for the recognition pass; the image travels alongside it.
pub fn recognition_prompt() -> String {
    format!(
        "Identify this wine from its label and complete the analysis.\n\
         Return JSON matching this schema:\n{RECORD_SCHEMA}"
    )
}

/// User message for the grounding pass.
pub fn grounding_prompt(record_json: &str, evidence: &[Evidence]) -> String {
    let mut prompt = format!(
        "Current analysis:\n{record_json}\n\nSchema:\n{RECORD_SCHEMA}\n\nEvidence:\n"
    );
    for (i, item) in evidence.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] {}\nURL: {}\n{}\n\n",
            i + 1,
            item.title,
            item.url,
            item.snippet
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(RECORD_SCHEMA).unwrap();
        assert!(schema.get("tastingNotes").is_some());
        assert!(schema["tastingNotes"].get("wsetLevel2").is_some());
    }

    #[test]
    fn grounding_prompt_numbers_evidence() {
        let evidence = vec![
            Evidence {
                title: "Ridge Monte Bello".into(),
                url: "https://www.wine-searcher.com/a".into(),
                snippet: "Avg price $250".into(),
            },
            Evidence {
                title: "Vivino".into(),
                url: "https://www.vivino.com/b".into(),
                snippet: "4.6 stars".into(),
            },
        ];
        let prompt = grounding_prompt("{\"abv\":13.5}", &evidence);
        assert!(prompt.starts_with("Current analysis:\n{\"abv\":13.5}"));
        assert!(prompt.contains("[1] Ridge Monte Bello\nURL: https://www.wine-searcher.com/a"));
        assert!(prompt.contains("[2] Vivino"));
    }
}
