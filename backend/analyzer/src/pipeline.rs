use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tracing::{debug, info, warn};

use vinoscope_config::Settings;
use vinoscope_core::{
    parse_model_json, AnalyzeError, ImageAttachment, LlmProvider, LlmRequest, SearchProvider,
    SearchRequest, StagePolicy, WineAnalysisRecord, MAX_SOURCES,
};
use vinoscope_tools::{build_price_query, normalize_hits, Evidence, MAX_SEARCH_RESULTS};

use crate::prompts::{
    grounding_prompt, recognition_prompt, GROUNDING_SYSTEM_PROMPT, RECOGNITION_SYSTEM_PROMPT,
};
use crate::providers::Backends;

/// Sampling temperature for both model passes.
pub const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 2048;

/// Appended to `priceEstimate.note` when the grounding pass returns garbage.
pub const GROUNDING_DEGRADED_NOTE: &str =
    "Grounding step failed; price estimates may be less reliable.";

/// The stages of one analysis, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Recognize,
    GatherEvidence,
    Ground,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Recognize => "recognize",
            Stage::GatherEvidence => "gather_evidence",
            Stage::Ground => "ground",
        }
    }

    /// What a failed provider call does to the request.
    pub fn on_call_error(self) -> StagePolicy {
        match self {
            Stage::GatherEvidence => StagePolicy::Degrade,
            Stage::Validate | Stage::Recognize | Stage::Ground => StagePolicy::Fatal,
        }
    }

    /// What unusable output (bad input, unparseable reply) does to the request.
    pub fn on_bad_output(self) -> StagePolicy {
        match self {
            Stage::GatherEvidence | Stage::Ground => StagePolicy::Degrade,
            Stage::Validate | Stage::Recognize => StagePolicy::Fatal,
        }
    }
}

/// The submitted photograph.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// How the grounding pass went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grounding {
    /// No evidence, so the pass did not run.
    Skipped,
    Applied,
    /// The model reply was unusable; the recognized record was kept.
    Degraded,
}

/// The final record plus a trace of what the pipeline did.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub record: WineAnalysisRecord,
    pub evidence_count: usize,
    pub grounding: Grounding,
}

/// Runs the recognition → evidence → grounding pipeline for one image.
pub struct Analyzer {
    model: Arc<dyn LlmProvider>,
    search: Option<Arc<dyn SearchProvider>>,
    vision_model: String,
    grounding_model: String,
}

impl Analyzer {
    pub fn new(
        model: Arc<dyn LlmProvider>,
        vision_model: impl Into<String>,
        grounding_model: impl Into<String>,
    ) -> Self {
        Self {
            model,
            search: None,
            vision_model: vision_model.into(),
            grounding_model: grounding_model.into(),
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    /// Build an analyzer from request-time settings.
    pub fn from_settings(settings: &Settings, client: &Client) -> Result<Self, AnalyzeError> {
        let backends = Backends::from_settings(settings, client)?;
        let analyzer = Self::new(
            backends.model,
            settings.vision_model.clone(),
            settings.grounding_model.clone(),
        );
        Ok(match backends.search {
            Some(search) => analyzer.with_search(search),
            None => analyzer,
        })
    }

    /// Analyze one label photograph.
    pub async fn analyze(&self, upload: ImageUpload) -> Result<AnalysisReport, AnalyzeError> {
        let start = Instant::now();
        let upload = validate_upload(Some(upload))?;

        let record = self.recognize(&upload).await?;
        let evidence = self.gather_evidence(&record).await?;
        let (mut record, grounding) = self.ground(record, &evidence).await?;
        backfill_sources(&mut record, &evidence);

        info!(
            evidence = evidence.len(),
            grounding = ?grounding,
            sources = record.sources.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Label analysis complete"
        );

        Ok(AnalysisReport {
            record,
            evidence_count: evidence.len(),
            grounding,
        })
    }

    /// Stage 1: read the label with the vision model.
    async fn recognize(&self, upload: &ImageUpload) -> Result<WineAnalysisRecord, AnalyzeError> {
        let request = LlmRequest {
            model: self.vision_model.clone(),
            system_prompt: RECOGNITION_SYSTEM_PROMPT.to_string(),
            user_prompt: recognition_prompt(),
            images: vec![ImageAttachment {
                mime_type: upload.mime_type.clone(),
                data: upload.bytes.clone(),
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!(
            stage = Stage::Recognize.name(),
            model = %request.model,
            bytes = upload.bytes.len(),
            mime = %upload.mime_type,
            "Calling vision model"
        );

        let response = self.model.complete(&request).await?;
        let value = parse_model_json(&response.content)?;

        info!(
            stage = Stage::Recognize.name(),
            provider = %response.provider,
            tokens = response.tokens_used,
            latency_ms = response.latency_ms,
            "Label recognized"
        );
        let mut record = WineAnalysisRecord::from_value(value);
        // Sources only ever come from gathered evidence.
        if !record.sources.is_empty() {
            debug!(
                stage = Stage::Recognize.name(),
                dropped = record.sources.len(),
                "Discarding sources cited by the vision model"
            );
            record.sources.clear();
        }
        Ok(record)
    }

    /// Stage 2: best-effort web search for pricing evidence.
    async fn gather_evidence(
        &self,
        record: &WineAnalysisRecord,
    ) -> Result<Vec<Evidence>, AnalyzeError> {
        let stage = Stage::GatherEvidence;
        let Some(search) = &self.search else {
            debug!(stage = stage.name(), "No search provider configured");
            return Ok(Vec::new());
        };
        let Some(query) = record
            .recognized_label
            .as_ref()
            .and_then(build_price_query)
        else {
            debug!(stage = stage.name(), "Nothing identifying to search for");
            return Ok(Vec::new());
        };

        let request = SearchRequest {
            query,
            max_results: MAX_SEARCH_RESULTS,
            deep: true,
        };
        debug!(stage = stage.name(), provider = search.name(), query = %request.query, "Searching");

        let result = search
            .search(&request)
            .await
            .map(normalize_hits)
            .map_err(AnalyzeError::from);
        let evidence = apply_policy(stage, stage.on_call_error(), result)?.unwrap_or_default();
        debug!(stage = stage.name(), items = evidence.len(), "Evidence gathered");
        Ok(evidence)
    }

    /// Stage 3: refine price and drink window against the evidence.
    async fn ground(
        &self,
        record: WineAnalysisRecord,
        evidence: &[Evidence],
    ) -> Result<(WineAnalysisRecord, Grounding), AnalyzeError> {
        let stage = Stage::Ground;
        if evidence.is_empty() {
            return Ok((record, Grounding::Skipped));
        }

        let record_json = serde_json::to_string_pretty(&record)
            .map_err(|e| AnalyzeError::Internal(e.into()))?;
        let request = LlmRequest {
            model: self.grounding_model.clone(),
            system_prompt: GROUNDING_SYSTEM_PROMPT.to_string(),
            user_prompt: grounding_prompt(&record_json, evidence),
            images: Vec::new(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!(
            stage = stage.name(),
            model = %request.model,
            evidence = evidence.len(),
            "Calling grounding model"
        );

        let reply = self.model.complete(&request).await.map_err(AnalyzeError::from);
        let Some(reply) = apply_policy(stage, stage.on_call_error(), reply)? else {
            return Ok(degrade_grounding(record));
        };

        let parsed = parse_model_json(&reply.content);
        Ok(match apply_policy(stage, stage.on_bad_output(), parsed)? {
            Some(value) => {
                let mut record = record;
                record.apply_grounding(WineAnalysisRecord::from_value(value));
                (record, Grounding::Applied)
            }
            None => degrade_grounding(record),
        })
    }
}

/// Apply a stage's failure policy: `Fatal` propagates the error, `Degrade`
/// logs it and yields `None` so the caller continues with less.
fn apply_policy<T>(
    stage: Stage,
    policy: StagePolicy,
    result: Result<T, AnalyzeError>,
) -> Result<Option<T>, AnalyzeError> {
    match (result, policy) {
        (Ok(value), _) => Ok(Some(value)),
        (Err(e), StagePolicy::Fatal) => Err(e),
        (Err(e), StagePolicy::Degrade) => {
            warn!(
                stage = stage.name(),
                error = %e,
                "Stage failed, continuing with reduced information"
            );
            Ok(None)
        }
    }
}

/// Keep the recognized record and flag its price estimate.
fn degrade_grounding(mut record: WineAnalysisRecord) -> (WineAnalysisRecord, Grounding) {
    record.price_estimate_mut().append_note(GROUNDING_DEGRADED_NOTE);
    (record, Grounding::Degraded)
}

/// Cite the gathered evidence when the record has no sources of its own.
pub fn backfill_sources(record: &mut WineAnalysisRecord, evidence: &[Evidence]) {
    if record.sources.is_empty() {
        record.sources = evidence
            .iter()
            .take(MAX_SOURCES)
            .map(Evidence::to_source)
            .collect();
    }
}

/// Require exactly one non-empty image.
pub fn validate_upload(upload: Option<ImageUpload>) -> Result<ImageUpload, AnalyzeError> {
    match upload {
        Some(upload) if !upload.bytes.is_empty() => Ok(upload),
        _ => Err(AnalyzeError::NoImage),
    }
}

/// Validate, resolve providers, run. The image is checked before the
/// credential, and the credential is read now rather than at startup.
pub async fn analyze_upload(
    upload: Option<ImageUpload>,
    settings: &Settings,
    client: &Client,
) -> Result<AnalysisReport, AnalyzeError> {
    let upload = validate_upload(upload)?;
    let analyzer = Analyzer::from_settings(settings, client)?;
    analyzer.analyze(upload).await
}
