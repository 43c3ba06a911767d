//! Core types for Vinoscope: the Wine Analysis Record, the JSON contract
//! with the model, the error taxonomy, and the provider seams.

pub mod error;
pub mod json;
pub mod record;
pub mod traits;

pub use error::{AnalyzeError, StagePolicy, UpstreamError};
pub use json::{parse_model_json, strip_code_fences};
pub use record::{
    display_list, display_number, display_text, AromasAndFlavours, Confidence, DrinkWindow,
    Grape, PriceEstimate, RecognizedLabel, Source, TastingNotes, Vintage, WineAnalysisRecord,
    WsetLevel2, MAX_SOURCES, PLACEHOLDER,
};
pub use traits::{
    ImageAttachment, LlmProvider, LlmRequest, LlmResponse, SearchHit, SearchProvider,
    SearchRequest,
};
