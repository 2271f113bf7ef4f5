use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::annotation::AnnotationSet;
use crate::models::chart_analysis::{
    ChartAnalysis, ChartAnalysisRequest, SentimentReading, Verdict, VolatilityLevel,
    VolatilityReading,
};
use super::backend_proxy::{backend_error_message, lenient_number};
use super::traits::{AnnotationSource, ChartAnalyst};

const PROVIDER: &str = "Technical analysis";

/// Used when an upload's format can't be recognized; the backend assumes
/// the same.
const FALLBACK_MIME: &str = "image/jpeg";

/// Client for the backend's chart endpoints (both multipart):
///
/// - `POST /api/technical-analysis`: `mode`, `draw_lines`,
///   `include_entry_exit` and one file per chart; answers with a
///   sentiment/volatility reading.
/// - `POST /api/technical-analysis/draw`: `chart` file and an optional
///   `existing_analysis` text field; answers with annotations.
pub struct TechnicalAnalysisClient {
    client: Client,
    base_url: String,
}

impl TechnicalAnalysisClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs));
        #[cfg(target_arch = "wasm32")]
        let _ = timeout_secs;
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post_form(&self, path: &str, form: Form) -> Result<String, CoreError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.client.post(&url).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: backend_error_message(status.as_u16(), &body),
            });
        }
        Ok(body)
    }
}

/// MIME type of a chart image, sniffed from its magic bytes.
pub fn chart_mime_type(image: &[u8]) -> &'static str {
    image::guess_format(image)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}

/// Multipart file part for a chart, labelled with its real MIME type.
pub fn chart_part(image: Vec<u8>, file_name: &str) -> Result<Part, CoreError> {
    let mime = chart_mime_type(&image);
    Ok(Part::bytes(image)
        .file_name(file_name.to_string())
        .mime_str(mime)?)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AnnotationSource for TechnicalAnalysisClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn request_annotations(
        &self,
        image: Vec<u8>,
        file_name: &str,
        existing_analysis: Option<&str>,
    ) -> Result<AnnotationSet, CoreError> {
        let mut form = Form::new().part("chart", chart_part(image, file_name)?);
        if let Some(text) = existing_analysis.filter(|t| !t.trim().is_empty()) {
            form = form.text("existing_analysis", text.to_string());
        }

        tracing::info!(file_name, "requesting chart annotations");
        let body = self.post_form("/api/technical-analysis/draw", form).await?;
        parse_draw_response(&body)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ChartAnalyst for TechnicalAnalysisClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn analyse_chart(
        &self,
        request: &ChartAnalysisRequest,
    ) -> Result<ChartAnalysis, CoreError> {
        request.validate()?;
        let mut form = Form::new()
            .text("mode", request.mode())
            .text("draw_lines", request.draw_lines.to_string())
            .text("include_entry_exit", request.include_entry_exit.to_string());
        for (field, chart) in request.parts() {
            form = form.part(field, chart_part(chart.bytes.clone(), &chart.file_name)?);
        }

        tracing::info!(
            mode = request.mode(),
            charts = request.parts().len(),
            "requesting chart analysis"
        );
        let body = self.post_form("/api/technical-analysis", form).await?;
        parse_analysis_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct DrawResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    annotations: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Parse `{"success": true, "annotations": [...]}`.
///
/// `success: false` is an error carrying the backend's message. An
/// `annotations` field that isn't a list is treated as no annotations.
pub fn parse_draw_response(body: &str) -> Result<AnnotationSet, CoreError> {
    let resp: DrawResponse = serde_json::from_str(body)?;
    if !resp.success {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: resp.error.unwrap_or_else(|| "Line drawing failed".into()),
        });
    }

    match resp.annotations {
        value @ serde_json::Value::Array(_) => AnnotationSet::from_value(value),
        serde_json::Value::Null => Ok(AnnotationSet::default()),
        _ => {
            tracing::warn!("annotations field is not a list, treating as empty");
            Ok(AnnotationSet::default())
        }
    }
}

// ── Chart analysis response ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    analysis: Option<RawAnalysis>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    sentiment: Option<RawReading>,
    #[serde(default)]
    volatility: Option<RawReading>,
    #[serde(default)]
    insights: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    trading_opportunity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawReading {
    #[serde(default, alias = "level")]
    verdict: Option<String>,
    #[serde(default)]
    strength: Option<serde_json::Value>,
}

impl RawReading {
    fn strength(&self) -> f64 {
        self.strength
            .as_ref()
            .and_then(lenient_number)
            .unwrap_or(50.0)
            .clamp(0.0, 100.0)
    }
}

/// Parse `{"success": true, "analysis": {...}}`.
///
/// Missing parts of the analysis take the backend's own defaults (neutral,
/// medium volatility, strength 50). Insights that aren't strings are
/// dropped.
pub fn parse_analysis_response(body: &str) -> Result<ChartAnalysis, CoreError> {
    let resp: AnalysisResponse = serde_json::from_str(body)?;
    if !resp.success {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: resp.error.unwrap_or_else(|| "Analysis failed".into()),
        });
    }
    let raw = resp.analysis.ok_or_else(|| CoreError::Api {
        provider: PROVIDER.into(),
        message: "Analysis response had no analysis".into(),
    })?;

    let sentiment = raw.sentiment.unwrap_or_default();
    let volatility = raw.volatility.unwrap_or_default();
    Ok(ChartAnalysis {
        sentiment: SentimentReading {
            verdict: sentiment.verdict.as_deref().map_or(Verdict::Neutral, Verdict::parse),
            strength: sentiment.strength(),
        },
        volatility: VolatilityReading {
            level: volatility
                .verdict
                .as_deref()
                .map_or(VolatilityLevel::Medium, VolatilityLevel::parse),
            strength: volatility.strength(),
        },
        insights: raw
            .insights
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        trading_opportunity: raw.trading_opportunity.unwrap_or_default(),
    })
}
