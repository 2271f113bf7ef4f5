use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ── Request ─────────────────────────────────────────────────────────

/// An uploaded chart image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl ChartImage {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
        }
    }
}

/// Chart timeframes accepted in advanced mode, in upload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Weekly,
    Daily,
    FourHour,
    OneHour,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Weekly,
        Timeframe::Daily,
        Timeframe::FourHour,
        Timeframe::OneHour,
    ];

    /// Multipart field the backend reads this timeframe's chart from.
    pub fn field_name(self) -> &'static str {
        match self {
            Timeframe::Weekly => "weekly_chart",
            Timeframe::Daily => "daily_chart",
            Timeframe::FourHour => "four_hour_chart",
            Timeframe::OneHour => "one_hour_chart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartUpload {
    /// One chart, sent as `chart`
    Simple(ChartImage),
    /// Up to one chart per timeframe
    Advanced(Vec<(Timeframe, ChartImage)>),
}

/// What to send to the chart analysis endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartAnalysisRequest {
    pub upload: ChartUpload,
    pub draw_lines: bool,
    pub include_entry_exit: bool,
}

impl ChartAnalysisRequest {
    pub fn simple(chart: ChartImage) -> Self {
        Self {
            upload: ChartUpload::Simple(chart),
            draw_lines: true,
            include_entry_exit: true,
        }
    }

    /// Multi-timeframe request. Charts are sorted weekly → one hour; a
    /// timeframe given twice keeps the last chart.
    pub fn advanced(charts: impl IntoIterator<Item = (Timeframe, ChartImage)>) -> Self {
        let mut by_frame: Vec<(Timeframe, ChartImage)> = Vec::new();
        for (frame, chart) in charts {
            by_frame.retain(|(f, _)| *f != frame);
            by_frame.push((frame, chart));
        }
        by_frame.sort_by_key(|(f, _)| *f);
        Self {
            upload: ChartUpload::Advanced(by_frame),
            draw_lines: true,
            include_entry_exit: true,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self.upload {
            ChartUpload::Simple(_) => "simple",
            ChartUpload::Advanced(_) => "advanced",
        }
    }

    /// `(field name, chart)` pairs in upload order.
    pub fn parts(&self) -> Vec<(&'static str, &ChartImage)> {
        match &self.upload {
            ChartUpload::Simple(chart) => vec![("chart", chart)],
            ChartUpload::Advanced(charts) => charts
                .iter()
                .map(|(frame, chart)| (frame.field_name(), chart))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let parts = self.parts();
        if parts.is_empty() {
            return Err(CoreError::ValidationError("No chart images provided".into()));
        }
        if let Some((field, _)) = parts.iter().find(|(_, c)| c.bytes.is_empty()) {
            return Err(CoreError::ValidationError(format!(
                "Chart image for {field} is empty"
            )));
        }
        Ok(())
    }
}

// ── Result ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Bullish,
    Bearish,
    Neutral,
}

impl Verdict {
    /// Case-insensitive; anything unrecognized reads as neutral.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "bullish" => Verdict::Bullish,
            "bearish" => Verdict::Bearish,
            _ => Verdict::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
}

impl VolatilityLevel {
    /// Case-insensitive; anything unrecognized reads as medium.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => VolatilityLevel::Low,
            "high" => VolatilityLevel::High,
            _ => VolatilityLevel::Medium,
        }
    }

    /// Where the indicator sits along the volatility meter, in percent.
    pub fn meter_position(self) -> f64 {
        match self {
            VolatilityLevel::Low => 25.0,
            VolatilityLevel::Medium => 50.0,
            VolatilityLevel::High => 75.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub verdict: Verdict,
    /// 0–100
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReading {
    pub level: VolatilityLevel,
    /// 0–100
    pub strength: f64,
}

/// Reading of a chart by the analysis backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartAnalysis {
    pub sentiment: SentimentReading,
    pub volatility: VolatilityReading,
    pub insights: Vec<String>,

    /// HTML fragment describing trade ideas; may be empty
    pub trading_opportunity: String,
}
