use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bmi::calculate_bmi;
use crate::models::{WeightEntry, WeightUnit};
use crate::units::kg_to_display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Progress,
    Motivation,
    Recommendation,
    Achievement,
}

impl InsightKind {
    /// Lenient parse; anything unrecognized is treated as motivation.
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::to_lowercase).as_deref() {
            Some("progress") => InsightKind::Progress,
            Some("recommendation") => InsightKind::Recommendation,
            Some("achievement") => InsightKind::Achievement,
            _ => InsightKind::Motivation,
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            InsightKind::Progress => "📈",
            InsightKind::Motivation => "💪",
            InsightKind::Recommendation => "💡",
            InsightKind::Achievement => "🏆",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: InsightKind,
    pub icon: String,
    pub timestamp: DateTime<Utc>,
}

// --- Wire types for the generative-text endpoint ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateRequest {
    #[must_use]
    pub fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .parts
            .first()
            .map(|p| p.text.as_str())
    }
}

/// Something that can turn a prompt into generated text.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
}

// --- Prompt ---

fn unit_of(entry: &WeightEntry) -> WeightUnit {
    entry.units.unwrap_or_default()
}

/// Summarize `entries` for the model. `None` when there is nothing to summarize.
#[must_use]
pub fn build_prompt(entries: &[WeightEntry], height_cm: Option<f64>) -> Option<String> {
    let mut sorted: Vec<&WeightEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.date);
    let first = *sorted.first()?;
    let last = *sorted.last()?;

    let first_unit = unit_of(first);
    let last_unit = unit_of(last);
    let first_weight = kg_to_display(first.weight_kg, first_unit);
    let last_weight = kg_to_display(last.weight_kg, last_unit);
    let change = last_weight - kg_to_display(first.weight_kg, last_unit);
    let days = (last.date - first.date).num_days();
    #[allow(clippy::cast_precision_loss)]
    let per_week = entries.len() as f64 / days.max(1) as f64 * 7.0;

    let mut prompt = String::from(
        "You are a fitness coach analyzing weight tracking data. \
         Generate 3 personalized insights based on this data:\n\nWeight Data:\n",
    );
    let _ = writeln!(prompt, "- Total entries: {}", entries.len());
    let _ = writeln!(prompt, "- First weight: {first_weight:.1} {first_unit}");
    let _ = writeln!(prompt, "- Latest weight: {last_weight:.1} {last_unit}");
    let sign = if change > 0.0 { "+" } else { "" };
    let _ = writeln!(prompt, "- Weight change: {sign}{change:.1} {last_unit}");
    let _ = writeln!(prompt, "- Days tracked: {days}");
    let _ = writeln!(prompt, "- Average entries per week: {per_week:.1}");
    if let Some(height_cm) = height_cm.filter(|h| *h > 0.0) {
        let bmi = calculate_bmi(last.weight_kg, height_cm);
        let _ = writeln!(prompt, "- Current BMI: {bmi:.1}");
    }

    prompt.push_str(
        r#"
Generate exactly 3 insights in this JSON format:
[
  {
    "title": "Short title (max 5 words)",
    "message": "Encouraging message (max 100 characters)",
    "type": "progress|motivation|recommendation|achievement"
  }
]

Rules:
1. Be positive and encouraging
2. Focus on progress, not perfection
3. Give actionable advice
4. Keep messages concise
5. Use emojis sparingly
6. Return ONLY valid JSON array, no other text

Example types:
- progress: Weight trends, consistency
- motivation: Encouragement, keep going
- recommendation: Health tips, suggestions
- achievement: Milestones reached"#,
    );
    Some(prompt)
}

// --- Response ---

#[derive(Deserialize)]
struct RawInsight {
    title: String,
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// The outermost `[...]` span in `text`; models often wrap JSON in prose or fences.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Insights from a model response, or `None` when the response is unusable.
#[must_use]
pub fn parse_response(response: &GenerateResponse, now: DateTime<Utc>) -> Option<Vec<Insight>> {
    let text = response.first_text()?;
    let Some(json) = extract_json_array(text) else {
        warn!("no JSON array in insight response");
        return None;
    };
    let raw: Vec<RawInsight> = match serde_json::from_str(json) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "malformed insight JSON");
            return None;
        }
    };
    if raw.is_empty() {
        return None;
    }
    let stamp = now.timestamp_millis();
    Some(
        raw.into_iter()
            .enumerate()
            .map(|(i, r)| {
                let kind = InsightKind::from_label(r.kind.as_deref());
                Insight {
                    id: format!("ai-{stamp}-{i}"),
                    title: r.title,
                    message: r.message,
                    kind,
                    icon: kind.icon().to_string(),
                    timestamp: now,
                }
            })
            .collect(),
    )
}

#[must_use]
pub fn default_insights(now: DateTime<Utc>) -> Vec<Insight> {
    let make = |id: &str, title: &str, message: &str, kind, icon: &str| Insight {
        id: id.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        kind,
        icon: icon.to_string(),
        timestamp: now,
    };
    vec![
        make(
            "default-1",
            "Start Your Journey",
            "Begin tracking your weight to get personalized insights!",
            InsightKind::Motivation,
            "🚀",
        ),
        make(
            "default-2",
            "Consistency is Key",
            "Track daily for the best results and insights.",
            InsightKind::Recommendation,
            "💡",
        ),
        make(
            "default-3",
            "You Got This",
            "Every entry brings you closer to your goals!",
            InsightKind::Motivation,
            "💪",
        ),
    ]
}

/// Ask `provider` for insights about `entries`.
///
/// Never fails: no data, a transport error or an unusable response all fall back to
/// [`default_insights`].
pub async fn generate_insights(
    provider: &dyn InsightProvider,
    entries: &[WeightEntry],
    height_cm: Option<f64>,
) -> Vec<Insight> {
    let now = Utc::now();
    let Some(prompt) = build_prompt(entries, height_cm) else {
        debug!("no entries; using default insights");
        return default_insights(now);
    };
    let request = GenerateRequest::from_prompt(prompt);
    match provider.generate(&request).await {
        Ok(response) => parse_response(&response, now).unwrap_or_else(|| default_insights(now)),
        Err(e) => {
            warn!(error = %e, "insight request failed; using defaults");
            default_insights(now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewWeightEntry;
    use anyhow::bail;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    fn entry(day: u32, kg: f64, units: Option<WeightUnit>) -> WeightEntry {
        let mut draft = NewWeightEntry::new(NaiveDate::from_ymd_opt(2026, 10, day).unwrap(), kg);
        draft.units = units;
        WeightEntry::from_draft(draft)
    }

    fn response(text: &str) -> GenerateResponse {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part {
                        text: text.to_string(),
                    }],
                },
            }],
        }
    }

    struct CannedProvider(anyhow::Result<GenerateResponse>);

    #[async_trait]
    impl InsightProvider for CannedProvider {
        async fn generate(&self, _request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            match &self.0 {
                Ok(r) => Ok(r.clone()),
                Err(e) => bail!("{e}"),
            }
        }
    }

    #[test]
    fn test_prompt_summary_lines() {
        let entries = vec![entry(15, 82.0, None), entry(1, 84.0, None), entry(8, 83.0, None)];
        let prompt = build_prompt(&entries, Some(180.0)).unwrap();
        assert!(prompt.contains("- Total entries: 3"));
        assert!(prompt.contains("- First weight: 84.0 kg"));
        assert!(prompt.contains("- Latest weight: 82.0 kg"));
        assert!(prompt.contains("- Weight change: -2.0 kg"));
        assert!(prompt.contains("- Days tracked: 14"));
        assert!(prompt.contains("- Average entries per week: 1.5"));
        assert!(prompt.contains("- Current BMI: 25.3"));
    }

    #[test]
    fn test_prompt_uses_display_units() {
        let entries = vec![entry(1, 90.0, Some(WeightUnit::Lb)), entry(2, 89.0, Some(WeightUnit::Lb))];
        let prompt = build_prompt(&entries, None).unwrap();
        assert!(prompt.contains("- First weight: 198.4 lb"));
        assert!(!prompt.contains("BMI"));
    }

    #[test]
    fn test_prompt_single_day_does_not_divide_by_zero() {
        let prompt = build_prompt(&[entry(5, 70.0, None)], None).unwrap();
        assert!(prompt.contains("- Days tracked: 0"));
        assert!(prompt.contains("- Average entries per week: 7.0"));
    }

    #[test]
    fn test_no_entries_no_prompt() {
        assert!(build_prompt(&[], None).is_none());
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest::from_prompt("hi".to_string())).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["generationConfig"]["temperature"], 0.7);
    }

    #[test]
    fn test_parse_fenced_response() {
        let text = "```json\n[{\"title\":\"Nice\",\"message\":\"Down 2kg\",\"type\":\"progress\"},\
                    {\"title\":\"Hmm\",\"message\":\"Keep going\",\"type\":\"whatever\"}]\n```";
        let insights = parse_response(&response(text), now()).unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::Progress);
        assert_eq!(insights[0].icon, "📈");
        assert_eq!(insights[1].kind, InsightKind::Motivation);
        assert_eq!(insights[0].id, format!("ai-{}-0", now().timestamp_millis()));
    }

    #[test]
    fn test_parse_rejects_unusable_responses() {
        assert!(parse_response(&GenerateResponse::default(), now()).is_none());
        assert!(parse_response(&response("no json here"), now()).is_none());
        assert!(parse_response(&response("[not json]"), now()).is_none());
        assert!(parse_response(&response("[]"), now()).is_none());
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_error() {
        let provider = CannedProvider(Err(anyhow::anyhow!("timeout")));
        let insights = generate_insights(&provider, &[entry(1, 80.0, None)], None).await;
        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].id, "default-1");
    }

    #[tokio::test]
    async fn test_generate_without_entries_skips_provider() {
        let provider = CannedProvider(Ok(response("[{\"title\":\"x\",\"message\":\"y\"}]")));
        let insights = generate_insights(&provider, &[], None).await;
        assert_eq!(insights[2].title, "You Got This");
    }

    #[tokio::test]
    async fn test_generate_success() {
        let provider = CannedProvider(Ok(response(
            "[{\"title\":\"Streak\",\"message\":\"7 days\",\"type\":\"achievement\"}]",
        )));
        let insights = generate_insights(&provider, &[entry(1, 80.0, None)], Some(180.0)).await;
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Achievement);
        assert_eq!(insights[0].icon, "🏆");
    }
}
