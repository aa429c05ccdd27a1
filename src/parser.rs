// Parsing of the estimator's free-text reply into a carbon estimate and challenge

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::error::AppError;
use crate::models::FootprintEstimate;

lazy_static! {
    /// Reply wrapped in a Markdown code fence, e.g. ```json ... ```
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap();
    /// Leading list marker: "1.", "1)", or a keycap emoji such as "1️⃣"
    static ref LIST_MARKER: Regex =
        Regex::new(r"^\d+\s*(?:\x{FE0F}?\x{20E3}|[.)]\s)\s*").unwrap();
    /// First decimal number not glued to a preceding word ("CO2" is skipped).
    /// A leading `-` or `−` sign belongs to the number.
    static ref NUMBER: Regex = Regex::new(
        r"(?:^|[^\w.])([-\x{2212}]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?)"
    )
    .unwrap();
}

/// Parse an estimator reply.
///
/// A JSON object `{"carbon": .., "challenge": ..}` is accepted first. Any
/// other text goes through the two-line layout: the first non-blank line
/// carries the number, the second is the challenge.
pub fn parse_reply(reply: &str) -> Result<FootprintEstimate, AppError> {
    let trimmed = reply.trim();
    let unfenced = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(unfenced) {
        return parse_json_fields(&fields);
    }

    parse_lines(trimmed)
}

fn parse_json_fields(fields: &serde_json::Map<String, Value>) -> Result<FootprintEstimate, AppError> {
    let carbon = match fields.get("carbon") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => extract_number(s),
        _ => None,
    }
    .filter(|c| c.is_finite())
    .ok_or_else(|| AppError::MalformedResponse("JSON reply has no numeric `carbon`".to_string()))?;

    let challenge = fields
        .get("challenge")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::MalformedResponse("JSON reply has no `challenge`".to_string()))?;

    Ok(FootprintEstimate {
        carbon,
        challenge: challenge.to_string(),
    })
}

fn parse_lines(reply: &str) -> Result<FootprintEstimate, AppError> {
    let mut lines = reply.lines().map(str::trim).filter(|l| !l.is_empty());

    let (first, second) = match (lines.next(), lines.next()) {
        (Some(first), Some(second)) => (first, second),
        _ => {
            return Err(AppError::MalformedResponse(format!(
                "expected at least two lines, got: {:?}",
                reply
            )))
        }
    };

    let carbon = extract_number(first).ok_or_else(|| {
        AppError::MalformedResponse(format!("no carbon value on first line: {:?}", first))
    })?;

    Ok(FootprintEstimate {
        carbon,
        challenge: second.to_string(),
    })
}

/// First number on a line, ignoring a leading list marker. Decimals are kept.
fn extract_number(line: &str) -> Option<f64> {
    let body = LIST_MARKER.replace(line.trim(), "");
    NUMBER
        .captures(&body)
        .and_then(|c| c.get(1))
        .and_then(|m| {
            m.as_str()
                .replace(',', "")
                .replace('\u{2212}', "-")
                .parse::<f64>()
                .ok()
        })
        .filter(|n| n.is_finite())
}
