use serde_json::{Map, Value, json};

use crate::config::CoercionPolicy;
use crate::error::{EngineError, EngineResult};
use crate::models::Lap;

/// A practice session as submitted by a client, after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInput {
    pub problem_rating: f64,
    pub total_time: f64,
    pub laps: Vec<Lap>,
    pub comments: Option<String>,
}

impl SessionInput {
    /// Parses a submission body:
    /// `{ problemRating, totalTime, laps: [{name, durationSeconds, comment?}], comments? }`.
    ///
    /// `problemRating`, `totalTime` and `laps` must be present. Numbers may be sent as
    /// strings; negative numbers become 0. What happens to numbers that don't parse is
    /// up to `policy`.
    pub fn from_json(body: &Value, policy: CoercionPolicy) -> EngineResult<SessionInput> {
        let body = body
            .as_object()
            .ok_or_else(|| EngineError::Validation(String::from("expected a JSON object")))?;

        let problem_rating = number(required(body, "problemRating")?, "problemRating", policy)?;
        let total_time = number(required(body, "totalTime")?, "totalTime", policy)?;

        let laps = required(body, "laps")?
            .as_array()
            .ok_or_else(|| EngineError::Validation(String::from("laps must be a list")))?
            .iter()
            .enumerate()
            .map(|(index, lap)| parse_lap(index, lap, policy))
            .collect::<EngineResult<Vec<Lap>>>()?;

        let comments = optional_text(body.get("comments"));

        Ok(SessionInput { problem_rating, total_time, laps, comments })
    }

    /// Parses the chat shorthand `<rating> <seconds> [name:seconds[:comment] ...]`.
    pub fn from_args(args: &[&str], policy: CoercionPolicy) -> EngineResult<SessionInput> {
        let [rating, seconds, lap_args @ ..] = args else {
            return Err(EngineError::Validation(String::from(
                "expected `<rating> <seconds> [lap:seconds[:comment] ...]`",
            )));
        };

        let laps = lap_args
            .iter()
            .map(|lap| {
                let mut parts = lap.splitn(3, ':');
                let name = parts.next().unwrap_or_default();
                let duration = parts.next().unwrap_or_default();
                match parts.next() {
                    Some(comment) => json!({ "name": name, "durationSeconds": duration, "comment": comment }),
                    None => json!({ "name": name, "durationSeconds": duration }),
                }
            })
            .collect::<Vec<Value>>();

        let body = json!({ "problemRating": rating, "totalTime": seconds, "laps": laps });
        Self::from_json(&body, policy)
    }
}

fn required<'a>(body: &'a Map<String, Value>, field: &str) -> EngineResult<&'a Value> {
    match body.get(field) {
        None | Some(Value::Null) => Err(EngineError::Validation(format!("{field} is required"))),
        Some(value) => Ok(value),
    }
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}

/// Reads a non-negative number from a JSON number or numeric string.
fn number(value: &Value, field: &str, policy: CoercionPolicy) -> EngineResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite());

    match (parsed, policy) {
        (Some(n), _) => Ok(n.max(0.0)),
        (None, CoercionPolicy::Lenient) => {
            log::warn!("[number] Could not parse {field} from {value}, using 0.");
            Ok(0.0)
        }
        (None, CoercionPolicy::Strict) => {
            Err(EngineError::Validation(format!("{field} must be a number, got {value}")))
        }
    }
}

fn parse_lap(index: usize, lap: &Value, policy: CoercionPolicy) -> EngineResult<Lap> {
    let lap = lap
        .as_object()
        .ok_or_else(|| EngineError::Validation(format!("lap {} must be an object", index + 1)))?;

    let name = optional_text(lap.get("name"))
        .ok_or_else(|| EngineError::Validation(format!("lap {} needs a name", index + 1)))?;

    let duration_seconds = match lap.get("durationSeconds") {
        None | Some(Value::Null) => 0.0,
        Some(value) => number(value, "durationSeconds", policy)?,
    };

    Ok(Lap { name, duration_seconds, comment: optional_text(lap.get("comment")) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_body() {
        let body = json!({
            "problemRating": 1500,
            "totalTime": 2000,
            "laps": [
                { "name": "read", "durationSeconds": 300 },
                { "name": "code", "durationSeconds": 1700, "comment": "off by one" },
            ],
            "comments": "two pointers",
        });

        let input = SessionInput::from_json(&body, CoercionPolicy::Lenient).unwrap();
        assert_eq!(input.problem_rating, 1500.0);
        assert_eq!(input.total_time, 2000.0);
        assert_eq!(input.laps.len(), 2);
        assert_eq!(input.laps[1].comment.as_deref(), Some("off by one"));
        assert_eq!(input.comments.as_deref(), Some("two pointers"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        for field in ["problemRating", "totalTime", "laps"] {
            let mut body = json!({ "problemRating": 800, "totalTime": 60, "laps": [] });
            body.as_object_mut().unwrap().remove(field);
            let err = SessionInput::from_json(&body, CoercionPolicy::Lenient).unwrap_err();
            assert!(matches!(err, EngineError::Validation(ref msg) if msg.contains(field)));
        }

        let body = json!({ "problemRating": null, "totalTime": 60, "laps": [] });
        assert!(SessionInput::from_json(&body, CoercionPolicy::Lenient).is_err());
    }

    #[test]
    fn zero_rating_is_allowed() {
        let body = json!({ "problemRating": 0, "totalTime": 0, "laps": [] });
        let input = SessionInput::from_json(&body, CoercionPolicy::Strict).unwrap();
        assert_eq!(input.problem_rating, 0.0);
    }

    #[test]
    fn lenient_policy_coerces_garbage_to_zero() {
        let body = json!({ "problemRating": "hard", "totalTime": "12.5", "laps": [] });
        let input = SessionInput::from_json(&body, CoercionPolicy::Lenient).unwrap();
        assert_eq!(input.problem_rating, 0.0);
        assert_eq!(input.total_time, 12.5);
    }

    #[test]
    fn strict_policy_rejects_garbage() {
        let body = json!({ "problemRating": "hard", "totalTime": 10, "laps": [] });
        let err = SessionInput::from_json(&body, CoercionPolicy::Strict).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn negatives_clamp_to_zero() {
        let body = json!({ "problemRating": -5, "totalTime": -1, "laps": [] });
        let input = SessionInput::from_json(&body, CoercionPolicy::Strict).unwrap();
        assert_eq!((input.problem_rating, input.total_time), (0.0, 0.0));
    }

    #[test]
    fn laps_need_names() {
        let body = json!({ "problemRating": 800, "totalTime": 60, "laps": [{ "durationSeconds": 5 }] });
        assert!(SessionInput::from_json(&body, CoercionPolicy::Lenient).is_err());

        let body = json!({ "problemRating": 800, "totalTime": 60, "laps": "fast" });
        assert!(SessionInput::from_json(&body, CoercionPolicy::Lenient).is_err());
    }

    #[test]
    fn chat_shorthand() {
        let input = SessionInput::from_args(
            &["1500", "2000", "read:300", "code:1700:dp table was wrong"],
            CoercionPolicy::Strict,
        )
        .unwrap();

        assert_eq!(input.problem_rating, 1500.0);
        assert_eq!(input.laps[0], Lap { name: "read".into(), duration_seconds: 300.0, comment: None });
        assert_eq!(input.laps[1].comment.as_deref(), Some("dp table was wrong"));

        assert!(SessionInput::from_args(&["1500"], CoercionPolicy::Lenient).is_err());
    }
}
