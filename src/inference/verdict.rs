//! Label and confidence extraction.
//!
//! The remote payload is opaque to the classifier. For the detection log we
//! still try to pull out a label and a confidence score, recognising the
//! shapes the deepfake Space and stock Gradio components produce. Anything
//! unrecognised simply yields an empty [`Verdict`].

use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub label: Option<String>,
    pub confidence: Option<f64>,
}

impl Verdict {
    pub fn from_payload(payload: &Value) -> Self {
        match payload {
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(decoded @ Value::Object(_)) => Self::from_payload(&decoded),
                _ => Self {
                    label: Some(s.clone()),
                    confidence: None,
                },
            },
            Value::Object(map) => from_object(map),
            _ => Self::default(),
        }
    }

    pub fn is_fake(&self) -> bool {
        self.label
            .as_deref()
            .is_some_and(|l| l.to_lowercase().contains("fake"))
    }
}

fn from_object(map: &Map<String, Value>) -> Verdict {
    // {"Prediction": "Fake", "Real Confidence": 0.1, "Fake Confidence": 0.9}
    if let Some(label) = map.get("Prediction").and_then(Value::as_str) {
        let key = if label.to_lowercase().contains("fake") {
            "Fake Confidence"
        } else {
            "Real Confidence"
        };
        return Verdict {
            label: Some(label.to_string()),
            confidence: map.get(key).and_then(Value::as_f64),
        };
    }

    if let Some(label) = map.get("label").and_then(Value::as_str) {
        // gr.Label output: {"label": "Fake", "confidences": [{"label": "Fake", "confidence": 0.9}]}
        let confidence = map.get("confidence").and_then(Value::as_f64).or_else(|| {
            map.get("confidences")
                .and_then(Value::as_array)?
                .iter()
                .find(|c| c.get("label").and_then(Value::as_str) == Some(label))?
                .get("confidence")
                .and_then(Value::as_f64)
        });
        return Verdict {
            label: Some(label.to_string()),
            confidence,
        };
    }

    let score = |needle: &str| {
        map.iter()
            .find(|(k, v)| k.to_lowercase().contains(needle) && v.is_number())
            .and_then(|(_, v)| v.as_f64())
    };
    match (score("fake"), score("real")) {
        (None, None) => Verdict::default(),
        (fake, real) => {
            let fake = fake.unwrap_or(0.0);
            let real = real.unwrap_or(0.0);
            if fake > real {
                Verdict {
                    label: Some("Fake".to_string()),
                    confidence: Some(fake),
                }
            } else {
                Verdict {
                    label: Some("Real".to_string()),
                    confidence: Some(real),
                }
            }
        }
    }
}
