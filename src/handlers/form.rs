//! HTML form handlers
//!
//! Single page: one Type selector, five numeric inputs, a Predict button and
//! a result area. Rendered server-side, no scripts.

use std::collections::HashMap;

use axum::{extract::State, response::Html, Form};
use validator::Validate;

use crate::AppState;
use crate::error::AppError;
use crate::logic::features::FeatureRecord;
use crate::logic::model::{ClassProbabilities, ClassificationResult};
use crate::models::PredictRequest;

const PRODUCT_TYPES: &[&str] = &["L", "M", "H"];

/// What the result area shows
pub enum Outcome {
    Result(ClassificationResult),
    Error(String),
}

/// Empty form with default values
pub async fn index() -> Html<String> {
    Html(render_page(&FeatureRecord::default(), None))
}

/// Form submit: classify and re-render with the result.
///
/// Fields are parsed here rather than by a typed extractor, so a malformed
/// number still renders the page with an error in the result area.
pub async fn submit(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Html<String> {
    let values = form_values(&fields);

    let outcome = match parse_request(&fields) {
        Err(msg) => Outcome::Error(msg),
        Ok(req) => match req.validate() {
            Err(e) => Outcome::Error(AppError::from(e).message().to_string()),
            Ok(()) => {
                let record: FeatureRecord = req.into();
                match state.pipeline.classify(&record) {
                    Ok(result) => Outcome::Result(result),
                    Err(e) => Outcome::Error(e.to_string()),
                }
            }
        },
    };

    Html(render_page(&values, Some(&outcome)))
}

fn parse_number(fields: &HashMap<String, String>, name: &str) -> Result<f64, String> {
    let raw = fields.get(name).map(|v| v.trim()).unwrap_or("");
    raw.parse::<f64>()
        .map_err(|_| format!("{} must be a number, got {:?}", name, raw))
}

fn parse_request(fields: &HashMap<String, String>) -> Result<PredictRequest, String> {
    Ok(PredictRequest {
        product_type: fields.get("type").cloned().unwrap_or_default(),
        air_temperature_k: parse_number(fields, "air_temperature_k")?,
        process_temperature_k: parse_number(fields, "process_temperature_k")?,
        rotational_speed_rpm: parse_number(fields, "rotational_speed_rpm")?,
        torque_nm: parse_number(fields, "torque_nm")?,
        tool_wear_min: parse_number(fields, "tool_wear_min")?,
    })
}

/// Submitted values for re-rendering; fields that do not parse keep the default
fn form_values(fields: &HashMap<String, String>) -> FeatureRecord {
    let mut values = FeatureRecord::default();
    if let Some(t) = fields.get("type") {
        values.product_type = t.clone();
    }

    let numbers = [
        ("air_temperature_k", &mut values.air_temperature_k),
        ("process_temperature_k", &mut values.process_temperature_k),
        ("rotational_speed_rpm", &mut values.rotational_speed_rpm),
        ("torque_nm", &mut values.torque_nm),
        ("tool_wear_min", &mut values.tool_wear_min),
    ];
    for (name, slot) in numbers {
        if let Ok(v) = parse_number(fields, name) {
            *slot = v;
        }
    }
    values
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn number_input(name: &str, label: &str, value: f64, step: &str) -> String {
    format!(
        r#"<label for="{name}">{label}</label>
      <input type="number" id="{name}" name="{name}" value="{value}" step="{step}" required>"#
    )
}

fn probability_table(probs: &ClassProbabilities) -> String {
    let rows: String = probs
        .entries()
        .iter()
        .map(|e| {
            format!(
                "<tr><td>{}</td><td>{:.3}</td></tr>",
                escape(&e.label.to_string()),
                e.probability
            )
        })
        .collect();

    format!(
        r#"<table class="proba"><thead><tr><th>Class</th><th>Probability</th></tr></thead><tbody>{}</tbody></table>"#,
        rows
    )
}

fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Result(result @ ClassificationResult::Anomaly) => {
            format!(r#"<div class="result warning">⚠️ {}</div>"#, escape(&result.message()))
        }
        Outcome::Result(result @ ClassificationResult::Normal) => {
            format!(r#"<div class="result success">✅ {}</div>"#, escape(&result.message()))
        }
        Outcome::Result(result @ ClassificationResult::Failure { .. }) => {
            let table = result
                .probabilities()
                .map(probability_table)
                .unwrap_or_default();
            format!(
                r#"<div class="result failure">❌ {}</div>{}"#,
                escape(&result.message()),
                table
            )
        }
        Outcome::Error(msg) => format!(
            r#"<div class="result error">Prediction failed: {}</div>"#,
            escape(msg)
        ),
    }
}

/// Whole page, with the form pre-filled from `values`
pub fn render_page(values: &FeatureRecord, outcome: Option<&Outcome>) -> String {
    let options: String = PRODUCT_TYPES
        .iter()
        .map(|t| {
            let selected = if *t == values.product_type { " selected" } else { "" };
            format!(r#"<option value="{t}"{selected}>{t}</option>"#)
        })
        .collect();

    let fields = [
        number_input("air_temperature_k", "Air temperature [K]", values.air_temperature_k, "0.1"),
        number_input("process_temperature_k", "Process temperature [K]", values.process_temperature_k, "0.1"),
        number_input("rotational_speed_rpm", "Rotational speed [rpm]", values.rotational_speed_rpm, "1"),
        number_input("torque_nm", "Torque [Nm]", values.torque_nm, "0.1"),
        number_input("tool_wear_min", "Tool wear [min]", values.tool_wear_min, "1"),
    ]
    .join("\n      ");

    let result = outcome.map(render_outcome).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Predictive Maintenance</title>
  <style>
    body {{ font-family: sans-serif; max-width: 640px; margin: 2rem auto; }}
    label {{ display: block; margin-top: .75rem; }}
    input, select {{ width: 100%; padding: .3rem; }}
    button {{ margin-top: 1rem; padding: .5rem 1.5rem; }}
    .result {{ margin-top: 1.5rem; padding: .75rem; border-radius: 4px; }}
    .warning {{ background: #fef3c7; }}
    .success {{ background: #d1fae5; }}
    .failure, .error {{ background: #fee2e2; }}
    .proba {{ margin-top: .75rem; border-collapse: collapse; }}
    .proba td, .proba th {{ border: 1px solid #ccc; padding: .25rem .75rem; }}
  </style>
</head>
<body>
  <h1>🚀 Predictive Maintenance</h1>
  <p>Enter machine sensor data to detect <b>Normal</b>, <b>Failure</b> or <b>Unknown / Anomaly</b>.</p>
  <form method="post" action="/predict">
      <label for="type">Product Type</label>
      <select id="type" name="type">{options}</select>
      {fields}
      <button type="submit">Predict</button>
  </form>
  {result}
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::labels::FailureLabel;

    #[test]
    fn test_default_form() {
        let page = render_page(&FeatureRecord::default(), None);
        assert!(page.contains(r#"<option value="L" selected>L</option>"#));
        assert!(page.contains(r#"name="air_temperature_k" value="300""#));
        assert!(page.contains(r#"name="rotational_speed_rpm" value="1500""#));
        assert!(!page.contains("class=\"result"));
    }

    #[test]
    fn test_index_handler() {
        let Html(page) = tokio_test::block_on(index());
        assert!(page.contains(r#"<form method="post" action="/predict">"#));
        assert!(page.contains(r#"name="tool_wear_min" value="100""#));
    }

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_request_rejects_empty_number() {
        let submitted = fields(&[
            ("type", "M"),
            ("air_temperature_k", "301.5"),
            ("process_temperature_k", "311"),
            ("rotational_speed_rpm", "1400"),
            ("torque_nm", ""),
            ("tool_wear_min", "20"),
        ]);
        let err = parse_request(&submitted).unwrap_err();
        assert!(err.contains("torque_nm"));

        // Parsable fields survive for the re-render
        let values = form_values(&submitted);
        assert_eq!(values.product_type, "M");
        assert_eq!(values.air_temperature_k, 301.5);
        assert_eq!(values.torque_nm, FeatureRecord::default().torque_nm);
    }

    #[test]
    fn test_failure_with_probability_table() {
        let probs = ClassProbabilities::from_model(&[0, 1, 4], &[0.1, 0.2345, 0.6655]).unwrap();
        let outcome = Outcome::Result(ClassificationResult::Failure {
            label: FailureLabel::OverstrainFailure,
            probabilities: Some(probs),
        });
        let html = render_outcome(&outcome);
        assert!(html.contains("Overstrain Failure (OSF)"));
        assert!(html.contains("<td>0.665</td>") || html.contains("<td>0.666</td>"));
        assert!(html.contains("<td>0.000</td>"));
        assert_eq!(html.matches("<tr><td>").count(), 6);
    }

    #[test]
    fn test_anomaly_and_normal() {
        let html = render_outcome(&Outcome::Result(ClassificationResult::Anomaly));
        assert!(html.contains("warning"));
        let html = render_outcome(&Outcome::Result(ClassificationResult::Normal));
        assert!(html.contains("success"));
    }

    #[test]
    fn test_error_is_escaped() {
        let html = render_outcome(&Outcome::Error("unseen category for Type: \"<x>\"".into()));
        assert!(html.contains("Prediction failed"));
        assert!(html.contains("&lt;x&gt;"));
        assert!(!html.contains("<x>"));
    }
}
