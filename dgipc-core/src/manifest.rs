//! Manifest model and validator (spec §3, §4.3).
//!
//! A [`Manifest`] describes request argument schemas and response shapes,
//! including validation constraints (length/range/pattern/enum). Two wire
//! shapes are accepted and canonicalized into one internal representation
//! at parse time (spec §9 Open Question, resolved in `DESIGN.md`):
//!
//! - **models-only**: `models: { <name>: { properties, required } }`.
//! - **legacy channels**: `channels: { <channel>: { requests: { <name>: {
//!   args, response } } } }`.

use std::collections::HashMap;
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Manifest schema
// ============================================================================

/// The declarative schema describing request arguments and response shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest schema version, non-empty.
    pub version: String,

    /// Model name → object schema. Always present, even when the manifest
    /// was authored in the legacy `channels` shape — canonicalization
    /// populates this map from `channels` if `models` is absent.
    #[serde(default)]
    pub models: HashMap<String, ModelSpec>,

    /// Legacy layout: channel → request name → request spec. Optional;
    /// implementations must accept manifests describing only `models`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<HashMap<String, ChannelSpec>>,
}

/// A named channel's set of request specs (legacy layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Request name → request spec.
    #[serde(default)]
    pub requests: HashMap<String, RequestSpec>,
}

/// A single request's argument and response schema (legacy layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Argument schema, shaped like a [`ModelSpec`].
    #[serde(default)]
    pub args: ModelSpec,

    /// Response schema, if this request's replies are validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSpec>,
}

/// An object schema: named properties plus which of them are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Field name → argument spec.
    #[serde(default)]
    pub properties: HashMap<String, ArgumentSpec>,

    /// Names of properties that must be present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// A response schema: an object schema with `properties` (spec §3).
pub type ResponseSpec = ModelSpec;

/// JSON type tags an argument may take (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    /// JSON string.
    String,
    /// JSON number (int or float).
    Number,
    /// JSON number with zero fractional part.
    Integer,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

/// The schema for a single argument or property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Expected JSON type.
    #[serde(rename = "type")]
    pub arg_type: ArgType,

    /// Whether this field is required within its parent object. Honored in
    /// addition to the parent [`ModelSpec::required`] list — a field missing
    /// from the list but marked `required: true` here is still mandatory.
    #[serde(default)]
    pub required: bool,

    /// Human-readable description, not used for validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Length/range/pattern/enum constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConstraints>,

    /// Element schema, meaningful only when `arg_type == Array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ArgumentSpec>>,

    /// Nested object schema, meaningful only when `arg_type == Object`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, ArgumentSpec>>,

    /// Which of `properties` are required, meaningful only when
    /// `arg_type == Object`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_required: Option<Vec<String>>,
}

/// Length/range/pattern/enum constraints on an [`ArgumentSpec`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConstraints {
    /// Inclusive minimum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Inclusive maximum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Anchored regex the string must fully match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Inclusive minimum numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive maximum numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Value must be deep-equal to one of these constants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#enum: Option<Vec<Value>>,
}

// ============================================================================
// Validation report
// ============================================================================

/// A single validation failure, carrying a dotted/indexed field path
/// (spec §4.3, e.g. `"items[2].name"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted/indexed path to the offending field.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The result of validating request args or a response payload (spec §4.3).
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// `true` iff `errors` is empty.
    pub valid: bool,
    /// All field-level failures, collected rather than fail-fast.
    pub errors: Vec<ValidationError>,
    /// Count of leaf fields checked (used for the performance floor in
    /// spec §4.3).
    pub fields_validated: usize,
    /// Wall-clock time the validation pass took.
    pub validation_time: std::time::Duration,
}

impl ValidationReport {
    fn ok(fields_validated: usize, validation_time: std::time::Duration) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_validated,
            validation_time,
        }
    }

    fn failed(
        errors: Vec<ValidationError>,
        fields_validated: usize,
        validation_time: std::time::Duration,
    ) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            fields_validated,
            validation_time,
        }
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Validates request arguments and response payloads against a [`Manifest`].
///
/// Regex patterns are compiled once, at construction time, and cached for
/// the validator's lifetime rather than recompiled on every call.
pub struct ManifestValidator {
    manifest: Manifest,
    patterns: HashMap<String, Regex>,
}

impl ManifestValidator {
    /// Builds a validator from a manifest, canonicalizing the legacy
    /// `channels` layout into `models` if present, and precompiling every
    /// `pattern` constraint found in the schema.
    ///
    /// # Errors
    ///
    /// Returns an error string naming the field whose `pattern` failed to
    /// compile as a regex.
    pub fn new(mut manifest: Manifest) -> Result<Self, String> {
        canonicalize(&mut manifest);
        let mut patterns = HashMap::new();
        for (name, model) in &manifest.models {
            collect_patterns(&format!("models.{name}"), model, &mut patterns)?;
        }
        Ok(Self { manifest, patterns })
    }

    /// Validates request arguments against the model or legacy
    /// channel/request pair named `request_name`.
    ///
    /// In the models-only layout `request_name` is looked up directly in
    /// `manifest.models`. In the legacy layout it is looked up as
    /// `"<channel>.<request>"` would be if channels were addressed
    /// explicitly; since `validate_request` takes a single identifier, the
    /// canonicalization step above flattens `channels.<c>.requests.<r>`
    /// into a model keyed `"<c>::<r>"` as well as a bare `<r>` alias when
    /// unambiguous (see `DESIGN.md`).
    #[must_use]
    pub fn validate_request(
        &self,
        request_name: &str,
        args: &HashMap<String, Value>,
    ) -> ValidationReport {
        let start = Instant::now();
        let Some(model) = self.manifest.models.get(request_name) else {
            return ValidationReport::failed(
                vec![ValidationError::new(
                    "request",
                    format!("request '{request_name}' not found in manifest"),
                )],
                0,
                start.elapsed(),
            );
        };

        let mut errors = Vec::new();
        let mut count = 0usize;
        validate_object(
            &format!("models.{request_name}"),
            model,
            args,
            &self.patterns,
            &mut errors,
            &mut count,
        );
        ValidationReport::failed(errors, count, start.elapsed())
    }

    /// Validates a response payload against the response schema registered
    /// for `(channel_or_model, request_name)`.
    ///
    /// When the manifest uses the legacy `channels` layout, `channel_or_model`
    /// names the channel and `request_name` the request within it. When the
    /// manifest uses the models-only layout, `request_name` is looked up
    /// directly and `channel_or_model` is checked only if `channels` is
    /// present (producing a `channelId`-scoped "not found" error otherwise).
    #[must_use]
    pub fn validate_response(
        &self,
        channel_or_model: &str,
        request_name: &str,
        payload: &Value,
    ) -> ValidationReport {
        let start = Instant::now();

        if let Some(channels) = &self.manifest.channels {
            let Some(channel) = channels.get(channel_or_model) else {
                return ValidationReport::failed(
                    vec![ValidationError::new(
                        "channelId",
                        format!("channel '{channel_or_model}' not found in manifest"),
                    )],
                    0,
                    start.elapsed(),
                );
            };
            let Some(request) = channel.requests.get(request_name) else {
                return ValidationReport::failed(
                    vec![ValidationError::new(
                        "request",
                        format!("request '{request_name}' not found in channel '{channel_or_model}'"),
                    )],
                    0,
                    start.elapsed(),
                );
            };
            let Some(response_spec) = &request.response else {
                return ValidationReport::failed(
                    vec![ValidationError::new(
                        "response",
                        "no response manifest defined for this request",
                    )],
                    0,
                    start.elapsed(),
                );
            };
            return self.validate_response_payload(
                &format!("channels.{channel_or_model}.requests.{request_name}.response"),
                response_spec,
                payload,
                start,
            );
        }

        let Some(model) = self.manifest.models.get(request_name) else {
            return ValidationReport::failed(
                vec![ValidationError::new(
                    "request",
                    format!("request '{request_name}' not found in manifest"),
                )],
                0,
                start.elapsed(),
            );
        };
        self.validate_response_payload(&format!("models.{request_name}"), model, payload, start)
    }

    fn validate_response_payload(
        &self,
        path: &str,
        model: &ModelSpec,
        payload: &Value,
        start: Instant,
    ) -> ValidationReport {
        let Some(obj) = payload.as_object() else {
            return ValidationReport::failed(
                vec![ValidationError::new(
                    path,
                    "expected response payload to be a JSON object",
                )],
                0,
                start.elapsed(),
            );
        };
        let args: HashMap<String, Value> =
            obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let mut errors = Vec::new();
        let mut count = 0usize;
        validate_object(path, model, &args, &self.patterns, &mut errors, &mut count);
        ValidationReport::failed(errors, count, start.elapsed())
    }
}

/// Folds the legacy `channels` layout into `manifest.models` so the rest of
/// the validator only ever deals with one shape. Each `channels.<c>.requests.<r>`
/// request is registered twice: as `"<c>::<r>"` (unambiguous) and, when no
/// other request shares the bare name `<r>`, as `<r>` itself — letting
/// `validate_request` accept either form.
fn canonicalize(manifest: &mut Manifest) {
    let Some(channels) = manifest.channels.clone() else {
        return;
    };

    let mut bare_name_counts: HashMap<String, usize> = HashMap::new();
    for channel in channels.values() {
        for name in channel.requests.keys() {
            *bare_name_counts.entry(name.clone()).or_insert(0) += 1;
        }
    }

    for (channel_name, channel) in &channels {
        for (request_name, request) in &channel.requests {
            let qualified = format!("{channel_name}::{request_name}");
            manifest
                .models
                .entry(qualified)
                .or_insert_with(|| request.args.clone());

            if bare_name_counts.get(request_name).copied().unwrap_or(0) == 1 {
                manifest
                    .models
                    .entry(request_name.clone())
                    .or_insert_with(|| request.args.clone());
            }
        }
    }
}

fn collect_patterns(
    path: &str,
    model: &ModelSpec,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), String> {
    for (field, spec) in &model.properties {
        collect_patterns_for_spec(&format!("{path}.{field}"), spec, patterns)?;
    }
    Ok(())
}

fn collect_patterns_for_spec(
    path: &str,
    spec: &ArgumentSpec,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), String> {
    if let Some(validation) = &spec.validation {
        if let Some(pattern) = &validation.pattern {
            let anchored = anchor_pattern(pattern);
            let regex = Regex::new(&anchored)
                .map_err(|e| format!("invalid pattern at {path}: {e}"))?;
            patterns.insert(path.to_string(), regex);
        }
    }
    if let Some(items) = &spec.items {
        collect_patterns_for_spec(&format!("{path}[]"), items, patterns)?;
    }
    if let Some(props) = &spec.properties {
        for (field, nested) in props {
            collect_patterns_for_spec(&format!("{path}.{field}"), nested, patterns)?;
        }
    }
    Ok(())
}

/// Anchors a pattern at both ends if it is not already, per spec §4.3
/// ("pattern is an anchored regex").
fn anchor_pattern(pattern: &str) -> String {
    let starts = pattern.starts_with('^');
    let ends = pattern.ends_with('$');
    match (starts, ends) {
        (true, true) => pattern.to_string(),
        (true, false) => format!("{pattern}$"),
        (false, true) => format!("^{pattern}"),
        (false, false) => format!("^{pattern}$"),
    }
}

fn validate_object(
    path: &str,
    model: &ModelSpec,
    args: &HashMap<String, Value>,
    patterns: &HashMap<String, Regex>,
    errors: &mut Vec<ValidationError>,
    count: &mut usize,
) {
    let required_by_list: std::collections::HashSet<&str> = model
        .required
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(String::as_str)
        .collect();

    for (field, spec) in &model.properties {
        let field_path = format!("{path}.{field}");
        *count += 1;
        let is_required = spec.required || required_by_list.contains(field.as_str());

        match args.get(field) {
            None => {
                if is_required {
                    errors.push(ValidationError::new(
                        &field_path,
                        "Required field is missing",
                    ));
                }
            }
            Some(value) => {
                validate_value(&field_path, spec, value, patterns, errors, count);
            }
        }
    }
}

fn validate_value(
    path: &str,
    spec: &ArgumentSpec,
    value: &Value,
    patterns: &HashMap<String, Regex>,
    errors: &mut Vec<ValidationError>,
    count: &mut usize,
) {
    if let Some(validation) = &spec.validation {
        if let Some(allowed) = &validation.r#enum {
            if !allowed.iter().any(|v| v == value) {
                errors.push(ValidationError::new(
                    path,
                    format!("value is not one of the allowed enum values: {allowed:?}"),
                ));
                return;
            }
        }
    }

    match spec.arg_type {
        ArgType::String => {
            let Some(s) = value.as_str() else {
                errors.push(ValidationError::new(path, "expected a string"));
                return;
            };
            if let Some(v) = &spec.validation {
                if let Some(min) = v.min_length {
                    if s.chars().count() < min {
                        errors.push(ValidationError::new(
                            path,
                            format!("string shorter than minimum length {min}"),
                        ));
                    }
                }
                if let Some(max) = v.max_length {
                    if s.chars().count() > max {
                        errors.push(ValidationError::new(
                            path,
                            format!("string longer than maximum length {max}"),
                        ));
                    }
                }
            }
            if let Some(regex) = patterns.get(path) {
                if !regex.is_match(s) {
                    errors.push(ValidationError::new(
                        path,
                        format!("string does not match pattern {}", regex.as_str()),
                    ));
                }
            }
        }
        ArgType::Number => {
            let Some(n) = value.as_f64() else {
                errors.push(ValidationError::new(path, "expected a number"));
                return;
            };
            validate_range(path, n, spec.validation.as_ref(), errors);
        }
        ArgType::Integer => {
            let Some(n) = value.as_f64() else {
                errors.push(ValidationError::new(path, "expected an integer"));
                return;
            };
            if n.fract() != 0.0 {
                errors.push(ValidationError::new(
                    path,
                    "expected an integer, got a fractional number",
                ));
                return;
            }
            validate_range(path, n, spec.validation.as_ref(), errors);
        }
        ArgType::Boolean => {
            if !value.is_boolean() {
                errors.push(ValidationError::new(path, "expected a boolean"));
            }
        }
        ArgType::Array => {
            let Some(arr) = value.as_array() else {
                errors.push(ValidationError::new(path, "expected an array"));
                return;
            };
            if let Some(v) = &spec.validation {
                if let Some(min) = v.min_length {
                    if arr.len() < min {
                        errors.push(ValidationError::new(
                            path,
                            format!("array shorter than minimum length {min}"),
                        ));
                    }
                }
                if let Some(max) = v.max_length {
                    if arr.len() > max {
                        errors.push(ValidationError::new(
                            path,
                            format!("array longer than maximum length {max}"),
                        ));
                    }
                }
            }
            if let Some(items_spec) = &spec.items {
                for (i, item) in arr.iter().enumerate() {
                    *count += 1;
                    validate_value(
                        &format!("{path}[{i}]"),
                        items_spec,
                        item,
                        patterns,
                        errors,
                        count,
                    );
                }
            }
        }
        ArgType::Object => {
            let Some(obj) = value.as_object() else {
                errors.push(ValidationError::new(path, "expected an object"));
                return;
            };
            if let Some(props) = &spec.properties {
                let nested_model = ModelSpec {
                    properties: props.clone(),
                    required: spec.object_required.clone(),
                };
                let nested_args: HashMap<String, Value> =
                    obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                validate_object(path, &nested_model, &nested_args, patterns, errors, count);
            }
        }
    }
}

fn validate_range(
    path: &str,
    n: f64,
    validation: Option<&ValidationConstraints>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(v) = validation else { return };
    if let Some(min) = v.minimum {
        if n < min {
            errors.push(ValidationError::new(
                path,
                format!("value {n} is below minimum {min}"),
            ));
        }
    }
    if let Some(max) = v.maximum {
        if n > max {
            errors.push(ValidationError::new(
                path,
                format!("value {n} is above maximum {max}"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ping_manifest() -> Manifest {
        let mut properties = HashMap::new();
        properties.insert(
            "data".to_string(),
            ArgumentSpec {
                arg_type: ArgType::String,
                required: true,
                description: None,
                validation: None,
                items: None,
                properties: None,
                object_required: None,
            },
        );
        let mut models = HashMap::new();
        models.insert(
            "process".to_string(),
            ModelSpec {
                properties,
                required: Some(vec!["data".to_string()]),
            },
        );
        Manifest {
            version: "1.0".to_string(),
            models,
            channels: None,
        }
    }

    #[test]
    fn missing_required_field_reports_substring() {
        let validator = ManifestValidator::new(ping_manifest()).unwrap();
        let report = validator.validate_request("process", &HashMap::new());
        assert!(!report.valid);
        assert_eq!(report.errors[0].field, "models.process.data");
        assert!(report.errors[0].message.contains("Required field is missing"));
    }

    #[test]
    fn present_required_field_passes() {
        let validator = ManifestValidator::new(ping_manifest()).unwrap();
        let mut args = HashMap::new();
        args.insert("data".to_string(), json!("hello"));
        let report = validator.validate_request("process", &args);
        assert!(report.valid);
        assert_eq!(report.fields_validated, 1);
    }

    #[test]
    fn unknown_request_reports_on_request_field() {
        let validator = ManifestValidator::new(ping_manifest()).unwrap();
        let report = validator.validate_request("nonexistent", &HashMap::new());
        assert!(!report.valid);
        assert_eq!(report.errors[0].field, "request");
    }

    #[test]
    fn pattern_is_anchored_and_enforced() {
        let mut properties = HashMap::new();
        properties.insert(
            "id".to_string(),
            ArgumentSpec {
                arg_type: ArgType::String,
                required: true,
                description: None,
                validation: Some(ValidationConstraints {
                    pattern: Some(r"[a-z]+".to_string()),
                    ..Default::default()
                }),
                items: None,
                properties: None,
                object_required: None,
            },
        );
        let mut models = HashMap::new();
        models.insert(
            "m".to_string(),
            ModelSpec {
                properties,
                required: None,
            },
        );
        let manifest = Manifest {
            version: "1.0".to_string(),
            models,
            channels: None,
        };
        let validator = ManifestValidator::new(manifest).unwrap();

        let mut bad = HashMap::new();
        bad.insert("id".to_string(), json!("abc123"));
        assert!(!validator.validate_request("m", &bad).valid);

        let mut good = HashMap::new();
        good.insert("id".to_string(), json!("abc"));
        assert!(validator.validate_request("m", &good).valid);
    }

    #[test]
    fn enum_rejects_values_outside_the_set() {
        let mut properties = HashMap::new();
        properties.insert(
            "level".to_string(),
            ArgumentSpec {
                arg_type: ArgType::String,
                required: true,
                description: None,
                validation: Some(ValidationConstraints {
                    r#enum: Some(vec![json!("low"), json!("high")]),
                    ..Default::default()
                }),
                items: None,
                properties: None,
                object_required: None,
            },
        );
        let mut models = HashMap::new();
        models.insert(
            "m".to_string(),
            ModelSpec {
                properties,
                required: None,
            },
        );
        let manifest = Manifest {
            version: "1.0".to_string(),
            models,
            channels: None,
        };
        let validator = ManifestValidator::new(manifest).unwrap();
        let mut args = HashMap::new();
        args.insert("level".to_string(), json!("medium"));
        assert!(!validator.validate_request("m", &args).valid);
    }

    #[test]
    fn array_items_validate_each_element_with_indexed_path() {
        let item_spec = ArgumentSpec {
            arg_type: ArgType::Integer,
            required: false,
            description: None,
            validation: Some(ValidationConstraints {
                minimum: Some(0.0),
                ..Default::default()
            }),
            items: None,
            properties: None,
            object_required: None,
        };
        let mut properties = HashMap::new();
        properties.insert(
            "items".to_string(),
            ArgumentSpec {
                arg_type: ArgType::Array,
                required: true,
                description: None,
                validation: None,
                items: Some(Box::new(item_spec)),
                properties: None,
                object_required: None,
            },
        );
        let mut models = HashMap::new();
        models.insert(
            "m".to_string(),
            ModelSpec {
                properties,
                required: None,
            },
        );
        let manifest = Manifest {
            version: "1.0".to_string(),
            models,
            channels: None,
        };
        let validator = ManifestValidator::new(manifest).unwrap();
        let mut args = HashMap::new();
        args.insert("items".to_string(), json!([1, 2, -1]));
        let report = validator.validate_request("m", &args);
        assert!(!report.valid);
        assert_eq!(report.errors[0].field, "models.m.items[2]");
    }

    #[test]
    fn legacy_channel_layout_is_canonicalized_and_validates() {
        let mut properties = HashMap::new();
        properties.insert(
            "message".to_string(),
            ArgumentSpec {
                arg_type: ArgType::String,
                required: true,
                description: None,
                validation: None,
                items: None,
                properties: None,
                object_required: None,
            },
        );
        let mut requests = HashMap::new();
        requests.insert(
            "echo".to_string(),
            RequestSpec {
                args: ModelSpec {
                    properties,
                    required: None,
                },
                response: None,
            },
        );
        let mut channels = HashMap::new();
        channels.insert("default".to_string(), ChannelSpec { requests });
        let manifest = Manifest {
            version: "1.0".to_string(),
            models: HashMap::new(),
            channels: Some(channels),
        };
        let validator = ManifestValidator::new(manifest).unwrap();

        let mut args = HashMap::new();
        args.insert("message".to_string(), json!("hi"));
        assert!(validator.validate_request("echo", &args).valid);
        assert!(validator.validate_request("default::echo", &args).valid);
    }

    #[test]
    fn validation_result_is_pure_modulo_timing() {
        let validator = ManifestValidator::new(ping_manifest()).unwrap();
        let mut args = HashMap::new();
        args.insert("data".to_string(), json!("x"));
        let a = validator.validate_request("process", &args);
        let b = validator.validate_request("process", &args);
        assert_eq!(a.valid, b.valid);
        assert_eq!(a.errors, b.errors);
        assert_eq!(a.fields_validated, b.fields_validated);
    }

    #[test]
    fn response_without_manifest_reports_on_response_field() {
        let mut requests = HashMap::new();
        requests.insert(
            "echo".to_string(),
            RequestSpec {
                args: ModelSpec::default(),
                response: None,
            },
        );
        let mut channels = HashMap::new();
        channels.insert("default".to_string(), ChannelSpec { requests });
        let manifest = Manifest {
            version: "1.0".to_string(),
            models: HashMap::new(),
            channels: Some(channels),
        };
        let validator = ManifestValidator::new(manifest).unwrap();
        let report = validator.validate_response("default", "echo", &json!({}));
        assert!(!report.valid);
        assert_eq!(report.errors[0].field, "response");
    }
}
