// Response classification.
//
// The vendor reports failures in at least four shapes: HTTP status codes,
// `{"Error": "..."}`, `{"Error": {"Message": "..."}}`, and a bare top-level
// `{"Message": "..."}` with no `Data`. An endpoint that does not exist for a
// device may also answer 200 with an empty body. `classify` folds all of
// them into one taxonomy so nothing above this module inspects raw bodies.

use serde_json::Value;
use strum::Display;

/// Message the vendor uses when an endpoint is not implemented for a device.
const INVALID_ENDPOINT: &str = "invalid endpoint";
/// Message the vendor uses when the key has no access to the resource.
const ACCESS_DENIED: &str = "access denied";

/// Coarse category of a [`NormalizedOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OutcomeKind {
    Success,
    EndpointUnsupported,
    Authentication,
    Transient,
    Malformed,
    Rejected,
}

/// A response after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedOutcome {
    /// A usable payload (the full response object, `Data` included).
    Success(Value),
    /// The endpoint does not exist for this device (or at all).
    EndpointUnsupported { message: String },
    /// The key was refused.
    Authentication { message: String },
    /// Worth retrying: 5xx or 429.
    Transient { status: u16, message: String },
    /// Not JSON, or otherwise outside the response contract.
    Malformed { message: String },
    /// A definitive refusal that is neither of the above.
    Rejected { status: u16, message: String },
}

impl NormalizedOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::EndpointUnsupported { .. } => OutcomeKind::EndpointUnsupported,
            Self::Authentication { .. } => OutcomeKind::Authentication,
            Self::Transient { .. } => OutcomeKind::Transient,
            Self::Malformed { .. } => OutcomeKind::Malformed,
            Self::Rejected { .. } => OutcomeKind::Rejected,
        }
    }

    /// Human-readable message, `None` for successes.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::EndpointUnsupported { message }
            | Self::Authentication { message }
            | Self::Transient { message, .. }
            | Self::Malformed { message }
            | Self::Rejected { message, .. } => Some(message),
        }
    }
}

/// Classify an HTTP status and body into a [`NormalizedOutcome`].
pub fn classify(status: u16, body: &str) -> NormalizedOutcome {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let body_message = || {
        parsed
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| format!("HTTP {status}"))
    };

    match status {
        401 | 403 => {
            return NormalizedOutcome::Authentication {
                message: body_message(),
            };
        }
        429 | 500..=599 => {
            return NormalizedOutcome::Transient {
                status,
                message: body_message(),
            };
        }
        200..=299 => {}
        _ => {
            return NormalizedOutcome::Rejected {
                status,
                message: body_message(),
            };
        }
    }

    if body.trim().is_empty() {
        return NormalizedOutcome::EndpointUnsupported {
            message: "empty response body".into(),
        };
    }

    let Some(value) = parsed else {
        return NormalizedOutcome::Malformed {
            message: "response body is not valid JSON".into(),
        };
    };

    match error_message(&value) {
        Some(message) => classify_message(status, message),
        None => NormalizedOutcome::Success(value),
    }
}

/// Map a vendor error message onto the taxonomy.
fn classify_message(status: u16, message: String) -> NormalizedOutcome {
    let folded = message.trim().to_lowercase();
    if folded == INVALID_ENDPOINT {
        NormalizedOutcome::EndpointUnsupported { message }
    } else if folded == ACCESS_DENIED {
        NormalizedOutcome::Authentication { message }
    } else {
        NormalizedOutcome::Rejected { status, message }
    }
}

/// Extract the vendor error message from a response object, if it carries one.
///
/// `Error: null` and the literal string `"null"` mean "no error".
pub fn error_message(value: &Value) -> Option<String> {
    let obj = value.as_object()?;

    match obj.get("Error") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("null") {
                return Some(trimmed.to_owned());
            }
        }
        Some(Value::Object(inner)) => {
            return Some(match inner.get("Message") {
                Some(Value::String(msg)) => msg.trim().to_owned(),
                _ => Value::Object(inner.clone()).to_string(),
            });
        }
        Some(other) => return Some(other.to_string()),
    }

    let has_data = obj.get("Data").is_some_and(|d| !d.is_null());
    match obj.get("Message") {
        Some(Value::String(msg)) if !has_data && !msg.trim().is_empty() => {
            Some(msg.trim().to_owned())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_invalid_endpoint_is_unsupported() {
        let outcome = classify(200, r#"{"Data":null,"Error":{"Message":"invalid endpoint"}}"#);
        assert_eq!(outcome.kind(), OutcomeKind::EndpointUnsupported);
    }

    #[test]
    fn bare_message_invalid_endpoint_is_unsupported() {
        let outcome = classify(200, r#"{"Message":"Invalid Endpoint "}"#);
        assert_eq!(outcome.kind(), OutcomeKind::EndpointUnsupported);
        assert_eq!(outcome.message(), Some("Invalid Endpoint"));
    }

    #[test]
    fn string_error_field_is_classified() {
        assert_eq!(
            classify(200, r#"{"Error":"invalid endpoint"}"#).kind(),
            OutcomeKind::EndpointUnsupported
        );
        assert_eq!(
            classify(200, r#"{"Error":"Access denied"}"#).kind(),
            OutcomeKind::Authentication
        );
        assert_eq!(
            classify(200, r#"{"Error":"Device offline"}"#),
            NormalizedOutcome::Rejected {
                status: 200,
                message: "Device offline".into()
            }
        );
    }

    #[test]
    fn empty_body_is_unsupported() {
        assert_eq!(classify(200, "  \n").kind(), OutcomeKind::EndpointUnsupported);
    }

    #[test]
    fn null_error_is_success() {
        let body = r#"{"Data":{"Values":[]},"Error":null}"#;
        assert_eq!(
            classify(200, body),
            NormalizedOutcome::Success(json!({"Data": {"Values": []}, "Error": null}))
        );
        let outcome = classify(200, r#"{"Data":{"Values":[]},"Error":"null"}"#);
        assert_eq!(outcome.kind(), OutcomeKind::Success);
    }

    #[test]
    fn message_alongside_data_is_not_an_error() {
        let outcome = classify(200, r#"{"Data":{"Values":[1]},"Message":"ok"}"#);
        assert_eq!(outcome.kind(), OutcomeKind::Success);
    }

    #[test]
    fn status_codes() {
        assert_eq!(classify(401, "").kind(), OutcomeKind::Authentication);
        assert_eq!(classify(403, "").kind(), OutcomeKind::Authentication);
        assert_eq!(classify(503, "busy").kind(), OutcomeKind::Transient);
        assert_eq!(classify(429, "").kind(), OutcomeKind::Transient);
        assert_eq!(
            classify(404, r#"{"Message":"not here"}"#),
            NormalizedOutcome::Rejected {
                status: 404,
                message: "not here".into()
            }
        );
    }

    #[test]
    fn non_json_is_malformed() {
        assert_eq!(
            classify(200, "<html>maintenance</html>").kind(),
            OutcomeKind::Malformed
        );
    }
}
