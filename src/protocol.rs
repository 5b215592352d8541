//! Typed envelopes for the list and mutate endpoints.
//!
//! Everything past this module works with [`ListPage`] and [`Verdict`]; raw
//! response shapes are only inspected here.

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, HardFailure};
use crate::pagination::PaginationMeta;

/// Status signalling a recoverable conflict that may be overridden.
pub const SOFT_CONFLICT_STATUS: u16 = 409;

/// Status signalling a validation or referential-integrity rejection.
pub const HARD_FAILURE_STATUS: u16 = 422;

/// `{ success, data, meta }` returned by list endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListEnvelope<T> {
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<PaginationMeta>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A successful list response.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> ListPage<T> {
    pub fn new(data: Vec<T>, meta: PaginationMeta) -> Self {
        Self { data, meta }
    }

    /// An unpaginated result.
    pub fn single(data: Vec<T>) -> Self {
        let meta = PaginationMeta::single_page(data.len());
        Self { data, meta }
    }
}

impl<T> ListEnvelope<T> {
    /// `success: false` is a fetch failure; a missing `meta` means one page.
    pub fn into_page(self) -> Result<ListPage<T>, FetchError> {
        if !self.success {
            return Err(FetchError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        Ok(match self.meta {
            Some(meta) => ListPage::new(self.data, meta),
            None => ListPage::single(self.data),
        })
    }
}

/// Body sent with a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceBody {
    pub force: bool,
}

/// Loosely-typed body of any mutate response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MutationBody {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Status and body of a mutate response, before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationReply {
    pub status: u16,
    pub body: MutationBody,
}

impl MutationReply {
    pub fn new(status: u16, body: MutationBody) -> Self {
        Self { status, body }
    }

    /// `{ success: true, message }` with status 200.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(
            200,
            MutationBody {
                success: Some(true),
                message: Some(message.into()),
                data: None,
            },
        )
    }

    /// 409 with a human-readable warning in `data`.
    pub fn soft_conflict(message: impl Into<String>, warning: impl Into<String>) -> Self {
        Self::new(
            SOFT_CONFLICT_STATUS,
            MutationBody {
                success: Some(false),
                message: Some(message.into()),
                data: Some(serde_json::Value::String(warning.into())),
            },
        )
    }

    /// 422 with blocking reasons in `data`.
    pub fn hard_failure(message: impl Into<String>, reasons: &[&str]) -> Self {
        Self::new(
            HARD_FAILURE_STATUS,
            MutationBody {
                success: Some(false),
                message: Some(message.into()),
                data: Some(serde_json::Value::from(reasons.to_vec())),
            },
        )
    }

    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Whether a conflict may be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Soft,
    Hard,
}

/// A mutation attempt that the server did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDescriptor {
    pub kind: ConflictKind,
    pub message: String,
    pub blocking_reasons: Vec<String>,
}

impl ConflictDescriptor {
    pub fn into_hard_failure(self) -> HardFailure {
        HardFailure::with_reasons(self.message, self.blocking_reasons)
    }
}

/// Interpretation of a [`MutationReply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { message: String },
    Conflict(ConflictDescriptor),
}

/// Classify a mutate response.
///
/// Only [`SOFT_CONFLICT_STATUS`] is a soft conflict. [`HARD_FAILURE_STATUS`]
/// carries blocking reasons; any other failure is a hard failure with the raw
/// message.
pub fn classify(reply: &MutationReply) -> Verdict {
    let body = &reply.body;
    if reply.is_success_status() {
        if body.success == Some(false) {
            return Verdict::Conflict(ConflictDescriptor {
                kind: ConflictKind::Hard,
                message: message_or(body, "the server rejected the action"),
                blocking_reasons: Vec::new(),
            });
        }
        return Verdict::Accepted {
            message: message_or(body, "done"),
        };
    }

    match reply.status {
        SOFT_CONFLICT_STATUS => Verdict::Conflict(ConflictDescriptor {
            kind: ConflictKind::Soft,
            message: warning_text(body)
                .unwrap_or_else(|| message_or(body, "the server asked for confirmation")),
            blocking_reasons: Vec::new(),
        }),
        HARD_FAILURE_STATUS => Verdict::Conflict(ConflictDescriptor {
            kind: ConflictKind::Hard,
            message: message_or(body, "the action is blocked"),
            blocking_reasons: reasons(body),
        }),
        status => Verdict::Conflict(ConflictDescriptor {
            kind: ConflictKind::Hard,
            message: message_or(body, &format!("request failed with status {}", status)),
            blocking_reasons: Vec::new(),
        }),
    }
}

fn message_or(body: &MutationBody, fallback: &str) -> String {
    body.message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn warning_text(body: &MutationBody) -> Option<String> {
    match body.data.as_ref()? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("warning")
            .or_else(|| map.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    }
}

fn reasons(body: &MutationBody) -> Vec<String> {
    match body.data.as_ref() {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(serde_json::Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_envelope_into_page() {
        let envelope: ListEnvelope<u32> = serde_json::from_str(
            r#"{"success":true,"data":[1,2,3],"meta":{"current_page":1,"last_page":4,"total":12,"from":1,"to":3}}"#,
        )
        .unwrap();
        let page = envelope.into_page().unwrap();
        assert_eq!(page.data, vec![1, 2, 3]);
        assert_eq!(page.meta.last_page, 4);
    }

    #[test]
    fn test_list_envelope_without_meta_is_single_page() {
        let envelope: ListEnvelope<u32> =
            serde_json::from_str(r#"{"success":true,"data":[7,8]}"#).unwrap();
        let page = envelope.into_page().unwrap();
        assert_eq!(page.meta.last_page, 1);
        assert_eq!(page.meta.total, 2);
    }

    #[test]
    fn test_unsuccessful_list_envelope_is_rejected() {
        let envelope: ListEnvelope<u32> =
            serde_json::from_str(r#"{"success":false,"message":"forbidden"}"#).unwrap();
        assert_eq!(
            envelope.into_page(),
            Err(FetchError::Rejected {
                message: "forbidden".into()
            })
        );
    }

    #[test]
    fn test_classify_success() {
        assert_eq!(
            classify(&MutationReply::ok("Trainer deactivated")),
            Verdict::Accepted {
                message: "Trainer deactivated".into()
            }
        );
    }

    #[test]
    fn test_classify_soft_conflict_prefers_warning() {
        let verdict = classify(&MutationReply::soft_conflict(
            "Confirmation required",
            "This will affect 4 active enrollments",
        ));
        assert_eq!(
            verdict,
            Verdict::Conflict(ConflictDescriptor {
                kind: ConflictKind::Soft,
                message: "This will affect 4 active enrollments".into(),
                blocking_reasons: vec![],
            })
        );
    }

    #[test]
    fn test_classify_hard_failure_with_reasons() {
        let verdict = classify(&MutationReply::hard_failure(
            "Cannot delete",
            &["reason A", "reason B"],
        ));
        match verdict {
            Verdict::Conflict(descriptor) => {
                assert_eq!(descriptor.kind, ConflictKind::Hard);
                assert_eq!(descriptor.blocking_reasons, vec!["reason A", "reason B"]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_other_statuses_are_hard_even_with_truthy_fields() {
        // A 403 with a populated `data` must not be mistaken for a soft conflict.
        let reply = MutationReply::new(
            403,
            MutationBody {
                success: None,
                message: None,
                data: Some(serde_json::json!("careful")),
            },
        );
        match classify(&reply) {
            Verdict::Conflict(descriptor) => {
                assert_eq!(descriptor.kind, ConflictKind::Hard);
                assert_eq!(descriptor.message, "request failed with status 403");
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_success_status_with_success_false_is_hard() {
        let reply = MutationReply::new(
            200,
            MutationBody {
                success: Some(false),
                message: Some("not allowed".into()),
                data: None,
            },
        );
        assert!(matches!(
            classify(&reply),
            Verdict::Conflict(ConflictDescriptor {
                kind: ConflictKind::Hard,
                ..
            })
        ));
    }
}
