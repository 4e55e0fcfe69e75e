//! Comment submission payload and the record produced from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CommentId;
use crate::error::{FieldError, ValidationError};

pub const MAX_USER_NAME_LEN: usize = 64;
pub const MAX_TEXT_LEN: usize = 1024;

/// What a visitor submits. The queue forwards it untouched to the comment creator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    pub user_name: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_id: Option<String>,

    /// Reference to an already uploaded attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl CreateCommentRequest {
    pub fn new(
        user_name: impl Into<String>,
        email: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            email: email.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn reply_to(mut self, parent_id: CommentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }

    pub fn with_file(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// Check required fields and formats. Every problem is collected, not just the first.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut fields = Vec::new();
        let mut reject = |field: &'static str, reason: &str| {
            fields.push(FieldError {
                field,
                reason: reason.to_string(),
            });
        };

        let user_name = self.user_name.trim();
        if user_name.is_empty() {
            reject("user_name", "is required");
        } else if user_name.chars().count() > MAX_USER_NAME_LEN {
            reject("user_name", "must be at most 64 characters");
        }

        let email = self.email.trim();
        if email.is_empty() {
            reject("email", "is required");
        } else if !looks_like_email(email) {
            reject("email", "is not a valid email address");
        }

        if let Some(homepage) = self.homepage.as_deref()
            && !homepage.trim().is_empty()
            && !looks_like_http_url(homepage.trim())
        {
            reject("homepage", "must be an http or https URL");
        }

        let text = self.text.trim();
        if text.is_empty() {
            reject("text", "is required");
        } else if text.chars().count() > MAX_TEXT_LEN {
            reject("text", "must be at most 1024 characters");
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { fields })
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
}

fn looks_like_http_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !rest.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// A stored comment, as returned by the comment creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: CommentId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    pub user_name: String,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl CommentRecord {
    pub fn from_request(id: CommentId, request: &CreateCommentRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            parent_id: request.parent_id,
            user_name: request.user_name.trim().to_string(),
            email: request.email.trim().to_string(),
            homepage: request
                .homepage
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string),
            text: request.text.trim().to_string(),
            file_id: request.file_id.clone(),
            created_at,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn alice() -> CreateCommentRequest {
        CreateCommentRequest::new("Alice", "a@x.com", "hi")
    }

    #[test]
    fn valid_request_passes() {
        assert!(alice().validate().is_ok());
        assert!(
            alice()
                .with_homepage("https://alice.example/blog")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let err = CreateCommentRequest::default().validate().unwrap_err();
        assert!(err.has_field("user_name"));
        assert!(err.has_field("email"));
        assert!(err.has_field("text"));
        assert_eq!(err.fields.len(), 3);
    }

    #[test]
    fn whitespace_counts_as_missing() {
        let err = CreateCommentRequest::new("  ", "a@x.com", "\n\t")
            .validate()
            .unwrap_err();
        assert!(err.has_field("user_name"));
        assert!(err.has_field("text"));
        assert!(!err.has_field("email"));
    }

    #[rstest]
    #[case::no_at("alice.example.com")]
    #[case::no_domain_dot("alice@localhost")]
    #[case::empty_local("@x.com")]
    #[case::two_ats("a@b@x.com")]
    #[case::space("a lice@x.com")]
    fn bad_email_is_rejected(#[case] email: &str) {
        let err = CreateCommentRequest::new("Alice", email, "hi")
            .validate()
            .unwrap_err();
        assert!(err.has_field("email"));
    }

    #[rstest]
    #[case::no_scheme("alice.example")]
    #[case::ftp("ftp://alice.example")]
    #[case::no_host("https://")]
    fn bad_homepage_is_rejected(#[case] homepage: &str) {
        let err = alice().with_homepage(homepage).validate().unwrap_err();
        assert!(err.has_field("homepage"));
    }

    #[test]
    fn length_limits_are_enforced() {
        let long_name = "n".repeat(MAX_USER_NAME_LEN + 1);
        let long_text = "t".repeat(MAX_TEXT_LEN + 1);
        let err = CreateCommentRequest::new(long_name, "a@x.com", long_text)
            .validate()
            .unwrap_err();
        assert!(err.has_field("user_name"));
        assert!(err.has_field("text"));

        let at_limit = CreateCommentRequest::new(
            "n".repeat(MAX_USER_NAME_LEN),
            "a@x.com",
            "t".repeat(MAX_TEXT_LEN),
        );
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn request_uses_camel_case_on_the_wire() {
        let req: CreateCommentRequest = serde_json::from_value(serde_json::json!({
            "userName": "Alice",
            "email": "a@x.com",
            "text": "hi",
            "captchaId": "c-1",
        }))
        .unwrap();

        assert_eq!(req.user_name, "Alice");
        assert_eq!(req.captcha_id.as_deref(), Some("c-1"));
        assert!(req.parent_id.is_none());
    }
}
