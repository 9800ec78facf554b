//! Reader comment input and its validation rules.

use crate::domain::error::DomainError;

const MAX_AUTHOR_NAME_CHARS: usize = 80;
const MAX_BODY_CHARS: usize = 4000;

/// A comment submission before persistence. Moderation is out of scope;
/// validation here only guards against empty or oversized input.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub author_name: String,
    pub email: Option<String>,
    pub body: String,
}

impl NewComment {
    pub fn validated(mut self) -> Result<Self, DomainError> {
        self.author_name = self.author_name.trim().to_string();
        self.body = self.body.trim().to_string();
        self.email = self
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());

        if self.author_name.is_empty() {
            return Err(DomainError::validation("comment author name is required"));
        }
        if self.author_name.chars().count() > MAX_AUTHOR_NAME_CHARS {
            return Err(DomainError::validation(format!(
                "comment author name exceeds {MAX_AUTHOR_NAME_CHARS} characters"
            )));
        }
        if self.body.is_empty() {
            return Err(DomainError::validation("comment body is required"));
        }
        if self.body.chars().count() > MAX_BODY_CHARS {
            return Err(DomainError::validation(format!(
                "comment body exceeds {MAX_BODY_CHARS} characters"
            )));
        }
        if let Some(email) = self.email.as_ref() {
            if !email.contains('@') {
                return Err(DomainError::validation("comment email is not valid"));
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts_reasonable_input() {
        let comment = NewComment {
            author_name: "  Wei  ".to_string(),
            email: Some(" wei@example.com ".to_string()),
            body: "  Nice writeup.  ".to_string(),
        }
        .validated()
        .expect("valid comment");

        assert_eq!(comment.author_name, "Wei");
        assert_eq!(comment.email.as_deref(), Some("wei@example.com"));
        assert_eq!(comment.body, "Nice writeup.");
    }

    #[test]
    fn rejects_blank_author_and_body() {
        let missing_name = NewComment {
            author_name: "   ".to_string(),
            email: None,
            body: "hello".to_string(),
        };
        assert!(missing_name.validated().is_err());

        let missing_body = NewComment {
            author_name: "Wei".to_string(),
            email: None,
            body: "\n\t".to_string(),
        };
        assert!(missing_body.validated().is_err());
    }

    #[test]
    fn empty_email_field_becomes_none() {
        let comment = NewComment {
            author_name: "Wei".to_string(),
            email: Some("   ".to_string()),
            body: "hello".to_string(),
        }
        .validated()
        .expect("valid comment");

        assert!(comment.email.is_none());
    }

    #[test]
    fn rejects_email_without_at_sign() {
        let comment = NewComment {
            author_name: "Wei".to_string(),
            email: Some("not-an-email".to_string()),
            body: "hello".to_string(),
        };
        assert!(comment.validated().is_err());
    }
}
