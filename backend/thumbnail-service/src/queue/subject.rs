//! Hierarchical subject matching
//!
//! Subjects are dot-separated tokens (`media.picture`). A filter token `*`
//! matches exactly one subject token; a trailing `>` matches one or more
//! remaining tokens.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFilter {
    tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSubjectFilter(String);

impl fmt::Display for InvalidSubjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid subject filter: {}", self.0)
    }
}

impl std::error::Error for InvalidSubjectFilter {}

impl SubjectFilter {
    pub fn parse(filter: &str) -> Result<Self, InvalidSubjectFilter> {
        let tokens: Vec<String> = filter.split('.').map(str::to_string).collect();

        if tokens.iter().any(String::is_empty) {
            return Err(InvalidSubjectFilter(filter.to_string()));
        }
        if let Some(pos) = tokens.iter().position(|t| t == ">") {
            if pos != tokens.len() - 1 {
                return Err(InvalidSubjectFilter(filter.to_string()));
            }
        }

        Ok(Self { tokens })
    }

    pub fn matches(&self, subject: &str) -> bool {
        let mut subject_tokens = subject.split('.');

        for token in &self.tokens {
            match token.as_str() {
                ">" => return subject_tokens.next().is_some_and(|t| !t.is_empty()),
                "*" => match subject_tokens.next() {
                    Some(t) if !t.is_empty() => {}
                    _ => return false,
                },
                literal => {
                    if subject_tokens.next() != Some(literal) {
                        return false;
                    }
                }
            }
        }

        subject_tokens.next().is_none()
    }
}

impl fmt::Display for SubjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_wildcard() {
        let filter = SubjectFilter::parse("media.>").unwrap();
        assert!(filter.matches("media.picture"));
        assert!(filter.matches("media.picture.large"));
        assert!(!filter.matches("media"));
        assert!(!filter.matches("video.picture"));
    }

    #[test]
    fn test_single_token_wildcard() {
        let filter = SubjectFilter::parse("media.*").unwrap();
        assert!(filter.matches("media.picture"));
        assert!(!filter.matches("media.picture.large"));
        assert!(!filter.matches("media"));
    }

    #[test]
    fn test_literal_subject() {
        let filter = SubjectFilter::parse("media.picture").unwrap();
        assert!(filter.matches("media.picture"));
        assert!(!filter.matches("media.pictures"));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(SubjectFilter::parse("media.>.picture").is_err());
        assert!(SubjectFilter::parse("media..picture").is_err());
        assert!(SubjectFilter::parse("").is_err());
    }
}
