//! Error categorization shared across the crates in this workspace.
//!
//! The core (§7 of the design) funnels every fallible operation through one of a handful of
//! error enums. Those enums derive [`ErrorCategory`] so that logging and telemetry code can
//! decide, per variant, whether the error is expected (safe to log at `info`/`debug`),
//! unexpected (log at `error`, possibly alert), carries personal data (never log the `Display`
//! output, only the variant name), or is critical (unrecoverable, should crash loudly in debug
//! builds).

pub use error_category_derive::ErrorCategory;

/// Classification of an error variant, set via `#[category(..)]` on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// A normal, anticipated failure (e.g. user cancellation, a timeout). Safe to log.
    Expected,
    /// An unanticipated failure that likely indicates a bug or environment problem.
    Unexpected,
    /// The error's `Display` output may contain personal data (attribute values, names).
    /// Never log it directly; log only the variant's discriminant.
    PersonalData,
    /// An invariant the core cannot recover from (e.g. global registration called twice).
    Critical,
}

/// Implemented via `#[derive(ErrorCategory)]`. See the crate-level documentation.
pub trait ErrorCategory {
    fn category(&self) -> Category;

    /// A string suitable for logging: the `Display` impl for non-personal-data categories,
    /// or a redacted placeholder for [`Category::PersonalData`].
    fn log_safe_message(&self) -> String
    where
        Self: std::fmt::Display,
    {
        match self.category() {
            Category::PersonalData => "<redacted: error carries personal data>".to_owned(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, ErrorCategory)]
    enum ExampleError {
        #[error("canceled")]
        #[category(expected)]
        Canceled,
        #[error("attribute leaked: {0}")]
        #[category(pd)]
        Attribute(String),
        #[error("nested: {0}")]
        #[category(defer)]
        Nested(#[from] NestedError),
    }

    #[derive(Debug, thiserror::Error, ErrorCategory)]
    #[error("nested failure")]
    #[category(unexpected)]
    struct NestedError;

    #[test]
    fn categorizes_variants() {
        assert_eq!(ExampleError::Canceled.category(), Category::Expected);
        assert_eq!(
            ExampleError::Attribute("secret".to_owned()).category(),
            Category::PersonalData
        );
        assert_eq!(ExampleError::from(NestedError).category(), Category::Unexpected);
    }

    #[test]
    fn redacts_personal_data_in_log_message() {
        let err = ExampleError::Attribute("secret".to_owned());
        assert_eq!(err.log_safe_message(), "<redacted: error carries personal data>");
        assert_eq!(ExampleError::Canceled.log_safe_message(), "canceled");
    }
}
