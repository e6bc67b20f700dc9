//! Candidate input submitted with the resume stage.
//!
//! Everything here is validated locally so that malformed input never
//! reaches the analysis gateway.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::domain::foundation::ValidationError;

/// Default upper bound for an uploaded resume.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Phone numbers are kept to this many digits.
pub const MAX_PHONE_DIGITS: usize = 10;

static ALLOWED_MIME_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ])
});

static ALLOWED_EXTENSIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["pdf", "doc", "docx"]));

fn required(field: &str, value: impl Into<String>) -> Result<String, ValidationError> {
    let value = value.into().trim().to_string();
    if value.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    Ok(value)
}

/// Personal details of the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInfo {
    name: String,
    email: String,
    phone: Option<String>,
}

impl CandidateInfo {
    /// Validates the candidate's details.
    ///
    /// The phone number is reduced to its digits and truncated to ten; a
    /// phone with no digits at all is treated as absent.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let name = required("name", name)?;
        let email = required("email", email)?;
        if !email.contains('@') {
            return Err(ValidationError::invalid_format("email", "missing @ symbol"));
        }

        let phone = phone
            .map(|p| {
                p.chars()
                    .filter(char::is_ascii_digit)
                    .take(MAX_PHONE_DIGITS)
                    .collect::<String>()
            })
            .filter(|digits| !digits.is_empty());

        Ok(Self { name, email, phone })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}

/// Recruiter-side metadata sent with the resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    hr_name: String,
    job_position: String,
}

impl SubmissionMetadata {
    pub fn new(
        hr_name: impl Into<String>,
        job_position: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            hr_name: required("hr_name", hr_name)?,
            job_position: required("job_position", job_position)?,
        })
    }

    pub fn hr_name(&self) -> &str {
        &self.hr_name
    }

    pub fn job_position(&self) -> &str {
        &self.job_position
    }
}

/// Job description the resume is matched against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobDescription(String);

impl JobDescription {
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self(required("job_description", text)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An uploaded resume file.
#[derive(Clone, PartialEq, Eq)]
pub struct ResumeDocument {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl ResumeDocument {
    /// Validates type, extension and size of an uploaded resume.
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, ValidationError> {
        let file_name = required("resume.file_name", file_name)?;
        let mime_type = mime_type.into().trim().to_ascii_lowercase();

        if !ALLOWED_MIME_TYPES.contains(mime_type.as_str()) {
            return Err(ValidationError::invalid_format(
                "resume.mime_type",
                format!("unsupported document type '{}'", mime_type),
            ));
        }

        let extension = Path::new(&file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(extension.as_str()) {
            return Err(ValidationError::invalid_format(
                "resume.file_name",
                "only PDF, DOC or DOCX files are accepted",
            ));
        }

        if bytes.is_empty() {
            return Err(ValidationError::empty_field("resume"));
        }
        if bytes.len() > max_bytes {
            return Err(ValidationError::invalid_format(
                "resume",
                format!("file is {} bytes, limit is {}", bytes.len(), max_bytes),
            ));
        }

        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ResumeDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeDocument")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: &str = "application/pdf";

    #[test]
    fn candidate_info_requires_name_and_email() {
        assert!(CandidateInfo::new("", "jane@x.com", None).is_err());
        assert!(CandidateInfo::new("Jane Doe", "  ", None).is_err());
        assert!(CandidateInfo::new("Jane Doe", "jane@x.com", None).is_ok());
    }

    #[test]
    fn candidate_email_needs_at_symbol() {
        let err = CandidateInfo::new("Jane Doe", "jane.x.com", None).unwrap_err();
        assert_eq!(err.field(), "email");
    }

    #[test]
    fn phone_is_normalized_to_ten_digits() {
        let info = CandidateInfo::new("Jane", "jane@x.com", Some("+1 (555) 010-9999 ext 4")).unwrap();
        assert_eq!(info.phone(), Some("1555010999"));
    }

    #[test]
    fn phone_without_digits_is_absent() {
        let info = CandidateInfo::new("Jane", "jane@x.com", Some("n/a")).unwrap();
        assert_eq!(info.phone(), None);
    }

    #[test]
    fn metadata_requires_both_fields() {
        assert!(SubmissionMetadata::new("Sam", "").is_err());
        assert!(SubmissionMetadata::new("Sam", "Backend Engineer").is_ok());
    }

    #[test]
    fn job_description_trims_and_rejects_blank() {
        assert!(JobDescription::new(" \n ").is_err());
        assert_eq!(JobDescription::new("  Rust dev ").unwrap().as_str(), "Rust dev");
    }

    #[test]
    fn accepts_pdf_under_limit() {
        let doc = ResumeDocument::new("cv.PDF", PDF, vec![1; 512], DEFAULT_MAX_DOCUMENT_BYTES).unwrap();
        assert_eq!(doc.len(), 512);
        assert_eq!(doc.mime_type(), PDF);
    }

    #[test]
    fn rejects_executable() {
        let err = ResumeDocument::new(
            "setup.exe",
            "application/x-msdownload",
            vec![0x4d, 0x5a],
            DEFAULT_MAX_DOCUMENT_BYTES,
        )
        .unwrap_err();
        assert_eq!(err.field(), "resume.mime_type");
    }

    #[test]
    fn rejects_wrong_extension_with_allowed_mime() {
        let err = ResumeDocument::new("cv.exe", PDF, vec![1], DEFAULT_MAX_DOCUMENT_BYTES).unwrap_err();
        assert_eq!(err.field(), "resume.file_name");
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        assert!(ResumeDocument::new("cv.pdf", PDF, vec![], 10).is_err());
        assert!(ResumeDocument::new("cv.pdf", PDF, vec![0; 11], 10).is_err());
        assert!(ResumeDocument::new("cv.pdf", PDF, vec![0; 10], 10).is_ok());
    }

    #[test]
    fn debug_output_omits_contents() {
        let doc = ResumeDocument::new("cv.pdf", PDF, vec![7; 3], 10).unwrap();
        assert!(format!("{:?}", doc).contains("len: 3"));
    }
}
