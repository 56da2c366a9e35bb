//! Request validation helpers

use crate::constants::{
    MAX_EXPLAIN_CODE_BYTES, MAX_QUESTION_CHARS, MAX_REPOSITORY_ID_LEN, MAX_SPEECH_TEXT_CHARS,
};
use crate::AppError;

/// Validate a caller supplied repository identifier.
///
/// Identifiers are used as directory names, so only ASCII letters, digits,
/// `-` and `_` are accepted.
pub fn validate_repository_id(id: &str) -> Result<(), AppError> {
    if id.is_empty() || id.len() > MAX_REPOSITORY_ID_LEN {
        return Err(AppError::InvalidInput(format!(
            "Repository id must be between 1 and {} characters",
            MAX_REPOSITORY_ID_LEN
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::InvalidInput(
            "Repository id may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_question(question: &str) -> Result<(), AppError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Question must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_QUESTION_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Question exceeds {} characters",
            MAX_QUESTION_CHARS
        )));
    }
    Ok(())
}

pub fn validate_code_snippet(code: &str) -> Result<(), AppError> {
    if code.trim().is_empty() {
        return Err(AppError::InvalidInput("No code provided".to_string()));
    }
    if code.len() > MAX_EXPLAIN_CODE_BYTES {
        return Err(AppError::PayloadTooLarge(format!(
            "Code exceeds {} bytes",
            MAX_EXPLAIN_CODE_BYTES
        )));
    }
    Ok(())
}

pub fn validate_speech_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput("Text must not be empty".to_string()));
    }
    if text.chars().count() > MAX_SPEECH_TEXT_CHARS {
        return Err(AppError::PayloadTooLarge(format!(
            "Text exceeds {} characters",
            MAX_SPEECH_TEXT_CHARS
        )));
    }
    Ok(())
}
