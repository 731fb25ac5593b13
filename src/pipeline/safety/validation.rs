use super::types::{InputPresence, InputRejection};

/// Maximum question length, in characters.
pub const MAX_QUESTION_CHARS: usize = 2_000;

/// Validate a request before any model is called.
///
/// Blank text does not count as a modality.
pub fn validate_input(input: &InputPresence<'_>) -> Result<(), InputRejection> {
    let text = input.text.filter(|t| !t.trim().is_empty());

    if text.is_none() && !input.audio && !input.image && !input.document {
        return Err(InputRejection::NoInput);
    }

    if let Some(text) = text {
        let chars = text.chars().count();
        if chars > MAX_QUESTION_CHARS {
            return Err(InputRejection::TooLong {
                chars,
                limit: MAX_QUESTION_CHARS,
            });
        }
    }

    Ok(())
}
