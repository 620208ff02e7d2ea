//! Phone number → channel-native recipient identifier.

use crate::error::SendError;

/// Suffix the channel uses for direct-chat identifiers.
pub const CHANNEL_ID_SUFFIX: &str = "@c.us";

/// Minimum digit count a phone number must yield after normalization.
pub const MIN_RECIPIENT_DIGITS: usize = 8;

/// Convert a human phone number (E.164 recommended, e.g. `+31612345678`)
/// into a channel identifier like `31612345678@c.us`.
///
/// Strips every non-digit character; anything with fewer than
/// [`MIN_RECIPIENT_DIGITS`] digits left is rejected.
pub fn normalize_recipient(input: &str) -> Result<String, SendError> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < MIN_RECIPIENT_DIGITS {
        return Err(SendError::InvalidRecipient {
            input: input.to_string(),
            digits: digits.len(),
        });
    }
    Ok(format!("{digits}{CHANNEL_ID_SUFFIX}"))
}
