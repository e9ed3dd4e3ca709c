use crate::error::ClientError;

pub const CODE_LENGTH: usize = 6;
pub const MIN_PHONE_LENGTH: usize = 10;

pub fn validate_phone_number(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_PHONE_LENGTH {
        return Err(ClientError::validation("Please enter a valid phone number"));
    }
    Ok(trimmed.to_string())
}

/// Exactly six ASCII digits; surrounding whitespace is not accepted.
pub fn validate_code(raw: &str) -> Result<String, ClientError> {
    if raw.len() != CODE_LENGTH || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(ClientError::validation("Please enter a valid 6-digit OTP"));
    }
    Ok(raw.to_string())
}

/// Phone number for log output: everything but the last four characters hidden.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    "*".repeat(hidden) + &chars[hidden..].iter().collect::<String>()
}

/// Six single-digit input positions plus the position that currently has focus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    digits: [Option<char>; CODE_LENGTH],
    focus: usize,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input typed into position `index`. Only the first character is kept; anything that is
    /// not made of digits is refused and leaves the buffer untouched. Empty input clears the
    /// position.
    pub fn enter(&mut self, index: usize, input: &str) -> Result<(), ClientError> {
        if index >= CODE_LENGTH {
            return Err(ClientError::validation(format!(
                "Code position {} is out of range",
                index
            )));
        }
        if input.is_empty() {
            self.digits[index] = None;
            return Ok(());
        }
        if !input.chars().all(|c| c.is_ascii_digit()) {
            return Err(ClientError::validation("Only digits are allowed"));
        }
        self.digits[index] = input.chars().next();
        self.focus = (index + 1).min(CODE_LENGTH - 1);
        Ok(())
    }

    /// Backspace at `index`: clears the position, or the previous one (moving focus back)
    /// when the position is already empty.
    pub fn backspace(&mut self, index: usize) {
        if index >= CODE_LENGTH {
            return;
        }
        if self.digits[index].is_some() {
            self.digits[index] = None;
            self.focus = index;
        } else if index > 0 {
            self.digits[index - 1] = None;
            self.focus = index - 1;
        }
    }

    /// Fill every position from a pasted string. Anything other than exactly six digits is
    /// ignored.
    pub fn paste(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.len() != CODE_LENGTH || !text.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        for (slot, ch) in self.digits.iter_mut().zip(text.chars()) {
            *slot = Some(ch);
        }
        self.focus = CODE_LENGTH - 1;
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn digits(&self) -> [Option<char>; CODE_LENGTH] {
        self.digits
    }

    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(|d| d.is_some())
    }

    /// The full code, only once every position is filled.
    pub fn value(&self) -> Option<String> {
        if self.is_complete() {
            Some(self.digits.iter().flatten().collect())
        } else {
            None
        }
    }
}
