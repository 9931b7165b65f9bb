//! User input value object

/// Text submitted by the user for a new turn (Value Object)
///
/// Always trimmed and never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInput {
    content: String,
}

impl UserInput {
    /// Try to create user input, returning None for blank text
    pub fn try_new(content: impl AsRef<str>) -> Option<Self> {
        let trimmed = content.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                content: trimmed.to_string(),
            })
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_blank() {
        assert!(UserInput::try_new("").is_none());
        assert!(UserInput::try_new(" \n\t ").is_none());
    }

    #[test]
    fn test_try_new_trims() {
        let input = UserInput::try_new("  hello \n").unwrap();
        assert_eq!(input.content(), "hello");
        assert_eq!(input.into_content(), "hello");
    }
}
