/// Whether another page exists, derived from the latest response each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Continuation {
    pub present: bool,
    pub token: String,
}

impl Continuation {
    pub fn none() -> Self {
        Self::default()
    }

    /// An empty token means the repository has finished the list.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(token) if !token.is_empty() => Self {
                present: true,
                token: token.to_string(),
            },
            _ => Self::none(),
        }
    }
}
