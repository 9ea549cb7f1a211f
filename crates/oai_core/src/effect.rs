use crate::Continuation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect<E> {
    /// Perform one GET against this URL.
    Fetch { url: String },
    /// Decode the body of the last fetch.
    Decode,
    /// Hand the decoded batch to the sink.
    Dispatch { continuation: Continuation },
    /// Terminal: the loop stops after this effect.
    Finish(Outcome<E>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<E> {
    Done { cycles: u32 },
    Failed { cycle: u32, error: E },
}
