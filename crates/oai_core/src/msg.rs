use crate::Continuation;

/// Result of executing an effect, fed back into [`crate::update`].
///
/// `E` is the failure type of the driver executing the effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg<E> {
    /// Begin the harvest with the session's initial request.
    Start,
    /// The transport returned a body for the current request.
    Fetched,
    /// The transport failed; the harvest stops.
    FetchFailed(E),
    /// The body decoded into a response carrying this continuation.
    Decoded { continuation: Continuation },
    /// The body could not be decoded; the harvest stops.
    DecodeFailed(E),
    /// The sink has consumed the current batch.
    Dispatched,
    /// The sink refused the current batch; the harvest stops.
    DispatchFailed(E),
}
