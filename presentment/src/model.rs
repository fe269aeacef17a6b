//! `PresentmentModel` (§4.11): a coroutine-free state machine observed by a UI layer and driven
//! by the transport owner / request loop.

use parking_lot::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentmentState {
    Reset,
    Connecting,
    WaitingForReader,
    WaitingForUserInput,
    Sending,
    Completed,
    CanceledByUser,
}

/// The observable state a UI layer reads: current phase, the documents selected for the current
/// request (once the consent prompt has resolved), and a count of requests handled so far in
/// this session (§4.11: "the model exposes ... a request counter").
pub struct PresentmentModel {
    state: RwLock<PresentmentState>,
    selected_documents: RwLock<Vec<Uuid>>,
    request_count: RwLock<u32>,
    canceled: RwLock<bool>,
}

impl PresentmentModel {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PresentmentState::Reset),
            selected_documents: RwLock::new(Vec::new()),
            request_count: RwLock::new(0),
            canceled: RwLock::new(false),
        }
    }

    pub fn state(&self) -> PresentmentState {
        *self.state.read()
    }

    pub fn selected_documents(&self) -> Vec<Uuid> {
        self.selected_documents.read().clone()
    }

    pub fn request_count(&self) -> u32 {
        *self.request_count.read()
    }

    pub fn transition(&self, state: PresentmentState) {
        tracing::debug!(?state, "presentment state transition");
        *self.state.write() = state;
    }

    pub fn set_selected_documents(&self, documents: Vec<Uuid>) {
        *self.selected_documents.write() = documents;
    }

    pub fn begin_request(&self) {
        *self.request_count.write() += 1;
    }

    /// Called by the UI layer. Observed cooperatively at the request loop's next message
    /// boundary (§4.11: "Cancellation is cooperative").
    pub fn set_canceled_by_user(&self) {
        *self.canceled.write() = true;
    }

    pub fn is_canceled_by_user(&self) -> bool {
        *self.canceled.read()
    }
}

impl Default for PresentmentModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_model_starts_in_reset_with_no_requests() {
        let model = PresentmentModel::new();
        assert_eq!(model.state(), PresentmentState::Reset);
        assert_eq!(model.request_count(), 0);
        assert!(!model.is_canceled_by_user());
    }

    #[test]
    fn set_canceled_by_user_is_observable_without_transitioning_state() {
        let model = PresentmentModel::new();
        model.transition(PresentmentState::WaitingForUserInput);
        model.set_canceled_by_user();

        assert!(model.is_canceled_by_user());
        assert_eq!(model.state(), PresentmentState::WaitingForUserInput);
    }

    #[test]
    fn begin_request_increments_counter() {
        let model = PresentmentModel::new();
        model.begin_request();
        model.begin_request();
        assert_eq!(model.request_count(), 2);
    }
}
