mod controller;
mod state;

pub use controller::{SelectionController, SubmitOutcome};
pub use state::SelectionState;
