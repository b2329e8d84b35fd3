use crate::dom::NodeId;
use crate::models::{ClickContext, ElementRef};

/// Lifecycle of one feedback-authoring interaction. Exactly one
/// instance exists per mounted tool; mutual exclusion of "one active
/// pick" is the structure of this enum, not a lock.
///
/// `Annotating`/`Submitting` carry both the chosen element and the
/// click context by construction, so a submission without either is
/// unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionState {
    Idle,
    Selecting {
        hover: Option<NodeId>,
    },
    Annotating {
        chosen: ElementRef,
        context: ClickContext,
        draft: String,
    },
    Submitting {
        chosen: ElementRef,
        context: ClickContext,
        draft: String,
        attempt: u64,
    },
}

impl Default for SelectionState {
    fn default() -> Self {
        SelectionState::Idle
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SelectionState::Idle)
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self, SelectionState::Selecting { .. })
    }

    pub fn is_annotating(&self) -> bool {
        matches!(self, SelectionState::Annotating { .. })
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, SelectionState::Submitting { .. })
    }

    pub fn hover(&self) -> Option<NodeId> {
        match self {
            SelectionState::Selecting { hover } => *hover,
            _ => None,
        }
    }

    /// `Idle -> Selecting`. Re-arming while already `Selecting` is an
    /// idempotent no-op; any other state refuses. Returns whether the
    /// transition happened.
    pub fn arm(&mut self) -> bool {
        match self {
            SelectionState::Idle => {
                *self = SelectionState::Selecting { hover: None };
                true
            }
            _ => false,
        }
    }

    /// Update the tracked hover candidate while `Selecting`.
    pub fn update_hover(&mut self, target: Option<NodeId>) -> bool {
        match self {
            SelectionState::Selecting { hover } => {
                *hover = target;
                true
            }
            _ => false,
        }
    }

    /// `Selecting -> Annotating` with an atomically captured element
    /// reference and click context.
    pub fn choose(&mut self, chosen: ElementRef, context: ClickContext) -> bool {
        match self {
            SelectionState::Selecting { .. } => {
                *self = SelectionState::Annotating {
                    chosen,
                    context,
                    draft: String::new(),
                };
                true
            }
            _ => false,
        }
    }

    /// `Annotating -> Submitting`, recording the comment as the draft
    /// to preserve across a failed attempt. Returns the submission
    /// payload pieces when the transition applies.
    pub fn begin_submit(
        &mut self,
        comment: String,
        attempt: u64,
    ) -> Option<(ElementRef, ClickContext)> {
        match self {
            SelectionState::Annotating { chosen, context, .. } => {
                let chosen = chosen.clone();
                let context = *context;
                *self = SelectionState::Submitting {
                    chosen: chosen.clone(),
                    context,
                    draft: comment,
                    attempt,
                };
                Some((chosen, context))
            }
            _ => None,
        }
    }

    /// `Submitting -> Annotating` with the draft preserved, applied
    /// only when `attempt` still names the in-flight submission.
    pub fn submit_failed(&mut self, attempt: u64) -> bool {
        match self {
            SelectionState::Submitting {
                chosen,
                context,
                draft,
                attempt: current,
            } if *current == attempt => {
                *self = SelectionState::Annotating {
                    chosen: chosen.clone(),
                    context: *context,
                    draft: draft.clone(),
                };
                true
            }
            _ => false,
        }
    }

    /// Whether the completion of submission `attempt` still applies.
    pub fn owns_submit(&self, attempt: u64) -> bool {
        matches!(self, SelectionState::Submitting { attempt: current, .. } if *current == attempt)
    }

    /// Back to `Idle`, discarding everything captured.
    pub fn reset(&mut self) {
        *self = SelectionState::Idle;
    }
}
