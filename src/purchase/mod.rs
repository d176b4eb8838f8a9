mod attempt;
mod event;
mod flow;
mod poller;

#[cfg(test)]
mod tests;

pub use attempt::{FailureKind, PurchaseAttempt, PurchaseDialogView, PurchaseStatus};
pub use event::{FlowEvent, PollEvent};
pub use flow::{BeginOutcome, FlowServices, FlowTransition, PurchaseFlowController};
pub use poller::{PollJob, PurchasePoller};
