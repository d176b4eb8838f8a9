/// Events fed into the purchase flow from background sources.
///
/// Out-of-band checkout completion reaches the flow either through a poll
/// confirmation here or through a received-packs update; both end in the
/// same guarded transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Poll(PollEvent),
    /// The received packs loaded after login and the settle delay elapsed.
    LoginSettled { generation: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Confirmed { generation: u64 },
    CheckFailed { generation: u64, message: String },
}

impl PollEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Confirmed { generation } | Self::CheckFailed { generation, .. } => *generation,
        }
    }
}
