use crate::*;

/// Signals emitted by the ledger
///
/// A `VoteCast` carries only the voter and the chosen option index, never any plaintext weight.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Event {
    VoteCast { voter: Address, option_id: usize },
    ViewerGranted { viewer: Address },
    Finalized,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Event::VoteCast { voter, option_id } => write!(f, "VoteCast({}, {})", voter, option_id),
            Event::ViewerGranted { viewer } => write!(f, "ViewerGranted({})", viewer),
            Event::Finalized => write!(f, "Finalized()"),
        }
    }
}

/// An event tagged with the survey that emitted it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LoggedEvent {
    pub survey: Address,
    pub event: Event,
}
