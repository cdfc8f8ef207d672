use crate::*;
use std::collections::BTreeSet;

/// Minimum number of options a survey may offer
pub const MIN_OPTIONS: usize = 2;

/// Maximum number of options a survey may offer
pub const MAX_OPTIONS: usize = 32;

/// Shortest allowed voting window, in seconds (1 hour)
pub const MIN_DURATION: u64 = 60 * 60;

/// Longest allowed voting window, in seconds (30 days)
pub const MAX_DURATION: u64 = 30 * 24 * 60 * 60;

/// Lifecycle position of a survey
///
/// Only `Finalized` is stored. The other phases are derived from the voting window, so the
/// phase of a survey never moves backward as time advances.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    Pending = 0,
    Open = 1,
    Closed = 2,
    Finalized = 3,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Phase::Pending => "pending",
            Phase::Open => "open",
            Phase::Closed => "closed",
            Phase::Finalized => "finalized",
        };
        write!(f, "{}", name)
    }
}

/// A deployed survey and its encrypted tallies
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Survey {
    address: Address,
    title: String,
    options: Vec<String>,
    voting_start: u64,
    voting_end: u64,
    admin: Address,
    finalized: bool,

    /// One accumulator per option, in option order
    tallies: Vec<CiphertextHandle>,
    voters: BTreeSet<Address>,
    viewers: BTreeSet<Address>,
}

/// Summary returned by `getSurveyInfo`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyInfo {
    pub title: String,
    pub start_time: u64,
    pub end_time: u64,
    pub finalized: bool,
    pub options_count: usize,
}

impl Survey {
    pub(crate) fn new(
        address: Address,
        title: String,
        options: Vec<String>,
        voting_start: u64,
        voting_end: u64,
        admin: Address,
        tallies: Vec<CiphertextHandle>,
    ) -> Self {
        debug_assert_eq!(options.len(), tallies.len());
        Survey {
            address,
            title,
            options,
            voting_start,
            voting_end,
            admin,
            finalized: false,
            tallies,
            voters: BTreeSet::new(),
            viewers: BTreeSet::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn options_count(&self) -> usize {
        self.options.len()
    }

    pub fn voting_start(&self) -> u64 {
        self.voting_start
    }

    pub fn voting_end(&self) -> u64 {
        self.voting_end
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Phase of the survey at `now`
    pub fn phase_at(&self, now: u64) -> Phase {
        if self.finalized {
            Phase::Finalized
        } else if now < self.voting_start {
            Phase::Pending
        } else if now > self.voting_end {
            Phase::Closed
        } else {
            Phase::Open
        }
    }

    /// Ballots are accepted in `[voting_start, voting_end]` until the survey is finalized
    pub fn is_voting_open(&self, now: u64) -> bool {
        self.phase_at(now) == Phase::Open
    }

    pub fn has_voted(&self, identity: &Address) -> bool {
        self.voters.contains(identity)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn is_viewer(&self, identity: &Address) -> bool {
        self.viewers.contains(identity)
    }

    /// Current accumulator ciphertext of an option
    pub fn tally_handle(&self, option_id: usize) -> Option<&CiphertextHandle> {
        self.tallies.get(option_id)
    }

    pub fn info(&self) -> SurveyInfo {
        SurveyInfo {
            title: self.title.clone(),
            start_time: self.voting_start,
            end_time: self.voting_end,
            finalized: self.finalized,
            options_count: self.options.len(),
        }
    }

    /// Why `requester` may reveal tallies, if at all
    pub(crate) fn reveal_grounds(&self, requester: &Address) -> Option<RevealGrounds> {
        if self.finalized {
            Some(RevealGrounds::Finalized)
        } else if self.viewers.contains(requester) {
            Some(RevealGrounds::ViewerGrant)
        } else {
            None
        }
    }

    pub(crate) fn record_vote(&mut self, voter: Address, option_id: usize, merged: CiphertextHandle) {
        self.tallies[option_id] = merged;
        self.voters.insert(voter);
    }

    pub(crate) fn grant_viewer(&mut self, viewer: Address) {
        self.viewers.insert(viewer);
    }

    pub(crate) fn finalize(&mut self) {
        self.finalized = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(start: u64, end: u64) -> Survey {
        Survey::new(
            Address::random(),
            "Test".to_owned(),
            vec!["Yes".to_owned(), "No".to_owned()],
            start,
            end,
            Address::random(),
            vec![CiphertextHandle::new([0; HANDLE_LEN]); 2],
        )
    }

    #[test]
    fn phase_follows_window() {
        let mut survey = survey(100, 200);
        assert_eq!(survey.phase_at(99), Phase::Pending);
        assert_eq!(survey.phase_at(100), Phase::Open);
        assert_eq!(survey.phase_at(200), Phase::Open);
        assert_eq!(survey.phase_at(201), Phase::Closed);
        assert!(survey.is_voting_open(150));
        assert!(!survey.is_voting_open(201));

        survey.finalize();
        for now in &[0, 150, 300] {
            assert_eq!(survey.phase_at(*now), Phase::Finalized);
        }
    }

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Pending < Phase::Open);
        assert!(Phase::Open < Phase::Closed);
        assert!(Phase::Closed < Phase::Finalized);
        assert_eq!(Phase::Finalized as u8, 3);
        assert_eq!(Phase::Closed.to_string(), "closed");
    }

    #[test]
    fn info_uses_camel_case() {
        let survey = survey(100, 200);
        let json = serde_json::to_value(survey.info()).unwrap();
        assert_eq!(json["startTime"], 100);
        assert_eq!(json["endTime"], 200);
        assert_eq!(json["optionsCount"], 2);
        assert_eq!(json["finalized"], false);
    }
}
