use crate::*;

/// Caller identity and block time of a ledger call
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(caller: Address, timestamp: u64) -> Self {
        CallContext { caller, timestamp }
    }

    /// A call made by `caller` at the current wall-clock time
    pub fn now(caller: Address) -> Self {
        CallContext::new(caller, unix_now())
    }
}

/// Revealed count of a single option
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option_id: usize,
    pub label: String,
    pub count: u64,
}

/// The voting ledger
///
/// Holds every deployed survey and adjudicates phase, deduplication and reveal authorization.
/// Mutating calls take `&mut self`, so they are totally ordered. Each call either commits
/// completely or leaves tallies, voter records and phase exactly as they were: all checks,
/// and the fallible homomorphic merge, happen before anything is written.
pub struct Ledger<B, S = MemStore> {
    backend: B,
    store: S,
    events: Vec<LoggedEvent>,
}

impl<B: FheBackend> Ledger<B, MemStore> {
    pub fn new(backend: B) -> Self {
        Ledger::with_store(backend, MemStore::default())
    }
}

impl<B: FheBackend, S: Store> Ledger<B, S> {
    pub fn with_store(backend: B, store: S) -> Self {
        Ledger::from_parts(backend, store, vec![])
    }

    pub fn from_parts(backend: B, store: S, events: Vec<LoggedEvent>) -> Self {
        Ledger {
            backend,
            store,
            events,
        }
    }

    pub fn into_parts(self) -> (B, S, Vec<LoggedEvent>) {
        (self.backend, self.store, self.events)
    }

    /// Deploy a new survey administered by the caller. Voting opens immediately.
    pub fn create(
        &mut self,
        ctx: &CallContext,
        title: &str,
        options: Vec<String>,
        duration_seconds: u64,
    ) -> Result<Address, LedgerError> {
        if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
            warn!(
                "rejected survey from {}: {} options",
                ctx.caller,
                options.len()
            );
            return Err(LedgerError::InvalidOption);
        }
        if duration_seconds < MIN_DURATION || duration_seconds > MAX_DURATION {
            warn!(
                "rejected survey from {}: duration {}s",
                ctx.caller, duration_seconds
            );
            return Err(LedgerError::InvalidDuration(duration_seconds));
        }

        let tallies = options
            .iter()
            .map(|_| self.backend.zero())
            .collect::<Result<Vec<_>, _>>()?;

        let nonce = self.store.deployments_by(&ctx.caller);
        let address = Address::derive(&ctx.caller, nonce);
        let voting_end = ctx.timestamp.saturating_add(duration_seconds);

        self.store.set_survey(Survey::new(
            address,
            title.to_owned(),
            options,
            ctx.timestamp,
            voting_end,
            ctx.caller,
            tallies,
        ));

        debug!(
            "survey {} '{}' created by {}, open until {}",
            address, title, ctx.caller, voting_end
        );
        Ok(address)
    }

    /// Cast an encrypted ballot for `option_id`, as the caller
    pub fn vote(
        &mut self,
        ctx: &CallContext,
        survey: &Address,
        option_id: usize,
        ciphertext: &CiphertextHandle,
        proof: &Proof,
    ) -> Result<(), LedgerError> {
        let (previous, merged) = {
            let current = self.store.survey(survey)?;

            // An early call is reported as not started, even on a finalized survey
            if ctx.timestamp < current.voting_start() {
                return Err(LedgerError::VotingNotStarted);
            }
            match current.phase_at(ctx.timestamp) {
                Phase::Pending => return Err(LedgerError::VotingNotStarted),
                Phase::Closed | Phase::Finalized => return Err(LedgerError::VotingClosed),
                Phase::Open => {}
            }

            let tally = current
                .tally_handle(option_id)
                .ok_or(LedgerError::InvalidOption)?;

            if current.has_voted(&ctx.caller) {
                return Err(LedgerError::AlreadyVoted);
            }

            if !self
                .backend
                .verify_input(ciphertext, proof, survey, &ctx.caller)
            {
                warn!(
                    "input proof from {} for survey {} failed to verify",
                    ctx.caller, survey
                );
                return Err(LedgerError::InvalidProof);
            }

            (*tally, self.backend.merge(tally, ciphertext)?)
        };

        self.store
            .get_survey_mut(survey)
            .ok_or(LedgerError::UnknownSurvey(*survey))?
            .record_vote(ctx.caller, option_id, merged);

        // Both inputs are folded into the new accumulator
        self.backend.discard(&previous);
        self.backend.discard(ciphertext);

        self.emit(
            *survey,
            Event::VoteCast {
                voter: ctx.caller,
                option_id,
            },
        );
        Ok(())
    }

    /// Close the survey for good and unlock its results. Admin only.
    pub fn finalize(&mut self, ctx: &CallContext, survey: &Address) -> Result<(), LedgerError> {
        let current = self.admin_survey_mut(ctx, survey)?;
        if current.is_finalized() {
            return Err(LedgerError::AlreadyFinalized);
        }
        current.finalize();

        // Tallies are revealed lazily by `get_tally`, nothing is decrypted here
        debug!("survey {} finalized by {}", survey, ctx.caller);
        self.emit(*survey, Event::Finalized);
        Ok(())
    }

    /// Let `viewer` read tallies before finalization. Admin only.
    pub fn grant_view(
        &mut self,
        ctx: &CallContext,
        survey: &Address,
        viewer: &Address,
    ) -> Result<(), LedgerError> {
        self.admin_survey_mut(ctx, survey)?.grant_viewer(*viewer);

        debug!("survey {}: {} may view results", survey, viewer);
        self.emit(*survey, Event::ViewerGranted { viewer: *viewer });
        Ok(())
    }

    /// Accumulated ciphertext of an option, for a requester allowed to see results
    pub fn tally_handle(
        &self,
        requester: &Address,
        survey: &Address,
        option_id: usize,
    ) -> Result<CiphertextHandle, LedgerError> {
        let (current, _) = self.authorize(requester, survey, option_id)?;
        current
            .tally_handle(option_id)
            .copied()
            .ok_or(LedgerError::InvalidOption)
    }

    /// Decrypted count of an option
    pub fn get_tally(
        &self,
        requester: &Address,
        survey: &Address,
        option_id: usize,
    ) -> Result<u64, LedgerError> {
        let (current, auth) = self.authorize(requester, survey, option_id)?;
        let handle = current
            .tally_handle(option_id)
            .ok_or(LedgerError::InvalidOption)?;

        Ok(self.backend.reveal(handle, &auth)?)
    }

    /// Decrypted counts of every option, one entry per option in option order
    ///
    /// Labels need not be unique, so entries are identified by option index.
    pub fn results(
        &self,
        requester: &Address,
        survey: &Address,
    ) -> Result<Vec<OptionTally>, LedgerError> {
        let current = self.store.survey(survey)?;

        current
            .options()
            .iter()
            .enumerate()
            .map(|(option_id, label)| {
                Ok(OptionTally {
                    option_id,
                    label: label.clone(),
                    count: self.get_tally(requester, survey, option_id)?,
                })
            })
            .collect()
    }

    pub fn has_voted(&self, survey: &Address, identity: &Address) -> Result<bool, LedgerError> {
        Ok(self.store.survey(survey)?.has_voted(identity))
    }

    pub fn get_options(&self, survey: &Address) -> Result<&[String], LedgerError> {
        Ok(self.store.survey(survey)?.options())
    }

    pub fn get_survey_info(&self, survey: &Address) -> Result<SurveyInfo, LedgerError> {
        Ok(self.store.survey(survey)?.info())
    }

    pub fn is_voting_open(&self, survey: &Address, now: u64) -> Result<bool, LedgerError> {
        Ok(self.store.survey(survey)?.is_voting_open(now))
    }

    /// Read access to a survey, for the admin/title/votingStart/votingEnd/finalized accessors
    pub fn survey(&self, address: &Address) -> Result<&Survey, LedgerError> {
        self.store.survey(address)
    }

    pub fn surveys(&self) -> Vec<&Survey> {
        self.store
            .addresses()
            .iter()
            .filter_map(|address| self.store.get_survey(address))
            .collect()
    }

    /// Every event emitted so far, in commit order
    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    /// Events emitted by one survey, in commit order
    pub fn events_for<'a>(&'a self, survey: &'a Address) -> impl Iterator<Item = &'a Event> + 'a {
        self.events
            .iter()
            .filter(move |logged| &logged.survey == survey)
            .map(|logged| &logged.event)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn authorize(
        &self,
        requester: &Address,
        survey: &Address,
        option_id: usize,
    ) -> Result<(&Survey, Authorization), LedgerError> {
        let current = self.store.survey(survey)?;
        if option_id >= current.options_count() {
            return Err(LedgerError::InvalidOption);
        }

        let grounds = current
            .reveal_grounds(requester)
            .ok_or(LedgerError::ResultsLocked)?;

        Ok((current, Authorization::new(*survey, *requester, grounds)))
    }

    fn admin_survey_mut(
        &mut self,
        ctx: &CallContext,
        survey: &Address,
    ) -> Result<&mut Survey, LedgerError> {
        let current = self
            .store
            .get_survey_mut(survey)
            .ok_or(LedgerError::UnknownSurvey(*survey))?;

        if current.admin() != &ctx.caller {
            warn!("{} is not the admin of survey {}", ctx.caller, survey);
            return Err(LedgerError::NotAuthorized);
        }
        Ok(current)
    }

    fn emit(&mut self, survey: Address, event: Event) {
        info!("survey {}: {}", survey, event);
        self.events.push(LoggedEvent { survey, event });
    }
}
