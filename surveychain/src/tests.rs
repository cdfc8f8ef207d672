use super::*;
use std::sync::{Arc, RwLock};

const START: u64 = 1_700_000_000;
const WEEK: u64 = 7 * 24 * 60 * 60;

fn five_options() -> Vec<String> {
    vec![
        "Very Satisfied".to_owned(),
        "Satisfied".to_owned(),
        "Neutral".to_owned(),
        "Dissatisfied".to_owned(),
        "Very Dissatisfied".to_owned(),
    ]
}

fn encrypt(
    coprocessor: &LocalCoprocessor,
    survey: &Address,
    voter: &Address,
) -> (CiphertextHandle, Proof) {
    let raw = coprocessor.encrypt_u64(survey, voter, VOTE_WEIGHT).unwrap();
    (
        CiphertextHandle::from_slice(&raw.handles[0]).unwrap(),
        Proof::new(raw.input_proof),
    )
}

#[test]
fn end_to_end_survey() {
    let coprocessor = Arc::new(LocalCoprocessor::new());
    let mut ledger = Ledger::new(coprocessor.clone());

    let admin = Address::random();
    let v = Address::random();
    let w = Address::random();

    // Deploy a 5-option survey, open for 7 days
    let survey = ledger
        .create(
            &CallContext::new(admin, START),
            "Community Sentiment Survey",
            five_options(),
            WEEK,
        )
        .unwrap();

    let info = ledger.get_survey_info(&survey).unwrap();
    assert_eq!(info.start_time, START);
    assert_eq!(info.end_time, START + WEEK);
    assert_eq!(info.options_count, 5);
    assert!(!info.finalized);
    assert_eq!(ledger.survey(&survey).unwrap().admin(), &admin);

    // V votes for option 0
    let (handle, proof) = encrypt(&coprocessor, &survey, &v);
    ledger
        .vote(&CallContext::new(v, START + 1), &survey, 0, &handle, &proof)
        .unwrap();
    assert!(ledger.has_voted(&survey, &v).unwrap());
    assert_eq!(
        ledger.events_for(&survey).last(),
        Some(&Event::VoteCast {
            voter: v,
            option_id: 0
        })
    );

    // V cannot vote again, even for another option
    let (handle, proof) = encrypt(&coprocessor, &survey, &v);
    assert_eq!(
        ledger.vote(&CallContext::new(v, START + 2), &survey, 1, &handle, &proof),
        Err(LedgerError::AlreadyVoted)
    );

    // W arrives after the window closed
    let (handle, proof) = encrypt(&coprocessor, &survey, &w);
    assert_eq!(
        ledger.vote(
            &CallContext::new(w, START + WEEK + 1),
            &survey,
            0,
            &handle,
            &proof
        ),
        Err(LedgerError::VotingClosed)
    );
    assert!(!ledger.has_voted(&survey, &w).unwrap());

    // Results stay locked until the admin finalizes
    assert_eq!(
        ledger.get_tally(&admin, &survey, 0),
        Err(LedgerError::ResultsLocked)
    );
    ledger
        .finalize(&CallContext::new(admin, START + WEEK + 1), &survey)
        .unwrap();
    assert_eq!(ledger.events_for(&survey).last(), Some(&Event::Finalized));

    assert_eq!(ledger.get_tally(&admin, &survey, 0), Ok(1));
    for option_id in 1..5 {
        assert_eq!(ledger.get_tally(&w, &survey, option_id), Ok(0));
    }
    assert_eq!(
        ledger.get_tally(&admin, &survey, 5),
        Err(LedgerError::InvalidOption)
    );

    let events: Vec<String> = ledger.events().iter().map(|e| e.event.to_string()).collect();
    assert_eq!(
        events,
        vec![format!("VoteCast({}, 0)", v), "Finalized()".to_owned()]
    );
}

#[tokio::test]
async fn end_to_end_through_gateway() {
    let coprocessor = Arc::new(LocalCoprocessor::new());
    let loader = Arc::new(LocalLoader::new(coprocessor.clone()));
    let ledger = RwLock::new(Ledger::new(coprocessor));

    let admin = Address::random();
    let survey = ledger
        .write()
        .unwrap()
        .create(
            &CallContext::new(admin, START),
            "Community Sentiment Survey",
            five_options(),
            WEEK,
        )
        .unwrap();

    let profile = NetworkProfile::local();
    let gateway = Arc::new(EncryptionGateway::new(profile.clone(), loader.clone()));
    gateway.connect(WalletContext {
        account: admin,
        chain_id: profile.chain_id,
    });

    let v = SurveyClient::new(Address::random(), gateway.clone());
    v.cast_ballot(&ledger, &survey, 0, START + 1).await.unwrap();

    let err = v.cast_ballot(&ledger, &survey, 1, START + 2).await.unwrap_err();
    assert!(matches!(err, ClientError::Ledger(LedgerError::AlreadyVoted)));

    let w = SurveyClient::new(Address::random(), gateway.clone());
    let err = w
        .cast_ballot(&ledger, &survey, 0, START + WEEK + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Ledger(LedgerError::VotingClosed)));

    // Grant an analyst early access, then finalize
    let analyst = SurveyClient::new(Address::random(), gateway.clone());
    ledger
        .write()
        .unwrap()
        .grant_view(&CallContext::new(admin, START + 3), &survey, analyst.identity())
        .unwrap();
    assert_eq!(analyst.read_tally(&ledger, &survey, 0).await.unwrap(), 1);

    ledger
        .write()
        .unwrap()
        .finalize(&CallContext::new(admin, START + WEEK + 1), &survey)
        .unwrap();
    assert_eq!(w.read_tally(&ledger, &survey, 0).await.unwrap(), 1);
    assert_eq!(w.read_tally(&ledger, &survey, 4).await.unwrap(), 0);

    // One toolkit load served every ballot and every reveal
    assert_eq!(loader.load_count(), 1);
}
