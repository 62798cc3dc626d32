mod common;

use common::{Session, StaticSite, VIEWER, config};
use harvest::discovery::{self, SessionOption};
use harvest::http::HttpPage;
use harvest::{BrowserError, HarvestError, RunContext, StepError, summary, tally};
use senate_core::xml::ParseError;
use senate_core::{MemoryStore, VoteStore};
use std::sync::Arc;

fn sessions() -> Vec<Session> {
    vec![
        Session::new("118", "2", "2024", &["00001", "00002"]),
        Session::new("118", "1", "2023", &["00001", "00002", "00003"]),
        Session::new("117", "2", "2022", &["00001"]),
    ]
}

fn page(site: &Arc<StaticSite>) -> HttpPage {
    HttpPage::new(site.clone(), VIEWER)
}

#[tokio::test]
async fn discovery_skips_the_placeholder_option() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    let ctx = RunContext::new(config(dir.path()));

    let found = discovery::discover_sessions(&ctx, &mut page(&site)).await.unwrap();
    let expected: Vec<SessionOption> = sessions()
        .iter()
        .map(|s| SessionOption {
            value: s.value(),
            label: s.label(),
        })
        .collect();
    assert_eq!(found, expected);
}

#[tokio::test]
async fn discovery_fails_when_the_dropdown_never_appears() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    site.put("/votes_new.htm", "<html><body><p>maintenance</p></body></html>");
    let ctx = RunContext::new(config(dir.path()));

    let err = discovery::discover_sessions(&ctx, &mut page(&site))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Discovery {
            source: BrowserError::WaitTimeout { .. }
        }
    ));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn summary_harvest_tags_records_with_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    let ctx = RunContext::new(config(dir.path()));
    let store = MemoryStore::new();
    let all = sessions();
    let target = &all[1];
    let expected = SessionOption {
        value: target.value(),
        label: target.label(),
    };

    let harvested = summary::harvest_session(&ctx, &mut page(&site), &store, 1, &expected)
        .await
        .unwrap();

    assert_eq!(harvested.session, expected);
    assert_eq!(harvested.candidates, 3);
    let numbers: Vec<_> = harvested.fresh.iter().map(|s| s.vote_number.as_str()).collect();
    assert_eq!(numbers, ["00001", "00002", "00003"]);
    for record in &harvested.fresh {
        assert_eq!(record.congress, "118");
        assert_eq!(record.session, "1");
        assert_eq!(record.congress_year, "2023");
        assert_eq!(record.url, "/menu_118_1.htm");
        assert_eq!(record.issue, format!("S. {}", record.vote_number));
    }
}

#[tokio::test]
async fn repeated_summary_harvest_yields_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    let ctx = RunContext::new(config(dir.path()));
    let store = MemoryStore::new();
    let all = sessions();
    let target = &all[0];
    let expected = SessionOption {
        value: target.value(),
        label: target.label(),
    };

    let first = summary::harvest_session(&ctx, &mut page(&site), &store, 0, &expected)
        .await
        .unwrap();
    store.insert_many_summaries(&first.fresh).await.unwrap();

    let second = summary::harvest_session(&ctx, &mut page(&site), &store, 0, &expected)
        .await
        .unwrap();
    assert_eq!(second.candidates, 2);
    assert!(second.fresh.is_empty());
}

#[tokio::test]
async fn summary_harvest_keeps_only_votes_past_the_stored_maximum() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&[Session::new("118", "1", "2023", &["00001", "00009"])]);
    let ctx = RunContext::new(config(dir.path()));
    let store = MemoryStore::new();
    let session = Session::new("118", "1", "2023", &["00001", "00009", "00010", "00011"]);
    let expected = SessionOption {
        value: session.value(),
        label: session.label(),
    };

    let first = summary::harvest_session(&ctx, &mut page(&site), &store, 0, &expected)
        .await
        .unwrap();
    store.insert_many_summaries(&first.fresh).await.unwrap();

    site.publish(&[session]);
    let second = summary::harvest_session(&ctx, &mut page(&site), &store, 0, &expected)
        .await
        .unwrap();
    let numbers: Vec<_> = second.fresh.iter().map(|s| s.vote_number.as_str()).collect();
    assert_eq!(numbers, ["00010", "00011"]);
}

#[tokio::test]
async fn summary_failure_is_fatal_and_captured() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    site.put("/menu_118_1.xml", "<vote_summary><votes>");
    let ctx = RunContext::new(config(dir.path()));
    let store = MemoryStore::new();
    let all = sessions();
    let target = &all[1];
    let expected = SessionOption {
        value: target.value(),
        label: target.label(),
    };

    let err = summary::harvest_session(&ctx, &mut page(&site), &store, 1, &expected)
        .await
        .unwrap_err();
    assert!(!err.is_recoverable());
    let HarvestError::SummaryHarvest {
        session,
        screenshot,
        source,
    } = err
    else {
        panic!("expected a summary harvest error");
    };
    assert_eq!(session, target.label());
    assert!(matches!(source, StepError::Parse(ParseError::Structure(_))));

    let screenshot = screenshot.expect("failure is captured");
    assert!(screenshot.starts_with(dir.path().join("summary")));
    assert!(screenshot.exists());
}

#[tokio::test]
async fn summary_for_a_vanished_session_reports_what_is_left() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    let ctx = RunContext::new(config(dir.path()));
    let store = MemoryStore::new();
    let expected = SessionOption {
        value: "/menu_116_1.htm".to_string(),
        label: "116 Congress, Session 1".to_string(),
    };

    let err = summary::harvest_session(&ctx, &mut page(&site), &store, 7, &expected)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarvestError::SummaryHarvest {
            source: StepError::SessionMissing {
                index: 7,
                available: 3
            },
            ..
        }
    ));
}

#[tokio::test]
async fn tally_harvest_stamps_members_with_the_vote() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    let ctx = RunContext::new(config(dir.path()));
    let all = sessions();
    let target = &all[1];
    let expected = SessionOption {
        value: target.value(),
        label: target.label(),
    };
    let store = MemoryStore::new();
    let harvested = summary::harvest_session(&ctx, &mut page(&site), &store, 1, &expected)
        .await
        .unwrap();
    let vote = &harvested.fresh[1];

    let tallies = tally::harvest_vote(&ctx, &mut page(&site), vote).await.unwrap();
    assert_eq!(tallies.len(), 2);
    assert_eq!(tallies[0].name, "Jane Doe");
    assert_eq!(tallies[0].vote_cast, "Yea");
    assert_eq!(tallies[1].name, "John Roe");
    assert_eq!(tallies[1].state, "TX");
    for tally in &tallies {
        assert_eq!(tally.issue, "S. 00002");
        assert_eq!(tally.title, vote.title);
    }
    assert!(
        site.hits()
            .contains(&format!("{}/votes/118-1-00002.htm", common::ORIGIN))
    );
}

#[tokio::test]
async fn tally_failure_is_recoverable_and_captured() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    site.fail("/votes/118-2-00001.htm");
    let ctx = RunContext::new(config(dir.path()));
    let vote = senate_core::VoteSummary {
        congress: "118".to_string(),
        congress_year: "2024".to_string(),
        issue: "S. 00001".to_string(),
        session: "2".to_string(),
        title: "Vote 00001 of 2".to_string(),
        vote_number: "00001".to_string(),
        vote_date: "01-Mar".to_string(),
        url: "/menu_118_2.htm".to_string(),
    };

    let err = tally::harvest_vote(&ctx, &mut page(&site), &vote)
        .await
        .unwrap_err();
    assert!(err.is_recoverable());
    let HarvestError::TallyHarvest {
        vote: label,
        url,
        screenshot,
        source,
    } = err
    else {
        panic!("expected a tally harvest error");
    };
    assert_eq!(label, "118-2 vote 00001");
    assert_eq!(url, format!("{}/votes/118-2-00001.htm", common::ORIGIN));
    assert!(matches!(
        source,
        StepError::Browser(BrowserError::Status { status: 500, .. })
    ));
    assert!(screenshot.is_some_and(|path| path.starts_with(dir.path().join("tally"))));
}

#[tokio::test]
async fn tally_page_without_export_link_is_a_missing_element() {
    let dir = tempfile::tempdir().unwrap();
    let site = StaticSite::with_sessions(&sessions());
    site.put("/votes/117-2-00001.htm", "<html><body>no export</body></html>");
    let ctx = RunContext::new(config(dir.path()));
    let vote = senate_core::VoteSummary {
        congress: "117".to_string(),
        session: "2".to_string(),
        vote_number: "00001".to_string(),
        ..Default::default()
    };

    let err = tally::harvest_vote(&ctx, &mut page(&site), &vote)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarvestError::TallyHarvest {
            source: StepError::MissingElement(_),
            ..
        }
    ));
}
