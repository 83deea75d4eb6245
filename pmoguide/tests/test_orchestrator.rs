mod common;

use std::sync::Arc;
use std::thread;

use common::{FakeFeed, airing, program};
use pmoguide::{
    CacheKey, CollectingDiagnostics, DecodeError, EntityCache, FailureReason, FetchError,
    FetchOrchestrator, Resource, Station, TransportError,
};
use serde_json::json;

fn feed_with_programs(count: usize) -> FakeFeed {
    (0..count).fold(FakeFeed::new(), |feed, i| {
        feed.with_program(program(&format!("EP{:08}0001", i)))
    })
}

fn program_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("EP{:08}0001", i)).collect()
}

#[test]
fn test_second_fetch_is_served_from_cache() {
    let orchestrator = FetchOrchestrator::new(feed_with_programs(3));
    let requested = program_ids(3);

    let first = orchestrator.fetch_programs(&requested).unwrap();
    assert_eq!(orchestrator.transport().calls(), 1);

    let second = orchestrator.fetch_programs(&requested).unwrap();
    assert_eq!(orchestrator.transport().calls(), 1);
    assert_eq!(first, second);
    assert!(second.is_complete());
}

#[test]
fn test_all_misses_cost_one_batch() {
    let orchestrator = FetchOrchestrator::new(feed_with_programs(25));
    let requested = program_ids(25);

    let batch = orchestrator.fetch_programs(&requested).unwrap();
    assert_eq!(batch.len(), 25);
    assert_eq!(orchestrator.transport().calls(), 1);
    assert_eq!(orchestrator.transport().last_request().ids, requested);
}

#[test]
fn test_only_misses_are_requested() {
    let orchestrator = FetchOrchestrator::new(feed_with_programs(4));
    let requested = program_ids(4);

    orchestrator.fetch_programs(&requested[..2]).unwrap();
    let batch = orchestrator.fetch_programs(&requested).unwrap();

    assert_eq!(orchestrator.transport().calls(), 2);
    assert_eq!(orchestrator.transport().last_request().ids, requested[2..].to_vec());
    // request order is kept, hits and fresh entities alike
    let keys: Vec<&String> = batch.entities.keys().collect();
    assert_eq!(keys, requested.iter().collect::<Vec<_>>());
}

#[test]
fn test_one_malformed_record_among_ten() {
    let mut feed = feed_with_programs(10);
    let broken = program_ids(10)[4].clone();
    feed.programs
        .get_mut(&broken)
        .unwrap()
        .as_object_mut()
        .unwrap()
        .remove("md5");

    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let orchestrator = FetchOrchestrator::builder(feed)
        .diagnostics(diagnostics.clone())
        .build();

    let batch = orchestrator.fetch_programs(&program_ids(10)).unwrap();
    assert_eq!(batch.len(), 9);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].id, broken);
    assert_eq!(
        batch.failures[0].decode_error(),
        Some(&DecodeError::missing("Program", "md5"))
    );

    let reports = diagnostics.take();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, broken);

    // failures are not cached: only the failed id goes upstream again
    let again = orchestrator.fetch_programs(&program_ids(10)).unwrap();
    assert_eq!(again.len(), 9);
    assert_eq!(orchestrator.transport().calls(), 2);
    assert_eq!(orchestrator.transport().last_request().ids, vec![broken]);
}

#[test]
fn test_record_with_unreadable_id_counts_once() {
    let mut feed = feed_with_programs(10);
    let broken = program_ids(10)[4].clone();
    feed.programs.get_mut(&broken).unwrap()["programID"] = json!({"oops": 1});

    let orchestrator = FetchOrchestrator::new(feed);
    let batch = orchestrator.fetch_programs(&program_ids(10)).unwrap();
    assert_eq!(batch.len(), 9);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].id, broken);
    assert!(matches!(
        batch.failures[0].decode_error(),
        Some(DecodeError::MalformedField { .. })
    ));
}

#[test]
fn test_queued_and_missing_programs() {
    let feed = FakeFeed::new()
        .with_program(program("EP000000010001"))
        .with_program(json!({
            "programID": "EP000000020001",
            "code": 6001,
            "message": "Program ID queued for generation.",
        }));
    let orchestrator = FetchOrchestrator::new(feed);

    let batch = orchestrator
        .fetch_programs(&["EP000000010001", "EP000000020001", "EP000000030001"])
        .unwrap();
    assert_eq!(batch.len(), 1);
    assert!(matches!(
        batch.failure("EP000000020001").unwrap().reason,
        FailureReason::Upstream { code: 6001, .. }
    ));
    assert_eq!(
        batch.failure("EP000000030001").unwrap().reason,
        FailureReason::NotReturned
    );
}

#[test]
fn test_transport_failure_is_fatal() {
    let feed = feed_with_programs(2);
    feed.set_offline(true);
    let orchestrator = FetchOrchestrator::new(feed);

    let err = orchestrator.fetch_programs(&program_ids(2)).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        FetchError::TransportFailure(TransportError::Connectivity(_))
    ));
    assert_eq!(orchestrator.cache().stats().programs_count, 0);

    orchestrator.transport().set_offline(false);
    assert_eq!(orchestrator.fetch_programs(&program_ids(2)).unwrap().len(), 2);
}

#[test]
fn test_fetch_program_and_series() {
    let feed = FakeFeed::new()
        .with_program(program("EP012345670023"))
        .with_program(program("SH012345670000"));
    let orchestrator = FetchOrchestrator::new(feed);

    let episode = orchestrator.fetch_program("EP012345670023").unwrap();
    let series = orchestrator.resolve_series(&episode).unwrap().unwrap();
    assert_eq!(series.id, "SH012345670000");
    assert_eq!(orchestrator.resolve_series(&series).unwrap(), None);

    let err = orchestrator.fetch_program("EP999999990001").unwrap_err();
    assert!(!err.is_fatal());
}

#[test]
fn test_airings_prefetch_programs_in_one_batch() {
    let feed = FakeFeed::new()
        .with_program(program("EP000000010001"))
        .with_program(program("EP000000020001"))
        .with_program(program("SH000000030000"))
        .with_schedule(
            "10021",
            vec![
                airing("EP000000020001", "2014-06-28T14:00:00Z"),
                airing("EP000000010001", "2014-06-28T13:00:00Z"),
            ],
        )
        .with_schedule(
            "10022",
            vec![
                airing("EP000000010001", "2014-06-28T13:00:00Z"),
                airing("SH000000030000", "2014-06-28T13:30:00Z"),
            ],
        );
    let orchestrator = FetchOrchestrator::new(feed);
    let stations = vec![
        Arc::new(Station::new("10021", "WAAA", "Station A")),
        Arc::new(Station::new("10022", "WBBB", "Station B")),
    ];

    let batch = orchestrator.fetch_station_airings(&stations).unwrap();
    assert!(batch.is_complete());
    assert_eq!(orchestrator.transport().calls(), 2);

    let requests = orchestrator.transport().requests();
    assert_eq!(requests[0].resource, Resource::Schedules);
    assert_eq!(requests[1].resource, Resource::Programs);
    assert_eq!(requests[1].ids.len(), 3);

    let first = batch.get("10021").unwrap();
    assert_eq!(first.len(), 2);
    // sorted by start time
    assert_eq!(first[0].id(), "EP000000010001");
    assert!(first.iter().all(|a| a.id() == a.program().id));
    assert!(first[0].flags().closed_captioned);

    // the shared program is one shared entity
    let other = batch.get("10022").unwrap();
    assert!(Arc::ptr_eq(first[0].program(), other[0].program()));

    orchestrator.fetch_station_airings(&stations).unwrap();
    assert_eq!(orchestrator.transport().calls(), 2);
}

#[test]
fn test_cached_programs_skip_the_nested_batch() {
    let feed = FakeFeed::new()
        .with_program(program("EP000000010001"))
        .with_schedule("10021", vec![airing("EP000000010001", "2014-06-28T13:00:00Z")]);
    let orchestrator = FetchOrchestrator::new(feed);
    orchestrator.fetch_program("EP000000010001").unwrap();

    let stations = vec![Arc::new(Station::new("10021", "WAAA", "Station A"))];
    let batch = orchestrator.fetch_station_airings(&stations).unwrap();
    assert_eq!(batch.get("10021").unwrap().len(), 1);
    assert_eq!(orchestrator.transport().calls(), 2);
}

#[test]
fn test_airing_with_unresolved_program() {
    let feed = FakeFeed::new()
        .with_program(program("EP000000010001"))
        .with_schedule(
            "10021",
            vec![
                airing("EP000000010001", "2014-06-28T13:00:00Z"),
                airing("EP000000090001", "2014-06-28T13:30:00Z"),
                json!({"programID": "EP000000010001", "duration": 1800}),
            ],
        );
    let orchestrator = FetchOrchestrator::new(feed);
    let stations = vec![Arc::new(Station::new("10021", "WAAA", "Station A"))];

    let batch = orchestrator.fetch_station_airings(&stations).unwrap();
    assert_eq!(batch.get("10021").unwrap().len(), 1);
    assert_eq!(batch.failures.len(), 2);
    assert_eq!(
        batch.failure("10021/EP000000090001").unwrap().reason,
        FailureReason::MissingProgram {
            program_id: "EP000000090001".into()
        }
    );
    assert_eq!(
        batch.failure("10021/EP000000010001").unwrap().decode_error(),
        Some(&DecodeError::missing("Airing", "airDateTime"))
    );

    // an incomplete schedule is fetched again next time
    orchestrator.fetch_station_airings(&stations).unwrap();
    let schedule_calls = orchestrator
        .transport()
        .requests()
        .iter()
        .filter(|r| r.resource == Resource::Schedules)
        .count();
    assert_eq!(schedule_calls, 2);
}

#[test]
fn test_unknown_vocabulary_still_resolves() {
    let mut raw = program("MV000000010000");
    raw["colorCode"] = json!("Sepia Hologram");
    raw["cast"] = json!([{"role": "Chief Vibes Officer", "name": "Jane Doe", "billingOrder": "01"}]);
    let feed = FakeFeed::new().with_program(raw);
    let orchestrator = FetchOrchestrator::new(feed);

    let movie = orchestrator.fetch_program("MV000000010000").unwrap();
    assert!(movie.color_code.is_unknown());
    assert!(movie.credits[0].role.is_unknown());
    assert_eq!(movie.credits[0].role_text, "Chief Vibes Officer");
}

#[test]
fn test_bypassing_cache_reads() {
    let orchestrator = FetchOrchestrator::builder(feed_with_programs(3))
        .use_cache(false)
        .build();
    orchestrator.fetch_programs(&program_ids(3)).unwrap();
    orchestrator.fetch_programs(&program_ids(3)).unwrap();
    assert_eq!(orchestrator.transport().calls(), 2);
    assert_eq!(orchestrator.transport().last_request().ids.len(), 3);
    assert_eq!(orchestrator.cache().stats().programs_count, 3);
}

#[test]
fn test_purge_forces_refetch() {
    let orchestrator = FetchOrchestrator::new(feed_with_programs(2));
    let requested = program_ids(2);
    orchestrator.fetch_programs(&requested).unwrap();

    orchestrator.purge(&CacheKey::program(requested[0].clone()));
    orchestrator.purge(&CacheKey::station(requested[1].clone()));
    orchestrator.fetch_programs(&requested).unwrap();
    assert_eq!(
        orchestrator.transport().last_request().ids,
        vec![requested[0].clone()]
    );

    orchestrator.purge_cache();
    orchestrator.fetch_programs(&requested).unwrap();
    assert_eq!(orchestrator.transport().last_request().ids, requested);
}

#[test]
fn test_shared_cache_between_orchestrators() {
    let cache = Arc::new(EntityCache::new());
    let first = FetchOrchestrator::builder(feed_with_programs(2))
        .cache(cache.clone())
        .build();
    let second = FetchOrchestrator::builder(feed_with_programs(2))
        .cache(cache.clone())
        .build();

    first.fetch_programs(&program_ids(2)).unwrap();
    second.fetch_programs(&program_ids(2)).unwrap();
    assert_eq!(second.transport().calls(), 0);
}

#[test]
fn test_concurrent_callers() {
    let orchestrator = FetchOrchestrator::new(feed_with_programs(20));
    let requested = program_ids(20);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| orchestrator.fetch_programs(&requested).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|batch| batch.len() == 20));
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(orchestrator.transport().calls() <= 8);
    assert_eq!(orchestrator.cache().stats().programs_count, 20);
}
