//! End-to-end tests for the esports schedule crawler

use crate::common::{read_json, TestEnv};
use chrono::Utc;
use lol_ingest::crawler::{EsportsCrawler, GAMES_META_FILE};
use lol_ingest::{ApiContext, ConfigError, Credentials};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GW: &str = "/persisted/gw";

fn recent() -> String {
    (Utc::now() - chrono::Duration::days(1)).to_rfc3339()
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{}/getLeagues", GW)))
        .and(header("x-api-key", "test-esports-key"))
        .and(query_param("hl", "en-US"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"leagues": [
                {"id": "L1", "slug": "lck", "name": "LCK"},
                {"id": "L2", "slug": "lec", "name": "LEC"}
            ]}
        })))
        .mount(server)
        .await;
}

/// L1 schedule: e1 and e3 are recent, e2 is old, e1 is listed twice
async fn mount_schedule(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{}/getSchedule", GW)))
        .and(query_param("leagueId", "L1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"schedule": {"events": [
                {"id": "e1", "startTime": recent(), "state": "completed"},
                {"id": "e2", "startTime": "2001-01-01T00:00:00Z", "state": "completed"},
                {"startTime": recent(), "match": {"id": "e3"}},
                {"id": "e1", "startTime": recent()}
            ], "pages": {}}}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/getSchedule", GW)))
        .and(query_param("leagueId", "L2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(server)
        .await;
}

fn event_body(event_id: &str, games: Value, league: Option<&str>) -> Value {
    let mut event = json!({"id": event_id, "match": {"games": games}});
    if let Some(slug) = league {
        event["league"] = json!({"slug": slug});
    }
    json!({"data": {"event": event}})
}

async fn mount_events(server: &MockServer, e1_expect: u64, e3_expect: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{}/getEventDetails", GW)))
        .and(query_param("id", "e1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(event_body(
            "e1",
            json!([
                {"id": "g1", "state": "completed"},
                {"id": "g2", "state": "unscheduled"}
            ]),
            Some("lck"),
        )))
        .expect(e1_expect)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/getEventDetails", GW)))
        .and(query_param("id", "e3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(event_body(
            "e3",
            json!([{"id": "g3", "state": "inProgress"}]),
            None,
        )))
        .expect(e3_expect)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/getEventDetails", GW)))
        .and(query_param("id", "e2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(server)
        .await;
}

fn lck_env(server: &MockServer) -> TestEnv {
    TestEnv::with_config(&server.uri(), |config| {
        config.esports.league_slugs = vec!["lck".to_string()];
        config.esports.recent_days = Some(30);
    })
}

async fn run(env: &TestEnv, context: &ApiContext) -> lol_ingest::CrawlReport {
    EsportsCrawler::new(context, &env.store, &env.archive)
        .expect("esports credential is set")
        .run()
        .await
        .expect("esports run failed")
}

#[tokio::test]
async fn test_first_run_archives_recent_events_and_material_games() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_schedule(&server).await;
    mount_events(&server, 1, 1).await;

    let env = lck_env(&server);
    let report = run(&env, &env.context()).await;

    assert_eq!(report.stored, 2);
    assert_eq!(report.filtered, 1);
    assert_eq!(report.new_ids, vec!["g1", "g3"]);

    assert!(env.data_path("raw/esports_gw/leagues/leagues.json").is_file());
    assert!(env.data_path("raw/esports_gw/schedules/L1.json").is_file());
    assert!(env.data_path("raw/esports_gw/events/e1.json").is_file());
    assert!(env.data_path("raw/esports_gw/events/e3.json").is_file());
    assert!(!env.data_path("raw/esports_gw/events/e2.json").exists());

    let games = read_json(&env.meta_path(GAMES_META_FILE));
    assert_eq!(
        games,
        json!([
            {"gameId": "g1", "eventId": "e1", "leagueSlug": "lck", "state": "completed"},
            {"gameId": "g3", "eventId": "e3", "leagueSlug": "unknown", "state": "inProgress"}
        ])
    );

    assert_eq!(env.state_list("esports", "seenEventIds"), vec!["e1", "e3"]);
    assert_eq!(env.state_list("esports", "seenGameIds"), vec!["g1", "g3"]);
    let state = read_json(&env.meta_path("esports_state.json"));
    assert!(state["lastScheduleTime"].is_i64());
    assert!(state["lastRunTime"].is_i64());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_schedule(&server).await;
    // each event is fetched exactly once across both runs
    mount_events(&server, 1, 1).await;

    let env = lck_env(&server);
    let context = env.context();
    run(&env, &context).await;
    let files_before = std::fs::read_dir(env.data_path("raw/esports_gw/events"))
        .unwrap()
        .count();

    let report = run(&env, &context).await;

    assert_eq!(report.stored, 0);
    assert_eq!(report.already_seen, 2);
    assert!(report.new_ids.is_empty());
    let files_after = std::fs::read_dir(env.data_path("raw/esports_gw/events"))
        .unwrap()
        .count();
    assert_eq!(files_before, files_after);
}

#[tokio::test]
async fn test_missing_event_file_is_refetched() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_schedule(&server).await;
    mount_events(&server, 2, 1).await;

    let env = lck_env(&server);
    let context = env.context();
    run(&env, &context).await;

    std::fs::remove_file(env.data_path("raw/esports_gw/events/e1.json")).unwrap();
    let report = run(&env, &context).await;

    assert_eq!(report.stored, 1);
    assert_eq!(report.already_seen, 1);
    // g1 was already seen, so it is not reported as new again
    assert!(report.new_ids.is_empty());
    assert!(env.data_path("raw/esports_gw/events/e1.json").is_file());
}

#[tokio::test]
async fn test_failed_event_is_retried_next_run() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_schedule(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/getEventDetails", GW)))
        .and(query_param("id", "e3"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_events(&server, 1, 1).await;

    let env = TestEnv::with_config(&server.uri(), |config| {
        config.esports.league_slugs = vec!["lck".to_string()];
        config.esports.recent_days = Some(30);
        config.esports.state_flush_every = 1;
    });
    let context = env.context();

    let first = run(&env, &context).await;
    assert_eq!(first.stored, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(env.state_list("esports", "seenEventIds"), vec!["e1"]);

    let log = std::fs::read_to_string(env.data_path("logs/esports.log")).unwrap();
    assert!(log.contains("class=UpstreamClientError event failed event_id=e3"));

    let second = run(&env, &context).await;
    assert_eq!(second.stored, 1);
    assert_eq!(second.already_seen, 1);
    assert_eq!(env.state_list("esports", "seenEventIds"), vec!["e1", "e3"]);
}

#[tokio::test]
async fn test_explicit_league_ids_survive_catalog_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/getLeagues", GW)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_schedule(&server).await;
    mount_events(&server, 1, 1).await;

    let env = TestEnv::with_config(&server.uri(), |config| {
        config.esports.leagues = vec!["L1".to_string()];
        config.esports.recent_days = Some(30);
        config.http.max_retries = 0;
    });
    let report = run(&env, &env.context()).await;

    assert_eq!(report.stored, 2);
    assert!(!env.data_path("raw/esports_gw/leagues/leagues.json").exists());
}

#[tokio::test]
async fn test_catalog_failure_without_explicit_ids_still_commits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/getLeagues", GW)))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let env = TestEnv::new(&server.uri());
    let report = run(&env, &env.context()).await;

    assert_eq!(report.total(), 0);
    let state = read_json(&env.meta_path("esports_state.json"));
    assert!(state["lastRunTime"].is_i64());
}

#[tokio::test]
async fn test_schedule_pages_follow_older_token() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    // the token-bearing request must be matched first
    Mock::given(method("GET"))
        .and(path(format!("{}/getSchedule", GW)))
        .and(query_param("leagueId", "L1"))
        .and(query_param("pageToken", "older-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"schedule": {"events": [{"id": "e3"}], "pages": {"older": "older-2"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/getSchedule", GW)))
        .and(query_param("leagueId", "L1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"schedule": {"events": [{"id": "e1"}], "pages": {"older": "older-1"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_events(&server, 1, 1).await;

    let env = TestEnv::with_config(&server.uri(), |config| {
        config.esports.league_slugs = vec!["lck".to_string()];
        config.esports.schedule_pages = 2;
    });
    let report = run(&env, &env.context()).await;

    assert_eq!(report.stored, 2);
    assert!(env.data_path("raw/esports_gw/schedules/L1.json").is_file());
    assert!(env.data_path("raw/esports_gw/schedules/L1.page1.json").is_file());
}

#[tokio::test]
async fn test_games_metadata_is_merged_with_previous_runs() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_schedule(&server).await;
    mount_events(&server, 1, 1).await;

    let env = lck_env(&server);
    env.write_json(
        &env.meta_path(GAMES_META_FILE),
        &json!([
            {"gameId": "g0", "eventId": "e0", "leagueSlug": "lck", "state": "completed"},
            {"gameId": "g3", "eventId": "e3", "leagueSlug": "unknown", "state": "unscheduled"}
        ]),
    );

    run(&env, &env.context()).await;

    let games = read_json(&env.meta_path(GAMES_META_FILE));
    let ids: Vec<_> = games
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["gameId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["g0", "g3", "g1"]);
    assert_eq!(games[1]["state"], "inProgress");
}

#[tokio::test]
async fn test_missing_credential_fails_before_network() {
    let server = MockServer::start().await;
    let env = TestEnv::new(&server.uri());
    let context = ApiContext::new(&env.config, Credentials::new(Some("riot".into()), None)).unwrap();

    let result = EsportsCrawler::new(&context, &env.store, &env.archive);

    assert!(matches!(
        result,
        Err(ConfigError::MissingCredential("ESPORTS_API_KEY"))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_interrupted_run_keeps_flushed_events_and_games() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_schedule(&server).await;

    // e3 hangs on the first run only
    Mock::given(method("GET"))
        .and(path(format!("{}/getEventDetails", GW)))
        .and(query_param("id", "e3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(30)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_events(&server, 1, 1).await;

    let env = TestEnv::with_config(&server.uri(), |config| {
        config.esports.league_slugs = vec!["lck".to_string()];
        config.esports.recent_days = Some(30);
        config.esports.state_flush_every = 1;
    });
    let context = env.context();

    let crawler = EsportsCrawler::new(&context, &env.store, &env.archive).unwrap();
    let interrupted = tokio::time::timeout(Duration::from_secs(2), crawler.run()).await;
    assert!(interrupted.is_err(), "run should still be waiting on e3");

    assert_eq!(env.state_list("esports", "seenEventIds"), vec!["e1"]);
    assert_eq!(env.state_list("esports", "seenGameIds"), vec!["g1"]);
    let state = read_json(&env.meta_path("esports_state.json"));
    assert!(state.get("lastRunTime").is_none());
    // the flushed event's games are listed even though the run never finished
    let games = read_json(&env.meta_path(GAMES_META_FILE));
    assert_eq!(games[0]["gameId"], "g1");

    let resumed = run(&env, &context).await;

    assert_eq!(resumed.already_seen, 1);
    assert_eq!(resumed.stored, 1);
    assert_eq!(resumed.new_ids, vec!["g3"]);
    assert_eq!(env.state_list("esports", "seenEventIds"), vec!["e1", "e3"]);
    let ids: Vec<_> = read_json(&env.meta_path(GAMES_META_FILE))
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["gameId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["g1", "g3"]);
}
