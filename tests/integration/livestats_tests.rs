//! End-to-end tests for the live-stats telemetry crawler

use crate::common::{read_json, TestEnv};
use lol_ingest::crawler::{LiveStatsCrawler, GAMES_META_FILE};
use lol_ingest::CrawlReport;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = "/livestats/v1";

fn window_with_data() -> Value {
    json!({
        "esportsGameId": "g",
        "frames": [{
            "rfc460Timestamp": "2024-05-01T12:00:00Z",
            "blueTeam": {"totalGold": 2500, "totalKills": 0},
            "redTeam": {"totalGold": 2500, "totalKills": 0}
        }]
    })
}

fn empty_window() -> Value {
    json!({"esportsGameId": "g", "frames": [{
        "blueTeam": {"totalGold": 0, "totalKills": 0},
        "redTeam": {"totalGold": 0, "totalKills": 0}
    }]})
}

async fn mount_feed(server: &MockServer, kind: &str, game_id: &str, body: Value, expect: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}/{}", FEED, kind, game_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expect)
        .mount(server)
        .await;
}

fn write_games(env: &TestEnv, games: Value) {
    env.write_json(&env.meta_path(GAMES_META_FILE), &games);
}

fn game(game_id: &str, league_slug: &str) -> Value {
    json!({"gameId": game_id, "eventId": "e", "leagueSlug": league_slug, "state": "completed"})
}

async fn run(env: &TestEnv, handed_over: &[String]) -> CrawlReport {
    let context = env.context();
    LiveStatsCrawler::new(&context, &env.store, &env.archive)
        .run(handed_over)
        .await
        .expect("livestats run failed")
}

#[tokio::test]
async fn test_games_from_metadata_are_downloaded_once() {
    let server = MockServer::start().await;
    // expectations cover both runs
    mount_feed(&server, "window", "g1", window_with_data(), 1).await;
    mount_feed(&server, "details", "g1", json!({"frames": [{"participants": []}]}), 1).await;
    mount_feed(&server, "window", "g3", empty_window(), 1).await;
    mount_feed(&server, "details", "g3", json!({}), 0).await;
    mount_feed(&server, "window", "g2", json!({}), 0).await;

    let env = TestEnv::with_config(&server.uri(), |config| {
        config.livestats.league_slugs = vec!["lck".to_string()];
        config.livestats.skip_empty = true;
    });
    write_games(
        &env,
        json!([game("g1", "lck"), game("g2", "lec"), game("g3", "lck"), game("g1", "lck")]),
    );

    let first = run(&env, &[]).await;

    assert_eq!(first.stored, 1);
    assert_eq!(first.empty, 1);
    assert_eq!(first.new_ids, vec!["g1"]);
    let window = read_json(&env.data_path("raw/livestats/lck/g1/window.json"));
    assert_eq!(window["frames"][0]["blueTeam"]["totalGold"], 2500);
    assert!(env.data_path("raw/livestats/lck/g1/details.json").is_file());
    assert!(!env.data_path("raw/livestats/lck/g3").exists());

    assert_eq!(env.state_list("livestats", "downloadedGameIds"), vec!["g1"]);
    assert_eq!(env.state_list("livestats", "skippedGameIds"), vec!["g3"]);
    let log = std::fs::read_to_string(env.data_path("logs/livestats.log")).unwrap();
    assert!(log.contains("livestats empty window game_id=g3"));

    let second = run(&env, &[]).await;
    assert_eq!(second.already_seen, 2);
    assert_eq!(second.stored, 0);
}

#[tokio::test]
async fn test_handed_over_ids_are_used_without_metadata() {
    let server = MockServer::start().await;
    mount_feed(&server, "window", "g9", window_with_data(), 1).await;
    mount_feed(&server, "details", "g9", json!({"frames": []}), 1).await;

    let env = TestEnv::new(&server.uri());
    let report = run(&env, &["g9".to_string(), "g9".to_string()]).await;

    assert_eq!(report.stored, 1);
    assert!(env.data_path("raw/livestats/unknown/g9/window.json").is_file());
    assert!(env.data_path("raw/livestats/unknown/g9/details.json").is_file());
}

#[tokio::test]
async fn test_empty_windows_are_kept_when_not_skipping() {
    let server = MockServer::start().await;
    mount_feed(&server, "window", "g4", json!({"frames": []}), 1).await;
    mount_feed(&server, "details", "g4", json!({"frames": []}), 1).await;

    let env = TestEnv::with_config(&server.uri(), |config| {
        config.livestats.league_slugs = Vec::new();
        config.livestats.skip_empty = false;
    });
    write_games(&env, json!([game("g4", "lpl")]));

    let report = run(&env, &[]).await;

    assert_eq!(report.stored, 1);
    assert_eq!(report.empty, 0);
    assert!(env.data_path("raw/livestats/lpl/g4/window.json").is_file());
    assert_eq!(env.state_list("livestats", "downloadedGameIds"), vec!["g4"]);
}

#[tokio::test]
async fn test_failed_game_is_retried_next_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/window/g5", FEED)))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_feed(&server, "window", "g5", window_with_data(), 1).await;
    mount_feed(&server, "details", "g5", json!({"frames": []}), 1).await;

    let env = TestEnv::with_config(&server.uri(), |config| {
        config.livestats.league_slugs = Vec::new();
    });
    write_games(&env, json!([game("g5", "lck")]));

    let first = run(&env, &[]).await;
    assert_eq!(first.failed, 1);
    assert!(env.state_list("livestats", "downloadedGameIds").is_empty());
    assert!(env.state_list("livestats", "skippedGameIds").is_empty());
    let log = std::fs::read_to_string(env.data_path("logs/livestats.log")).unwrap();
    assert!(log.contains("class=UpstreamClientError livestats window failed game_id=g5"));

    let second = run(&env, &[]).await;
    assert_eq!(second.stored, 1);
    assert_eq!(env.state_list("livestats", "downloadedGameIds"), vec!["g5"]);
}

#[tokio::test]
async fn test_null_and_unreadable_totals_are_not_skipped() {
    let server = MockServer::start().await;
    let partial = json!({"frames": [{
        "blueTeam": {"totalGold": null, "totalKills": 2},
        "redTeam": {"totalGold": null, "totalKills": null}
    }]});
    let unreadable = json!({"frames": [{"blueTeam": {"totalGold": "n/a"}}]});
    mount_feed(&server, "window", "g6", partial, 1).await;
    mount_feed(&server, "details", "g6", json!({"frames": []}), 1).await;
    mount_feed(&server, "window", "g7", unreadable, 1).await;
    mount_feed(&server, "details", "g7", json!({"frames": []}), 1).await;

    let env = TestEnv::with_config(&server.uri(), |config| {
        config.livestats.league_slugs = Vec::new();
        config.livestats.skip_empty = true;
    });
    write_games(&env, json!([game("g6", "lck"), game("g7", "lck")]));

    let report = run(&env, &[]).await;

    assert_eq!(report.stored, 2);
    assert_eq!(report.empty, 0);
    assert!(env.state_list("livestats", "skippedGameIds").is_empty());
    assert_eq!(env.state_list("livestats", "downloadedGameIds"), vec!["g6", "g7"]);
}
