use httpmock::prelude::*;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use tarot_cache::adapters::sink::LocalDirSink;
use tarot_cache::domain::model::Orientation;
use tarot_cache::utils::validation::Validate;
use tarot_cache::{
    DivinationRequest, IntegrityValidator, TarotConfig, TarotError, TarotService,
};
use tempfile::TempDir;

fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(12, 20, Rgb([90, 30, 140]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn write_tables(dir: &Path) {
    let cards: Vec<String> = (0..78)
        .map(|i| {
            let folder = if i < 22 { "MajorArcana" } else { "MinorArcana" };
            format!(
                r#""{i}": {{"name": "Card {i}", "type": "{folder}", "info": {{"description": "Upright meaning of card {i}", "reverseDescription": "Reversed meaning of card {i}", "imgUrl": "{folder}/{i}.png"}}}}"#
            )
        })
        .collect();
    std::fs::write(dir.join("tarots.json"), format!("{{{}}}", cards.join(","))).unwrap();

    let formations = r#"{
        "单张": {"cards_num": 1, "is_cut": false, "represent": [["Answer"]]},
        "圣三角": {"cards_num": 3, "is_cut": true, "represent": [["Situation", "Action", "Outcome"]]},
        "凯尔特十字": {"cards_num": 30, "is_cut": true, "represent": [[]]}
    }"#;
    std::fs::write(dir.join("formation.json"), formations).unwrap();
}

fn service(dir: &TempDir, server: &MockServer, extra: &str) -> TarotService {
    service_with_cache(dir, server, "", extra)
}

fn service_with_cache(
    dir: &TempDir,
    server: &MockServer,
    cache_extra: &str,
    extra: &str,
) -> TarotService {
    write_tables(dir.path());
    let toml_content = format!(
        r#"
[catalog]
cards_path = "{root}/tarots.json"
formations_path = "{root}/formation.json"

[source]
base_url = "{base}"
timeout_seconds = 5
retry_attempts = 1

[cache]
dir = "{root}/tarots_cache"
{cache_extra}

[delivery]
min_spacing_ms = 0
{extra}
"#,
        root = dir.path().display(),
        base = server.url("/Tarot/"),
    );

    let config = TarotConfig::from_toml_str(&toml_content).unwrap();
    config.validate().unwrap();
    TarotService::from_config(config).unwrap()
}

#[tokio::test]
async fn test_single_card_from_full_deck() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let images = server.mock(|when, then| {
        when.method(GET)
            .path_matches(regex::Regex::new(r"^/Tarot/(Major|Minor)Arcana/\d+\.png$").unwrap());
        then.status(200)
            .header("Content-Type", "image/png")
            .body(png_bytes());
    });

    let service = service(&temp_dir, &server, "");
    let reading = service
        .divine(&DivinationRequest::new("all", "单张"))
        .await
        .unwrap();

    images.assert_hits(1);
    assert_eq!(reading.items.len(), 1);
    let item = &reading.items[0];
    assert_eq!(item.position, "Answer");
    assert_eq!(item.orientation, Orientation::Upright);
    assert!(item.description.starts_with("Upright meaning of card"));
    assert!(IntegrityValidator::new().validate_bytes(item.image.as_ref().unwrap()));

    let cached = temp_dir
        .path()
        .join("tarots_cache")
        .join(format!("{}_norm.png", item.card_id));
    assert!(cached.exists());
}

#[tokio::test]
async fn test_major_arcana_triangle_uses_primed_cache() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let images = server.mock(|when, then| {
        when.method(GET)
            .path_matches(regex::Regex::new(r"^/Tarot/(Major|Minor)Arcana/\d+\.png$").unwrap());
        then.status(200).body(png_bytes());
    });

    let service = service(
        &temp_dir,
        &server,
        "\n[draw]\nreversal_probability = 1.0\nseed = 5\n",
    );

    let report = service.prime(Some(8)).await;
    assert_eq!(report.attempted, 78);
    assert_eq!(report.succeeded, 78);
    images.assert_hits(78);

    let reading = service
        .divine(&DivinationRequest::new("major", "圣三角"))
        .await
        .unwrap();

    // 全部命中快取；逆位由正位圖旋轉而來
    images.assert_hits(78);
    let ids: HashSet<u32> = reading
        .items
        .iter()
        .map(|item| item.card_id.parse().unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|&id| id < 22));
    assert!(reading
        .items
        .iter()
        .all(|item| item.orientation == Orientation::Reversed));
    assert!(reading
        .items
        .iter()
        .all(|item| item.description.starts_with("Reversed meaning")));
}

#[tokio::test]
async fn test_dual_fetch_prime_downloads_reverse_variants() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let upright = server.mock(|when, then| {
        when.method(GET)
            .path_matches(regex::Regex::new(r"^/Tarot/(Major|Minor)Arcana/\d+\.png$").unwrap());
        then.status(200).body(png_bytes());
    });
    let reversed = server.mock(|when, then| {
        when.method(GET)
            .path_matches(regex::Regex::new(r"^/Tarot/Reverse/(Major|Minor)Arcana/\d+\.png$").unwrap());
        then.status(200).body(png_bytes());
    });

    let service = service_with_cache(
        &temp_dir,
        &server,
        "reversal_strategy = \"dual_fetch\"",
        "",
    );

    let report = service.prime(None).await;

    assert_eq!(report.succeeded, 78);
    upright.assert_hits(78);
    reversed.assert_hits(78);
    assert!(temp_dir.path().join("tarots_cache/77_rev.png").exists());
}

#[tokio::test]
async fn test_validation_failures_are_reported_specifically() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let service = service(&temp_dir, &server, "");

    let err = service
        .divine(&DivinationRequest::new("major", "凯尔特十字"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TarotError::InsufficientPool {
            required: 30,
            available: 22,
            ..
        }
    ));
    assert!(err.user_friendly_message().contains("30"));

    let err = service
        .divine(&DivinationRequest::new("all", "六芒星"))
        .await
        .unwrap_err();
    assert!(matches!(err, TarotError::UnknownFormation { .. }));
}

#[tokio::test]
async fn test_unreachable_source_fails_the_reading() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let images = server.mock(|when, then| {
        when.method(GET).path_contains("/Tarot/");
        then.status(404);
    });

    let service = service(&temp_dir, &server, "");
    let err = service
        .divine(&DivinationRequest::new("all", "单张"))
        .await
        .unwrap_err();

    images.assert_hits(1);
    assert!(matches!(err, TarotError::FetchExhausted { attempts: 1, .. }));
    let message = err.user_friendly_message();
    assert!(!message.contains("127.0.0.1"));
    assert!(!message.contains("tarots_cache"));
}

#[tokio::test]
async fn test_divine_and_deliver_writes_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path_contains("/Tarot/");
        then.status(200).body(png_bytes());
    });

    let service = service(&temp_dir, &server, "");
    let out = temp_dir.path().join("reading");
    let sink = LocalDirSink::new(&out).quiet();

    let sent = service
        .divine_and_deliver(&DivinationRequest::new("minor", "圣三角"), &sink)
        .await
        .unwrap();

    assert_eq!(sent, 4);
    for index in 1..=3 {
        let image = out.join(format!("card_{:02}.png", index));
        assert!(IntegrityValidator::new().validate(&image));
    }
    let text = std::fs::read_to_string(out.join("reading.txt")).unwrap();
    assert!(text.starts_with("[圣三角]"));
    assert!(text.contains("Situation - "));
    assert!(text.contains("Outcome - "));
}
