use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};

use sitecraft::config::Config;
use sitecraft::merge::OVERRIDE_TEXT_COLOR;
use sitecraft::pipeline::Pipeline;
use sitecraft::provider::make_provider;
use sitecraft::server;
use sitecraft::transport::{self, MemoryTransport, Tier};
use sitecraft::wire::ApiResponse;

fn config_for(server: &ServerGuard, key: Option<&str>) -> Config {
    Config {
        api_base: server.url(),
        api_key: key.map(str::to_string),
        api_key_env: "SITECRAFT_TEST_UNSET_KEY".into(),
        timeout_secs: 5,
        ..Config::default()
    }
}

fn pipeline(cfg: Config) -> Pipeline {
    let cfg = Arc::new(cfg);
    let provider = make_provider(&cfg).unwrap();
    Pipeline::new(cfg, provider)
}

fn completion(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
}

fn model_site() -> Value {
    json!({
        "theme": "birthday",
        "metadata": { "title": "Happy Birthday, Sarah!", "createdAt": "2026-10-19" },
        "colorPalette": {
            "primary": "#FF6B9D", "secondary": "#FFC75F", "accent": "#845EC2",
            "background": "#FFF8F0", "text": "#2D2A32"
        },
        "pages": [{ "type": "hero", "order": 0, "content": { "title": "Hi" } }]
    })
}

async fn mock_model(server: &mut ServerGuard, content: &str) -> mockito::Mock {
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(content))
        .create_async()
        .await
}

fn body(v: Value) -> Vec<u8> {
    serde_json::to_vec(&v).unwrap()
}

#[tokio::test]
async fn scenario_a_verbatim_hero() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("CONTENT MODE: VERBATIM".into()),
            Matcher::Regex("title: Hi".into()),
        ]))
        .with_status(200)
        .with_body(completion(&model_site().to_string()))
        .expect(1)
        .create_async()
        .await;

    let p = pipeline(config_for(&server, Some("sk-test")));
    let (status, resp) = p
        .handle(&body(json!({
            "recipientName": "Sarah",
            "occasion": "Birthday",
            "selectedTemplates": ["hero"],
            "templateContent": { "hero": { "title": "Hi" } },
            "refineWithAI": false
        })))
        .await;

    mock.assert_async().await;
    assert_eq!(status, 200);
    assert!(resp.success);
    let cfg = resp.config.unwrap();
    assert_eq!(cfg.pages.len(), 1);
    assert_eq!(cfg.pages[0].kind.as_str(), "hero");
    assert_eq!(cfg.pages[0].order, 0);
    assert_eq!(cfg.pages[0].content["title"], "Hi");
    assert_eq!(cfg.metadata.recipient_name.as_deref(), Some("Sarah"));
    assert_eq!(cfg.metadata.title.as_deref(), Some("Happy Birthday, Sarah!"));
}

#[tokio::test]
async fn scenario_b_non_json_is_retryable_500() {
    let mut server = Server::new_async().await;
    let _mock = mock_model(&mut server, "Sure! Here's a lovely site for Sarah.").await;

    let p = pipeline(config_for(&server, Some("sk-test")));
    let (status, resp) = p
        .handle(&body(json!({ "recipientName": "Sarah", "selectedTemplates": ["hero"] })))
        .await;

    assert_eq!(status, 500);
    assert!(!resp.success);
    assert!(resp.error.unwrap().starts_with("AI returned an invalid response"));
    assert_eq!(resp.retryable, Some(true));
}

#[tokio::test]
async fn scenario_c_missing_recipient_is_400_over_http() {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", "/chat/completions").expect(0).create_async().await;

    let p = Arc::new(pipeline(config_for(&server, Some("sk-test"))));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, server::router(p)).await;
    });

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/generate"))
        .json(&json!({ "occasion": "Birthday", "selectedTemplates": ["hero"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let v: Value = resp.json().await.unwrap();
    assert_eq!(v["error"], "Missing required fields");
    assert_eq!(v["success"], false);
    mock.assert_async().await;
}

#[tokio::test]
async fn scenario_d_missing_palette_is_retryable_500() {
    let mut server = Server::new_async().await;
    let mut site = model_site();
    site.as_object_mut().unwrap().remove("colorPalette");
    let _mock = mock_model(&mut server, &site.to_string()).await;

    let p = pipeline(config_for(&server, Some("sk-test")));
    let (status, resp) = p
        .handle(&body(json!({ "recipientName": "Sarah", "selectedTemplates": ["hero"] })))
        .await;

    assert_eq!(status, 500);
    assert_eq!(resp, ApiResponse { success: false, retryable: Some(true), ..resp.clone() });
    assert!(resp.error.unwrap().contains("colorPalette"));
}

#[tokio::test]
async fn scenario_e_color_override_wins() {
    let mut server = Server::new_async().await;
    let _mock = mock_model(&mut server, &model_site().to_string()).await;

    let p = pipeline(config_for(&server, Some("sk-test")));
    let (status, resp) = p
        .handle(&body(json!({
            "recipientName": "Sarah",
            "selectedTemplates": ["hero"],
            "colorScheme": {
                "primary": "#101010", "secondary": "#202020",
                "accent": "#303030", "background": "#F0F0F0"
            }
        })))
        .await;

    assert_eq!(status, 200);
    let palette = serde_json::to_value(resp.config.unwrap().color_palette).unwrap();
    assert_eq!(
        palette,
        json!({
            "primary": "#101010", "secondary": "#202020", "accent": "#303030",
            "background": "#F0F0F0", "text": OVERRIDE_TEXT_COLOR
        })
    );
}

#[tokio::test]
async fn missing_credential_is_terminal() {
    let server = Server::new_async().await;
    let p = pipeline(config_for(&server, None));
    let (status, resp) = p
        .handle(&body(json!({ "recipientName": "Sarah", "selectedTemplates": ["hero"] })))
        .await;
    assert_eq!(status, 500);
    assert_eq!(resp.retryable, Some(false));
}

#[tokio::test]
async fn generated_site_degrades_when_buffer_is_small() {
    let mut server = Server::new_async().await;
    let _mock = mock_model(&mut server, &model_site().to_string()).await;

    let images: Vec<Value> = (0..5)
        .map(|i| {
            json!({
                "id": format!("img-{i}"),
                "caption": "at the lake",
                "urls": {
                    "thumbnail": "t".repeat(500),
                    "medium": "m".repeat(5_000),
                    "full": "f".repeat(50_000)
                }
            })
        })
        .collect();

    let p = pipeline(config_for(&server, Some("sk-test")));
    let (status, resp) = p
        .handle(&body(json!({
            "recipientName": "Sarah",
            "selectedTemplates": ["hero", "gallery"],
            "images": images
        })))
        .await;
    assert_eq!(status, 200);
    let site = resp.config.unwrap();
    assert_eq!(site.images.len(), 5);

    let roomy = MemoryTransport::new(1 << 20);
    let packed = transport::pack(&site, &roomy).unwrap();
    assert_eq!(packed.tier, Tier::Optimized);
    assert_eq!(packed.config.images.len(), 3);

    let tight = MemoryTransport::new(1_000);
    let degraded = transport::pack(&site, &tight).unwrap();
    assert_eq!(degraded.tier, Tier::Minimal);
    assert!(degraded.config.images.is_empty());
    assert!(degraded.bytes < packed.bytes);
}
