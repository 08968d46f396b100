use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::draft::DraftSaver;
use crate::errors::GenerationError;
use crate::log;
use crate::merge;
use crate::prompt::PromptComposer;
use crate::provider::DynProvider;
use crate::validate;
use crate::wire::{ApiResponse, GenerationRequest, InboundRequest, SiteConfig};

pub mod demo;

#[derive(Debug, Clone)]
pub struct Generated {
    pub tx: Uuid,
    pub config: SiteConfig,
    pub demo: bool,
}

/// Compose, invoke, validate and merge for one request. Holds no per-request
/// state, so one instance serves every request concurrently.
pub struct Pipeline {
    cfg: Arc<Config>,
    composer: PromptComposer,
    provider: DynProvider,
    drafts: Option<DraftSaver>,
}

impl Pipeline {
    pub fn new(cfg: Arc<Config>, provider: DynProvider) -> Self {
        Self { cfg, composer: PromptComposer::standard(), provider, drafts: None }
    }

    pub fn with_drafts(mut self, drafts: DraftSaver) -> Self {
        self.drafts = Some(drafts);
        self
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub async fn generate(&self, req: &GenerationRequest) -> Result<Generated, GenerationError> {
        self.generate_tx(Uuid::new_v4(), req).await
    }

    async fn generate_tx(&self, tx: Uuid, req: &GenerationRequest) -> Result<Generated, GenerationError> {
        if self.cfg.demo_mode {
            tracing::info!(%tx, "demo mode: drafting site without the model");
            let validated = validate::validate(&demo::draft_response(req))?;
            return Ok(Generated { tx, config: merge::merge(validated, req), demo: true });
        }

        let prompt = self.composer.compose(req)?;
        tracing::info!(
            %tx,
            provider = self.provider.name(),
            sections = req.sections.len(),
            mode = ?req.mode,
            "composed generation prompt"
        );

        let raw = self.provider.generate(&prompt).await?;
        if self.cfg.save_artifacts {
            log::save_artifacts(&self.cfg, tx, &prompt, &raw);
        }

        let validated = validate::validate(&raw)?;
        let config = merge::merge(validated, req);
        tracing::info!(%tx, pages = config.pages.len(), theme = config.theme.as_str(), "site config ready");
        Ok(Generated { tx, config, demo: false })
    }

    /// Full HTTP-style handling of a raw JSON body. Never fails; every error is
    /// folded into the response.
    pub async fn handle(&self, body: &[u8]) -> (u16, ApiResponse) {
        let tx = Uuid::new_v4();
        match self.handle_inner(tx, body).await {
            Ok(generated) => (200, ApiResponse::ok(generated.config, generated.demo)),
            Err(err) => {
                tracing::warn!(
                    %tx,
                    kind = err.kind(),
                    retryable = err.retryable(),
                    detail = err.detail().unwrap_or_default(),
                    error = %err,
                    "generation failed"
                );
                (err.status_code(), ApiResponse::failure(&err))
            }
        }
    }

    async fn handle_inner(&self, tx: Uuid, body: &[u8]) -> Result<Generated, GenerationError> {
        let inbound: InboundRequest = serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(%tx, error = %e, "rejecting malformed request body");
            GenerationError::Validation("Invalid request body".into())
        })?;
        let req = match &self.drafts {
            Some(drafts) => {
                let req = GenerationRequest::try_from(inbound.clone())?;
                // not awaited: a slow or failing save must not touch the generation result
                let _ = drafts.spawn_save(tx, inbound);
                req
            }
            None => GenerationRequest::try_from(inbound)?,
        };

        self.generate_tx(tx, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Canned {
        reply: Result<String, GenerationError>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for Canned {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.seen.lock().push(prompt.to_string());
            self.reply.clone()
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn pipeline(reply: Result<String, GenerationError>, cfg: Config) -> (Pipeline, Arc<Canned>) {
        let provider = Arc::new(Canned { reply, seen: Mutex::new(Vec::new()) });
        (Pipeline::new(Arc::new(cfg), provider.clone()), provider)
    }

    fn ok_reply() -> String {
        json!({
            "theme": "birthday",
            "metadata": { "title": "Happy Birthday Sarah" },
            "colorPalette": {
                "primary": "#FF6B9D", "secondary": "#FFC75F", "accent": "#845EC2",
                "background": "#FFF8F0", "text": "#2D2A32"
            },
            "pages": [{ "type": "hero", "order": 0, "content": { "title": "Hi" } }],
            "images": [{ "id": "made-up", "urls": { "thumbnail": "x", "medium": "x", "full": "x" } }]
        })
        .to_string()
    }

    fn body(v: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[tokio::test]
    async fn success_response_carries_merged_config() {
        let (p, provider) = pipeline(Ok(ok_reply()), Config::default());
        let (status, resp) = p
            .handle(&body(json!({
                "recipientName": "Sarah",
                "occasion": "Birthday",
                "selectedTemplates": ["hero"],
                "templateContent": { "hero": { "title": "Hi" } }
            })))
            .await;
        assert_eq!(status, 200);
        assert!(resp.success);
        assert_eq!(resp.demo, None);
        let cfg = resp.config.unwrap();
        assert!(cfg.images.is_empty());
        assert_eq!(cfg.metadata.recipient_name.as_deref(), Some("Sarah"));
        assert_eq!(provider.seen.lock().len(), 1);
        assert!(provider.seen.lock()[0].contains("title: Hi"));
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_provider() {
        let (p, provider) = pipeline(Ok(ok_reply()), Config::default());
        let (status, resp) = p.handle(&body(json!({ "selectedTemplates": ["hero"] }))).await;
        assert_eq!(status, 400);
        assert_eq!(resp.error.as_deref(), Some("Missing required fields"));
        assert_eq!(resp.retryable, Some(false));

        let (status, _) = p.handle(b"{not json").await;
        assert_eq!(status, 400);
        assert!(provider.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let (p, _) = pipeline(
            Err(GenerationError::Configuration("AI service is not configured".into())),
            Config::default(),
        );
        let (status, resp) = p
            .handle(&body(json!({ "recipientName": "Sam", "selectedTemplates": ["letter"] })))
            .await;
        assert_eq!(status, 500);
        assert_eq!(resp.retryable, Some(false));
        assert_eq!(resp.error.as_deref(), Some("AI service is not configured"));
    }

    #[tokio::test]
    async fn demo_mode_skips_provider() {
        let cfg = Config { demo_mode: true, ..Config::default() };
        let (p, provider) = pipeline(Err(GenerationError::Unexpected("unused".into())), cfg);
        let (status, resp) = p
            .handle(&body(json!({
                "recipientName": "Sam",
                "occasion": "Anniversary",
                "selectedTemplates": ["hero", "reasons"],
                "templateContent": { "reasons": { "reasons": "kind\nfunny" } }
            })))
            .await;
        assert_eq!(status, 200);
        assert_eq!(resp.demo, Some(true));
        let cfg = resp.config.unwrap();
        assert_eq!(cfg.pages.len(), 2);
        assert!(provider.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn draft_is_saved_alongside_generation() {
        let dir = tempfile::tempdir().unwrap();
        let (p, _) = pipeline(Ok(ok_reply()), Config::default());
        let p = p.with_drafts(DraftSaver::new(dir.path().join("drafts")));
        let (status, _) = p
            .handle(&body(json!({ "recipientName": "Sam", "selectedTemplates": ["hero"] })))
            .await;
        assert_eq!(status, 200);

        let mut saved = 0;
        for _ in 0..100 {
            saved = std::fs::read_dir(dir.path().join("drafts")).map(|d| d.count()).unwrap_or(0);
            if saved > 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(saved, 1);
    }

    #[tokio::test]
    async fn artifacts_saved_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            root: dir.path().to_string_lossy().into_owned(),
            save_artifacts: true,
            ..Config::default()
        };
        let (p, _) = pipeline(Ok(ok_reply()), cfg);
        let req = GenerationRequest::try_from(InboundRequest {
            recipient_name: Some("Sam".into()),
            selected_templates: vec!["hero".into()],
            ..InboundRequest::default()
        })
        .unwrap();
        let generated = p.generate(&req).await.unwrap();
        let tx_dir = log::tx_dir(dir.path(), generated.tx);
        assert!(tx_dir.join("prompt.txt").exists());
        assert!(tx_dir.join("response.txt").exists());
    }
}
