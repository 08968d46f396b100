use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use fs_err as fs;

use sitecraft::cli::{Args, Command};
use sitecraft::config::Config;
use sitecraft::draft::DraftSaver;
use sitecraft::pipeline::Pipeline;
use sitecraft::transport::{self, FileTransport};
use sitecraft::wire::SectionKind;
use sitecraft::{catalog, log, provider, server, ux};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    log::init_tracing(args.debug);

    let mut cfg = Config::load(args.config.as_deref())?;
    args.apply(&mut cfg);
    let cfg = Arc::new(cfg);

    match &args.command {
        Command::Questions { section } => {
            let kind = SectionKind::parse(section);
            ux::print_questions(&kind, catalog::questions_for(&kind));
        }
        Command::Serve { .. } => {
            let pipeline = build_pipeline(&cfg)?.with_drafts(DraftSaver::new(cfg.drafts_path()));
            server::serve(Arc::new(pipeline), &cfg.bind).await?;
        }
        Command::Generate { request, out, json } => {
            let body = fs::read(request)?;
            let pipeline = build_pipeline(&cfg)?;
            let (status, resp) = pipeline.handle(&body).await;

            if *json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                ux::print_response(&resp);
            }
            if status != 200 {
                bail!("generation failed with status {status}");
            }

            if let (Some(dir), Some(site)) = (out, resp.config.as_ref()) {
                let buffer = FileTransport::new(dir, cfg.transport_limit_bytes)
                    .with_context(|| format!("could not prepare {}", dir.display()))?;
                let packed = transport::pack(site, &buffer)?;
                ux::print_packed(&packed, &buffer.path_for(transport::SITE_CONFIG_KEY).display().to_string());
            }
        }
    }
    Ok(())
}

fn build_pipeline(cfg: &Arc<Config>) -> anyhow::Result<Pipeline> {
    let provider = provider::make_provider(cfg)?;
    Ok(Pipeline::new(Arc::clone(cfg), provider))
}
