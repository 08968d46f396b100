use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "sitecraft", version, about = "AI-drafted celebration sites: prompt, validate, merge and hand off")]
pub struct Args {
    /// TOML config file; flags below override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Draft sites from the request alone, without calling the model.
    #[arg(long, global = true, default_value_t = false)]
    pub demo: bool,

    #[arg(long, global = true, default_value_t = false)]
    pub save_artifacts: bool,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one generation request from a JSON file.
    Generate {
        #[arg(long)]
        request: PathBuf,
        /// Pack the result into this directory for the renderer.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the raw API response instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the question set for a section type.
    Questions { section: String },
}

impl Args {
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(model) = &self.model {
            cfg.model = model.clone();
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout_secs = secs;
        }
        if self.demo {
            cfg.demo_mode = true;
        }
        if self.save_artifacts {
            cfg.save_artifacts = true;
        }
        if let Command::Serve { bind: Some(bind) } = &self.command {
            cfg.bind = bind.clone();
        }
    }
}
