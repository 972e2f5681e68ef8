use crate::domain::ImageRuntime;
use crate::infra::{AppConfig, PodmanAdapter, load_app_config};
use crate::services::{CleanOptions, Cleaner, RunReport};
use anyhow::{Result, bail};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug, Clone, Default)]
pub struct CleanArgs {
    /// Imagens a preservar, no formato IMAGE:TAG (pode repetir)
    #[arg(short = 'x', long = "exclude", value_name = "IMAGE:TAG")]
    pub exclude: Vec<String>,
    /// Não remove imagens criadas há menos de DUR (ex.: 30m, 1h, 24h)
    #[arg(short = 'd', long, value_name = "DUR", value_parser = humantime::parse_duration)]
    pub safety_duration: Option<Duration>,
    /// Remove de fato as imagens dangling (sem tag nem digest)
    #[arg(long)]
    pub delete_dangling: bool,
    /// Remove de fato as imagens leaf (com tag e sem uso)
    #[arg(long)]
    pub delete_leaf: bool,
}

impl CleanArgs {
    /// Layers the command line on top of the file configuration.
    pub fn apply_to(&self, config: &mut AppConfig) {
        let mut overrides = AppConfig::default();
        if !self.exclude.is_empty() {
            overrides.retention.exclude = Some(self.exclude.clone());
        }
        overrides.retention.safety_duration = self.safety_duration;
        if self.delete_dangling {
            overrides.delete.dangling = Some(true);
        }
        if self.delete_leaf {
            overrides.delete.leaf = Some(true);
        }
        config.merge(overrides);
    }
}

pub fn run(args: &CleanArgs, config_dir: &Path) -> Result<()> {
    let mut config = load_app_config(config_dir)?;
    args.apply_to(&mut config);

    let runtime = Arc::new(PodmanAdapter::with_binary(config.podman_binary()));
    let options = config.clean_options();

    let report = run_with_runtime(&options, runtime)?;
    print_report(&options, &report);

    let failed = report.deletions.failed().len();
    if failed > 0 {
        bail!("{failed} imagem(ns) não puderam ser removidas");
    }

    Ok(())
}

pub fn run_with_runtime(
    options: &CleanOptions,
    runtime: Arc<dyn ImageRuntime>,
) -> Result<RunReport> {
    Cleaner::new(runtime).run(options)
}

fn print_report(options: &CleanOptions, report: &RunReport) {
    let summary = report.summary;
    println!(
        "📦 {} mantidas, {} dangling, {} leaf",
        summary.kept, summary.dangling, summary.leaf
    );

    let removed = report.deletions.removed().len();
    let planned = report.deletions.planned().len();
    if removed > 0 {
        println!("🗑️  {removed} imagem(ns) removidas");
    }
    if planned > 0 {
        println!("🔍 {planned} imagem(ns) seriam removidas (simulação)");
        if !options.delete_dangling || !options.delete_leaf {
            println!("   Use --delete-dangling e/ou --delete-leaf para remover de fato.");
        }
    }
    let held = report.deletions.held().len();
    if held > 0 {
        println!("🔒 {held} imagem(ns) mantidas por imagens filhas que continuam no sistema");
    }
    for outcome in report.deletions.failed() {
        for (target, error) in &outcome.errors {
            println!("⚠️  Falha ao remover {target}: {error}");
        }
    }
}
