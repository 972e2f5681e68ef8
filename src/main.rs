use anyhow::Result;
use clap::{Parser, Subcommand};
use podsweep::cli::{CleanArgs, clean, doctor};
use podsweep::infra::default_config_dir;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "podsweep",
    version,
    about = "Remove imagens do podman que parecem seguras de apagar"
)]
struct Cli {
    /// Diretório de configuração (default: ~/.config/podsweep)
    #[arg(long, env = "PODSWEEP_CONFIG_DIR", default_value_os_t = default_config_dir())]
    config_dir: std::path::PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classifica as imagens e remove (ou simula remover) as descartáveis
    Clean(CleanArgs),
    /// Verifica o podman e mostra a configuração efetiva
    Doctor,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean(args) => clean::run(&args, &cli.config_dir),
        Commands::Doctor => doctor::run(&cli.config_dir),
    }
}
