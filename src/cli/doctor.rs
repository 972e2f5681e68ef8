use crate::domain::ImageRuntime;
use crate::infra::PodmanAdapter;
use crate::infra::config::{config_paths, load_app_config};
use anyhow::Result;
use std::path::Path;

pub fn run(config_dir: &Path) -> Result<()> {
    println!("🔍 Checando dependências e configuração...");

    for path in config_paths(config_dir) {
        if path.exists() {
            println!("✅ Config encontrada: {:?}", path);
        } else {
            println!("➖ Config ausente: {:?}", path);
        }
    }

    let config = load_app_config(config_dir)?;
    let runtime = PodmanAdapter::with_binary(config.podman_binary());

    if runtime.is_available() {
        println!("✅ {} disponível", runtime.binary());
    } else {
        println!("⚠️  {} não encontrado no PATH", runtime.binary());
    }

    let options = config.clean_options();
    println!(
        "⏱️  Janela de segurança: {}",
        humantime::format_duration(options.policy.safety_duration)
    );
    if options.policy.exclude.is_empty() {
        println!("🏷️  Nenhuma tag excluída");
    } else {
        println!("🏷️  Tags excluídas: {}", options.policy.exclude.join(", "));
    }
    println!(
        "🗑️  Remover dangling: {} | remover leaf: {}",
        options.delete_dangling, options.delete_leaf
    );

    Ok(())
}
