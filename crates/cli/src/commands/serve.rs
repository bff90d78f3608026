//! `showroom serve` — Start the HTTP backend server.

use std::path::Path;

use showroom_config::AppConfig;
use showroom_knowledge::KnowledgeBase;

pub async fn run(config_path: &str, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(Path::new(config_path))
        .map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let kb = KnowledgeBase::load(&config.knowledge.root, config.knowledge.chunk_chars);

    println!("🛋️  Showroom backend");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.completion.model);
    println!("   Knowledge: {}", kb.summary());

    showroom_gateway::start(config).await?;

    Ok(())
}
