//! `showroom doctor` — Diagnose the local setup.

use std::path::Path;

use showroom_config::AppConfig;
use showroom_knowledge::KnowledgeBase;

pub async fn run(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Showroom Doctor — Setup Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let path = Path::new(config_path);
    let mut config = if path.exists() {
        match AppConfig::load(path) {
            Ok(config) => {
                println!("  ✅ Config file valid ({config_path})");
                config
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                issues += 1;
                AppConfig::default()
            }
        }
    } else {
        println!("  ⚠️  No config file at {config_path} — using defaults");
        AppConfig::default()
    };
    config.apply_env();

    if config.api_key().is_some() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set OPENAI_API_KEY or completion.api_key");
        issues += 1;
    }

    let kb_root = Path::new(&config.knowledge.root);
    if kb_root.exists() {
        let kb = KnowledgeBase::load(kb_root, config.knowledge.chunk_chars);
        println!("  ✅ Knowledge root present: {}", kb.summary());
    } else {
        println!(
            "  ⚠️  No knowledge root at {} — sessions start without local knowledge",
            config.knowledge.root
        );
    }

    let room_plan = Path::new(&config.projects.default_room_plan_path);
    let agents = Path::new(&config.projects.default_agents_path);
    if room_plan.exists() && agents.exists() {
        println!("  ✅ Default example documents present");
    } else {
        println!("  ⚠️  Default room plan / roster documents missing — /setup requires inline documents");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
