use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use tracing::info;

use design_prompt_studio::config::CONFIG;
use design_prompt_studio::llm::{generate_image, GeminiClient};
use design_prompt_studio::profiles::FACTORY_PROFILE_ID;
use design_prompt_studio::reconcile::progress::LogReporter;
use design_prompt_studio::reconcile::ReconcileEngine;
use design_prompt_studio::state::AppState;
use design_prompt_studio::storage::FileStore;
use design_prompt_studio::utils::logging::init_logging;
use design_prompt_studio::utils::template::fill_template;

fn usage() -> &'static str {
    "Usage: design_prompt_studio <command>\n\
     \n\
     Commands:\n\
       reconcile <theme>                restyle the catalog around a theme\n\
       render [style-id] [room-id]      generate an image from the current settings\n\
       profiles                         list saved profiles\n\
       save <name>                      snapshot the current settings as a profile\n\
       load <profile-id>                restore a profile (or 'factory-defaults')\n\
       reset                            restore factory defaults"
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let _guards = init_logging();

    let args: Vec<String> = std::env::args().collect();
    let store = Arc::new(FileStore::new(&CONFIG.data_dir)?);
    let state = AppState::new(store);

    match args.get(1).map(String::as_str) {
        Some("reconcile") => {
            let theme = args[2..].join(" ");
            if theme.trim().is_empty() {
                return Err(anyhow!("reconcile needs a theme, e.g. reconcile 复古咖啡館"));
            }
            if CONFIG.gemini_api_key.trim().is_empty() {
                return Err(anyhow!("GEMINI_API_KEY is required for reconcile"));
            }
            let engine = ReconcileEngine::new(GeminiClient::new());
            let document = engine.reconcile(&state, &theme, &LogReporter).await?;
            println!(
                "Restyled settings: theme '{}' / '{}', {} styles, {} room types",
                document.theme_en,
                document.theme_zh,
                document.styles.len(),
                document.room_types.len()
            );
        }
        Some("render") => {
            if CONFIG.gemini_api_key.trim().is_empty() {
                return Err(anyhow!("GEMINI_API_KEY is required for render"));
            }
            run_render(&state, args.get(2).map(String::as_str), args.get(3).map(String::as_str))
                .await?;
        }
        Some("profiles") => {
            let profiles = state.profiles.list();
            if profiles.is_empty() {
                println!("No saved profiles.");
            }
            for profile in profiles {
                println!(
                    "{}  {}  ({})",
                    profile.id,
                    profile.name,
                    profile.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Some("save") => {
            let name = args[2..].join(" ");
            if name.trim().is_empty() {
                return Err(anyhow!("save needs a profile name"));
            }
            let id = state.profiles.save(name.trim(), &state.settings(), None)?;
            println!("Saved profile {id}");
        }
        Some("load") => {
            let id = args
                .get(2)
                .ok_or_else(|| anyhow!("load needs a profile id"))?;
            state.load_profile(id)?;
            println!("Loaded profile {id}");
        }
        Some("reset") => {
            state.load_profile(FACTORY_PROFILE_ID)?;
            println!("Restored factory defaults");
        }
        _ => {
            println!("{}", usage());
        }
    }

    Ok(())
}

async fn run_render(
    state: &AppState,
    style_id: Option<&str>,
    room_id: Option<&str>,
) -> Result<()> {
    let document = state.settings();

    let style = match style_id {
        Some(id) => document
            .styles
            .iter()
            .find(|style| style.id == id)
            .ok_or_else(|| anyhow!("unknown style id: {id}"))?,
        None => document
            .styles
            .first()
            .ok_or_else(|| anyhow!("no styles configured"))?,
    };
    let room = match room_id {
        Some(id) => document
            .room_types
            .iter()
            .find(|room| room.id == id)
            .ok_or_else(|| anyhow!("unknown room type id: {id}"))?,
        None => document
            .room_types
            .first()
            .ok_or_else(|| anyhow!("no room types configured"))?,
    };
    let template = document
        .prompt_templates
        .get("imageGeneration")
        .ok_or_else(|| anyhow!("imageGeneration prompt template is missing"))?;

    // One representative term per related category keeps the prompt short.
    let terms: Vec<String> = style
        .related_category_ids
        .iter()
        .filter_map(|category_id| document.categories.get(category_id))
        .filter_map(|category| category.terms.first())
        .map(|term| term.term_en.clone())
        .collect();

    let mut values = HashMap::new();
    values.insert("theme".to_string(), document.theme_en.clone());
    values.insert("style".to_string(), style.base_prompt_en.clone());
    values.insert("roomType".to_string(), room.term_en.clone());
    values.insert("terms".to_string(), terms.join(", "));
    let prompt = fill_template(&template.template, &values);

    info!("Rendering image for prompt: {}", prompt);
    let images = generate_image(&prompt).await?;
    for (index, bytes) in images.iter().enumerate() {
        let extension = infer::get(bytes)
            .map(|kind| kind.extension())
            .unwrap_or("png");
        let path = format!("studio-render-{}.{}", index + 1, extension);
        fs::write(&path, bytes)?;
        println!("Wrote {path}");
    }
    Ok(())
}
