use crate::commands::write_story;
use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use quire_editor::{Section, Story};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Title of the first story
    #[arg(short, long, default_value = "Untitled story")]
    pub title: String,

    /// Story id (a fresh uuid when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Stories directory
    #[arg(short, long, default_value = "stories")]
    pub stories_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Quire project...".bright_blue().bold());

    let config = Config {
        stories_dir: args.stories_dir.clone(),
        ..Config::default()
    };
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let story_path = create_story_file(&config, cwd, &args)?;
    println!("  {} Created {}", "✓".green(), story_path.display());

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: quire inspect {}", story_path.display());
    println!("  2. Write a commands file and run: quire apply <story> <commands>");

    Ok(())
}

/// Write a starter story into the stories directory
pub(crate) fn create_story_file(config: &Config, cwd: &str, args: &InitArgs) -> Result<PathBuf> {
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let story = Story::new_default(id.as_str())
        .with_title(args.title.as_str())
        .create_section("introduction", Section::new("introduction", "Introduction"))?;

    let path = config.get_stories_dir(cwd).join(format!("{}.json", id));
    write_story(&path, &story)?;
    Ok(path)
}
