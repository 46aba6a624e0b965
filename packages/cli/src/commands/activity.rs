use crate::commands::{load_story, resolve};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quire_editor::{ActiveUsers, EditPipeline, LockLocation, LockOutcome, Story};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ActivityArgs {
    /// Exported story file
    pub input: PathBuf,

    /// Presence file (active users and the locks they request)
    pub presence: PathBuf,
}

/// Who is connected to a story and where they want to be
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    #[serde(default)]
    pub active_users: ActiveUsers,

    /// userId → requested locations, replayed in file order per user
    #[serde(default)]
    pub locks: BTreeMap<String, Vec<LockLocation>>,
}

impl Presence {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not a presence file", path.display()))
    }

    /// Replay every lock request against `pipeline`.
    ///
    /// Returns the requests that were rejected, with the holder that won.
    pub fn seed(&self, pipeline: &mut EditPipeline) -> Vec<Rejection> {
        let mut rejected = Vec::new();
        for (user_id, locations) in &self.locks {
            for location in locations {
                if let LockOutcome::Rejected { holder } =
                    pipeline.enter_block(user_id, location.clone())
                {
                    tracing::info!(user_id = %user_id, %location, %holder, "Lock request rejected");
                    rejected.push(Rejection {
                        user_id: user_id.clone(),
                        location: location.clone(),
                        holder,
                    });
                }
            }
        }
        rejected
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub user_id: String,
    pub location: LockLocation,
    pub holder: String,
}

pub(crate) fn print_rejections(rejections: &[Rejection]) {
    for rejection in rejections {
        println!(
            "  {} {} cannot enter {}: held by {}",
            "✗".red(),
            rejection.user_id,
            rejection.location.to_string().bright_white(),
            rejection.holder
        );
    }
}

/// One status line per active user, in user id order
pub(crate) fn activity_lines(pipeline: &EditPipeline, presence: &Presence) -> Vec<String> {
    let story: &Story = pipeline.story();
    presence
        .active_users
        .keys()
        .map(|user_id| {
            pipeline
                .locks()
                .describe_activity(story, user_id, &presence.active_users)
                .to_string()
        })
        .collect()
}

pub fn activity(args: ActivityArgs, cwd: &str) -> Result<()> {
    let story = load_story(&resolve(cwd, &args.input))?;
    let presence = Presence::load(&resolve(cwd, &args.presence))?;

    let mut pipeline = EditPipeline::new(story);
    let rejections = presence.seed(&mut pipeline);

    println!(
        "{} {}",
        "👥".bright_blue(),
        pipeline.story().metadata.title.bright_white().bold()
    );
    for line in activity_lines(&pipeline, &presence) {
        println!("  {} {}", "•".green(), line);
    }

    if !rejections.is_empty() {
        println!();
        print_rejections(&rejections);
    }
    Ok(())
}
