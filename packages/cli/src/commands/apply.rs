use crate::commands::activity::{print_rejections, Presence};
use crate::commands::{load_story, resolve, write_story};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quire_editor::{DispatchOutcome, EditPipeline, LockLocation, Story, StoryCommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Exported story file
    pub input: PathBuf,

    /// JSON array of story commands
    pub commands: PathBuf,

    /// Where to write the result (defaults to the input file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Author the commands are dispatched for
    #[arg(short, long)]
    pub user: Option<String>,

    /// Presence file whose locks are held by other authors
    #[arg(short, long)]
    pub presence: Option<PathBuf>,
}

/// A command refused because someone else holds one of its locations
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Skipped {
    pub index: usize,
    pub command: &'static str,
    pub location: LockLocation,
    pub holder: String,
}

#[derive(Debug)]
pub(crate) struct ApplyReport {
    pub story: Story,
    pub applied: usize,
    pub skipped: Vec<Skipped>,
}

/// Run `commands` through a pipeline on behalf of `user_id`.
///
/// Blocked commands are skipped; an integrity failure aborts the whole run.
pub(crate) fn run_commands(
    mut pipeline: EditPipeline,
    user_id: &str,
    commands: Vec<StoryCommand>,
) -> Result<ApplyReport> {
    let mut applied = 0;
    let mut skipped = Vec::new();

    for (index, command) in commands.into_iter().enumerate() {
        let name = command.name();
        let outcome = pipeline
            .dispatch(user_id, command)
            .with_context(|| format!("Command #{} ({}) failed", index + 1, name))?;

        match outcome {
            DispatchOutcome::Applied { .. } => applied += 1,
            DispatchOutcome::Blocked { location, holder } => skipped.push(Skipped {
                index,
                command: name,
                location,
                holder,
            }),
        }
    }

    Ok(ApplyReport {
        story: pipeline.story().clone(),
        applied,
        skipped,
    })
}

fn load_commands(path: &Path) -> Result<Vec<StoryCommand>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a list of story commands", path.display()))
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let user_id = args.user.unwrap_or(config.default_user);

    let input = resolve(cwd, &args.input);
    let story = load_story(&input)?;
    let commands = load_commands(&resolve(cwd, &args.commands))?;

    let mut pipeline = EditPipeline::new(story);
    if let Some(presence) = &args.presence {
        let presence = Presence::load(&resolve(cwd, presence))?;
        print_rejections(&presence.seed(&mut pipeline));
    }

    println!(
        "{} Applying {} command(s) as {}",
        "⚡".yellow(),
        commands.len(),
        user_id.bright_white()
    );

    let report = run_commands(pipeline, &user_id, commands)?;

    for skipped in &report.skipped {
        println!(
            "  {} #{} {} blocked: {} is held by {}",
            "⚠️".yellow(),
            skipped.index + 1,
            skipped.command,
            skipped.location.to_string().bright_white(),
            skipped.holder
        );
    }

    let output = args
        .output
        .map(|path| resolve(cwd, &path))
        .unwrap_or(input);
    write_story(&output, &report.story)?;

    println!(
        "  {} {} applied, {} skipped → {}",
        "✓".green(),
        report.applied,
        report.skipped.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_editor::{Resource, Section};
    use serde_json::Value;

    fn story() -> Story {
        Story::new_default("s1")
            .create_section("a", Section::new("a", "A"))
            .unwrap()
            .create_section("b", Section::new("b", "B"))
            .unwrap()
    }

    #[test]
    fn test_blocked_commands_are_skipped() {
        let mut pipeline = EditPipeline::new(story());
        pipeline.enter_block("u2", LockLocation::section("a"));

        let commands = vec![
            StoryCommand::UpdateSection {
                section_id: "a".into(),
                section: Section::new("a", "Renamed"),
            },
            StoryCommand::SetCss { css: "h1 {}".into() },
        ];

        let report = run_commands(pipeline, "u1", commands).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].holder, "u2");
        assert_eq!(report.story.section("a").map(|s| s.title()), Some("A"));
        assert_eq!(report.story.settings.css, "h1 {}");
    }

    #[test]
    fn test_integrity_error_aborts() {
        let commands = vec![
            StoryCommand::SetCss { css: "h1 {}".into() },
            StoryCommand::DeleteResource {
                resource_id: "missing".into(),
            },
        ];

        let err = run_commands(EditPipeline::new(story()), "u1", commands).unwrap_err();
        assert!(err.to_string().contains("#2"));
    }

    #[test]
    fn test_apply_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        write_story(&dir.path().join("story.json"), &story()).unwrap();

        let commands = vec![
            StoryCommand::ReorderSections {
                sections_order: vec!["b".into(), "a".into()],
            },
            StoryCommand::CreateResource {
                resource_id: "r1".into(),
                resource: Resource::new("r1", "bib", Value::Null),
            },
        ];
        std::fs::write(
            dir.path().join("commands.json"),
            serde_json::to_string(&commands).unwrap(),
        )
        .unwrap();

        let presence = Presence::default();
        std::fs::write(
            dir.path().join("presence.json"),
            serde_json::to_string(&presence).unwrap(),
        )
        .unwrap();

        apply(
            ApplyArgs {
                input: "story.json".into(),
                commands: "commands.json".into(),
                output: Some("out.json".into()),
                user: None,
                presence: Some("presence.json".into()),
            },
            &cwd,
        )
        .unwrap();

        let result = load_story(&dir.path().join("out.json")).unwrap();
        assert_eq!(result.sections_order.as_slice(), ["b", "a"]);
        assert!(result.resource("r1").is_some());

        // input untouched
        let input = load_story(&dir.path().join("story.json")).unwrap();
        assert_eq!(input.sections_order.as_slice(), ["a", "b"]);
    }
}
