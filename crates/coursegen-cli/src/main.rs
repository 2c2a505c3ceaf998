//! Course Generation CLI
//!
//! Main entry point for generating a personalized course archive.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use coursegen_olx::{CourseSummary, Exporter};
use coursegen_orchestrator::{
    ChatProvider, Config, ContentProvider, CourseGenerationManager, GenerationOutcome,
    GenerationSettings, ProviderKind, Skill, SkillLevel, TemplateProvider, Transcript,
    UserProfile,
};
use tracing_subscriber::EnvFilter;

/// Course Generator - Personalized e-learning courses
///
/// Generates a course outline and chapter content for a learner, reviews and
/// revises it, and exports an importable OLX archive.
#[derive(Parser, Debug)]
#[command(name = "coursegen")]
#[command(version, about, long_about = None)]
struct Args {
    /// Learner name
    #[arg(value_name = "NAME")]
    name: String,

    /// Skill to build the course for
    #[arg(value_name = "SKILL")]
    skill: String,

    /// Free-text description of the skill
    #[arg(long, value_name = "TEXT", default_value = "")]
    skill_description: String,

    /// Skill level (beginner, intermediate, advanced or 初级, 中级, 高级)
    #[arg(short, long, value_name = "LEVEL")]
    level: Option<SkillLevel>,

    /// Learning goal (repeatable)
    #[arg(short, long = "goal", value_name = "GOAL")]
    goals: Vec<String>,

    /// Run an interactive skill assessment before generating
    #[arg(long, conflicts_with = "level")]
    assess: bool,

    /// Path to configuration file (default: coursegen.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Output directory for archives
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Maximum review rounds for the outline
    #[arg(short, long, value_name = "N")]
    max_iterations: Option<u32>,

    /// Content provider (template, deepseek, glm)
    #[arg(short, long, value_name = "PROVIDER")]
    provider: Option<ProviderKind>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // A missing .env file is fine; keys may already be exported.
    dotenvy::dotenv().ok();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads configuration, applies overrides and dispatches on the provider.
fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref output_dir) = args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(provider) = args.provider {
        config.provider = provider;
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    match config.provider {
        ProviderKind::Template => generate(TemplateProvider::new(), &config, &args),
        ProviderKind::DeepSeek | ProviderKind::Glm => {
            generate(ChatProvider::from_config(&config)?, &config, &args)
        }
    }
}

/// Runs the session and exports the result.
fn generate<P: ContentProvider>(provider: P, config: &Config, args: &Args) -> anyhow::Result<()> {
    let mut manager = CourseGenerationManager::new(provider, GenerationSettings::from_config(config));

    let mut profile = UserProfile::new(args.name.trim());
    for goal in &args.goals {
        profile.add_learning_goal(goal.as_str());
    }
    let skill = Skill::new(args.skill.trim(), args.skill_description.as_str());

    if let Some(level) = args.level {
        profile = profile.with_skill_level(level);
    } else if args.assess {
        run_assessment(&mut manager, &skill, &mut profile)?;
    }

    println!();
    println!(
        "Generating '{}' for {} ({})...",
        skill.name(),
        profile.name(),
        profile.level_name()
    );
    let outcome = match manager.generate_course(&profile, &skill) {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(state) = manager.last_state() {
                eprintln!(
                    "Generation stopped in stage {} after {} review rounds",
                    state.stage,
                    state.history.len()
                );
            }
            return Err(e.into());
        }
    };

    let exporter = Exporter::new(&config.output_dir);
    let export = exporter.export(&outcome.course)?;

    let summary = CourseSummary::from_export(&outcome.course, &export);
    let summary_path = summary_path(exporter.output_dir(), &outcome);
    summary.write_to_file(&summary_path)?;

    print_summary(&summary, &outcome, &summary_path);
    Ok(())
}

/// Asks the assessment questions on stdin and stores the graded level.
fn run_assessment<P: ContentProvider>(
    manager: &mut CourseGenerationManager<P>,
    skill: &Skill,
    profile: &mut UserProfile,
) -> anyhow::Result<()> {
    let mut transcript = Transcript::new();
    let questions = manager.assessment_questions(skill, &mut transcript)?;

    println!();
    println!("Skill assessment for {} (answer y/n):", skill.name());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut answers = Vec::with_capacity(questions.len());
    for (i, question) in questions.into_iter().enumerate() {
        print!("  {}. {question} ", i + 1);
        std::io::stdout().flush()?;
        let answer = lines.next().transpose()?.unwrap_or_default();
        answers.push((question, answer.trim().to_string()));
    }

    let result = manager.analyze_assessment(skill, &answers, &mut transcript)?;
    profile.apply_assessment(&result);

    println!();
    println!("Assessed level: {}", result.level);
    println!("  {}", result.explanation);
    println!("Objectives:");
    for objective in &result.objectives {
        println!("  - {objective}");
    }
    println!("Learning path: {}", result.learning_path);
    Ok(())
}

fn summary_path(output_dir: &Path, outcome: &GenerationOutcome) -> PathBuf {
    output_dir.join(format!("{}-summary.json", outcome.course.archive_root_name()))
}

/// Loads configuration from the specified path or the default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Provider: {}", config.provider);
    if config.provider != ProviderKind::Template {
        println!("  Model: {}", config.effective_model());
    }
    println!("  Max iterations: {}", config.max_iterations);
    println!("  Full course review: {}", config.full_course_review);
    println!("  Output directory: {}", config.output_dir);
    println!("  Organization/run: {}/{}", config.org, config.run);
}

fn print_summary(summary: &CourseSummary, outcome: &GenerationOutcome, summary_path: &Path) {
    println!();
    println!("Course generated: {}", summary.title);
    println!("  Chapters: {}", summary.chapter_count);
    println!("  Units: {}", summary.sequential_count);
    println!("  Screens: {}", summary.vertical_count);
    println!("  Components: {}", summary.component_count);
    println!("  Review rounds: {}", outcome.state.history.len());
    if !outcome.state.fallbacks.is_empty() {
        println!("  Fallbacks used: {}", outcome.state.fallbacks.len());
    }
    println!("  Archive: {}", summary.archive_path.display());
    println!("  Summary: {}", summary_path.display());
}
