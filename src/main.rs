use anyhow::{anyhow, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use git_versioning::boundary::collect_warnings;
use git_versioning::config;
use git_versioning::engine;
use git_versioning::git::{Git2Repository, GitSituation};
use git_versioning::ui::{self, Report};

/// Exit status when no rule matches
const EXIT_NO_MATCH: i32 = 2;

#[derive(clap::Parser)]
#[command(
    name = "git-versioning",
    version,
    about = "Derive a project version from the state of its git repository"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, default_value = ".", help = "Directory inside the repository")]
    dir: PathBuf,

    #[arg(long, help = "Use this branch instead of HEAD's (empty detaches)")]
    branch: Option<String>,

    #[arg(long, help = "Use this tag instead of the tags at HEAD (empty clears)")]
    tag: Option<String>,

    #[arg(long, default_value = "0.0.0", help = "Version before rewriting")]
    project_version: String,

    #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property,
          help = "Property to rewrite, may be repeated")]
    properties: Vec<(String, String)>,

    #[arg(long, help = "Let tag rules match while on a branch")]
    consider_tags_on_branches: bool,

    #[arg(short, long, help = "Only print the resulting version")]
    quiet: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn parse_property(value: &str) -> std::result::Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", value))
}

fn init_logging(verbose: bool) -> Result<()> {
    let directive = if verbose {
        "git_versioning=debug"
    } else {
        "git_versioning=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() {
    let args = Args::parse();

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<i32> {
    init_logging(args.verbose)?;

    let mut config = config::load_config(args.config.as_deref())?;
    if args.consider_tags_on_branches {
        config.consider_tags_on_branches = true;
    }
    let rules = config.rules()?;
    let commit_fallback = config.commit_fallback();

    let repository = Git2Repository::open(&args.dir)
        .map_err(|e| anyhow!("{} is not inside a git repository: {}", args.dir.display(), e))?;
    let mut situation = GitSituation::from_repository(repository)?;

    if let Some(branch) = &args.branch {
        situation.set_branch(Some(branch.clone()).filter(|b| !b.is_empty()))?;
    }
    if let Some(tag) = &args.tag {
        let tags = if tag.is_empty() {
            Vec::new()
        } else {
            vec![tag.clone()]
        };
        situation.set_tags(tags)?;
        if !tag.is_empty() && args.branch.is_none() {
            situation.set_branch(None)?;
        }
    }
    config.apply_describe_settings(&mut situation)?;

    let properties: BTreeMap<String, String> = args.properties.into_iter().collect();
    let options = config.resolve_options();

    let report = match engine::resolve(
        &mut situation,
        &rules,
        commit_fallback.as_ref(),
        &options,
    )? {
        Some(resolution) => Some(Report {
            ref_type: resolution.ref_type(),
            ref_name: resolution.ref_name().to_string(),
            version: resolution.render_version(&args.project_version)?,
            properties: resolution.render_properties(&args.project_version, &properties)?,
            git_properties: resolution.git_properties()?,
        }),
        None => None,
    };

    for warning in collect_warnings(&situation, report.is_some()) {
        ui::display_boundary_warning(&warning);
    }

    match report {
        Some(report) => {
            ui::print_report(&report, args.quiet);
            Ok(0)
        }
        None => Ok(EXIT_NO_MATCH),
    }
}
