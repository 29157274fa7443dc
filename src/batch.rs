//! The batch loop: expand `--input`, run the command once per file, then
//! flush the aggregated dependencies into the manifest.

use std::path::Path;

use colored::Colorize;

use crate::aggregate::DependencyAggregate;
use crate::analyzer::Resolver;
use crate::cli::ParsedArguments;
use crate::commands;
use crate::config::{BuildMetadata, Config};
use crate::error::{ScanError, ScanResult};
use crate::inputs::resolve_inputs;
use crate::manifest;
use crate::models::Command;
use crate::registry::Publisher;

/// Collaborators and settings shared by every iteration.
pub struct BatchContext<'a, R, P> {
    pub resolver: &'a R,
    pub publisher: &'a P,
    pub config: &'a Config,
    pub build: &'a BuildMetadata,
    pub working_dir: &'a Path,
}

/// The raw tokens plus the slot that carries `--input`.
#[derive(Debug, Clone)]
struct Invocation<'t> {
    base: &'t [String],
    input_position: usize,
}

impl Invocation<'_> {
    /// Tokens for one iteration, with the input slot pointing at `path`.
    fn tokens_for(&self, path: &Path) -> Vec<String> {
        let mut tokens = self.base.to_vec();
        tokens[self.input_position] = format!("--input=\"{}\"", path.display());
        tokens
    }
}

pub async fn run<R: Resolver, P: Publisher>(
    tokens: &[String],
    ctx: &BatchContext<'_, R, P>,
) -> ScanResult<()> {
    let initial = ParsedArguments::parse(tokens)?;
    if initial.command().map_or(true, |c| c.trim().is_empty()) {
        return Err(ScanError::MissingCommand);
    }

    let spec = initial.required("input")?;
    let input_position = initial
        .position("input")
        .ok_or_else(|| ScanError::MissingArgument("input".to_string()))?;

    let inputs = resolve_inputs(spec, &ctx.config.inputs.default_pattern, ctx.working_dir)?;
    let invocation = Invocation {
        base: tokens,
        input_position,
    };

    let mut aggregate = DependencyAggregate::new();
    let mut args = initial;

    for path in inputs.iter() {
        tracing::debug!(path = %path.display(), "processing input");
        args = ParsedArguments::parse(&invocation.tokens_for(path))?;

        match args.command().unwrap_or_default().parse::<Command>()? {
            Command::Report => commands::report::run(&args, ctx.resolver)?,
            Command::Publish => {
                commands::publish::run(&args, ctx.resolver, ctx.publisher, &mut aggregate).await?
            }
        }
    }

    if aggregate.is_empty() {
        return Ok(());
    }
    let Some(nuspec) = args.named("application-nuspec") else {
        return Ok(());
    };

    println!("Adding dependencies to {}...", nuspec);
    let nuspec = Path::new(nuspec);
    manifest::augment_file(nuspec, &ctx.config.manifest.namespace, &aggregate, ctx.build).map_err(
        |source| ScanError::Manifest {
            path: nuspec.to_path_buf(),
            source,
        },
    )?;
    println!(
        "{}  {} represented.",
        "Dependencies added to manifest!".green(),
        aggregate.len()
    );

    Ok(())
}
