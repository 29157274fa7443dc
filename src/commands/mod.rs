//! Per-file command handlers invoked by the batch loop.

use std::path::PathBuf;

use crate::analyzer::Resolver;
use crate::cli::ParsedArguments;
use crate::error::{ScanError, ScanResult};
use crate::models::{Ecosystem, Project};

pub mod publish;
pub mod report;

/// The `--input` file of this iteration and its ecosystem.
fn source_file(args: &ParsedArguments) -> ScanResult<(PathBuf, Ecosystem)> {
    let input = PathBuf::from(args.required("input")?);
    let ecosystem = Ecosystem::resolve(args.named("type"), &input)?;
    Ok((input, ecosystem))
}

fn resolve_projects<R: Resolver>(
    resolver: &R,
    input: PathBuf,
    ecosystem: Ecosystem,
) -> ScanResult<Vec<Project>> {
    resolver
        .resolve(&input, ecosystem)
        .map_err(|source| ScanError::Resolve {
            path: input,
            source,
        })
}
