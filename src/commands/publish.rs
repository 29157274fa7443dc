use colored::Colorize;

use crate::aggregate::DependencyAggregate;
use crate::analyzer::Resolver;
use crate::cli::ParsedArguments;
use crate::error::{ScanError, ScanResult};
use crate::models::{ConsumerSource, PackageConsumer};
use crate::registry::{PublishRequest, Publisher};

/// Options of a publish iteration, read from the parsed arguments.
struct PublishOptions<'a> {
    package_feed: &'a str,
    base_url: &'a str,
    consumer_name: Option<&'a str>,
    consumer_version: &'a str,
    consumer_group: Option<&'a str>,
    consumer_source: ConsumerSource,
    api_key: Option<&'a str>,
}

impl<'a> PublishOptions<'a> {
    fn from_args(args: &'a ParsedArguments) -> ScanResult<Self> {
        Ok(Self {
            package_feed: args.required("package-feed")?,
            base_url: args.required("proget-url")?,
            consumer_source: ConsumerSource::classify(args.required("consumer-package-source")?),
            consumer_version: args.required("consumer-package-version")?,
            consumer_name: args.named("consumer-package-name"),
            consumer_group: args.named("consumer-package-group"),
            api_key: args.named("api-key"),
        })
    }

    fn consumer(&self, project_name: Option<&str>) -> PackageConsumer {
        PackageConsumer {
            name: self.consumer_name.or(project_name).map(str::to_string),
            version: self.consumer_version.to_string(),
            group: self.consumer_group.map(str::to_string),
            source: self.consumer_source.clone(),
        }
    }
}

/// Publish consumer data for every dependency in the `--input` file and fold
/// the dependencies into `aggregate`.
pub async fn run<R: Resolver, P: Publisher>(
    args: &ParsedArguments,
    resolver: &R,
    publisher: &P,
    aggregate: &mut DependencyAggregate,
) -> ScanResult<()> {
    let (input, ecosystem) = super::source_file(args)?;
    println!("Publishing {}...", input.display());

    let options = PublishOptions::from_args(args)?;
    let projects = super::resolve_projects(resolver, input, ecosystem)?;

    for project in &projects {
        let consumer = options.consumer(project.name.as_deref());
        for dependency in &project.dependencies {
            println!("Publishing consumer data for {}...", dependency);

            let request = PublishRequest {
                base_url: options.base_url,
                feed: options.package_feed,
                dependency,
                consumer: &consumer,
                api_key: options.api_key,
            };
            publisher
                .record_dependency(request)
                .await
                .map_err(|source| ScanError::Publish {
                    package: dependency.to_string(),
                    source,
                })?;

            aggregate.merge(dependency)?;
        }
    }

    println!("{}", "Dependencies published!".green());
    Ok(())
}
