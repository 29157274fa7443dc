use colored::Colorize;

use crate::analyzer::Resolver;
use crate::cli::ParsedArguments;
use crate::error::ScanResult;
use crate::models::Project;

/// Print the projects and dependencies found in the `--input` file.
pub fn run<R: Resolver>(args: &ParsedArguments, resolver: &R) -> ScanResult<()> {
    let (input, ecosystem) = super::source_file(args)?;
    println!("Reporting {}...", input.display());

    let projects = super::resolve_projects(resolver, input, ecosystem)?;
    print!("{}", render(&projects));
    Ok(())
}

fn render(projects: &[Project]) -> String {
    if projects.is_empty() {
        return format!("{}\n", "No projects found.".yellow());
    }

    let mut out = String::new();
    for project in projects {
        let name = project.name.as_deref().unwrap_or("(project)");
        out.push_str(&format!("{}\n", name.bold()));
        for dep in &project.dependencies {
            out.push_str(&format!("  {} {} {}\n", "=>".cyan(), dep.name, dep.version));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dependency;

    #[test]
    fn test_render_tree() {
        colored::control::set_override(false);
        let projects = vec![
            Project {
                name: Some("App".into()),
                dependencies: vec![
                    Dependency::new("Serilog", "2.12.0"),
                    Dependency::new("Dapper", "2.1.0"),
                ],
            },
            Project {
                name: None,
                dependencies: vec![],
            },
        ];
        assert_eq!(
            render(&projects),
            "App\n  => Serilog 2.12.0\n  => Dapper 2.1.0\n\n(project)\n\n"
        );
    }

    #[test]
    fn test_render_empty() {
        colored::control::set_override(false);
        assert_eq!(render(&[]), "No projects found.\n");
    }
}
