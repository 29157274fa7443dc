//! Embeds the aggregated dependencies and repository provenance into a
//! packaging manifest (`.nuspec`).
//!
//! The document is streamed through `quick-xml` and written back event by
//! event, so everything outside `metadata/dependencies` and
//! `metadata/repository` is preserved byte-for-byte. Inside `metadata`:
//!
//! - one `<dependency id=".." version=".."/>` per aggregated package is
//!   appended to `dependencies` (created when missing); existing entries are
//!   kept as they are
//! - `repository` is created as `type="git"` with `url` and `commit`, or, if
//!   present, only its `url` and `commit` attributes are replaced

use std::path::Path;

use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};

use crate::aggregate::DependencyAggregate;
use crate::config::BuildMetadata;

const DEFAULT_INDENT: &str = "    ";

/// Rewrite the manifest at `path` in place.
pub fn augment_file(
    path: &Path,
    namespace: &str,
    aggregate: &DependencyAggregate,
    build: &BuildMetadata,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let updated = augment(&content, namespace, aggregate, build)?;
    std::fs::write(path, updated).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// State for the `metadata` element while it is open.
#[derive(Default)]
struct Metadata {
    prefix: Option<String>,
    indent: String,
    child_indent: Option<String>,
    dependency_indent: Option<String>,
    has_dependencies: bool,
    has_repository: bool,
    in_dependencies: bool,
}

impl Metadata {
    fn open(e: &BytesStart, preceding: Option<&BytesText>) -> Self {
        Self {
            prefix: e
                .name()
                .prefix()
                .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned()),
            indent: indent_of(preceding).unwrap_or_default(),
            ..Self::default()
        }
    }

    fn qualified(&self, local: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    fn child_indent(&self) -> &str {
        self.child_indent.as_deref().unwrap_or(DEFAULT_INDENT)
    }

    fn dependency_indent(&self) -> String {
        if let Some(indent) = &self.dependency_indent {
            return indent.clone();
        }
        let child = self.child_indent();
        let unit = child
            .strip_prefix(self.indent.as_str())
            .filter(|u| !u.is_empty())
            .unwrap_or("  ");
        format!("{}{}", child, unit)
    }
}

struct Augmenter<'a> {
    writer: Writer<Vec<u8>>,
    aggregate: &'a DependencyAggregate,
    build: &'a BuildMetadata,
}

impl Augmenter<'_> {
    fn newline(&mut self, indent: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(&format!("\n{}", indent))))?;
        Ok(())
    }

    fn write_entries(&mut self, metadata: &Metadata) -> Result<()> {
        let name = metadata.qualified("dependency");
        let indent = metadata.dependency_indent();
        for dep in self.aggregate.iter() {
            self.newline(&indent)?;
            let element = BytesStart::new(name.as_str())
                .with_attributes([("id", dep.name.as_str()), ("version", dep.version.as_str())]);
            self.writer.write_event(Event::Empty(element))?;
        }
        Ok(())
    }

    fn write_dependencies(&mut self, metadata: &Metadata) -> Result<()> {
        let name = metadata.qualified("dependencies");
        self.newline(metadata.child_indent())?;
        self.writer
            .write_event(Event::Start(BytesStart::new(name.as_str())))?;
        self.write_entries(metadata)?;
        self.newline(metadata.child_indent())?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn write_repository(&mut self, metadata: &Metadata) -> Result<()> {
        let mut element = BytesStart::new(metadata.qualified("repository"));
        element.push_attribute(("type", "git"));
        if let Some(url) = &self.build.repository_uri {
            element.push_attribute(("url", url.as_str()));
        }
        if let Some(commit) = &self.build.source_version {
            element.push_attribute(("commit", commit.as_str()));
        }
        self.newline(metadata.child_indent())?;
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    /// Copy of an existing `repository` tag with `url` and `commit` replaced.
    fn rewrite_repository(&self, e: &BytesStart) -> Result<BytesStart<'static>> {
        let mut element = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
        let mut url = self.build.repository_uri.as_deref();
        let mut commit = self.build.source_version.as_deref();

        for attr in e.attributes() {
            let attr = attr?;
            match attr.key.as_ref() {
                b"url" => {
                    if let Some(value) = url.take() {
                        element.push_attribute(("url", value));
                    }
                }
                b"commit" => {
                    if let Some(value) = commit.take() {
                        element.push_attribute(("commit", value));
                    }
                }
                _ => element.push_attribute(attr),
            }
        }
        if let Some(value) = url {
            element.push_attribute(("url", value));
        }
        if let Some(value) = commit {
            element.push_attribute(("commit", value));
        }
        Ok(element)
    }
}

fn is_whitespace(text: &BytesText) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Indentation that follows the last line break of a whitespace run.
fn indent_of(text: Option<&BytesText>) -> Option<String> {
    let text = text?;
    let raw = String::from_utf8_lossy(text);
    raw.rfind('\n').map(|i| raw[i + 1..].to_string())
}

/// Augment a manifest document held in memory.
pub fn augment(
    content: &str,
    namespace: &str,
    aggregate: &DependencyAggregate,
    build: &BuildMetadata,
) -> Result<String> {
    let (bom, body) = match content.strip_prefix('\u{feff}') {
        Some(rest) => ("\u{feff}", rest),
        None => ("", content),
    };

    let mut reader = NsReader::from_str(body);
    let mut out = Augmenter {
        writer: Writer::new(Vec::new()),
        aggregate,
        build,
    };

    let mut depth = 0usize;
    let mut found = false;
    let mut metadata: Option<Metadata> = None;
    // Whitespace held back so new elements can go in front of a closing tag.
    let mut pending: Option<BytesText> = None;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let in_ns = matches!(ns, ResolveResult::Bound(Namespace(n)) if n == namespace.as_bytes());

        match event {
            Event::Eof => break,
            Event::Text(text) if is_whitespace(&text) => {
                if let Some(previous) = pending.replace(text) {
                    out.writer.write_event(Event::Text(previous))?;
                }
                continue;
            }
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                let mut rewritten = None;

                if depth == 1 && !found && in_ns && local == b"metadata" {
                    found = true;
                    metadata = Some(Metadata::open(&e, pending.as_ref()));
                } else if let Some(meta) = metadata.as_mut() {
                    if depth == 2 {
                        meta.child_indent = meta.child_indent.take().or(indent_of(pending.as_ref()));
                        if in_ns && local == b"dependencies" {
                            meta.has_dependencies = true;
                            meta.in_dependencies = true;
                        } else if in_ns && local == b"repository" {
                            meta.has_repository = true;
                            rewritten = Some(out.rewrite_repository(&e)?);
                        }
                    } else if depth == 3 && meta.in_dependencies && meta.dependency_indent.is_none() {
                        meta.dependency_indent = indent_of(pending.as_ref());
                    }
                }

                depth += 1;
                flush(&mut out, &mut pending)?;
                match rewritten {
                    Some(element) => out.writer.write_event(Event::Start(element))?,
                    None => out.writer.write_event(Event::Start(e))?,
                }
            }
            Event::Empty(e) => {
                let local = e.local_name().as_ref().to_vec();

                if depth == 1 && !found && in_ns && local == b"metadata" {
                    // `<metadata/>`: open it, add both elements, close it.
                    found = true;
                    let meta = Metadata::open(&e, pending.as_ref());
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    flush(&mut out, &mut pending)?;
                    out.writer.write_event(Event::Start(e))?;
                    out.write_dependencies(&meta)?;
                    out.write_repository(&meta)?;
                    out.newline(&meta.indent)?;
                    out.writer.write_event(Event::End(BytesEnd::new(name)))?;
                    continue;
                }

                let Some(meta) = metadata.as_mut() else {
                    flush(&mut out, &mut pending)?;
                    out.writer.write_event(Event::Empty(e))?;
                    continue;
                };

                if depth == 3 && meta.in_dependencies && meta.dependency_indent.is_none() {
                    meta.dependency_indent = indent_of(pending.as_ref());
                }
                if depth != 2 {
                    flush(&mut out, &mut pending)?;
                    out.writer.write_event(Event::Empty(e))?;
                    continue;
                }

                meta.child_indent = meta.child_indent.take().or(indent_of(pending.as_ref()));
                flush(&mut out, &mut pending)?;

                if in_ns && local == b"dependencies" {
                    // `<dependencies/>`: expand it so entries can go inside.
                    meta.has_dependencies = true;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    out.writer.write_event(Event::Start(e))?;
                    out.write_entries(meta)?;
                    let indent = meta.child_indent().to_string();
                    out.newline(&indent)?;
                    out.writer.write_event(Event::End(BytesEnd::new(name)))?;
                } else if in_ns && local == b"repository" {
                    meta.has_repository = true;
                    let element = out.rewrite_repository(&e)?;
                    out.writer.write_event(Event::Empty(element))?;
                } else {
                    out.writer.write_event(Event::Empty(e))?;
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);

                if let Some(meta) = metadata.as_mut() {
                    if depth == 2 && meta.in_dependencies {
                        meta.in_dependencies = false;
                        out.write_entries(meta)?;
                        if pending.is_none() {
                            let indent = meta.child_indent().to_string();
                            out.newline(&indent)?;
                        }
                    } else if depth == 1 {
                        if !meta.has_dependencies {
                            out.write_dependencies(meta)?;
                        }
                        if !meta.has_repository {
                            out.write_repository(meta)?;
                        }
                        metadata = None;
                    }
                }

                flush(&mut out, &mut pending)?;
                out.writer.write_event(Event::End(e))?;
            }
            other => {
                flush(&mut out, &mut pending)?;
                out.writer.write_event(other)?;
            }
        }
    }
    flush(&mut out, &mut pending)?;

    if !found {
        bail!("no <metadata> element in namespace {}", namespace);
    }

    let body = String::from_utf8(out.writer.into_inner())?;
    Ok(format!("{}{}", bom, body))
}

fn flush(out: &mut Augmenter, pending: &mut Option<BytesText>) -> Result<()> {
    if let Some(text) = pending.take() {
        out.writer.write_event(Event::Text(text))?;
    }
    Ok(())
}
