use std::path::{Path, PathBuf};

use lightningcss::media_query::MediaList;
use lightningcss::rules::{media::MediaRule, CssRule};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;

use crate::config::Layout;
use crate::error::{BuildError, Result};
use crate::models::{StepReport, Task};
use crate::notification::Notifier;

use super::{relative_to, report_failure, require_dir, write_file};

/// Entry stylesheet name; the first existing extension wins.
const ENTRY_STEM: &str = "style";
const ENTRY_EXTENSIONS: [&str; 3] = ["scss", "sass", "css"];

const BROWSER_QUERY: &str = "last 2 versions";

/// Compile the entry stylesheet into `css/style.min.css`.
pub fn render(layout: &Layout, notifier: &dyn Notifier) -> Result<StepReport> {
    let source = layout.styles_dir();
    require_dir(&source)?;
    let entry = find_entry(&source)
        .ok_or_else(|| BuildError::MissingSource(source.join("style.scss")))?;

    let mut report = StepReport::new(Task::Style);
    match compile(&entry) {
        Ok(css) => {
            let target = layout.stylesheet_output();
            write_file(&target, css.as_bytes())?;
            let relative = relative_to(&target, &layout.output_dir());
            notifier.success(Task::Style, &relative);
            report.written.push(relative);
        }
        Err(message) => report_failure(&mut report, notifier, &entry, message),
    }

    Ok(report)
}

fn find_entry(dir: &Path) -> Option<PathBuf> {
    ENTRY_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", ENTRY_STEM, ext)))
        .find(|path| path.is_file())
}

/// Sass compile, then the CSS chain. Errors are returned as display text
/// because they are only ever shown to the developer.
fn compile(entry: &Path) -> Result<String, String> {
    let options = grass::Options::default().style(grass::OutputStyle::Expanded);
    let css = grass::from_path(entry, &options).map_err(|e| e.to_string())?;
    postprocess(&css, &entry.to_string_lossy())
}

/// Consolidate media queries, add vendor prefixes and minify.
pub fn postprocess(css: &str, filename: &str) -> Result<String, String> {
    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    let rules = std::mem::take(&mut sheet.rules.0);
    sheet.rules.0 = pack_media_queries(rules);

    sheet
        .minify(MinifyOptions {
            targets: browser_targets()?,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let output = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets: browser_targets()?,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    Ok(output.code)
}

fn browser_targets() -> Result<Targets, String> {
    let browsers = Browsers::from_browserslist([BROWSER_QUERY]).map_err(|e| e.to_string())?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Merge `@media` blocks with identical queries and move them after all other
/// rules, in the order each query was first seen.
fn pack_media_queries<'i>(rules: Vec<CssRule<'i>>) -> Vec<CssRule<'i>> {
    let mut plain = Vec::with_capacity(rules.len());
    let mut media: Vec<(String, MediaRule<'i>)> = Vec::new();

    for rule in rules {
        match rule {
            CssRule::Media(rule) => {
                let key = query_key(&rule.query);
                match media.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, existing)) => existing.rules.0.extend(rule.rules.0),
                    None => media.push((key, rule)),
                }
            }
            other => plain.push(other),
        }
    }

    plain.extend(media.into_iter().map(|(_, rule)| CssRule::Media(rule)));
    plain
}

fn query_key(query: &MediaList<'_>) -> String {
    query
        .to_css_string(PrinterOptions::default())
        .unwrap_or_default()
}
