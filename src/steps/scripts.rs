use crate::config::Layout;
use crate::error::Result;
use crate::models::{StepReport, Task};
use crate::notification::Notifier;

use super::{collect_files, read_file, relative_to, report_failure, require_dir, write_file};

/// Concatenate every script in sorted path order, minify, and write
/// `js/scripts.min.js`. Nothing is written when there are no scripts.
pub fn bundle(layout: &Layout, notifier: &dyn Notifier) -> Result<StepReport> {
    let source = layout.scripts_dir();
    require_dir(&source)?;

    let mut report = StepReport::new(Task::Js);
    let files = collect_files(&source, "**/*.js")?;
    if files.is_empty() {
        tracing::debug!("No scripts under {}", source.display());
        return Ok(report);
    }

    let mut bundle = String::new();
    for file in &files {
        match String::from_utf8(read_file(file)?) {
            Ok(script) => {
                bundle.push_str(&script);
                if !script.ends_with('\n') {
                    bundle.push('\n');
                }
            }
            Err(_) => {
                let message = format!("{}: not valid UTF-8", relative_to(file, &source).display());
                report_failure(&mut report, notifier, file, message);
                return Ok(report);
            }
        }
    }

    let minified = minifier::js::minify(&bundle).to_string();
    let target = layout.script_output();
    write_file(&target, minified.as_bytes())?;

    let relative = relative_to(&target, &layout.output_dir());
    notifier.success(Task::Js, &relative);
    report.written.push(relative);
    Ok(report)
}
