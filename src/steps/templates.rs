use std::path::{Path, PathBuf};

use tera::{Context, Tera};

use crate::config::Layout;
use crate::error::{error_chain, Result};
use crate::models::{StepReport, Task};
use crate::notification::Notifier;

use super::{collect_files, relative_to, report_failure, require_dir, write_file};

/// Render every `index.*` template to `index.html` at the same relative
/// directory under the output root.
///
/// All files under the templates directory are loaded so entries can extend
/// layouts and include partials. If the template set does not compile the
/// whole run is skipped; a render error skips only that entry.
pub fn render(layout: &Layout, notifier: &dyn Notifier) -> Result<StepReport> {
    let source = layout.templates_dir();
    require_dir(&source)?;

    let output = layout.output_dir();
    let mut report = StepReport::new(Task::Pug);

    let files = collect_files(&source, "**/*")?;
    let named: Vec<(PathBuf, Option<String>)> = files
        .iter()
        .map(|file| (file.clone(), Some(template_name(&source, file))))
        .collect();

    let mut tera = Tera::default();
    if let Err(e) = tera.add_template_files(named) {
        report_failure(&mut report, notifier, &source, error_chain(&e));
        return Ok(report);
    }

    let context = Context::new();
    for entry in files.iter().filter(|file| is_entry(file)) {
        let name = template_name(&source, entry);
        match tera.render(&name, &context) {
            Ok(html) => {
                let relative = relative_to(entry, &source).with_file_name("index.html");
                write_file(&output.join(&relative), html.as_bytes())?;
                notifier.success(Task::Pug, &relative);
                report.written.push(relative);
            }
            Err(e) => {
                let message = format!("{}: {}", name, error_chain(&e));
                report_failure(&mut report, notifier, entry, message);
            }
        }
    }

    Ok(report)
}

fn is_entry(file: &Path) -> bool {
    file.file_stem().is_some_and(|stem| stem == "index")
}

/// Template names are `/`-separated paths relative to the templates root, which
/// is what `{% extends %}` and `{% include %}` refer to.
fn template_name(root: &Path, file: &Path) -> String {
    relative_to(file, root)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
