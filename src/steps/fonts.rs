use crate::config::Layout;
use crate::error::Result;
use crate::models::{StepReport, Task};

use super::{collect_files, read_file, relative_to, require_dir, write_file};

/// Copy every font file verbatim, keeping its relative path.
pub fn copy(layout: &Layout) -> Result<StepReport> {
    let source = layout.fonts_dir();
    require_dir(&source)?;

    let output = layout.output_dir();
    let destination = layout.fonts_output_dir();
    let mut report = StepReport::new(Task::Fonts);

    for file in collect_files(&source, "**/*")? {
        let target = destination.join(relative_to(&file, &source));
        write_file(&target, &read_file(&file)?)?;
        report.written.push(relative_to(&target, &output));
    }

    Ok(report)
}
