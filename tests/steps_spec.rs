use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use sitebuild::models::{Target, Task};
use sitebuild::notification::{Notification, RecordingNotifier};
use sitebuild::steps::Pipeline;
use sitebuild::{BuildError, Config, Layout, Site};
use speculate2::speculate;

fn write(root: &Path, relative: &str, contents: impl AsRef<[u8]>) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Opaque RGBA gradient written without filtering at the fastest level.
fn loose_png() -> Vec<u8> {
    let pixels: Vec<u8> = (0..32u32 * 32)
        .flat_map(|i| [(i % 32 * 8) as u8, (i / 32 * 8) as u8, 0, 255])
        .collect();
    let mut png = Vec::new();
    PngEncoder::new_with_quality(&mut png, CompressionType::Fast, FilterType::NoFilter)
        .write_image(&pixels, 32, 32, ExtendedColorType::Rgba8)
        .unwrap();
    png
}

fn full_quality_jpeg() -> Vec<u8> {
    let image = image::RgbImage::from_fn(32, 32, |x, y| {
        image::Rgb([(x * 31 + y * 17) as u8, (x * y) as u8, (x ^ y) as u8])
    });
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 100)
        .encode_image(&image)
        .unwrap();
    jpeg
}

/// A small site exercising every source kind.
fn create_site(root: &Path) {
    write(
        root,
        "src/pug/layout.html",
        "<html><body>{% block body %}{% endblock %}</body></html>",
    );
    write(
        root,
        "src/pug/index.html",
        "{% extends \"layout.html\" %}{% block body %}<h1>Home</h1>{% endblock %}",
    );
    write(
        root,
        "src/pug/about/index.html",
        "{% include \"partials/nav.html\" %}<p>About</p>",
    );
    write(root, "src/pug/partials/nav.html", "<nav>Nav</nav>");

    write(
        root,
        "src/stylus/style.scss",
        "@import \"partials/base\";\n.box {\n  user-select: none;\n}\n",
    );
    write(
        root,
        "src/stylus/partials/_base.scss",
        "$brand: #ff0000;\nbody {\n  color: $brand;\n}\n",
    );

    write(
        root,
        "src/img/logo.svg",
        "<svg viewBox=\"0 0 1 1\">\n  <!-- logo -->\n  <rect/>\n</svg>\n",
    );
    write(root, "src/img/photos/pic.gif", b"GIF89a-not-really");
    write(root, "src/img/dot.png", loose_png());
    write(root, "src/img/photos/beach.jpg", full_quality_jpeg());
    write(root, "src/img/svg-sprite/icon.svg", "<svg><path/></svg>");

    write(root, "src/js/a.js", "var x=1;");
    write(root, "src/js/b.js", "// second\nvar y=2;");

    write(root, "src/fonts/open-sans.woff2", b"\x00woff2\x01");
}

fn setup() -> (tempfile::TempDir, Layout, Site, Pipeline, RecordingNotifier) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    create_site(dir.path());
    let notifier = RecordingNotifier::new();
    let site = Site::new(Config::new(dir.path()), Arc::new(notifier.clone()));
    let layout = site.config().layout.clone();
    let pipeline = site.pipeline().clone();
    (dir, layout, site, pipeline, notifier)
}

/// Run the `build` target to completion.
fn build(site: &Site) -> sitebuild::Result<()> {
    tokio::runtime::Runtime::new()
        .expect("Failed to start runtime")
        .block_on(site.run_target(Target::Build))
}

/// Every file under `root`, relative path to contents.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn visit(base: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                visit(base, &path, out);
            } else {
                let relative = path.strip_prefix(base).unwrap().to_path_buf();
                out.insert(relative, std::fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    visit(root, root, &mut out);
    out
}

fn read_output(layout: &Layout, relative: &str) -> String {
    std::fs::read_to_string(layout.output_dir().join(relative)).unwrap()
}

speculate! {
    before {
        let (_dir, layout, site, pipeline, notifier) = setup();
    }

    describe "build" {
        it "writes an output file for every source kind" {
            build(&site).expect("Build failed");

            let files: Vec<PathBuf> = snapshot(&layout.output_dir()).into_keys().collect();
            let expected: Vec<PathBuf> = [
                "about/index.html",
                "css/style.min.css",
                "fonts/open-sans.woff2",
                "img/dot.png",
                "img/logo.svg",
                "img/photos/beach.jpg",
                "img/photos/pic.gif",
                "index.html",
                "js/scripts.min.js",
            ]
            .iter()
            .map(PathBuf::from)
            .collect();
            assert_eq!(files, expected);
        }

        it "is byte-identical when run twice" {
            build(&site).expect("First build failed");
            let first = snapshot(&layout.output_dir());

            build(&site).expect("Second build failed");
            assert_eq!(snapshot(&layout.output_dir()), first);
        }

        it "removes stale output before writing" {
            write(layout.root(), "build/old/page.html", "stale");

            build(&site).expect("Build failed");

            assert!(!layout.output_dir().join("old").exists());
            assert!(layout.output_dir().join("index.html").exists());
        }

        it "notifies success for pages, stylesheet and bundle" {
            build(&site).expect("Build failed");

            let notified: BTreeSet<Task> = notifier
                .notifications()
                .iter()
                .map(|n| match n {
                    Notification::Success { task, .. } => *task,
                    Notification::Failure { task, message } => {
                        panic!("'{}' failed: {}", task, message)
                    }
                })
                .collect();
            assert_eq!(notified, BTreeSet::from([Task::Pug, Task::Style, Task::Js]));
        }

        it "stops at a missing source directory and keeps earlier output" {
            std::fs::remove_dir_all(layout.scripts_dir()).unwrap();

            let err = build(&site).unwrap_err();

            assert!(matches!(err, BuildError::MissingSource(ref p) if *p == layout.scripts_dir()));
            assert!(layout.fonts_output_dir().join("open-sans.woff2").exists());
            assert!(layout.stylesheet_output().exists());
            assert!(!layout.script_output().exists());
        }
    }

    describe "templates" {
        it "renders index entries with layouts and includes" {
            pipeline.run_step(Task::Pug).expect("Template step failed");

            assert_eq!(
                read_output(&layout, "index.html"),
                "<html><body><h1>Home</h1></body></html>"
            );
            assert_eq!(
                read_output(&layout, "about/index.html"),
                "<nav>Nav</nav><p>About</p>"
            );
            assert!(!layout.output_dir().join("layout.html").exists());
            assert!(!layout.output_dir().join("partials").exists());
        }

        it "notifies success per written page" {
            pipeline.run_step(Task::Pug).expect("Template step failed");

            assert_eq!(
                notifier.notifications(),
                vec![
                    Notification::Success { task: Task::Pug, file: PathBuf::from("about/index.html") },
                    Notification::Success { task: Task::Pug, file: PathBuf::from("index.html") },
                ]
            );
        }

        it "skips an entry that fails to render and keeps the others" {
            write(layout.root(), "src/pug/broken/index.html", "<p>{{ missing }}</p>");

            let report = pipeline.run_step(Task::Pug).expect("Template step failed");

            assert_eq!(report.failures.len(), 1);
            assert!(report.failures[0].message.contains("broken/index.html"));
            assert!(!layout.output_dir().join("broken/index.html").exists());
            assert!(layout.output_dir().join("index.html").exists());
            assert_eq!(notifier.failures().len(), 1);
        }

        it "skips the run when a template does not compile" {
            write(layout.root(), "src/pug/partials/bad.html", "{% if %}");

            let report = pipeline.run_step(Task::Pug).expect("Template step failed");

            assert!(report.written.is_empty());
            assert_eq!(report.failures.len(), 1);
            assert!(!layout.output_dir().join("index.html").exists());
        }
    }

    describe "styles" {
        it "produces exactly one prefixed, minified stylesheet" {
            pipeline.run_step(Task::Style).expect("Style step failed");

            let css_files: Vec<PathBuf> = snapshot(&layout.output_dir().join("css")).into_keys().collect();
            assert_eq!(css_files, vec![PathBuf::from("style.min.css")]);

            let css = read_output(&layout, "css/style.min.css");
            assert!(css.contains("body{color:red}"), "partial not compiled: {}", css);
            assert!(
                css.contains("-ms-user-select:none") || css.contains("-webkit-user-select:none"),
                "missing vendor prefix: {}",
                css
            );
            assert!(!css.contains('\n'));
        }

        it "reports a compile error without writing output" {
            write(layout.root(), "src/stylus/style.scss", ".a { color: $undefined; }");

            let report = pipeline.run_step(Task::Style).expect("Style step failed");

            assert_eq!(report.failures.len(), 1);
            assert!(!layout.stylesheet_output().exists());
            assert!(matches!(
                notifier.notifications().as_slice(),
                [Notification::Failure { task: Task::Style, .. }]
            ));
        }

        it "treats a missing entry stylesheet as fatal" {
            std::fs::remove_file(layout.styles_dir().join("style.scss")).unwrap();

            assert!(matches!(
                pipeline.run_step(Task::Style),
                Err(BuildError::MissingSource(_))
            ));
        }
    }

    describe "scripts" {
        it "concatenates in source order and minifies" {
            pipeline.run_step(Task::Js).expect("Script step failed");

            let js = read_output(&layout, "js/scripts.min.js");
            let x = js.find("x=1").expect("a.js missing");
            let y = js.find("y=2").expect("b.js missing");
            assert!(x < y);
            assert!(!js.contains("second"));
            assert!(!js.contains('\n'));
        }

        it "reports non-UTF-8 input and writes nothing" {
            write(layout.root(), "src/js/c.js", b"\xff\xfe");

            let report = pipeline.run_step(Task::Js).expect("Script step failed");

            assert_eq!(report.failures.len(), 1);
            assert!(!layout.script_output().exists());
        }

        it "writes nothing when there are no scripts" {
            std::fs::remove_file(layout.scripts_dir().join("a.js")).unwrap();
            std::fs::remove_file(layout.scripts_dir().join("b.js")).unwrap();

            let report = pipeline.run_step(Task::Js).expect("Script step failed");

            assert!(report.written.is_empty());
            assert!(!layout.script_output().exists());
        }
    }

    describe "images" {
        it "never copies the sprite directory" {
            pipeline.run_step(Task::Img).expect("Image step failed");

            assert!(!layout.images_output_dir().join("svg-sprite").exists());
        }

        it "minifies svg and copies unknown formats verbatim" {
            pipeline.run_step(Task::Img).expect("Image step failed");

            assert_eq!(
                read_output(&layout, "img/logo.svg"),
                "<svg viewBox=\"0 0 1 1\"><rect/></svg>"
            );
            assert_eq!(
                std::fs::read(layout.images_output_dir().join("photos/pic.gif")).unwrap(),
                b"GIF89a-not-really"
            );
        }

        it "writes smaller png and jpeg files" {
            let report = pipeline.run_step(Task::Img).expect("Image step failed");
            assert!(report.is_clean());

            for image in ["dot.png", "photos/beach.jpg"] {
                let before = std::fs::metadata(layout.images_dir().join(image)).unwrap().len();
                let after = std::fs::metadata(layout.images_output_dir().join(image)).unwrap().len();
                assert!(after < before, "{} did not shrink from {} bytes", image, before);
            }
        }

        it "emits no notifications" {
            pipeline.run_step(Task::Img).expect("Image step failed");
            assert!(notifier.notifications().is_empty());
        }
    }

    describe "fonts" {
        it "copies fonts verbatim" {
            pipeline.run_step(Task::Fonts).expect("Font step failed");

            assert_eq!(
                std::fs::read(layout.fonts_output_dir().join("open-sans.woff2")).unwrap(),
                b"\x00woff2\x01"
            );
        }
    }

    describe "clean" {
        it "succeeds when there is nothing to delete" {
            pipeline.run_step(Task::Clean).expect("Clean failed");
            pipeline.run_step(Task::Clean).expect("Second clean failed");
            assert!(!layout.output_dir().exists());
        }
    }
}
