use std::fmt;
use std::str::FromStr;

/// A single named unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    Clean,
    Fonts,
    Pug,
    Style,
    Img,
    Js,
    Watch,
    Server,
}

impl Task {
    /// Transform steps in the order a full build runs them, after `Clean`.
    pub const BUILD_STEPS: [Task; 5] = [Task::Fonts, Task::Pug, Task::Style, Task::Img, Task::Js];

    /// Steps re-run by the source watch. Fonts are not watched.
    pub const WATCHED: [Task; 4] = [Task::Pug, Task::Style, Task::Img, Task::Js];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Fonts => "fonts",
            Self::Pug => "pug",
            Self::Style => "style",
            Self::Img => "img",
            Self::Js => "js",
            Self::Watch => "watch",
            Self::Server => "server",
        }
    }

    /// True for the five steps that read the source tree and write output.
    pub fn is_transform(&self) -> bool {
        Self::BUILD_STEPS.contains(self)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task name selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// `build`, then `watch` and `server` concurrently.
    #[default]
    Default,
    /// `clean` followed by every transform step, in sequence.
    Build,
    Task(Task),
}

impl Target {
    pub const NAMES: [&'static str; 10] = [
        "default", "build", "watch", "server", "clean", "pug", "style", "img", "js", "fonts",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Build => "build",
            Self::Task(task) => task.as_str(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let target = match s {
            "default" => Self::Default,
            "build" => Self::Build,
            "watch" => Self::Task(Task::Watch),
            "server" => Self::Task(Task::Server),
            "clean" => Self::Task(Task::Clean),
            "pug" => Self::Task(Task::Pug),
            "style" => Self::Task(Task::Style),
            "img" => Self::Task(Task::Img),
            "js" => Self::Task(Task::Js),
            "fonts" => Self::Task(Task::Fonts),
            other => {
                return Err(format!(
                    "unknown task '{}', expected one of: {}",
                    other,
                    Self::NAMES.join(", ")
                ))
            }
        };
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_target_name_parses_back_to_itself() {
        for name in Target::NAMES {
            let target: Target = name.parse().unwrap();
            assert_eq!(target.as_str(), name);
        }
    }

    #[test]
    fn unknown_target_lists_known_names() {
        let err = "deploy".parse::<Target>().unwrap_err();
        assert!(err.contains("deploy"));
        assert!(err.contains("fonts"));
    }

    #[test]
    fn watch_and_server_are_not_transforms() {
        assert!(Task::Img.is_transform());
        assert!(!Task::Clean.is_transform());
        assert!(!Task::Watch.is_transform());
        assert!(!Task::Server.is_transform());
    }
}
