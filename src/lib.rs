//! Static site build pipeline.
//!
//! Templates, stylesheets, images, scripts and fonts under `src/` are turned
//! into a deployable `build/` tree by five independent transform steps. A task
//! graph sequences them (`build`), a source watch re-runs the matching step on
//! change (`watch`), and a development server serves `build/` with live reload
//! (`server`). `default` is `build` followed by `watch` and `server` together.

pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod notification;
pub mod server;
pub mod steps;
pub mod watch;

mod site;

pub use config::{Config, Layout};
pub use error::{BuildError, Result};
pub use site::Site;
