use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

/// Options applied when a [`Router`](crate::Router) is built.
#[derive(Debug, Default, Clone)]
pub struct Config {
    pub(crate) bindings_path: Option<PathBuf>,
    pub(crate) bindings_header: Option<Cow<'static, str>>,
}

impl Config {
    pub fn new() -> Self {
        Default::default()
    }

    /// Write TypeScript bindings for the error types and procedure keys to `path` on every build.
    ///
    /// Only debug builds write the file.
    pub fn export_ts_bindings(self, path: impl Into<PathBuf>) -> Self {
        Self {
            bindings_path: Some(path.into()),
            ..self
        }
    }

    /// Text placed above the generated bindings, eg. `/* eslint-disable */`.
    pub fn set_ts_bindings_header(self, header: impl Into<Cow<'static, str>>) -> Self {
        Self {
            bindings_header: Some(header.into()),
            ..self
        }
    }

    pub fn ts_bindings_path(&self) -> Option<&Path> {
        self.bindings_path.as_deref()
    }
}
