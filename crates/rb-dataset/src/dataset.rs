//! Dataset directory handling.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::template::{TemplateValues, render_template};
use crate::welfile::{EngineOutput, read_result_file};
use crate::{DatasetError, DatasetResult, io_error, write_synced};

/// Extensions of files the engine produces during a run.
pub const RESULT_EXTENSIONS: [&str; 10] = [
    "MAX", "WMX", "BLZ", "SCO", "WRN", "ERR", "LOG", "WELINFO", "WEL", "WBL",
];

const TEMPLATE_EXTENSION: &str = "template";

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

fn is_result_file(path: &Path) -> bool {
    RESULT_EXTENSIONS.iter().any(|ext| has_extension(path, ext))
}

/// An engine dataset: a directory and the stem its files share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    path: PathBuf,
    name: String,
}

impl Dataset {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<dir>/<name>.<ext>`
    pub fn file(&self, ext: &str) -> PathBuf {
        self.path.join(format!("{}.{}", self.name, ext))
    }

    /// `<dir>/<name>_<suffix>.var`
    pub fn var_file(&self, suffix: &str) -> PathBuf {
        self.path.join(format!("{}_{}.var", self.name, suffix))
    }

    fn entries(&self) -> DatasetResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(io_error(&self.path))? {
            let entry = entry.map_err(io_error(&self.path))?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn belongs_to_dataset(&self, path: &Path) -> bool {
        let prefix = format!("{}.", self.name);
        path.file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
    }

    /// Copy the dataset's files (`<name>.*` and every `*.var`) into `destination`.
    ///
    /// Result files are skipped unless `include_results` is set.
    pub fn copy_to(&self, destination: &Path, include_results: bool) -> DatasetResult<Dataset> {
        fs::create_dir_all(destination).map_err(io_error(destination))?;

        let mut files = BTreeSet::new();
        for path in self.entries()? {
            if self.belongs_to_dataset(&path) {
                if !include_results && is_result_file(&path) {
                    continue;
                }
                files.insert(path);
            } else if has_extension(&path, "var") {
                files.insert(path);
            }
        }

        for file in &files {
            if let Some(name) = file.file_name() {
                let target = destination.join(name);
                fs::copy(file, &target).map_err(io_error(file))?;
            }
        }

        tracing::info!(
            dataset = %self.name,
            from = %self.path.display(),
            to = %destination.display(),
            files = files.len(),
            "copied dataset"
        );
        Ok(Dataset::new(destination, self.name.clone()))
    }

    /// Render every `*.template` file into the file named without the
    /// `.template` suffix. Returns the written files.
    pub fn process_templates(&self, values: &TemplateValues) -> DatasetResult<Vec<PathBuf>> {
        tracing::info!(dir = %self.path.display(), "processing templates");
        let mut written = Vec::new();
        for template in self.entries()? {
            if !has_extension(&template, TEMPLATE_EXTENSION) {
                continue;
            }
            let target = template.with_extension("");
            tracing::info!(template = %template.display(), "replacing variables");

            let content = fs::read(&template).map_err(io_error(&template))?;
            let rendered = render_template(&content, values).map_err(|source| {
                DatasetError::Template {
                    file: template.clone(),
                    source,
                }
            })?;
            write_synced(&target, &rendered)?;
            written.push(target);
        }
        Ok(written)
    }

    /// WEL and WBL files currently in the dataset directory.
    pub fn result_files(&self) -> DatasetResult<Vec<PathBuf>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|p| has_extension(p, "WEL") || has_extension(p, "WBL"))
            .collect())
    }

    /// Read every result file of the dataset.
    pub fn read_results(&self) -> DatasetResult<Vec<EngineOutput>> {
        self.result_files()?
            .iter()
            .map(|path| read_result_file(path))
            .collect()
    }

    /// Copy `<name>.<result extension>` files into `destination`.
    pub fn copy_result_files(&self, destination: &Path) -> DatasetResult<Vec<PathBuf>> {
        fs::create_dir_all(destination).map_err(io_error(destination))?;
        let mut copied = Vec::new();
        for ext in RESULT_EXTENSIONS {
            let file = self.file(ext);
            if !file.exists() {
                continue;
            }
            let target = destination.join(format!("{}.{}", self.name, ext));
            tracing::info!(file = %file.display(), "copying result file");
            fs::copy(&file, &target).map_err(io_error(&file))?;
            copied.push(target);
        }
        Ok(copied)
    }

    /// Delete `<name>.<result extension>` files left by an earlier run.
    pub fn clear_results(&self) -> DatasetResult<usize> {
        let mut removed = 0;
        for ext in RESULT_EXTENSIONS {
            let file = self.file(ext);
            if file.exists() {
                fs::remove_file(&file).map_err(io_error(&file))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// `<name>.<ext>` with the extension in any case.
    fn find_file(&self, ext: &str) -> DatasetResult<Option<PathBuf>> {
        let exact = self.file(ext);
        if exact.is_file() {
            return Ok(Some(exact));
        }
        if !self.path.is_dir() {
            return Ok(None);
        }
        Ok(self.entries()?.into_iter().find(|path| {
            path.file_stem().is_some_and(|stem| stem == self.name.as_str())
                && has_extension(path, ext)
        }))
    }

    fn optional_text(&self, ext: &str) -> DatasetResult<Option<String>> {
        let Some(path) = self.find_file(ext)? else {
            return Ok(None);
        };
        let bytes = fs::read(&path).map_err(io_error(&path))?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Contents of the `.WRN` file of the last run, if any. The extension
    /// is matched in any case.
    pub fn warnings(&self) -> DatasetResult<Option<String>> {
        self.optional_text("WRN")
    }

    /// Contents of the `.ERR` file of the last run, if any.
    pub fn errors(&self) -> DatasetResult<Option<String>> {
        self.optional_text("ERR")
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dataset '{}' in {}", self.name, self.path.display())
    }
}
