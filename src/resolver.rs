use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::Settings;
use crate::domain::ResolverKind;
use crate::error::UploadError;
use crate::mime_types;

#[derive(Debug, Clone, Copy)]
pub struct ResolveInput<'a> {
    pub path: &'a Path,
    pub declared_content_type: Option<&'a str>,
    pub original_filename: &'a str,
}

pub trait ContentTypeResolver: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, input: &ResolveInput<'_>) -> Result<String, UploadError>;
}

impl<T: ContentTypeResolver + ?Sized> ContentTypeResolver for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resolve(&self, input: &ResolveInput<'_>) -> Result<String, UploadError> {
        (**self).resolve(input)
    }
}

pub fn build(settings: &Settings) -> Box<dyn ContentTypeResolver> {
    match settings.resolver {
        ResolverKind::Identify => Box::new(IdentifyResolver::new(&settings.identify_program)),
        ResolverKind::Header => Box::new(HeaderResolver),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderResolver;

impl ContentTypeResolver for HeaderResolver {
    fn name(&self) -> &'static str {
        "header"
    }

    fn resolve(&self, input: &ResolveInput<'_>) -> Result<String, UploadError> {
        let declared = input.declared_content_type.ok_or_else(|| {
            UploadError::MissingContentType("response did not declare a Content-Type".to_string())
        })?;
        mime_types::normalize(declared).ok_or_else(|| {
            UploadError::MissingContentType(format!("not a MIME type: {declared:?}"))
        })
    }
}

#[derive(Debug, Clone)]
pub struct IdentifyResolver {
    program: Option<PathBuf>,
    requested: String,
}

impl IdentifyResolver {
    pub fn new(program: &str) -> Self {
        let candidate = Path::new(program);
        let resolved = if candidate.components().count() > 1 {
            candidate.is_file().then(|| candidate.to_path_buf())
        } else {
            find_in_path(program)
        };
        Self {
            program: resolved,
            requested: program.to_string(),
        }
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    fn run(&self, program: &Path, file: &Path) -> Result<String, UploadError> {
        let output = Command::new(program).arg(file).output().map_err(|err| {
            UploadError::MissingContentType(format!("failed to run {}: {err}", program.display()))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", program.display(), output.status)
            } else {
                stderr
            };
            return Err(UploadError::MissingContentType(message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ContentTypeResolver for IdentifyResolver {
    fn name(&self) -> &'static str {
        "identify"
    }

    fn resolve(&self, input: &ResolveInput<'_>) -> Result<String, UploadError> {
        let program = self.program.as_deref().ok_or_else(|| {
            UploadError::MissingContentType(format!("required tool not found: {}", self.requested))
        })?;
        let info = self.run(program, input.path)?;
        debug!(path = %input.path.display(), info = %info, "identify results");
        if info.is_empty() {
            return Err(UploadError::MissingContentType(format!(
                "{} produced no output for {}",
                self.requested, input.original_filename
            )));
        }

        let format = parse_identify_format(&info, input.path).ok_or_else(|| {
            UploadError::MissingContentType(format!("unexpected identify output: {info}"))
        })?;
        mime_types::for_format(format).ok_or_else(|| {
            UploadError::MissingContentType(format!("unrecognized image format: {format}"))
        })
    }
}

/// Extracts the format column from `identify` output such as
/// `/tmp/urlupload1234 PNG 16x16 16x16+0+0 8-bit sRGB 1.2KB 0.000u 0:00.000`.
pub fn parse_identify_format<'a>(info: &'a str, path: &Path) -> Option<&'a str> {
    let line = info.lines().next()?.trim();
    let path = path.to_string_lossy();
    if let Some(rest) = line.strip_prefix(&*path) {
        let rest = skip_frame_index(rest);
        if let Some(format) = rest.split_whitespace().next() {
            return Some(format);
        }
    }
    line.split_whitespace().nth(1)
}

// Multi-frame images are reported as `file[0] GIF ...`.
fn skip_frame_index(rest: &str) -> &str {
    match rest.strip_prefix('[').and_then(|inner| inner.split_once(']')) {
        Some((index, tail)) if index.chars().all(|ch| ch.is_ascii_digit()) => tail,
        _ => rest,
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    find_in_dirs(name, std::env::split_paths(&path_var))
}

fn find_in_dirs<I>(name: &str, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter().find_map(|dir| {
        [dir.join(format!("{name}.exe")), dir.join(name)]
            .into_iter()
            .find(|candidate| candidate.is_file())
    })
}
