//! Corpus loading.
//!
//! Walks the configured document directory and extracts plain text from each
//! supported file. A file that fails to load is logged and skipped; only a
//! missing corpus directory is fatal.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use deskbot_core::PipelineError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedDocument {
    /// Path relative to the corpus root, used for source attribution.
    pub source: String,
    pub text: String,
}

pub fn load_documents(
    corpus_dir: &Path,
    allowed_extensions: &[String],
) -> Result<Vec<LoadedDocument>, PipelineError> {
    if !corpus_dir.is_dir() {
        return Err(PipelineError::MissingCorpusDir(corpus_dir.to_path_buf()));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(corpus_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(event_name = "corpus_walk_failed", %error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let extension = match file_extension(path) {
            Some(extension) if allowed_extensions.iter().any(|allowed| allowed == &extension) => {
                extension
            }
            _ => continue,
        };

        let source = path
            .strip_prefix(corpus_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();

        match extract_file(path, &extension) {
            Ok(text) if text.trim().is_empty() => {
                debug!(event_name = "document_empty", source = %source, "skipping empty document");
            }
            Ok(text) => {
                debug!(event_name = "document_loaded", source = %source, bytes = text.len());
                documents.push(LoadedDocument { source, text });
            }
            Err(error) => {
                warn!(
                    event_name = "document_load_failed",
                    source = %source,
                    %error,
                    "skipping document",
                );
            }
        }
    }

    Ok(documents)
}

fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
}

fn extract_file(path: &Path, extension: &str) -> Result<String, PipelineError> {
    match extension {
        ".txt" | ".md" => {
            fs::read_to_string(path).map_err(|error| PipelineError::Store(error.to_string()))
        }
        ".html" | ".htm" => {
            let raw =
                fs::read_to_string(path).map_err(|error| PipelineError::Store(error.to_string()))?;
            Ok(strip_html_tags(&raw))
        }
        ".pdf" => {
            pdf_extract::extract_text(path).map_err(|error| PipelineError::Store(error.to_string()))
        }
        other => Err(PipelineError::UnsupportedFormat(other.to_string())),
    }
}

/// Crude tag removal, good enough for exported help pages. Script and style
/// bodies are dropped entirely.
pub fn strip_html_tags(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut chars = html.char_indices().peekable();
    let lower = html.to_ascii_lowercase();
    let mut skip_until: Option<&'static str> = None;

    while let Some((index, ch)) = chars.next() {
        if let Some(closer) = skip_until {
            if lower[index..].starts_with(closer) {
                for _ in 0..closer.len().saturating_sub(1) {
                    chars.next();
                }
                skip_until = None;
            }
            continue;
        }

        if ch == '<' {
            if lower[index..].starts_with("<script") {
                skip_until = Some("</script>");
            } else if lower[index..].starts_with("<style") {
                skip_until = Some("</style>");
            }
            for (_, inner) in chars.by_ref() {
                if inner == '>' {
                    break;
                }
            }
            output.push(' ');
            continue;
        }

        output.push(ch);
    }

    // Collapse runs of whitespace left behind by removed markup.
    output.split_whitespace().collect::<Vec<_>>().join(" ")
}
