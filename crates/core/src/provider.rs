//! Generative content provider seam.
//!
//! The provider is an external collaborator: it turns prompts into text or
//! image bytes. Every helper here tolerates provider failures by keeping
//! the input it was asked to transform.

use crate::error::Result;
use crate::markdown::split_slides;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::LazyLock;

/// Matches a fenced ```` ```ai-image ```` block and captures its prompt.
static AI_IMAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```ai-image[ \t]*\n(.*?)```").unwrap());

/// Sampling parameters passed to text generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 8192,
        }
    }
}

/// A service that generates text and images from prompts.
pub trait ContentProvider {
    /// Generate text for a prompt.
    fn generate_text(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;

    /// Generate an image for a prompt, returning encoded image bytes.
    fn generate_image(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// File name for the image generated from `prompt`.
///
/// Derived from the prompt hash so the same prompt maps to the same file.
pub fn image_file_name(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("ai_gen_{}.png", hex)
}

/// Replace every `ai-image` block with an image reference.
///
/// Images are written to `out_dir`. A file that already exists is reused
/// without asking the provider. Blocks with an empty prompt, or whose
/// generation or write fails, are left as they were.
pub fn expand_image_blocks<P: ContentProvider + ?Sized>(
    markdown: &str,
    provider: &P,
    out_dir: &Path,
) -> String {
    AI_IMAGE_REGEX
        .replace_all(markdown, |caps: &regex::Captures| {
            let original = caps[0].to_string();
            let prompt = caps[1].trim();
            if prompt.is_empty() {
                return original;
            }

            let path = out_dir.join(image_file_name(prompt));
            if !path.exists() {
                log::debug!("Generating image for prompt: {}", prompt);
                let written = provider.generate_image(prompt).and_then(|bytes| {
                    std::fs::create_dir_all(out_dir)?;
                    std::fs::write(&path, bytes)?;
                    Ok(())
                });
                if let Err(e) = written {
                    log::warn!("Image generation failed, keeping block: {}", e);
                    return original;
                }
            }

            format!("![{}]({})", prompt, path.display())
        })
        .into_owned()
}

/// Rewrite each slide segment through the provider.
///
/// `template` may contain `{slide_md}` (the segment) and `{prev_content}`
/// (a running summary of the segments already written). An empty or
/// failed answer keeps the original segment.
pub fn refine_segments<P: ContentProvider + ?Sized>(
    markdown: &str,
    provider: &P,
    template: &str,
    config: &GenerationConfig,
) -> String {
    let mut summary = String::new();
    let mut refined = Vec::new();

    for (i, segment) in split_slides(markdown).iter().enumerate() {
        let prompt = template
            .replace("{slide_md}", segment)
            .replace("{prev_content}", &summary);

        let text = match provider.generate_text(&prompt, config) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                log::warn!("Empty answer for slide {}, keeping original", i + 1);
                segment.clone()
            }
            Err(e) => {
                log::warn!("Refining slide {} failed, keeping original: {}", i + 1, e);
                segment.clone()
            }
        };

        let head: String = text.chars().take(200).collect();
        summary.push_str(&format!("\n[Slide {}] {}...", i + 1, head));
        refined.push(text.trim().to_string());
    }

    refined.join("\n\n---\n\n")
}
