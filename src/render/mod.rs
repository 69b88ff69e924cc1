//! Markdown to sanitized HTML.
//!
//! Rendering runs on the blocking pool as its own unit of work. A panic while
//! parsing or sanitizing is caught inside that task and turned into an empty
//! body, so a hostile document can never fail the save that carries it.

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

use ammonia::Builder;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use tokio::sync::oneshot;

/// Attributes kept on any element, provided their value passes [`SAFE_ATTR_VALUE`].
pub const PLUGIN_ATTRIBUTES: [&str; 2] = ["data-plugin", "data-id"];

/// Letters, digits, whitespace and `- _ ' , : [ ] ! . / \ ( ) &`.
static SAFE_ATTR_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{N}\s\-_',:\[\]!\./\\\(\)&]*$").expect("attribute pattern is valid")
});

static SANITIZER: Lazy<Builder<'static>> = Lazy::new(sanitizer_policy);

fn sanitizer_policy() -> Builder<'static> {
    let mut builder = Builder::default();
    builder
        .add_generic_attributes(PLUGIN_ATTRIBUTES)
        .attribute_filter(|_element, attribute, value| {
            if PLUGIN_ATTRIBUTES.contains(&attribute) && !SAFE_ATTR_VALUE.is_match(value) {
                None
            } else {
                Some(Cow::Borrowed(value))
            }
        });
    builder
}

/// Convert Markdown to HTML and strip anything unsafe. Pure function of its
/// input and the fixed policy.
pub fn markdown_to_safe_html(raw: &str) -> String {
    let mut unsafe_html = String::with_capacity(raw.len() * 3 / 2);
    {
        let parser = Parser::new_ext(raw, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
        html::push_html(&mut unsafe_html, parser);
    }
    SANITIZER.clean(&unsafe_html).to_string()
}

/// Signature of the render step; swapped out in tests to exercise faults.
pub type RenderFn = fn(&str) -> String;

/// Runs the render step in isolation. Cheap to clone.
#[derive(Clone, Copy)]
pub struct Renderer {
    render: RenderFn,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            render: markdown_to_safe_html,
        }
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn with_render_fn(render: RenderFn) -> Self {
        Self { render }
    }

    /// Render `raw` on its own task and wait for the single result.
    ///
    /// Never fails: a fault inside the task yields an empty string. There is
    /// no timeout, so a renderer that hangs also hangs the caller.
    pub async fn render(&self, raw: String) -> String {
        let render = self.render;
        let (tx, rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            let formatted = match panic::catch_unwind(AssertUnwindSafe(|| render(&raw))) {
                Ok(html) => html,
                Err(fault) => {
                    tracing::error!(
                        fault = %panic_message(fault.as_ref()),
                        input_len = raw.len(),
                        "Parsing Markdown failed"
                    );
                    String::new()
                }
            };
            // Receiver only goes away if the caller was dropped
            let _ = tx.send(formatted);
        });

        match rx.await {
            Ok(formatted) => formatted,
            Err(_) => {
                tracing::error!("Markdown render task ended without a result");
                String::new()
            }
        }
    }
}

fn panic_message(fault: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = fault.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = fault.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_kept_script_removed() {
        let html = markdown_to_safe_html("# Hello\n<script>alert(1)</script>");
        assert!(html.contains("<h1>Hello</h1>"), "got {html}");
        assert!(!html.contains("<script"));
        assert!(!html.contains("alert(1)"));
    }

    #[test]
    fn test_event_handlers_and_js_links_stripped() {
        let html = markdown_to_safe_html(
            "<img src=\"a.png\" onerror=\"alert(1)\">\n\n[x](javascript:alert(1))",
        );
        assert!(!html.contains("onerror"));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn test_prose_links_images_tables_preserved() {
        let md = "Some *em* and **strong**.\n\n[site](https://example.com) ![pic](https://example.com/a.png)\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        let html = markdown_to_safe_html(md);
        assert!(html.contains("<em>em</em>"));
        assert!(html.contains("<strong>strong</strong>"));
        assert!(html.contains("href=\"https://example.com\""));
        assert!(html.contains("<img src=\"https://example.com/a.png\""));
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_plugin_attributes_allowed_when_value_is_safe() {
        let html = markdown_to_safe_html(
            "<div data-plugin=\"gallery: [one, two]\" data-id=\"img-1 (copy)\">x</div>",
        );
        assert!(html.contains("data-plugin=\"gallery: [one, two]\""), "got {html}");
        assert!(html.contains("data-id=\"img-1 (copy)\""), "got {html}");
    }

    #[test]
    fn test_plugin_attributes_dropped_when_value_is_unsafe() {
        let html = markdown_to_safe_html("<div data-plugin=\"x<y>;\" data-id=\"a=b\">x</div>");
        assert!(!html.contains("data-plugin"), "got {html}");
        assert!(!html.contains("data-id"), "got {html}");
    }

    #[test]
    fn test_other_data_attributes_stripped() {
        let html = markdown_to_safe_html("<span data-evil=\"1\">x</span>");
        assert!(!html.contains("data-evil"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let md = "## Title\n\n- one\n- two\n\n`code` and > quote";
        assert_eq!(markdown_to_safe_html(md), markdown_to_safe_html(md));
    }

    #[tokio::test]
    async fn test_renderer_runs_default_pipeline() {
        let html = Renderer::default().render("*hi*".to_string()).await;
        assert_eq!(html.trim(), "<p><em>hi</em></p>");
    }

    fn exploding_render(_: &str) -> String {
        panic!("internal parser failure");
    }

    #[tokio::test]
    async fn test_renderer_contains_faults() {
        let renderer = Renderer::with_render_fn(exploding_render);
        let html = renderer.render("anything".to_string()).await;
        assert_eq!(html, "");
    }
}
