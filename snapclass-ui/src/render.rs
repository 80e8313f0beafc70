//! Server-side HTML rendering for the classifier page

use snapclass_common::ranking::rank_probabilities;
use snapclass_common::youtube::derive_thumbnail;
use snapclass_common::{ContentRegistry, ContentSet, Prediction};
use std::fmt::Write as _;

use crate::session::SessionContext;

/// Everything the page needs for one render
pub struct PageView<'a> {
    /// Classifier vocabulary, in class-index order
    pub vocab: &'a [String],
    pub registry: &'a ContentRegistry,
    pub session: Option<&'a SessionContext>,
    /// `?label=` from the query string
    pub requested_label: Option<&'a str>,
    /// Failure to show in the banner
    pub error: Option<&'a str>,
}

/// Escape text for HTML element content and quoted attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Label whose content is shown
///
/// A requested label wins when it is in the vocabulary; otherwise the
/// prediction, otherwise the first label.
pub fn select_label<'a>(
    vocab: &'a [String],
    requested: Option<&str>,
    predicted: Option<&str>,
) -> Option<&'a str> {
    let find = |wanted: Option<&str>| {
        wanted.and_then(|w| vocab.iter().find(|l| l.as_str() == w).map(String::as_str))
    };
    find(requested)
        .or_else(|| find(predicted))
        .or_else(|| vocab.first().map(String::as_str))
}

pub fn render_page(view: &PageView<'_>) -> String {
    let prediction = view.session.and_then(|s| s.last_prediction.as_ref());
    let image_uri = view
        .session
        .and_then(|s| s.last_image.as_ref())
        .map(|img| img.data_uri());

    let mut body = String::new();
    body.push_str(&render_vocab(view.vocab));
    if let Some(error) = view.error {
        body.push_str(&render_error(error));
    }
    body.push_str(INPUT_TABS);

    match (prediction, image_uri) {
        (Some(prediction), Some(image_uri)) => {
            body.push_str(&render_result(&image_uri, prediction));

            let selected = select_label(view.vocab, view.requested_label, Some(&prediction.label));
            let content = selected
                .map(|label| view.registry.resolve(label))
                .unwrap_or_default();
            let _ = write!(
                body,
                r#"<div class="columns">
<section class="column">
<h2>Prediction breakdown</h2>
{}
</section>
<section class="column">
<h2>Content by label</h2>
{}
</section>
</div>"#,
                render_probabilities(view.vocab, prediction),
                render_content_panel(view.vocab, selected, &content)
            );
        }
        _ => body.push_str(
            r#"<div class="notice info">Take a photo or upload a file to see the prediction and the content for its label.</div>"#,
        ),
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>SnapClass Image Classifier</title>
    <link rel="stylesheet" href="/static/snapclass.css">
</head>
<body>
<header>
    <h1>SnapClass Image Classifier</h1>
    <div class="subtitle">Probability bars and curated content per label</div>
</header>
<main class="container">
{body}
</main>
<footer>
    <span class="build-info-line">v{version} [{git_hash}]</span>
    <span class="build-info-line">{build_timestamp} ({build_profile})</span>
</footer>
</body>
</html>
"#,
        body = body,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_timestamp = env!("BUILD_TIMESTAMP"),
        build_profile = env!("BUILD_PROFILE"),
    )
}

fn render_vocab(vocab: &[String]) -> String {
    let labels: Vec<String> = vocab
        .iter()
        .map(|l| format!("<code>{}</code>", escape_html(l)))
        .collect();
    format!(
        r#"<p class="vocab"><strong>Classifiable labels:</strong> {}</p>"#,
        labels.join(", ")
    )
}

fn render_error(message: &str) -> String {
    format!(
        r#"<div class="notice error" role="alert">{}</div>"#,
        escape_html(message)
    )
}

const INPUT_TABS: &str = r#"<div class="tabs">
<input type="radio" name="input-tab" id="tab-camera" checked>
<label for="tab-camera">Camera</label>
<input type="radio" name="input-tab" id="tab-upload">
<label for="tab-upload">File upload</label>
<div class="tab-panel panel-camera">
<form method="post" action="/classify" enctype="multipart/form-data" class="dropzone">
<input type="file" name="image" accept="image/*" capture="environment" required>
<button type="submit">Classify snapshot</button>
</form>
</div>
<div class="tab-panel panel-upload">
<form method="post" action="/classify" enctype="multipart/form-data" class="dropzone">
<span class="helper">Upload an image (jpg, png, jpeg, webp, tiff)</span>
<input type="file" name="image" accept=".jpg,.jpeg,.png,.webp,.tiff,.tif,image/jpeg,image/png,image/webp,image/tiff" required>
<button type="submit">Classify file</button>
</form>
</div>
</div>"#;

fn render_result(image_uri: &str, prediction: &Prediction) -> String {
    format!(
        r#"<div class="columns result">
<div class="column">
<figure><img src="{}" class="thumb" alt="Input image"><figcaption>Input image</figcaption></figure>
</div>
<div class="column">
<div class="prediction-box">
<span class="prediction-caption">Prediction:</span>
<h2>{}</h2>
<div class="helper">Content for the predicted label is shown below.</div>
</div>
</div>
</div>"#,
        image_uri,
        escape_html(&prediction.label)
    )
}

fn render_probabilities(vocab: &[String], prediction: &Prediction) -> String {
    rank_probabilities(vocab, &prediction.probabilities, &prediction.label)
        .iter()
        .map(|row| {
            let highlight = if row.highlighted { " highlight" } else { "" };
            format!(
                r#"<div class="prob-card">
<div class="prob-head"><strong>{}</strong><span>{}</span></div>
<div class="prob-bar-bg"><div class="prob-bar-fg{}" style="width:{};"></div></div>
</div>"#,
                escape_html(&row.label),
                row.display_percentage(),
                highlight,
                row.bar_width()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_content_panel(vocab: &[String], selected: Option<&str>, content: &ContentSet) -> String {
    let mut html = String::new();

    let options: String = vocab
        .iter()
        .map(|label| {
            let flag = if Some(label.as_str()) == selected { " selected" } else { "" };
            let label = escape_html(label);
            format!(r#"<option value="{label}"{flag}>{label}</option>"#)
        })
        .collect();
    let _ = write!(
        html,
        r#"<form method="get" action="/" class="label-picker">
<label for="label-select">Label to show</label>
<select name="label" id="label-select" onchange="this.form.submit()">{}</select>
<noscript><button type="submit">Show</button></noscript>
</form>"#,
        options
    );

    if content.is_empty() {
        let _ = write!(
            html,
            r#"<div class="notice info">No content is configured for label <code>{}</code> yet. Add it to the content registry.</div>"#,
            escape_html(selected.unwrap_or_default())
        );
        return html;
    }

    if !content.texts.is_empty() {
        html.push_str(r#"<div class="info-grid">"#);
        for text in &content.texts {
            let _ = write!(
                html,
                r#"<div class="card span-12"><h4>Text</h4><div>{}</div></div>"#,
                escape_html(text)
            );
        }
        html.push_str("</div>");
    }

    if !content.images.is_empty() {
        html.push_str(r#"<div class="info-grid">"#);
        for url in &content.images {
            let _ = write!(
                html,
                r#"<div class="card span-4"><h4>Image</h4><img src="{}" class="thumb" alt=""></div>"#,
                escape_html(url)
            );
        }
        html.push_str("</div>");
    }

    if !content.videos.is_empty() {
        html.push_str(r#"<div class="info-grid">"#);
        for url in &content.videos {
            html.push_str(&render_video(url));
        }
        html.push_str("</div>");
    }

    html
}

fn render_video(url: &str) -> String {
    let href = escape_html(url);
    match derive_thumbnail(url) {
        Some(thumb) => format!(
            r#"<div class="card span-6"><h4>Video</h4>
<a href="{href}" target="_blank" rel="noopener" class="thumb-wrap"><img src="{thumb}" class="thumb" alt=""><div class="play"></div></a>
<div class="helper">{href}</div></div>"#,
            href = href,
            thumb = escape_html(&thumb)
        ),
        None => format!(
            r#"<div class="card span-6"><h4>Video</h4><a href="{href}" target="_blank" rel="noopener">{href}</a></div>"#,
            href = href
        ),
    }
}
