//! HTML fragment that runs an installed experiment inside the preview page.

use crate::manifest::ExperimentManifest;
use expdj_kernel::domain::constants::EXPERIMENTS_STATIC_PREFIX;

/// Public URL prefix of an installed experiment folder, with a trailing slash.
#[must_use]
pub fn url_prefix(tag: &str) -> String {
    format!("{EXPERIMENTS_STATIC_PREFIX}/{tag}/")
}

/// Stylesheet and script tags for every `.css` and `.js` entry of `run`, followed by an
/// inline script that starts the experiment.
#[must_use]
pub fn embed_experiment(manifest: &ExperimentManifest, url_prefix: &str) -> String {
    let styles = manifest.run.iter().filter(|asset| has_extension(asset, "css")).map(|asset| {
        format!(r#"<link rel="stylesheet" type="text/css" href="{}">"#, escape(&join(url_prefix, asset)))
    });
    let scripts = manifest
        .run
        .iter()
        .filter(|asset| has_extension(asset, "js"))
        .map(|asset| format!(r#"<script src="{}"></script>"#, escape(&join(url_prefix, asset))));

    let mut lines: Vec<String> = styles.chain(scripts).collect();
    lines.push(format!("<script>\n{}\n</script>", bootstrap(manifest)));
    let mut html = lines.join("\n");
    html.push('\n');
    html
}

fn bootstrap(manifest: &ExperimentManifest) -> String {
    let timeline = format!("{}_experiment", manifest.tag.replace('-', "_"));
    match manifest.template.as_str() {
        "jspsych" => format!(
            "$(document).ready(function() {{\n    jsPsych.init({{\n        timeline: {timeline},\n        \
             display_element: \"getDisplayElement\" in window ? getDisplayElement() : document.body\n    }});\n}});"
        ),
        engine => format!(
            "$(document).ready(function() {{\n    window.expfactory = {{ tag: \"{}\", engine: \"{}\" }};\n}});",
            manifest.tag,
            escape(engine)
        ),
    }
}

fn has_extension(asset: &str, ext: &str) -> bool {
    asset
        .rsplit_once('.')
        .is_some_and(|(_, found)| found.eq_ignore_ascii_case(ext))
}

fn join(prefix: &str, asset: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), asset.trim_start_matches("./").trim_start_matches('/'))
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}
