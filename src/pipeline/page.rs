//! Page rendering: wrap a normalised image in a one-page HTML document.
//!
//! The template is fixed. The image is centred and scaled down to fit the
//! printable area with its aspect ratio kept, so every source resolution and
//! orientation comes out as exactly one image on one page.

use super::encode::NormalizedImage;

const PAGE_HEAD: &str = r#"<!doctype html><html><head><meta charset="utf-8">
<style>
  html,body{margin:0;height:100%}
  .wrap{display:flex;align-items:center;justify-content:center;height:100%}
  img{max-width:100%;max-height:100%;object-fit:contain}
</style></head><body>
<div class="wrap"><img src=""#;

const PAGE_TAIL: &str = r#"" /></div>
</body></html>"#;

/// Build the HTML page for `image`.
///
/// A data URI only ever contains the base64 alphabet after its header, so it
/// is safe inside the double-quoted attribute without escaping.
pub fn render_page(image: &NormalizedImage) -> String {
    let mut html =
        String::with_capacity(PAGE_HEAD.len() + image.data_uri.len() + PAGE_TAIL.len());
    html.push_str(PAGE_HEAD);
    html.push_str(&image.data_uri);
    html.push_str(PAGE_TAIL);
    html
}
