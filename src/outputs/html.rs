//! Static HTML board generation.
//!
//! The board is a fixed 2632×1222 canvas for a signage screen: a 4×2 grid
//! where the first two articles take double-width hero cells and up to four
//! more fill standard cells. Each cell shows the article image with the title
//! and date over a bottom gradient, and the whole cell links to the article.
//!
//! Scraped text is untrusted, so every value is HTML-escaped for the context
//! it lands in. The document carries a meta-refresh so the viewer reloads it
//! after the next scheduled run.

use crate::config::BoardConfig;
use crate::models::ArticleRecord;
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tracing::{info, instrument};

/// Cells on the board.
pub const MAX_CELLS: usize = 6;

/// Cells rendered in the hero style.
pub const HERO_CELLS: usize = 2;

const CANVAS_WIDTH: u32 = 2632;
const CANVAS_HEIGHT: u32 = 1222;

/// Normalize a scraped date for display as `dd.mm.yyyy`.
///
/// Anything after a `T` separator is dropped and the first ten characters are
/// parsed as `yyyy-mm-dd`. Dates that do not parse are shown as scraped; a
/// missing date shows nothing.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_date(Some("2024-03-15T10:00:00Z")), "15.03.2024");
/// assert_eq!(format_date(Some("not-a-date")), "not-a-date");
/// assert_eq!(format_date(None), "");
/// ```
pub fn format_date(date: Option<&str>) -> String {
    let Some(raw) = date else {
        return String::new();
    };
    let day_part = raw.split('T').next().unwrap_or(raw);
    let head: String = day_part.chars().take(10).collect();
    match NaiveDate::parse_from_str(&head, "%Y-%m-%d") {
        Ok(day) => day.format("%d.%m.%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Render up to [`MAX_CELLS`] articles into a complete HTML document.
///
/// Output depends only on the inputs, so identical inputs produce identical
/// bytes.
pub fn render_board(articles: &[ArticleRecord], board: &BoardConfig) -> String {
    let placeholder = encode_double_quoted_attribute(&board.placeholder_image);
    let placeholder_js = js_single_quoted(&board.placeholder_image);
    let placeholder_js = encode_double_quoted_attribute(&placeholder_js);
    let site_label = encode_text(&board.site_label);

    let mut html = String::with_capacity(8 * 1024);
    html.push_str(&document_head(board));
    html.push_str("    <div class=\"grid\">\n");

    for (rank, article) in articles.iter().take(MAX_CELLS).enumerate() {
        let tier = if rank < HERO_CELLS { "hero" } else { "standard" };
        let image = match &article.image {
            Some(image) => encode_double_quoted_attribute(image),
            None => placeholder.clone(),
        };
        let title_attr = encode_double_quoted_attribute(&article.title);
        let title_text = encode_text(&article.title);
        let url = encode_double_quoted_attribute(&article.url);
        let date = format_date(article.date.as_deref());
        let date = encode_text(&date);

        write!(
            html,
            r#"        <div class="article article--{tier}">
            <img src="{image}" alt="{title_attr}" loading="lazy" onerror="this.onerror=null;this.src='{placeholder_js}'">
            <div class="article-overlay">
                <h2 class="article-title">{title_text}</h2>
                <div class="article-meta">{site_label} &bull; {date}</div>
            </div>
            <a href="{url}" target="_blank" rel="noopener"></a>
        </div>
"#
        )
        .unwrap();
    }

    html.push_str("    </div>\n</body>\n</html>\n");
    html
}

/// Escape a value for use inside a single-quoted JavaScript string.
fn js_single_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn document_head(board: &BoardConfig) -> String {
    let title = encode_text(&board.page_title);
    let refresh = board.refresh_secs;
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width={CANVAS_WIDTH}, height={CANVAS_HEIGHT}">
    <meta http-equiv="refresh" content="{refresh}">
    <title>{title}</title>
    <style>
        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}

        html, body {{
            width: {CANVAS_WIDTH}px;
            height: {CANVAS_HEIGHT}px;
            overflow: hidden;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;
            background: #e8e8e8;
        }}

        .grid {{
            display: grid;
            grid-template-columns: 1fr 1fr 1fr 1fr;
            grid-template-rows: 1fr 1fr;
            gap: 12px;
            padding: 12px;
            width: {CANVAS_WIDTH}px;
            height: {CANVAS_HEIGHT}px;
        }}

        .article {{
            position: relative;
            overflow: hidden;
            border-radius: 6px;
            background: #333;
        }}

        .article--hero {{
            grid-column: span 2;
        }}

        .article img {{
            width: 100%;
            height: 100%;
            object-fit: cover;
        }}

        .article-overlay {{
            position: absolute;
            bottom: 0;
            left: 0;
            right: 0;
            padding: 60px 25px 25px;
            background: linear-gradient(transparent, rgba(0,0,0,0.85));
            color: white;
        }}

        .article--hero .article-overlay {{
            padding: 80px 35px 35px;
        }}

        .article-title {{
            font-size: 26px;
            font-weight: 600;
            line-height: 1.25;
            margin-bottom: 8px;
            text-shadow: 2px 2px 4px rgba(0,0,0,0.5);
        }}

        .article--hero .article-title {{
            font-size: 38px;
            line-height: 1.2;
        }}

        .article-meta {{
            font-size: 16px;
            opacity: 0.85;
        }}

        .article--hero .article-meta {{
            font-size: 20px;
        }}

        .article a {{
            position: absolute;
            inset: 0;
            z-index: 1;
        }}
    </style>
</head>
<body>
"#
    )
}

/// Write the rendered board to `path`, replacing any existing file.
#[instrument(level = "info", skip(html), fields(path = %path.display(), bytes = html.len()))]
pub fn write_board(path: &Path, html: &str) -> Result<(), Box<dyn Error>> {
    std::fs::write(path, html.as_bytes())
        .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    info!("Wrote news board");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<ArticleRecord> {
        (0..n)
            .map(|i| {
                ArticleRecord::new(format!("Story {i}"), format!("https://www.en.update.aau.dk/news/{i}"))
                    .with_image(format!("https://cdn.aau.dk/{i}.jpg"))
                    .with_date("2024-03-15")
            })
            .collect()
    }

    fn render(articles: &[ArticleRecord]) -> String {
        render_board(articles, &BoardConfig::default())
    }

    fn count(html: &str, needle: &str) -> usize {
        html.matches(needle).count()
    }

    #[test]
    fn test_format_iso_datetime() {
        assert_eq!(format_date(Some("2024-03-15T10:00:00Z")), "15.03.2024");
    }

    #[test]
    fn test_format_plain_date_and_long_tail() {
        assert_eq!(format_date(Some("2024-03-15")), "15.03.2024");
        assert_eq!(format_date(Some("2024-03-15 10:00")), "15.03.2024");
    }

    #[test]
    fn test_unparseable_date_is_kept() {
        assert_eq!(format_date(Some("not-a-date")), "not-a-date");
        assert_eq!(format_date(Some("15 March 2024")), "15 March 2024");
        assert_eq!(format_date(Some("2024-13-40")), "2024-13-40");
    }

    #[test]
    fn test_missing_date_is_empty() {
        assert_eq!(format_date(None), "");
    }

    #[test]
    fn test_two_records_are_both_heroes() {
        let html = render(&records(2));
        assert_eq!(count(&html, "class=\"article article--hero\""), 2);
        assert_eq!(count(&html, "class=\"article article--standard\""), 0);
    }

    #[test]
    fn test_six_records_fill_the_grid() {
        let html = render(&records(6));
        assert_eq!(count(&html, "class=\"article article--hero\""), 2);
        assert_eq!(count(&html, "class=\"article article--standard\""), 4);
    }

    #[test]
    fn test_extra_records_are_not_rendered() {
        let html = render(&records(9));
        assert_eq!(count(&html, "<div class=\"article article--"), MAX_CELLS);
        assert!(!html.contains("Story 6"));
    }

    #[test]
    fn test_empty_grid() {
        let html = render(&[]);
        assert!(html.contains("<div class=\"grid\">\n    </div>"));
        assert_eq!(count(&html, "<div class=\"article article--"), 0);
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_missing_image_uses_placeholder() {
        let article = ArticleRecord::new("No picture", "https://www.en.update.aau.dk/news/x");
        let html = render(&[article]);
        assert!(html.contains(r#"<img src="https://www.en.update.aau.dk/media/aau-logo.png""#));
    }

    #[test]
    fn test_image_failure_falls_back_to_placeholder() {
        let html = render(&records(1));
        assert!(html.contains(
            "onerror=\"this.onerror=null;this.src='https://www.en.update.aau.dk/media/aau-logo.png'\""
        ));
    }

    #[test]
    fn test_cell_contents() {
        let html = render(&records(1));
        assert!(html.contains(r#"<h2 class="article-title">Story 0</h2>"#));
        assert!(html.contains("update.aau.dk &bull; 15.03.2024"));
        assert!(html.contains(
            r#"<a href="https://www.en.update.aau.dk/news/0" target="_blank" rel="noopener"></a>"#
        ));
    }

    #[test]
    fn test_document_frame() {
        let html = render(&records(1));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<meta http-equiv="refresh" content="3600">"#));
        assert!(html.contains(r#"<meta name="viewport" content="width=2632, height=1222">"#));
        assert!(html.contains("<title>AAU Update News</title>"));
    }

    #[test]
    fn test_untrusted_text_is_escaped() {
        let article = ArticleRecord::new(
            "<script>alert(1)</script> & \"quotes\"",
            "https://x/\"><script>",
        )
        .with_image("https://x/a.jpg\" onload=\"evil()")
        .with_date("<b>soon</b>");
        let html = render(&[article]);

        assert!(!html.contains("<script>"));
        assert!(!html.contains("onload=\"evil()"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp;"));
        assert!(html.contains("&lt;b&gt;soon&lt;/b&gt;"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let input = records(4);
        assert_eq!(render(&input), render(&input));
    }

    #[test]
    fn test_write_board_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "stale").unwrap();

        let html = render(&records(3));
        write_board(&path, &html).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), html);
    }

    #[test]
    fn test_write_board_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/index.html");
        assert!(write_board(&path, "x").is_err());
    }
}
