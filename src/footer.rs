// Footer: metadata lines rendered as an SVG overlay below the grid

use image::RgbImage;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{SheetError, SheetResult};
use crate::layout::SheetConfig;
use crate::metadata::{FooterField, MetadataRecord};

// ============================================================================
// Constants
// ============================================================================

/// Font sizes in px
const SERIAL_FONT_SIZE: u32 = 34;
const DETAIL_FONT_SIZE: u32 = 24;

/// Vertical advance per line
const SERIAL_LINE_HEIGHT: u32 = 46;
const DETAIL_LINE_HEIGHT: u32 = 34;

/// Right edge of the label column, measured from the left margin
const LABEL_COLUMN_PX: u32 = 190;
const LABEL_GAP_PX: u32 = 12;

const RULE_THICKNESS_PX: u32 = 2;

const TEXT_COLOR: &str = "#1a1a1a";
const RULE_COLOR: &str = "#8c8c8c";

/// Tried in order when choosing the family behind `sans-serif`
const PREFERRED_FAMILIES: [&str; 6] = [
    "Helvetica",
    "Arial",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "FreeSans",
];

// ============================================================================
// Markup
// ============================================================================

/// Escape the five XML metacharacters.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterLine {
    pub field: FooterField,
    pub value: String,
}

impl FooterLine {
    fn emphasized(&self) -> bool {
        self.field == FooterField::SerialNumber
    }

    fn font_size(&self) -> u32 {
        if self.emphasized() {
            SERIAL_FONT_SIZE
        } else {
            DETAIL_FONT_SIZE
        }
    }

    fn line_height(&self) -> u32 {
        if self.emphasized() {
            SERIAL_LINE_HEIGHT
        } else {
            DETAIL_LINE_HEIGHT
        }
    }

    fn font_weight(&self) -> &'static str {
        if self.emphasized() {
            "bold"
        } else {
            "normal"
        }
    }

    /// Plain-text form, e.g. "Roll: CS-001"
    pub fn text(&self) -> String {
        format!("{} {}", self.field.label(), self.value)
    }
}

/// One line per present field, compacted in footer order.
pub fn footer_lines(metadata: &MetadataRecord) -> Vec<FooterLine> {
    metadata
        .present_fields()
        .map(|(field, value)| FooterLine {
            field,
            value: value.to_string(),
        })
        .collect()
}

/// Size of the overlay: full canvas width, from the bottom of the grid down to
/// the bottom margin.
pub fn overlay_size(config: &SheetConfig) -> (u32, u32) {
    (
        config.canvas_px(),
        config.canvas_px() - config.grid_bottom() - config.margin_px(),
    )
}

/// Build the footer overlay, or None when no field is present.
pub fn footer_svg(config: &SheetConfig, metadata: &MetadataRecord) -> Option<String> {
    let lines = footer_lines(metadata);
    if lines.is_empty() {
        return None;
    }

    let (width, height) = overlay_size(config);
    let margin = config.margin_px();
    let offset = config.footer_offset_px();
    let label_x = margin + LABEL_COLUMN_PX;
    let value_x = label_x + LABEL_GAP_PX;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );

    // separator rule, centered in the gap between grid and footer
    let _ = writeln!(
        svg,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
        margin,
        (offset / 2).saturating_sub(RULE_THICKNESS_PX / 2),
        config.grid().grid_width_px(),
        RULE_THICKNESS_PX,
        RULE_COLOR
    );

    let mut cursor_y = offset;
    for line in &lines {
        let baseline = cursor_y + line.font_size();
        let style = format!(
            r#"font-family="sans-serif" font-size="{}" font-weight="{}" fill="{}""#,
            line.font_size(),
            line.font_weight(),
            TEXT_COLOR
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end" {}>{}</text>"#,
            label_x,
            baseline,
            style,
            escape_xml(line.field.label())
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" {} xml:space="preserve">{}</text>"#,
            value_x,
            baseline,
            style,
            escape_xml(&line.value)
        );
        cursor_y += line.line_height();
    }
    svg.push_str("</svg>\n");

    Some(svg)
}

// ============================================================================
// Rasterizing
// ============================================================================

/// Fonts used to rasterize the footer overlay.
pub struct FooterRenderer {
    fontdb: Arc<fontdb::Database>,
    has_fonts: bool,
}

impl FooterRenderer {
    /// System fonts, plus `extra_font` if given. An extra font becomes the
    /// `sans-serif` family.
    pub fn new(extra_font: Option<&Path>) -> SheetResult<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let mut family = None;
        if let Some(path) = extra_font {
            let before = db.len();
            db.load_font_file(path)
                .map_err(|e| SheetError::Render(format!("{}: {}", path.display(), e)))?;
            family = db
                .faces()
                .nth(before)
                .and_then(|face| face.families.first())
                .map(|(name, _)| name.clone());
        }

        Ok(FooterRenderer::with_database(db, family))
    }

    fn with_database(mut db: fontdb::Database, family: Option<String>) -> Self {
        let family = family.or_else(|| preferred_family(&db));
        match &family {
            Some(name) => {
                debug!(family = %name, faces = db.len(), "footer font");
                db.set_sans_serif_family(name.clone());
            }
            None => warn!("no fonts found, footer text cannot be drawn"),
        }

        FooterRenderer {
            fontdb: Arc::new(db),
            has_fonts: family.is_some(),
        }
    }

    pub fn has_fonts(&self) -> bool {
        self.has_fonts
    }

    /// Rasterize `svg` into a transparent pixmap of the given size.
    pub fn rasterize(&self, svg: &str, width: u32, height: u32) -> SheetResult<Pixmap> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);

        let tree = usvg::Tree::from_str(svg, &options)
            .map_err(|e| SheetError::Render(format!("SVG parse error: {}", e)))?;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| SheetError::Render(format!("cannot allocate {}x{} pixmap", width, height)))?;
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
        Ok(pixmap)
    }
}

fn preferred_family(db: &fontdb::Database) -> Option<String> {
    let has_family = |wanted: &str| {
        db.faces()
            .any(|face| face.families.iter().any(|(name, _)| name == wanted))
    };
    PREFERRED_FAMILIES
        .iter()
        .find(|name| has_family(name))
        .map(|name| name.to_string())
        .or_else(|| {
            db.faces()
                .next()
                .and_then(|face| face.families.first())
                .map(|(name, _)| name.clone())
        })
}

/// Alpha-composite a premultiplied pixmap onto the RGB canvas at (x, y).
/// Fully transparent pixels leave the canvas untouched.
fn composite_pixmap(canvas: &mut RgbImage, pixmap: &Pixmap, x: u32, y: u32) {
    let width = pixmap.width();
    for (i, pixel) in pixmap.pixels().iter().enumerate() {
        let alpha = pixel.alpha();
        if alpha == 0 {
            continue;
        }
        let cx = x + i as u32 % width;
        let cy = y + i as u32 / width;
        if cx >= canvas.width() || cy >= canvas.height() {
            continue;
        }

        let inv = 1.0 - alpha as f32 / 255.0;
        let dst = canvas.get_pixel_mut(cx, cy);
        let src = [pixel.red(), pixel.green(), pixel.blue()];
        for c in 0..3 {
            let out = src[c] as f32 + dst.0[c] as f32 * inv;
            dst.0[c] = out.round().min(255.0) as u8;
        }
    }
}

/// Draw the separator rule and metadata lines below the grid. Returns false
/// and leaves the canvas untouched when no field is present. Present fields
/// with no font to draw them in are a render error.
pub fn draw_footer(
    canvas: &mut RgbImage,
    config: &SheetConfig,
    metadata: &MetadataRecord,
    renderer: &FooterRenderer,
) -> SheetResult<bool> {
    let svg = match footer_svg(config, metadata) {
        Some(svg) => svg,
        None => {
            debug!("no metadata, footer left blank");
            return Ok(false);
        }
    };

    if !renderer.has_fonts() {
        return Err(SheetError::Render("no fonts available for footer text".into()));
    }

    let (width, height) = overlay_size(config);
    let pixmap = renderer.rasterize(&svg, width, height)?;
    composite_pixmap(canvas, &pixmap, 0, config.grid_bottom());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample_metadata() -> MetadataRecord {
        MetadataRecord::new(Some("CS-001".into()), None, Some("2024".into()), None)
    }

    #[test]
    fn test_escape_xml_all_metacharacters() {
        assert_eq!(
            escape_xml(r#"Tom & Jerry <"lab"> 'x'"#),
            "Tom &amp; Jerry &lt;&quot;lab&quot;&gt; &apos;x&apos;"
        );
        assert_eq!(escape_xml("plain"), "plain");
        assert_eq!(escape_xml("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_footer_lines_skip_absent_fields() {
        let lines = footer_lines(&sample_metadata());
        let texts: Vec<_> = lines.iter().map(FooterLine::text).collect();
        assert_eq!(texts, vec!["Roll: CS-001", "Date: 2024"]);
    }

    #[test]
    fn test_serial_line_is_emphasized() {
        let metadata = MetadataRecord::new(
            Some("R1".into()),
            Some("Lab".into()),
            Some("2024".into()),
            Some("n".into()),
        );
        let lines = footer_lines(&metadata);
        assert!(lines[0].font_size() > lines[1].font_size());
        assert_eq!(lines[0].font_weight(), "bold");
        for line in &lines[1..] {
            assert_eq!(line.font_size(), DETAIL_FONT_SIZE);
            assert_eq!(line.font_weight(), "normal");
        }
    }

    #[test]
    fn test_footer_svg_none_when_empty() {
        let config = SheetConfig::standard().unwrap();
        let blank = MetadataRecord::new(Some("  ".into()), None, Some(String::new()), None);
        assert!(footer_svg(&config, &blank).is_none());
    }

    #[test]
    fn test_footer_svg_escapes_values() {
        let config = SheetConfig::standard().unwrap();
        let metadata = MetadataRecord::new(None, Some("Smith & <Sons>".into()), None, None);
        let svg = footer_svg(&config, &metadata).unwrap();
        assert!(svg.contains("Smith &amp; &lt;Sons&gt;"));
        assert!(!svg.contains("<Sons>"));
        assert!(svg.contains("Scanned by:"));
        assert!(!svg.contains("Roll:"));
    }

    #[test]
    fn test_footer_svg_has_rule_and_compacted_lines() {
        let config = SheetConfig::standard().unwrap();
        let svg = footer_svg(&config, &sample_metadata()).unwrap();
        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(svg.contains(">CS-001<"));
        assert!(svg.contains(">2024<"));
        assert!(!svg.contains("Notes:"));

        // Date line follows directly after the roll line
        let date_baseline = config.footer_offset_px() + SERIAL_LINE_HEIGHT + DETAIL_FONT_SIZE;
        assert!(svg.contains(&format!(r#"y="{}""#, date_baseline)));
    }

    #[test]
    fn test_footer_svg_parses() {
        let config = SheetConfig::standard().unwrap();
        let metadata = MetadataRecord::new(
            Some("\"quoted\" & 'single'".into()),
            Some("<lab>".into()),
            Some("2024".into()),
            Some("a > b".into()),
        );
        let svg = footer_svg(&config, &metadata).unwrap();
        assert!(usvg::Tree::from_str(&svg, &usvg::Options::default()).is_ok());
    }

    #[test]
    fn test_draw_footer_leaves_canvas_untouched_when_empty() {
        let config = SheetConfig::standard().unwrap();
        let renderer = FooterRenderer::new(None).unwrap();
        let size = config.canvas_px();
        let mut canvas = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));

        let drawn = draw_footer(&mut canvas, &config, &MetadataRecord::default(), &renderer).unwrap();
        assert!(!drawn);
        assert!(canvas.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_draw_footer_draws_rule_below_grid() {
        let config = SheetConfig::standard().unwrap();
        let renderer = FooterRenderer::new(None).unwrap();
        let size = config.canvas_px();
        let mut canvas = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));

        let drawn = draw_footer(&mut canvas, &config, &sample_metadata(), &renderer).unwrap();
        assert!(drawn);

        let rule_y = config.grid_bottom() + config.footer_offset_px() / 2;
        let mid_x = config.margin_px() + (config.grid().grid_width_px() / 2) as u32;
        assert_ne!(*canvas.get_pixel(mid_x, rule_y), Rgb([255, 255, 255]));

        // nothing above the grid bottom is touched
        for y in 0..config.grid_bottom() {
            for x in 0..size {
                assert_eq!(*canvas.get_pixel(x, y), Rgb([255, 255, 255]));
            }
        }
    }

    fn dark_pixels(canvas: &RgbImage, rows: std::ops::Range<u32>) -> usize {
        rows.flat_map(|y| (0..canvas.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| canvas.get_pixel(x, y).0.iter().any(|&c| c < 128))
            .count()
    }

    #[test]
    fn test_draw_footer_draws_each_line_of_text() {
        let config = SheetConfig::standard().unwrap();
        let renderer = FooterRenderer::new(None).unwrap();
        let size = config.canvas_px();
        let mut canvas = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));

        let metadata = sample_metadata();
        assert!(draw_footer(&mut canvas, &config, &metadata, &renderer).unwrap());

        // the rule is light gray and sits above footer_top, so every dark
        // pixel here belongs to the text
        let lines = footer_lines(&metadata);
        let mut top = config.footer_top();
        for line in &lines {
            let bottom = top + line.line_height();
            let dark = dark_pixels(&canvas, top..bottom);
            assert!(dark > 50, "{:?} drew only {} dark pixels", line.text(), dark);
            top = bottom;
        }
        assert_eq!(dark_pixels(&canvas, top..size - config.margin_px()), 0);
    }

    #[test]
    fn test_draw_footer_without_fonts_is_render_error() {
        let config = SheetConfig::standard().unwrap();
        let renderer = FooterRenderer::with_database(fontdb::Database::new(), None);
        assert!(!renderer.has_fonts());
        let size = config.canvas_px();
        let mut canvas = RgbImage::from_pixel(size, size, Rgb([255, 255, 255]));

        let result = draw_footer(&mut canvas, &config, &sample_metadata(), &renderer);
        assert!(matches!(result, Err(SheetError::Render(_))));

        // no fields means nothing to draw, fonts or not
        assert!(!draw_footer(&mut canvas, &config, &MetadataRecord::default(), &renderer).unwrap());
    }
}
