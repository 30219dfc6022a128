//! 2D canvas drawing of the projected regions.

use scene::{ProjectedRegion, ProjectedScene, Size};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, CanvasWindingRule};

use crate::zoom_controller::ViewTransform;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" | "night" => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ThemePalette {
    pub background: &'static str,
    pub land: &'static str,
    pub border: &'static str,
    pub hovered: &'static str,
    pub selected: &'static str,
}

pub fn palette_for(theme: Theme) -> ThemePalette {
    match theme {
        Theme::Light => ThemePalette {
            background: "#e0f2fe",
            land: "#cbd5e1",
            border: "#ffffff",
            hovered: "#94a3b8",
            selected: "#f59e0b",
        },
        Theme::Dark => ThemePalette {
            background: "#020617",
            land: "#334155",
            border: "#0f172a",
            hovered: "#475569",
            selected: "#fbbf24",
        },
    }
}

/// Per-frame inputs that are not geometry.
#[derive(Debug, Copy, Clone)]
pub struct Frame {
    pub size: Size,
    pub pixel_ratio: f64,
    pub transform: ViewTransform,
    pub hovered: Option<usize>,
    pub selected: Option<usize>,
}

const BORDER_WIDTH_PX: f64 = 0.5;

pub fn draw(
    ctx: &CanvasRenderingContext2d,
    scene: &ProjectedScene,
    frame: &Frame,
    palette: &ThemePalette,
) -> Result<(), JsValue> {
    let Frame {
        size,
        pixel_ratio,
        transform,
        ..
    } = *frame;

    ctx.set_transform(pixel_ratio, 0.0, 0.0, pixel_ratio, 0.0, 0.0)?;
    ctx_set_fill_style(ctx, palette.background);
    ctx.fill_rect(0.0, 0.0, size.width, size.height);

    let k = transform.k * pixel_ratio;
    ctx.set_transform(
        k,
        0.0,
        0.0,
        k,
        transform.x * pixel_ratio,
        transform.y * pixel_ratio,
    )?;
    ctx.set_line_width(BORDER_WIDTH_PX / transform.k);
    ctx_set_stroke_style(ctx, palette.border);

    for region in scene.regions() {
        let fill = if frame.selected == Some(region.region) {
            palette.selected
        } else if frame.hovered == Some(region.region) {
            palette.hovered
        } else {
            palette.land
        };
        ctx_set_fill_style(ctx, fill);
        trace_region(ctx, region);
        ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
        ctx.stroke();
    }
    Ok(())
}

fn trace_region(ctx: &CanvasRenderingContext2d, region: &ProjectedRegion) {
    ctx.begin_path();
    for ring in region.polygons.iter().flatten() {
        let mut points = ring.iter().filter(|p| p.x.is_finite() && p.y.is_finite());
        let Some(first) = points.next() else {
            continue;
        };
        ctx.move_to(first.x, first.y);
        for p in points {
            ctx.line_to(p.x, p.y);
        }
        ctx.close_path();
    }
}

fn ctx_set_fill_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("fillStyle"),
        &JsValue::from_str(value),
    );
}

fn ctx_set_stroke_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("strokeStyle"),
        &JsValue::from_str(value),
    );
}
