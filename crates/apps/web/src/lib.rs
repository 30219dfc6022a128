use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use catalog::{InfoCache, InfoResolver, InfoState, RegionInfo, StaticTable, request_info};
use foundation::math::Vec2;
use gloo_net::http::Request;
use runtime::Debouncer;
use scene::view::{focus_projection, world_projection};
use scene::{Layout, ProjectedScene, RegionSet, Selection, Size, ViewTarget, derive_layout};
use serde::Serialize;
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{AddEventListenerOptions, CanvasRenderingContext2d, HtmlCanvasElement, PointerEvent};

mod config;
pub mod render;
mod sources;
pub mod split_pane;
pub mod zoom_controller;

pub use config::ViewConfig;
use render::{Frame, palette_for};
use sources::{HttpSources, js_error};
use split_pane::SplitPane;
use zoom_controller::ZoomController;

// Guard against double initialization (hot reload can re-run the start hook).
static INITIALIZED: AtomicBool = AtomicBool::new(false);

struct ViewerState {
    config: ViewConfig,
    canvas: Option<HtmlCanvasElement>,
    ctx: Option<CanvasRenderingContext2d>,
    pixel_ratio: f64,

    regions: RegionSet,
    world_loading: bool,
    world_error: Option<String>,

    outer: Size,
    resize: Debouncer<Size>,
    resize_timer_armed: bool,
    pane: SplitPane,
    layout: Layout,

    selection: Selection,
    hovered: Option<usize>,
    zoom: ZoomController,
    /// Projected geometry of the active render target.
    scene: ProjectedScene,
    animating: bool,

    resolver: Rc<InfoResolver<HttpSources>>,
    panel_listener: Option<js_sys::Function>,
    divider: Option<DividerListeners>,
}

impl ViewerState {
    fn new(config: ViewConfig) -> Self {
        let pane = SplitPane::new(config.panel_width);
        let layout = derive_layout(Size::default(), pane.width(), config.handle_width, false);
        Self {
            canvas: None,
            ctx: None,
            pixel_ratio: 1.0,
            regions: RegionSet::default(),
            world_loading: false,
            world_error: None,
            outer: Size::default(),
            resize: Debouncer::new(config.resize_debounce_s()),
            resize_timer_armed: false,
            pane,
            layout,
            selection: Selection::new(),
            hovered: None,
            zoom: ZoomController::new(config.scale_extent, config.reset_duration_s()),
            scene: ProjectedScene::default(),
            animating: false,
            resolver: Rc::new(InfoResolver::new(
                HttpSources::from_config(&config),
                StaticTable::bundled(),
            )),
            panel_listener: None,
            divider: None,
            config,
        }
    }

    fn apply_config(&mut self, config: ViewConfig) {
        self.pane = SplitPane::new(config.panel_width);
        self.zoom = ZoomController::new(config.scale_extent, config.reset_duration_s());
        self.resize = Debouncer::new(config.resize_debounce_s());
        self.resolver = Rc::new(InfoResolver::new(
            HttpSources::from_config(&config),
            StaticTable::bundled(),
        ));
        self.config = config;
        self.relayout();
    }

    fn selected_index(&self) -> Option<usize> {
        self.selection.name().and_then(|n| self.regions.index_of(n))
    }

    fn target(&self) -> ViewTarget {
        match self.selected_index() {
            Some(idx) => ViewTarget::Focus(idx),
            None => ViewTarget::World,
        }
    }

    /// Re-derives layout, projections and the zoom extent after any change
    /// to size, panel width, selection or data.
    fn relayout(&mut self) {
        self.layout = derive_layout(
            self.outer,
            self.pane.width(),
            self.config.handle_width,
            !self.selection.is_empty(),
        );
        let map = self.layout.map;
        let target = self.target();
        self.scene = match target {
            ViewTarget::World => {
                ProjectedScene::world(&self.regions, &world_projection(&self.regions, map))
            }
            ViewTarget::Focus(idx) => match self.regions.get(idx) {
                Some(region) => {
                    ProjectedScene::focus(&self.regions, idx, &focus_projection(region, map))
                }
                None => ProjectedScene::default(),
            },
        };
        self.zoom.set_viewport(map, self.scene.bounds());
        if self.zoom.target() != &target {
            self.zoom.attach(target);
        }
        self.resize_canvas();
    }

    fn resize_canvas(&self) {
        let Some(canvas) = self.canvas.as_ref() else {
            return;
        };
        let map = self.layout.map;
        canvas.set_width((map.width * self.pixel_ratio).round() as u32);
        canvas.set_height((map.height * self.pixel_ratio).round() as u32);
        let style = canvas.style();
        let _ = style.set_property("width", &format!("{}px", map.width));
        let _ = style.set_property("height", &format!("{}px", map.height));
    }

    fn pick(&self, screen: Vec2) -> Option<usize> {
        self.scene.pick(self.zoom.invert(screen))
    }

    fn panel_state<'a>(&'a self, info: Option<&'a InfoState>) -> PanelState<'a> {
        let region = self.selection.name();
        let (status, info, error) = match (region, info) {
            (None, _) => ("idle", None, None),
            (Some(_), None | Some(InfoState::Loading)) => ("loading", None, None),
            (Some(_), Some(InfoState::Ready(info))) => ("ready", Some(info), None),
            (Some(_), Some(InfoState::Error(msg))) => ("error", None, Some(msg.as_str())),
        };
        PanelState {
            open: self.layout.panel_open,
            region,
            status,
            info,
            error,
            panel_width: self.layout.panel_width,
            handle_width: self.layout.handle_width,
            map_width: self.layout.map.width,
            map_height: self.layout.map.height,
            dragging: self.pane.is_dragging(),
            guide_x: self.pane.guide_x(),
            regions_loaded: self.regions.len(),
            world_loading: self.world_loading,
            world_error: self.world_error.as_deref(),
        }
    }
}

/// Snapshot handed to the page for the info panel and divider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PanelState<'a> {
    open: bool,
    region: Option<&'a str>,
    status: &'static str,
    info: Option<&'a RegionInfo>,
    error: Option<&'a str>,
    panel_width: f64,
    handle_width: f64,
    map_width: f64,
    map_height: f64,
    dragging: bool,
    /// Provisional panel edge in container pixels while resizing. The page
    /// draws the guide over both panes, since it may leave the map canvas.
    guide_x: Option<f64>,
    regions_loaded: usize,
    world_loading: bool,
    world_error: Option<&'a str>,
}

/// Window listeners installed for the duration of a divider drag.
struct DividerListeners {
    window: web_sys::Window,
    on_move: Closure<dyn FnMut(PointerEvent)>,
    on_up: Closure<dyn FnMut(PointerEvent)>,
    on_cancel: Closure<dyn FnMut(PointerEvent)>,
}

impl DividerListeners {
    fn detach(&self) {
        let _ = self.window.remove_event_listener_with_callback(
            "pointermove",
            self.on_move.as_ref().unchecked_ref(),
        );
        let _ = self
            .window
            .remove_event_listener_with_callback("pointerup", self.on_up.as_ref().unchecked_ref());
        let _ = self.window.remove_event_listener_with_callback(
            "pointercancel",
            self.on_cancel.as_ref().unchecked_ref(),
        );
    }
}

thread_local! {
    static STATE: RefCell<ViewerState> = RefCell::new(ViewerState::new(ViewConfig::default()));
    static INFO: Rc<RefCell<InfoCache>> = Rc::new(RefCell::new(InfoCache::new()));
}

/// TLS access that returns a default during teardown instead of panicking.
fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&RefCell<ViewerState>) -> R,
    R: Default,
{
    STATE.try_with(f).unwrap_or_default()
}

fn wall_clock_seconds() -> f64 {
    js_sys::Date::now() / 1000.0
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    info!("atlas explorer started");
    Ok(())
}

/// Overrides configuration fields from a JSON object (camelCase keys).
#[wasm_bindgen]
pub fn configure(json: &str) -> Result<(), JsValue> {
    let config = ViewConfig::from_json(json)
        .map_err(|e| JsValue::from_str(&format!("invalid config: {e}")))?;
    with_state(|state| state.borrow_mut().apply_config(config));
    redraw();
    notify_panel();
    Ok(())
}

#[wasm_bindgen]
pub fn init_canvas(canvas_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str(&format!("missing canvas #{canvas_id}")))?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    let pixel_ratio = window.device_pixel_ratio().max(1.0);

    with_state(|state| {
        let mut s = state.borrow_mut();
        s.canvas = Some(canvas);
        s.ctx = Some(ctx);
        s.pixel_ratio = pixel_ratio;
        s.resize_canvas();
    });
    render()
}

#[wasm_bindgen]
pub fn set_theme(theme: &str) {
    let theme = render::Theme::from_str(theme);
    with_state(|state| state.borrow_mut().config.theme = theme);
    redraw();
}

/// Fetches the boundary topology once and builds the region set.
#[wasm_bindgen]
pub fn load_world() {
    let request = with_state(|state| {
        let mut s = state.borrow_mut();
        if s.world_loading {
            return None;
        }
        s.world_loading = true;
        s.world_error = None;
        Some((s.config.topology_url.clone(), s.config.topology_object.clone()))
    });
    let Some((url, object)) = request else {
        return;
    };

    spawn_local(async move {
        let loaded = fetch_regions(&url, &object).await;
        with_state(|state| {
            let mut s = state.borrow_mut();
            s.world_loading = false;
            match loaded {
                Ok(regions) => {
                    info!(count = regions.len(), "regions loaded");
                    s.regions = regions;
                    s.hovered = None;
                }
                Err(err) => {
                    warn!("failed to load {url}: {err}");
                    s.world_error = Some(err);
                }
            }
            s.relayout();
        });
        redraw();
        notify_panel();
    });
}

async fn fetch_regions(url: &str, object: &str) -> Result<RegionSet, String> {
    let resp = Request::get(url).send().await.map_err(|e| e.to_string())?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let text = resp.text().await.map_err(|e| e.to_string())?;
    let chunk = formats::parse_boundary_document(&text, object).map_err(|e| e.to_string())?;
    Ok(RegionSet::from_chunk(chunk))
}

/// Region names in ascending order.
#[wasm_bindgen]
pub fn region_names() -> js_sys::Array {
    let arr = js_sys::Array::new();
    with_state(|state| {
        for name in state.borrow().regions.names() {
            arr.push(&JsValue::from_str(name));
        }
    });
    arr
}

/// Container size changes are coalesced; only the last size within the
/// debounce window is applied. The first size is applied immediately.
#[wasm_bindgen]
pub fn set_outer_size(width: f64, height: f64) {
    let size = Size::new(width.max(0.0), height.max(0.0));
    let (immediate, arm) = with_state(|state| {
        let mut s = state.borrow_mut();
        if s.outer == Size::default() {
            s.outer = size;
            s.relayout();
            return (true, None);
        }
        s.resize.push(size, wall_clock_seconds());
        if s.resize_timer_armed {
            (false, None)
        } else {
            s.resize_timer_armed = true;
            (false, Some(s.resize.window_s()))
        }
    });
    if immediate {
        redraw();
        notify_panel();
    }
    if let Some(delay_s) = arm {
        arm_resize_timer(delay_s);
    }
}

#[derive(Default)]
enum ResizeStep {
    Applied,
    Wait(f64),
    #[default]
    Idle,
}

fn arm_resize_timer(delay_s: f64) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(poll_resize);
    let delay_ms = (delay_s * 1000.0).ceil().max(1.0) as i32;
    if window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay_ms)
        .is_err()
    {
        with_state(|state| state.borrow_mut().resize_timer_armed = false);
    }
}

fn poll_resize() {
    let step = with_state(|state| {
        let mut s = state.borrow_mut();
        let now = wall_clock_seconds();
        if let Some(size) = s.resize.poll(now) {
            s.resize_timer_armed = false;
            s.outer = size;
            s.relayout();
            ResizeStep::Applied
        } else if let Some(deadline) = s.resize.next_deadline() {
            ResizeStep::Wait(deadline - now)
        } else {
            s.resize_timer_armed = false;
            ResizeStep::Idle
        }
    });
    match step {
        ResizeStep::Applied => {
            redraw();
            notify_panel();
        }
        ResizeStep::Wait(delay_s) => arm_resize_timer(delay_s),
        ResizeStep::Idle => {}
    }
}

#[wasm_bindgen]
pub fn map_pointer_down(x: f64, y: f64) {
    with_state(|state| state.borrow_mut().zoom.pointer_down(Vec2::new(x, y)));
}

/// Pans while dragging, otherwise updates the hover highlight. Returns the
/// hovered region's name.
#[wasm_bindgen]
pub fn map_pointer_move(x: f64, y: f64) -> Option<String> {
    let (changed, hovered) = with_state(|state| {
        let mut s = state.borrow_mut();
        let pos = Vec2::new(x, y);
        if s.zoom.pointer_move(pos) {
            return (true, None);
        }
        if s.zoom.is_dragging() {
            return (false, None);
        }
        let hit = s.pick(pos);
        let changed = hit != s.hovered;
        s.hovered = hit;
        let name = hit
            .and_then(|idx| s.regions.get(idx))
            .map(|r| r.name.clone());
        (changed, name)
    });
    if changed {
        redraw();
    }
    hovered
}

/// Ends a map drag; a press that did not move selects the region under it.
#[wasm_bindgen]
pub fn map_pointer_up(x: f64, y: f64) {
    let clicked = with_state(|state| state.borrow_mut().zoom.pointer_up());
    if clicked {
        select_at(Vec2::new(x, y));
    } else {
        redraw();
    }
}

#[wasm_bindgen]
pub fn map_pointer_leave() {
    with_state(|state| {
        let mut s = state.borrow_mut();
        s.zoom.pointer_cancel();
        s.hovered = None;
    });
    redraw();
}

#[wasm_bindgen]
pub fn map_wheel(x: f64, y: f64, delta_y: f64) {
    let changed = with_state(|state| state.borrow_mut().zoom.wheel(Vec2::new(x, y), delta_y));
    if changed {
        redraw();
    }
}

/// Animated reset to the fitted view.
#[wasm_bindgen]
pub fn map_dblclick() {
    let start = with_state(|state| {
        let mut s = state.borrow_mut();
        s.zoom.double_click(wall_clock_seconds());
        !std::mem::replace(&mut s.animating, true)
    });
    if start {
        request_frame();
    }
}

fn request_frame() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(|_timestamp: f64| on_animation_frame());
    if window
        .request_animation_frame(callback.unchecked_ref())
        .is_err()
    {
        with_state(|state| state.borrow_mut().animating = false);
    }
}

fn on_animation_frame() {
    let more = with_state(|state| {
        let mut s = state.borrow_mut();
        let drew = s.zoom.tick(wall_clock_seconds());
        if !drew {
            s.animating = false;
        }
        drew
    });
    if more {
        redraw();
        request_frame();
    }
}

fn select_at(pos: Vec2) {
    let selected = with_state(|state| {
        let mut s = state.borrow_mut();
        let idx = s.pick(pos)?;
        let name = s.regions.get(idx)?.name.clone();
        if !s.selection.select(&name) {
            return None;
        }
        s.hovered = None;
        s.relayout();
        Some(name)
    });
    redraw();
    if let Some(name) = selected {
        debug!(region = %name, "selected");
        request_region_info(name);
    }
}

/// Selects a region by name, as a click on it would.
#[wasm_bindgen]
pub fn select_region(name: &str) -> bool {
    let changed = with_state(|state| {
        let mut s = state.borrow_mut();
        if s.regions.index_of(name).is_none() || !s.selection.select(name) {
            return false;
        }
        s.relayout();
        true
    });
    if changed {
        redraw();
        request_region_info(name.to_string());
    }
    changed
}

/// Clears the selection and returns to the world view.
#[wasm_bindgen]
pub fn close_panel() {
    let changed = with_state(|state| {
        let mut s = state.borrow_mut();
        if !s.selection.clear() {
            return false;
        }
        s.relayout();
        true
    });
    if changed {
        redraw();
        notify_panel();
    }
}

fn request_region_info(name: String) {
    let resolver = with_state(|state| Some(state.borrow().resolver.clone()));
    let Some(resolver) = resolver else {
        return;
    };
    let Ok(cache) = INFO.try_with(Rc::clone) else {
        return;
    };
    spawn_local(async move {
        let resolution = request_info(&resolver, &cache, &name).await;
        notify_panel();
        // Detached and at most once; the panel never waits on it.
        if let Some(write) = resolution.and_then(|r| r.write_back) {
            spawn_local(async move { resolver.write_back(&write).await });
        }
    });
    notify_panel();
}

/// Starts a panel resize from the divider. Move and release are tracked
/// on the window so the drag survives leaving the divider.
///
/// `client_x` is a viewport x and `container_left` the viewport x of the
/// container's left edge; the window listeners report viewport x as well.
#[wasm_bindgen]
pub fn divider_pointer_down(client_x: f64, container_left: f64) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let busy = with_state(|state| {
        let mut s = state.borrow_mut();
        if s.divider.is_some() {
            return true;
        }
        let outer = s.outer.width;
        s.pane.pointer_down(client_x, container_left, outer);
        false
    });
    if busy {
        return Ok(());
    }

    let on_move = Closure::<dyn FnMut(PointerEvent)>::new(|e: PointerEvent| {
        divider_move(f64::from(e.client_x()));
    });
    let on_up = Closure::<dyn FnMut(PointerEvent)>::new(|_e: PointerEvent| divider_release(true));
    let on_cancel =
        Closure::<dyn FnMut(PointerEvent)>::new(|_e: PointerEvent| divider_release(false));

    let once = AddEventListenerOptions::new();
    once.set_once(true);
    window.add_event_listener_with_callback("pointermove", on_move.as_ref().unchecked_ref())?;
    window.add_event_listener_with_callback_and_add_event_listener_options(
        "pointerup",
        on_up.as_ref().unchecked_ref(),
        &once,
    )?;
    window.add_event_listener_with_callback_and_add_event_listener_options(
        "pointercancel",
        on_cancel.as_ref().unchecked_ref(),
        &once,
    )?;

    with_state(|state| {
        state.borrow_mut().divider = Some(DividerListeners {
            window,
            on_move,
            on_up,
            on_cancel,
        });
    });
    notify_panel();
    Ok(())
}

fn divider_move(client_x: f64) {
    let moved = with_state(|state| state.borrow_mut().pane.pointer_move(client_x).is_some());
    if moved {
        notify_panel();
    }
}

fn divider_release(commit: bool) {
    let listeners = with_state(|state| {
        let mut s = state.borrow_mut();
        let listeners = s.divider.take();
        if !commit {
            s.pane.cancel();
        } else if s.pane.pointer_up().is_some() {
            s.relayout();
        }
        listeners
    });
    if let Some(listeners) = listeners {
        listeners.detach();
        // The release closure is still on the stack; free it once it returns.
        spawn_local(async move { drop(listeners) });
    }
    redraw();
    notify_panel();
}

/// Registers `callback(stateJson)`, called whenever the panel state changes.
#[wasm_bindgen]
pub fn set_panel_listener(callback: js_sys::Function) {
    with_state(|state| state.borrow_mut().panel_listener = Some(callback));
    notify_panel();
}

#[wasm_bindgen]
pub fn get_panel_state() -> String {
    panel_state_json().unwrap_or_default()
}

fn panel_state_json() -> Option<String> {
    STATE
        .try_with(|state| {
            let s = state.borrow();
            let entry = s.selection.name().and_then(|name| {
                INFO.try_with(|cache| cache.borrow().get(name).cloned())
                    .ok()
                    .flatten()
            });
            serde_json::to_string(&s.panel_state(entry.as_ref())).ok()
        })
        .ok()
        .flatten()
}

fn notify_panel() {
    let listener = with_state(|state| state.borrow().panel_listener.clone());
    let Some(listener) = listener else {
        return;
    };
    let Some(json) = panel_state_json() else {
        return;
    };
    if let Err(e) = listener.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
        warn!("panel listener failed: {}", js_error(&e));
    }
}

fn render() -> Result<(), JsValue> {
    let drawn = STATE.try_with(|state| {
        let s = state.borrow();
        let Some(ctx) = s.ctx.as_ref() else {
            return Ok(());
        };
        let frame = Frame {
            size: s.layout.map,
            pixel_ratio: s.pixel_ratio,
            transform: s.zoom.transform(),
            hovered: s.hovered,
            selected: s.selected_index(),
        };
        render::draw(ctx, &s.scene, &frame, &palette_for(s.config.theme))
    });
    // During teardown JS callbacks can still fire briefly.
    drawn.unwrap_or(Ok(()))
}

fn redraw() {
    if let Err(e) = render() {
        warn!("render failed: {}", js_error(&e));
    }
}
