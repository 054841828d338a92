use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use minifb::{InputCallback, Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use stepshot_adapters::raster::{glyph_or_fallback, glyph_scale, GLYPH_SIZE};
use stepshot_application::{AnnotationOverlay, ApplicationError, OverlayResult};
use stepshot_domain::{
    AnnotationSession, CanvasPoint, PixelPoint, PointerOutcome, RasterImage, Stroke, TextLabel,
    Tool, ViewTransform,
};
use tracing::debug;

const STATUS_HEIGHT: usize = 20;
const MIN_WIDTH: usize = 320;
const MIN_CANVAS_HEIGHT: usize = 120;
const MAX_TEXT_LEN: usize = 200;
const BACKDROP: u32 = 0x202020;
const STATUS_BACKGROUND: u32 = 0x1B1F26;
const STATUS_TEXT: u32 = 0xFFFFFF;
const NOTICE_TEXT: u32 = 0xF05C4B;
const SELECTION_COLOR: u32 = 0x4E78D5;
const PENDING_COLOR: u32 = 0xF7AE3D;

/// Modal annotation window. Enter confirms, Escape or closing the window
/// cancels.
pub struct MinifbOverlay {
    width: usize,
    height: usize,
}

impl MinifbOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: (width as usize).max(MIN_WIDTH),
            height: (height as usize).max(MIN_CANVAS_HEIGHT + STATUS_HEIGHT),
        }
    }

    fn canvas_height(&self) -> usize {
        self.height - STATUS_HEIGHT
    }
}

impl AnnotationOverlay for MinifbOverlay {
    fn annotate(
        &mut self,
        image: &RasterImage,
        description: &str,
    ) -> Result<Option<OverlayResult>, ApplicationError> {
        let width = self.width;
        let height = self.height;
        let canvas_height = self.canvas_height();

        let mut window = Window::new(
            "stepshot | annotate capture",
            width,
            height,
            WindowOptions::default(),
        )
        .map_err(|error| {
            ApplicationError::Capability(format!("failed to open overlay window: {error}"))
        })?;
        window.limit_update_rate(Some(Duration::from_micros(16_000)));
        let (sender, typed) = mpsc::channel();
        window.set_input_callback(Box::new(TypedChars(sender)));

        let source = to_display_pixels(image);
        let mut session = AnnotationSession::new(
            image.width(),
            image.height(),
            width as u32,
            canvas_height as u32,
        );
        let mut state = OverlayState::new(description);
        let mut buffer = vec![BACKDROP; width * height];
        debug!(
            image_width = image.width(),
            image_height = image.height(),
            "overlay opened"
        );

        while window.is_open() {
            let typed_now: Vec<char> = typed.try_iter().collect();
            let mouse = window
                .get_mouse_pos(MouseMode::Clamp)
                .map(|(x, y)| CanvasPoint::new(x as f64, y as f64));

            if state.prompt.is_some() {
                state.handle_prompt_keys(&window, &mut session, &typed_now);
            } else {
                match state.handle_shortcuts(&window, &mut session) {
                    Flow::Continue => {}
                    Flow::Cancel => return Ok(None),
                    Flow::Confirm => {
                        return Ok(Some(OverlayResult {
                            plan: session.finish(),
                            description: state.description,
                        }));
                    }
                }
                state.handle_mouse(&window, &mut session, mouse);
            }

            render_image(&mut buffer, width, canvas_height, &source, &session);
            draw_annotations(&mut buffer, width, &session);
            let status = state.status_line(&session);
            draw_status(&mut buffer, width, height, &status, state.notice.is_some());

            window
                .update_with_buffer(&buffer, width, height)
                .map_err(|error| {
                    ApplicationError::Io(format!("failed to update overlay window: {error}"))
                })?;
        }

        Ok(None)
    }
}

struct TypedChars(Sender<char>);

impl InputCallback for TypedChars {
    fn add_char(&mut self, uni_char: u32) {
        if let Some(ch) = char::from_u32(uni_char) {
            let _ = self.0.send(ch);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Prompt {
    Label { position: PixelPoint, text: String },
    Description(String),
}

enum Flow {
    Continue,
    Cancel,
    Confirm,
}

struct OverlayState {
    description: String,
    prompt: Option<Prompt>,
    notice: Option<String>,
    left_down: bool,
    last_pointer: Option<CanvasPoint>,
    pan_anchor: Option<CanvasPoint>,
}

impl OverlayState {
    fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            prompt: None,
            notice: None,
            left_down: false,
            last_pointer: None,
            pan_anchor: None,
        }
    }

    fn handle_shortcuts(&mut self, window: &Window, session: &mut AnnotationSession) -> Flow {
        let pressed = |key| window.is_key_pressed(key, KeyRepeat::No);
        if pressed(Key::Escape) {
            return Flow::Cancel;
        }
        if pressed(Key::Enter) || pressed(Key::NumPadEnter) {
            return Flow::Confirm;
        }
        if pressed(Key::S) {
            session.set_tool(Tool::Select);
        }
        if pressed(Key::D) {
            session.set_tool(Tool::Draw);
        }
        if pressed(Key::T) {
            session.set_tool(Tool::Text);
        }
        if pressed(Key::C) {
            session.cycle_color();
        }
        if window.is_key_pressed(Key::LeftBracket, KeyRepeat::Yes) {
            session.adjust_font_size(-1);
        }
        if window.is_key_pressed(Key::RightBracket, KeyRepeat::Yes) {
            session.adjust_font_size(1);
        }
        if pressed(Key::Backspace) {
            session.clear_annotations();
            self.notice = None;
        }
        if pressed(Key::Tab) {
            self.prompt = Some(Prompt::Description(self.description.clone()));
        }
        Flow::Continue
    }

    fn handle_prompt_keys(
        &mut self,
        window: &Window,
        session: &mut AnnotationSession,
        typed: &[char],
    ) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        if window.is_key_pressed(Key::Escape, KeyRepeat::No) {
            self.prompt = None;
            return;
        }
        if window.is_key_pressed(Key::Enter, KeyRepeat::No)
            || window.is_key_pressed(Key::NumPadEnter, KeyRepeat::No)
        {
            if let Some(prompt) = self.prompt.take() {
                self.commit_prompt(prompt, session);
            }
            return;
        }
        let text = match prompt {
            Prompt::Label { text, .. } => text,
            Prompt::Description(text) => text,
        };
        if window.is_key_pressed(Key::Backspace, KeyRepeat::Yes) {
            text.pop();
        }
        for ch in typed {
            push_typed(text, *ch);
        }
    }

    fn commit_prompt(&mut self, prompt: Prompt, session: &mut AnnotationSession) {
        match prompt {
            Prompt::Label { position, text } => {
                if !session.add_label(position, &text) {
                    self.notice = Some("empty label discarded".to_string());
                }
            }
            Prompt::Description(text) => self.description = text.trim().to_string(),
        }
    }

    fn handle_mouse(
        &mut self,
        window: &Window,
        session: &mut AnnotationSession,
        mouse: Option<CanvasPoint>,
    ) {
        if let Some((_, delta)) = window.get_scroll_wheel() {
            if let Some(anchor) = mouse {
                session.wheel(anchor, delta as f64);
            }
        }

        if window.get_mouse_down(MouseButton::Right) {
            if let (Some(anchor), Some(point)) = (self.pan_anchor, mouse) {
                session.pan(point.x - anchor.x, point.y - anchor.y);
            }
            self.pan_anchor = mouse;
        } else {
            self.pan_anchor = None;
        }

        let left_down = window.get_mouse_down(MouseButton::Left);
        let point = mouse.or(self.last_pointer);
        if let Some(point) = point {
            let outcome = match (self.left_down, left_down) {
                (false, true) => session.pointer_down(point),
                (true, true) if Some(point) != self.last_pointer => session.pointer_move(point),
                (true, false) => session.pointer_up(point),
                _ => PointerOutcome::Ignored,
            };
            self.apply_outcome(outcome);
        }
        self.left_down = left_down;
        self.last_pointer = point;
    }

    fn apply_outcome(&mut self, outcome: PointerOutcome) {
        match outcome {
            PointerOutcome::LabelRequested(position) => {
                self.notice = None;
                self.prompt = Some(Prompt::Label {
                    position,
                    text: String::new(),
                });
            }
            PointerOutcome::SelectionRejected(error) => self.notice = Some(error.to_string()),
            PointerOutcome::SelectionChanged(_) | PointerOutcome::StrokeFinished => {
                self.notice = None;
            }
            PointerOutcome::Ignored | PointerOutcome::Started | PointerOutcome::Extended => {}
        }
    }

    fn status_line(&self, session: &AnnotationSession) -> String {
        match &self.prompt {
            Some(Prompt::Label { text, .. }) => {
                format!("label: {text}_  (enter place, esc cancel)")
            }
            Some(Prompt::Description(text)) => {
                format!("description: {text}_  (enter keep, esc discard)")
            }
            None => status_summary(session, &self.description, self.notice.as_deref()),
        }
    }
}

fn status_summary(session: &AnnotationSession, description: &str, notice: Option<&str>) -> String {
    if let Some(notice) = notice {
        return notice.to_string();
    }
    let description = if description.is_empty() {
        "-"
    } else {
        description
    };
    format!(
        "{} | {} | {}px | {:.0}% | {} | s/d/t c [ ] tab enter esc",
        session.tool().label(),
        session.color(),
        session.font_size(),
        session.view().scale() * 100.0,
        description
    )
}

fn push_typed(text: &mut String, ch: char) {
    if ch.is_control() || text.chars().count() >= MAX_TEXT_LEN {
        return;
    }
    text.push(ch);
}

fn to_display_pixels(image: &RasterImage) -> Vec<u32> {
    image
        .pixels()
        .chunks_exact(4)
        .map(|rgba| ((rgba[0] as u32) << 16) | ((rgba[1] as u32) << 8) | rgba[2] as u32)
        .collect()
}

/// Nearest-neighbour view of the grabbed image into the top `canvas_height`
/// rows of the buffer.
fn render_image(
    buffer: &mut [u32],
    width: usize,
    canvas_height: usize,
    source: &[u32],
    session: &AnnotationSession,
) {
    let (image_width, image_height) = session.image_size();
    let view = session.view();
    for y in 0..canvas_height {
        for x in 0..width {
            let point = view.to_image(CanvasPoint::new(x as f64 + 0.5, y as f64 + 0.5));
            let (ix, iy) = (point.x.floor(), point.y.floor());
            let inside = ix >= 0.0
                && iy >= 0.0
                && ix < image_width as f64
                && iy < image_height as f64;
            buffer[y * width + x] = if inside {
                source[iy as usize * image_width as usize + ix as usize]
            } else {
                BACKDROP
            };
        }
    }
}

fn draw_annotations(buffer: &mut [u32], width: usize, session: &AnnotationSession) {
    let view = session.view();
    for stroke in session.strokes().iter().chain(session.active_stroke()) {
        draw_stroke(buffer, width, view, stroke);
    }
    for label in session.labels() {
        draw_label(buffer, width, view, label);
    }
    if let Some(region) = session.selection() {
        let top_left = view.pixel_to_canvas(PixelPoint::new(region.x1() as i32, region.y1() as i32));
        let bottom_right =
            view.pixel_to_canvas(PixelPoint::new(region.x2() as i32, region.y2() as i32));
        draw_outline(buffer, width, top_left, bottom_right, SELECTION_COLOR);
    }
    if let Some((start, current)) = session.pending_selection() {
        draw_outline(buffer, width, start, current, PENDING_COLOR);
    }
}

fn draw_stroke(buffer: &mut [u32], width: usize, view: &ViewTransform, stroke: &Stroke) {
    let radius = ((stroke.width as f64 * view.scale()) / 2.0).round().max(0.0) as i64;
    let color = stroke.color.to_u32();
    let points: Vec<(i64, i64)> = stroke
        .points
        .iter()
        .map(|point| {
            let canvas = view.pixel_to_canvas(*point);
            (canvas.x.round() as i64, canvas.y.round() as i64)
        })
        .collect();
    match points.as_slice() {
        [] => {}
        [only] => stamp(buffer, width, *only, radius, color),
        _ => {
            for pair in points.windows(2) {
                draw_line(buffer, width, pair[0], pair[1], radius, color);
            }
        }
    }
}

fn draw_label(buffer: &mut [u32], width: usize, view: &ViewTransform, label: &TextLabel) {
    let origin = view.pixel_to_canvas(label.position);
    let scale = ((glyph_scale(label.font_size) as f64) * view.scale()).round().max(1.0) as i64;
    let advance = GLYPH_SIZE as i64 * scale;
    let mut cursor_x = origin.x.round() as i64;
    let top = origin.y.round() as i64;
    for ch in label.text.chars() {
        let (glyph, _) = glyph_or_fallback(ch);
        draw_glyph(buffer, width, cursor_x, top, &glyph, scale, label.color.to_u32());
        cursor_x += advance;
    }
}

fn draw_status(buffer: &mut [u32], width: usize, height: usize, text: &str, is_notice: bool) {
    let top = height - STATUS_HEIGHT;
    fill_rect(buffer, width, 0, top, width, STATUS_HEIGHT, STATUS_BACKGROUND);
    let color = if is_notice { NOTICE_TEXT } else { STATUS_TEXT };
    let max_chars = width.saturating_sub(12) / GLYPH_SIZE as usize;
    let visible: String = text.chars().take(max_chars).collect();
    draw_text(buffer, width, 6, top + 6, &visible, color);
}

fn draw_outline(buffer: &mut [u32], width: usize, a: CanvasPoint, b: CanvasPoint, color: u32) {
    let left = a.x.min(b.x).round() as i64;
    let right = a.x.max(b.x).round() as i64;
    let top = a.y.min(b.y).round() as i64;
    let bottom = a.y.max(b.y).round() as i64;
    for x in left..=right {
        set_pixel(buffer, width, x, top, color);
        set_pixel(buffer, width, x, bottom, color);
    }
    for y in top..=bottom {
        set_pixel(buffer, width, left, y, color);
        set_pixel(buffer, width, right, y, color);
    }
}

fn draw_line(
    buffer: &mut [u32],
    width: usize,
    from: (i64, i64),
    to: (i64, i64),
    radius: i64,
    color: u32,
) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).max(1);
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        let x = from.0 as f64 + (to.0 - from.0) as f64 * t;
        let y = from.1 as f64 + (to.1 - from.1) as f64 * t;
        stamp(buffer, width, (x.round() as i64, y.round() as i64), radius, color);
    }
}

fn stamp(buffer: &mut [u32], width: usize, center: (i64, i64), radius: i64, color: u32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                set_pixel(buffer, width, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}

fn fill_rect(buffer: &mut [u32], width: usize, left: usize, top: usize, w: usize, h: usize, color: u32) {
    for y in top..top.saturating_add(h) {
        for x in left..left.saturating_add(w) {
            set_pixel(buffer, width, x as i64, y as i64, color);
        }
    }
}

fn set_pixel(buffer: &mut [u32], width: usize, x: i64, y: i64, color: u32) {
    let height = buffer.len() / width;
    if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
        buffer[y as usize * width + x as usize] = color;
    }
}

fn draw_text(buffer: &mut [u32], width: usize, x: usize, y: usize, text: &str, color: u32) {
    let mut cursor_x = x as i64;
    for ch in text.chars() {
        let (glyph, _) = glyph_or_fallback(ch);
        draw_glyph(buffer, width, cursor_x, y as i64, &glyph, 1, color);
        cursor_x += GLYPH_SIZE as i64;
    }
}

fn draw_glyph(
    buffer: &mut [u32],
    width: usize,
    x: i64,
    y: i64,
    glyph: &[u8; 8],
    scale: i64,
    color: u32,
) {
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..8 {
            if (bits >> col) & 1 == 1 {
                let left = x + col * scale;
                let top = y + row as i64 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        set_pixel(buffer, width, left + dx, top + dy, color);
                    }
                }
            }
        }
    }
}
