use crate::{
    validate_font_size, AnnotationPlan, CanvasPoint, Color, CropRegion, DomainError, PixelPoint,
    Stroke, TextLabel, ViewTransform, DEFAULT_FONT_SIZE, DEFAULT_STROKE_WIDTH, MAX_FONT_SIZE,
    MIN_FONT_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Draw,
    Text,
}

impl Tool {
    pub fn label(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Draw => "draw",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    Ignored,
    Started,
    Extended,
    SelectionChanged(CropRegion),
    SelectionRejected(DomainError),
    StrokeFinished,
    /// The text tool was clicked over the image; the caller asks for the text
    /// and hands it back through [`AnnotationSession::add_label`].
    LabelRequested(PixelPoint),
}

#[derive(Debug, Clone, PartialEq)]
enum Drag {
    Select { start: CanvasPoint, current: CanvasPoint },
    Draw(Stroke),
}

/// Interactive state of one annotation pass over a grabbed image.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSession {
    image_width: u32,
    image_height: u32,
    view: ViewTransform,
    tool: Tool,
    color: Color,
    font_size: u32,
    stroke_width: u32,
    strokes: Vec<Stroke>,
    labels: Vec<TextLabel>,
    selection: Option<CropRegion>,
    drag: Option<Drag>,
}

impl AnnotationSession {
    pub fn new(image_width: u32, image_height: u32, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            image_width,
            image_height,
            view: ViewTransform::fit(image_width, image_height, viewport_width, viewport_height),
            tool: Tool::default(),
            color: Color::default(),
            font_size: DEFAULT_FONT_SIZE,
            stroke_width: DEFAULT_STROKE_WIDTH,
            strokes: Vec::new(),
            labels: Vec::new(),
            selection: None,
            drag: None,
        }
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    pub fn selection(&self) -> Option<CropRegion> {
        self.selection
    }

    /// Rubber band of a selection drag in progress, in canvas coordinates.
    pub fn pending_selection(&self) -> Option<(CanvasPoint, CanvasPoint)> {
        match &self.drag {
            Some(Drag::Select { start, current }) => Some((*start, *current)),
            _ => None,
        }
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        match &self.drag {
            Some(Drag::Draw(stroke)) => Some(stroke),
            _ => None,
        }
    }

    pub fn contains_canvas_point(&self, point: CanvasPoint) -> bool {
        self.view.covers(point, self.image_width, self.image_height)
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.commit_drag();
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn cycle_color(&mut self) -> Color {
        self.color = self.color.next_in_palette();
        self.color
    }

    pub fn set_font_size(&mut self, size: u32) -> Result<(), DomainError> {
        self.font_size = validate_font_size(size)?;
        Ok(())
    }

    pub fn adjust_font_size(&mut self, delta: i32) -> u32 {
        let size = (self.font_size as i64 + delta as i64)
            .clamp(MIN_FONT_SIZE as i64, MAX_FONT_SIZE as i64);
        self.font_size = size as u32;
        self.font_size
    }

    pub fn set_stroke_width(&mut self, width: u32) -> Result<(), DomainError> {
        Stroke::new(self.color, width)?;
        self.stroke_width = width;
        Ok(())
    }

    pub fn pointer_down(&mut self, point: CanvasPoint) -> PointerOutcome {
        self.commit_drag();
        match self.tool {
            Tool::Select => {
                self.drag = Some(Drag::Select {
                    start: point,
                    current: point,
                });
                PointerOutcome::Started
            }
            Tool::Draw => {
                let mut stroke = Stroke {
                    points: Vec::new(),
                    color: self.color,
                    width: self.stroke_width,
                };
                stroke.points.push(self.view.to_pixel(point));
                self.drag = Some(Drag::Draw(stroke));
                PointerOutcome::Started
            }
            Tool::Text => {
                if self.contains_canvas_point(point) {
                    PointerOutcome::LabelRequested(self.view.to_pixel(point))
                } else {
                    PointerOutcome::Ignored
                }
            }
        }
    }

    pub fn pointer_move(&mut self, point: CanvasPoint) -> PointerOutcome {
        let pixel = self.view.to_pixel(point);
        match &mut self.drag {
            Some(Drag::Select { current, .. }) => {
                *current = point;
                PointerOutcome::Extended
            }
            Some(Drag::Draw(stroke)) => {
                if stroke.points.last() != Some(&pixel) {
                    stroke.points.push(pixel);
                }
                PointerOutcome::Extended
            }
            None => PointerOutcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self, point: CanvasPoint) -> PointerOutcome {
        match self.drag.take() {
            Some(Drag::Select { start, .. }) => {
                match self
                    .view
                    .crop_region(start, point, self.image_width, self.image_height)
                {
                    Ok(region) => {
                        self.selection = Some(region);
                        PointerOutcome::SelectionChanged(region)
                    }
                    Err(error) => PointerOutcome::SelectionRejected(error),
                }
            }
            Some(Drag::Draw(mut stroke)) => {
                let pixel = self.view.to_pixel(point);
                if stroke.points.last() != Some(&pixel) {
                    stroke.points.push(pixel);
                }
                self.strokes.push(stroke);
                PointerOutcome::StrokeFinished
            }
            None => PointerOutcome::Ignored,
        }
    }

    /// Places a label with the current colour and font size. Blank text adds
    /// nothing and returns `false`.
    pub fn add_label(&mut self, position: PixelPoint, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.labels.push(TextLabel {
            position,
            text: text.to_string(),
            color: self.color,
            font_size: self.font_size,
        });
        true
    }

    /// Positive deltas zoom in one step about `anchor`, negative ones zoom out.
    pub fn wheel(&mut self, anchor: CanvasPoint, delta: f64) {
        if delta > 0.0 {
            self.view.zoom_in(anchor);
        } else if delta < 0.0 {
            self.view.zoom_out(anchor);
        }
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.view.pan_by(dx, dy);
    }

    /// Drops strokes and labels. The selection is kept.
    pub fn clear_annotations(&mut self) {
        if matches!(self.drag, Some(Drag::Draw(_))) {
            self.drag = None;
        }
        self.strokes.clear();
        self.labels.clear();
    }

    pub fn clear_selection(&mut self) {
        if matches!(self.drag, Some(Drag::Select { .. })) {
            self.drag = None;
        }
        self.selection = None;
    }

    pub fn finish(mut self) -> AnnotationPlan {
        self.commit_drag();
        AnnotationPlan {
            crop: self.selection,
            strokes: self.strokes,
            labels: self.labels,
        }
    }

    fn commit_drag(&mut self) {
        if let Some(Drag::Draw(stroke)) = self.drag.take() {
            self.strokes.push(stroke);
        }
    }
}
