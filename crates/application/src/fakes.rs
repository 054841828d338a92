//! In-memory port implementations shared by the service and controller tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::rc::Rc;

use stepshot_domain::{
    AnnotationPlan, HotkeyCombo, RasterImage, Session, SessionId,
};

use crate::{
    AnnotationOverlay, ApplicationError, Clock, Compositor, HotkeyHandle, HotkeyRegistrar,
    OverlayResult, ReportExporter, ReportFormat, ReportOptions, ReportSummary, ScreenGrabber,
    SessionCatalog, SessionStore, TriggerSender,
};

#[derive(Default)]
struct StoreState {
    next_id: u32,
    created: usize,
    records: HashMap<SessionId, Session>,
    images: HashMap<String, RasterImage>,
    copies: HashMap<String, String>,
    discarded: HashSet<SessionId>,
    fail_saves: bool,
    fail_image_removal: bool,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    state: Rc<RefCell<StoreState>>,
}

impl FakeStore {
    pub fn created_count(&self) -> usize {
        self.state.borrow().created
    }

    pub fn saved(&self, id: &SessionId) -> Option<Session> {
        self.state.borrow().records.get(id).cloned()
    }

    pub fn discarded(&self, id: &SessionId) -> bool {
        self.state.borrow().discarded.contains(id)
    }

    pub fn image(&self, path: &str) -> Option<RasterImage> {
        self.state.borrow().images.get(path).cloned()
    }

    pub fn has_image(&self, path: &str) -> bool {
        self.state.borrow().images.contains_key(path)
    }

    pub fn image_count(&self) -> usize {
        self.state.borrow().images.len()
    }

    pub fn forget_image(&self, path: &str) {
        self.state.borrow_mut().images.remove(path);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.state.borrow_mut().fail_saves = fail;
    }

    pub fn fail_image_removal(&self, fail: bool) {
        self.state.borrow_mut().fail_image_removal = fail;
    }
}

impl SessionStore for FakeStore {
    fn create(
        &self,
        name: &str,
        description: &str,
        start_time: &str,
    ) -> Result<Session, ApplicationError> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.created += 1;
        let id = SessionId::new(format!("session-{}", state.next_id))?;
        Ok(Session::new(id, name, description, start_time)?)
    }

    fn load_all(&self) -> Result<SessionCatalog, ApplicationError> {
        let mut sessions: Vec<Session> = self.state.borrow().records.values().cloned().collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(SessionCatalog {
            sessions,
            skipped: Vec::new(),
        })
    }

    fn load(&self, id: &SessionId) -> Result<Option<Session>, ApplicationError> {
        Ok(self.saved(id))
    }

    fn save(&self, session: &Session) -> Result<(), ApplicationError> {
        let mut state = self.state.borrow_mut();
        if state.fail_saves {
            return Err(ApplicationError::Persistence("disk full".to_string()));
        }
        session.validate()?;
        state.records.insert(session.id().clone(), session.clone());
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> Result<(), ApplicationError> {
        let mut state = self.state.borrow_mut();
        let session = state
            .records
            .remove(id)
            .ok_or_else(|| ApplicationError::NotFound(format!("session {id}")))?;
        for capture in session.captures() {
            state.images.remove(&capture.image_path);
        }
        Ok(())
    }

    fn write_capture_image(
        &self,
        id: &SessionId,
        file_stem: &str,
        image: &RasterImage,
    ) -> Result<String, ApplicationError> {
        let mut state = self.state.borrow_mut();
        let mut path = format!("/store/{id}/{file_stem}.png");
        let mut suffix = 1;
        while state.images.contains_key(&path) {
            path = format!("/store/{id}/{file_stem}_{suffix}.png");
            suffix += 1;
        }
        state.images.insert(path.clone(), image.clone());
        Ok(path)
    }

    fn overwrite_image(&self, path: &str, image: &RasterImage) -> Result<(), ApplicationError> {
        self.state
            .borrow_mut()
            .images
            .insert(path.to_string(), image.clone());
        Ok(())
    }

    fn read_image(&self, path: &str) -> Result<RasterImage, ApplicationError> {
        self.image(path)
            .ok_or_else(|| ApplicationError::Io(format!("{path}: no such file")))
    }

    fn remove_image(&self, path: &str) -> Result<bool, ApplicationError> {
        let mut state = self.state.borrow_mut();
        if state.fail_image_removal {
            return Err(ApplicationError::Io(format!("{path}: permission denied")));
        }
        Ok(state.images.remove(path).is_some())
    }

    fn stage_image_removal(&self, path: &str) -> Result<Option<String>, ApplicationError> {
        let mut state = self.state.borrow_mut();
        if state.fail_image_removal {
            return Err(ApplicationError::Io(format!("{path}: permission denied")));
        }
        let Some(image) = state.images.remove(path) else {
            return Ok(None);
        };
        let staged = format!("{path}.deleting");
        state.images.insert(staged.clone(), image);
        Ok(Some(staged))
    }

    fn restore_staged_image(&self, staged: &str, path: &str) -> Result<(), ApplicationError> {
        let mut state = self.state.borrow_mut();
        let image = state
            .images
            .remove(staged)
            .ok_or_else(|| ApplicationError::Io(format!("{staged}: no such file")))?;
        state.images.insert(path.to_string(), image);
        Ok(())
    }

    fn copy_image(&self, path: &str, destination: &Path) -> Result<(), ApplicationError> {
        let mut state = self.state.borrow_mut();
        if !state.images.contains_key(path) {
            return Err(ApplicationError::Io(format!("{path}: no such file")));
        }
        state
            .copies
            .insert(destination.display().to_string(), path.to_string());
        Ok(())
    }

    fn discard_images_dir(&self, id: &SessionId) -> Result<(), ApplicationError> {
        let mut state = self.state.borrow_mut();
        let prefix = format!("/store/{id}/");
        state.images.retain(|path, _| !path.starts_with(&prefix));
        state.discarded.insert(id.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeClock {
    epoch: Rc<Cell<u64>>,
    ticks: Rc<Cell<u32>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            epoch: Rc::new(Cell::new(1_000)),
            ticks: Rc::new(Cell::new(0)),
        }
    }
}

impl FakeClock {
    pub fn set_epoch(&self, epoch: u64) {
        self.epoch.set(epoch);
    }
}

impl Clock for FakeClock {
    fn now_timestamp_string(&self) -> String {
        let tick = self.ticks.get();
        self.ticks.set(tick + 1);
        format!("2026-10-16 09:00:{:02}", tick % 60)
    }

    fn now_file_stamp(&self) -> String {
        "20261016_090000".to_string()
    }

    fn now_epoch_seconds(&self) -> u64 {
        self.epoch.get()
    }
}

/// Crops to the plan's output size; ignores strokes and labels.
pub struct FakeCompositor;

impl Compositor for FakeCompositor {
    fn compose(
        &self,
        base: &RasterImage,
        plan: &AnnotationPlan,
    ) -> Result<RasterImage, ApplicationError> {
        if plan.crop.is_none() {
            return Ok(base.clone());
        }
        let (width, height) = plan.output_size(base.width(), base.height());
        Ok(RasterImage::filled(width, height, [0, 0, 0, 255]))
    }
}

pub struct FakeExporter {
    format: ReportFormat,
}

impl FakeExporter {
    pub fn markdown() -> Self {
        Self {
            format: ReportFormat::Markdown,
        }
    }
}

impl ReportExporter for FakeExporter {
    fn format(&self) -> ReportFormat {
        self.format
    }

    fn export(
        &self,
        session: &Session,
        destination: &Path,
        _options: &ReportOptions,
    ) -> Result<ReportSummary, ApplicationError> {
        Ok(ReportSummary {
            path: destination.to_path_buf(),
            steps: session.captures().len(),
            missing_images: 0,
        })
    }
}

#[derive(Default)]
struct OverlayState {
    response: Option<OverlayResult>,
    fail: bool,
    seen: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeOverlay {
    state: Rc<RefCell<OverlayState>>,
}

impl FakeOverlay {
    pub fn confirming(plan: AnnotationPlan, description: &str) -> Self {
        let overlay = Self::default();
        overlay.state.borrow_mut().response = Some(OverlayResult {
            plan,
            description: description.to_string(),
        });
        overlay
    }

    pub fn cancelling() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    pub fn seen_descriptions(&self) -> Vec<String> {
        self.state.borrow().seen.clone()
    }

    pub fn shown(&self) -> usize {
        self.state.borrow().seen.len()
    }
}

impl AnnotationOverlay for FakeOverlay {
    fn annotate(
        &mut self,
        _image: &RasterImage,
        description: &str,
    ) -> Result<Option<OverlayResult>, ApplicationError> {
        let mut state = self.state.borrow_mut();
        state.seen.push(description.to_string());
        if state.fail {
            return Err(ApplicationError::Io("window closed".to_string()));
        }
        Ok(state.response.clone())
    }
}

pub enum Grab {
    Image,
    Fail,
    Unsupported,
}

#[derive(Clone, Default)]
pub struct FakeGrabber {
    script: Rc<RefCell<VecDeque<Grab>>>,
}

impl FakeGrabber {
    pub fn push(&self, grab: Grab) {
        self.script.borrow_mut().push_back(grab);
    }
}

impl ScreenGrabber for FakeGrabber {
    fn grab(&self) -> Result<RasterImage, ApplicationError> {
        match self.script.borrow_mut().pop_front().unwrap_or(Grab::Image) {
            Grab::Image => Ok(RasterImage::filled(8, 6, [200, 200, 200, 255])),
            Grab::Fail => Err(ApplicationError::Capture("display busy".to_string())),
            Grab::Unsupported => Err(ApplicationError::Capability(
                "no displays reported".to_string(),
            )),
        }
    }
}

#[derive(Default)]
struct RegistrarState {
    deny: bool,
    fail_unregister: bool,
    next_handle: u32,
    active: Vec<HotkeyHandle>,
    sender: Option<TriggerSender>,
    combos: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeRegistrar {
    state: Rc<RefCell<RegistrarState>>,
}

impl FakeRegistrar {
    pub fn deny(&self) {
        self.state.borrow_mut().deny = true;
    }

    pub fn fail_unregister(&self) {
        self.state.borrow_mut().fail_unregister = true;
    }

    /// Simulates the OS reporting a key press.
    pub fn press(&self) -> bool {
        match &self.state.borrow().sender {
            Some(sender) => sender.fire(),
            None => false,
        }
    }

    pub fn active(&self) -> usize {
        self.state.borrow().active.len()
    }

    pub fn combos(&self) -> Vec<String> {
        self.state.borrow().combos.clone()
    }
}

impl HotkeyRegistrar for FakeRegistrar {
    fn register(
        &mut self,
        combo: &HotkeyCombo,
        triggers: TriggerSender,
    ) -> Result<HotkeyHandle, ApplicationError> {
        let mut state = self.state.borrow_mut();
        if state.deny {
            return Err(ApplicationError::Permission(
                "input monitoring not granted".to_string(),
            ));
        }
        state.next_handle += 1;
        let handle = HotkeyHandle(state.next_handle);
        state.active.push(handle);
        state.sender = Some(triggers);
        state.combos.push(combo.to_string());
        Ok(handle)
    }

    fn unregister(&mut self, handle: HotkeyHandle) -> Result<(), ApplicationError> {
        let mut state = self.state.borrow_mut();
        state.active.retain(|active| *active != handle);
        state.sender = None;
        if state.fail_unregister {
            return Err(ApplicationError::Hotkey("event loop gone".to_string()));
        }
        Ok(())
    }
}
