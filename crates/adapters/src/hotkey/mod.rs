use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use stepshot_application::{ApplicationError, HotkeyHandle, HotkeyRegistrar, TriggerSender};
use stepshot_domain::{BaseKey, HotkeyCombo, Modifier};
use tracing::{debug, info, warn};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

type Routes = Arc<Mutex<HashMap<u32, TriggerSender>>>;

/// OS-wide shortcuts through `global-hotkey`. Presses are forwarded from a
/// background thread into each registration's trigger queue.
pub struct GlobalHotkeyRegistrar {
    manager: Option<GlobalHotKeyManager>,
    registered: HashMap<u32, HotKey>,
    routes: Routes,
    stop: Arc<AtomicBool>,
    forwarder: Option<JoinHandle<()>>,
}

impl Default for GlobalHotkeyRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalHotkeyRegistrar {
    pub fn new() -> Self {
        Self {
            manager: None,
            registered: HashMap::new(),
            routes: Arc::new(Mutex::new(HashMap::new())),
            stop: Arc::new(AtomicBool::new(false)),
            forwarder: None,
        }
    }

    fn manager(&mut self) -> Result<&GlobalHotKeyManager, ApplicationError> {
        if self.manager.is_none() {
            self.manager = Some(GlobalHotKeyManager::new().map_err(map_error)?);
        }
        self.manager
            .as_ref()
            .ok_or_else(|| ApplicationError::Hotkey("hotkey manager unavailable".to_string()))
    }

    fn ensure_forwarder(&mut self) -> Result<(), ApplicationError> {
        if self.forwarder.is_some() {
            return Ok(());
        }
        let routes = Arc::clone(&self.routes);
        let stop = Arc::clone(&self.stop);
        let handle = thread::Builder::new()
            .name("stepshot-hotkeys".to_string())
            .spawn(move || forward_events(routes, stop))
            .map_err(|error| ApplicationError::Hotkey(error.to_string()))?;
        self.forwarder = Some(handle);
        Ok(())
    }
}

impl HotkeyRegistrar for GlobalHotkeyRegistrar {
    fn register(
        &mut self,
        combo: &HotkeyCombo,
        triggers: TriggerSender,
    ) -> Result<HotkeyHandle, ApplicationError> {
        let hotkey = to_hotkey(combo);
        self.manager()?.register(hotkey).map_err(map_error)?;
        let id = hotkey.id();
        lock(&self.routes).insert(id, triggers);
        self.registered.insert(id, hotkey);
        self.ensure_forwarder()?;
        info!(hotkey = %combo, "global hotkey registered");
        Ok(HotkeyHandle(id))
    }

    fn unregister(&mut self, handle: HotkeyHandle) -> Result<(), ApplicationError> {
        let Some(hotkey) = self.registered.remove(&handle.0) else {
            return Ok(());
        };
        lock(&self.routes).remove(&handle.0);
        self.manager()?.unregister(hotkey).map_err(map_error)?;
        debug!(id = handle.0, "global hotkey unregistered");
        Ok(())
    }
}

impl Drop for GlobalHotkeyRegistrar {
    fn drop(&mut self) {
        let handles: Vec<u32> = self.registered.keys().copied().collect();
        for id in handles {
            if let Err(error) = self.unregister(HotkeyHandle(id)) {
                warn!(error = %error, "hotkey left registered on shutdown");
            }
        }
        self.stop.store(true, Ordering::Relaxed);
        if let Some(forwarder) = self.forwarder.take() {
            let _ = forwarder.join();
        }
    }
}

fn forward_events(routes: Routes, stop: Arc<AtomicBool>) {
    let events = GlobalHotKeyEvent::receiver();
    while !stop.load(Ordering::Relaxed) {
        let Ok(event) = events.recv_timeout(EVENT_POLL_INTERVAL) else {
            continue;
        };
        if event.state != HotKeyState::Pressed {
            continue;
        }
        if let Some(sender) = lock(&routes).get(&event.id) {
            sender.fire();
        }
    }
}

fn lock(routes: &Routes) -> MutexGuard<'_, HashMap<u32, TriggerSender>> {
    match routes.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn map_error(error: global_hotkey::Error) -> ApplicationError {
    match error {
        global_hotkey::Error::OsError(io) if io.kind() == ErrorKind::PermissionDenied => {
            ApplicationError::Permission(io.to_string())
        }
        other => ApplicationError::Hotkey(other.to_string()),
    }
}

pub fn to_hotkey(combo: &HotkeyCombo) -> HotKey {
    let mut modifiers = Modifiers::empty();
    for modifier in combo.modifiers() {
        modifiers |= match modifier {
            Modifier::Ctrl => Modifiers::CONTROL,
            Modifier::Alt => Modifiers::ALT,
            Modifier::Shift => Modifiers::SHIFT,
        };
    }
    let modifiers = (!modifiers.is_empty()).then_some(modifiers);
    HotKey::new(modifiers, key_code(combo.key()))
}

fn key_code(key: BaseKey) -> Code {
    match key {
        BaseKey::Letter(letter) => letter_code(letter),
        BaseKey::Digit(digit) => match digit {
            0 => Code::Digit0,
            1 => Code::Digit1,
            2 => Code::Digit2,
            3 => Code::Digit3,
            4 => Code::Digit4,
            5 => Code::Digit5,
            6 => Code::Digit6,
            7 => Code::Digit7,
            8 => Code::Digit8,
            _ => Code::Digit9,
        },
        BaseKey::Function(number) => match number {
            1 => Code::F1,
            2 => Code::F2,
            3 => Code::F3,
            4 => Code::F4,
            5 => Code::F5,
            6 => Code::F6,
            7 => Code::F7,
            8 => Code::F8,
            9 => Code::F9,
            10 => Code::F10,
            11 => Code::F11,
            _ => Code::F12,
        },
    }
}

fn letter_code(letter: char) -> Code {
    match letter {
        'a' => Code::KeyA,
        'b' => Code::KeyB,
        'c' => Code::KeyC,
        'd' => Code::KeyD,
        'e' => Code::KeyE,
        'f' => Code::KeyF,
        'g' => Code::KeyG,
        'h' => Code::KeyH,
        'i' => Code::KeyI,
        'j' => Code::KeyJ,
        'k' => Code::KeyK,
        'l' => Code::KeyL,
        'm' => Code::KeyM,
        'n' => Code::KeyN,
        'o' => Code::KeyO,
        'p' => Code::KeyP,
        'q' => Code::KeyQ,
        'r' => Code::KeyR,
        's' => Code::KeyS,
        't' => Code::KeyT,
        'u' => Code::KeyU,
        'v' => Code::KeyV,
        'w' => Code::KeyW,
        'x' => Code::KeyX,
        'y' => Code::KeyY,
        _ => Code::KeyZ,
    }
}
