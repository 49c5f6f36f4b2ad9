//=========================================================================
// App — Module Registry & Lifecycle Driver
//=========================================================================
//
// Owns the ordered module list and executes the lifecycle protocol:
//
//   add_module() → init()                 (registration order)
//   awake()      → Module::awake(config)  (registration order, fail-fast)
//   start()      → Module::start()        (registration order, fail-fast)
//   update():
//     1. prepare_update  (frame timer)
//     2. quit-signal check
//     3. pre_update  over active modules
//     4. update(dt)  over active modules
//     5. post_update over active modules
//     6. finish_update (deferred save/load, frame pacing)
//   clean_up()   → Module::clean_up()     (REVERSE registration order)
//
// Any module error in a phase stops that phase's iteration at the failing
// module and ends the frame loop. Save/load requests are deferred flags
// serviced once per frame in finish_update, after post_update.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

//=== External Crates =====================================================

use log::{error, info};
use serde_json::{Map, Value};

//=== Internal Modules ====================================================

use super::config::{Config, ConfigSource};
use super::module::{Module, ModuleError};

//=== TickControl =========================================================

/// Frame loop control signal returned by [`App::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Exit,
}

//=== AppSignals ==========================================================

/// Deferred cross-module requests.
///
/// Cloned (via `Rc`) into any module that needs to quit the frame loop,
/// schedule a save/load, or stage a config write-back. Save/load requests
/// raised mid-frame are serviced by the App after that frame's
/// post_update, before the next frame's pre_update; config edits are
/// applied and persisted at cleanup.
#[derive(Default)]
pub struct AppSignals {
    quit: Cell<bool>,
    save: Cell<bool>,
    load: Cell<bool>,
    config_edits: RefCell<Vec<(String, String, Value)>>,
}

impl AppSignals {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Requests frame loop termination (checked at the top of each frame).
    pub fn request_quit(&self) {
        self.quit.set(true);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.get()
    }

    /// Schedules a save for the end of the current frame.
    pub fn request_save(&self) {
        self.save.set(true);
    }

    pub fn save_requested(&self) -> bool {
        self.save.get()
    }

    /// Schedules a load for the end of the current frame.
    pub fn request_load(&self) {
        self.load.set(true);
    }

    pub fn load_requested(&self) -> bool {
        self.load.get()
    }

    /// Stages a `module.key = value` config edit for write-back.
    pub fn stage_config_edit(&self, module: &str, key: &str, value: Value) {
        self.config_edits
            .borrow_mut()
            .push((module.to_string(), key.to_string(), value));
    }

    /// Takes all staged config edits (App calls this at cleanup).
    pub fn drain_config_edits(&self) -> Vec<(String, String, Value)> {
        std::mem::take(&mut *self.config_edits.borrow_mut())
    }

    fn take_save(&self) -> bool {
        self.save.replace(false)
    }

    fn take_load(&self) -> bool {
        self.load.replace(false)
    }
}

//=== App =================================================================

/// Module registry and lifecycle driver.
///
/// Modules are registered once, in dependency order, and owned by the App
/// for the whole process lifetime. Collaborating modules hold `Rc` handles
/// to each other, wired by the engine builder at construction; the App
/// itself only drives the lifecycle protocol.
pub struct App {
    modules: Vec<Rc<RefCell<dyn Module>>>,

    signals: Rc<AppSignals>,
    config_source: ConfigSource,
    config: Option<Config>,
    save_path: PathBuf,

    title: String,
    organization: String,

    /// Previous frame duration, handed to Module::update.
    dt: f32,
    frame_start: Option<Instant>,

    /// Per-frame time budget for pacing, None = uncapped.
    frame_budget: Option<Duration>,
}

impl App {
    //--- Construction -----------------------------------------------------

    pub fn new(config_source: ConfigSource, signals: Rc<AppSignals>) -> Self {
        Self {
            modules: Vec::new(),
            signals,
            config_source,
            config: None,
            save_path: PathBuf::from("save_game.json"),
            title: String::new(),
            organization: String::new(),
            dt: 0.0,
            frame_start: None,
            frame_budget: None,
        }
    }

    /// Overrides the save-file location (tests, portable installs).
    pub fn set_save_path(&mut self, path: PathBuf) {
        self.save_path = path;
    }

    //--- Registration -----------------------------------------------------

    /// Appends a module and immediately invokes its one-time `init`.
    ///
    /// Registration order is awake/start/frame-phase order and the reverse
    /// of clean_up order.
    pub fn add_module(&mut self, module: Rc<RefCell<dyn Module>>) {
        module.borrow_mut().init();
        self.modules.push(module);
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    //--- One-time Lifecycle -----------------------------------------------

    /// Loads configuration and awakens every module in order.
    ///
    /// The first failing module aborts startup; modules after it are never
    /// awoken and no rollback is attempted.
    pub fn awake(&mut self) -> Result<(), ModuleError> {
        let config = Config::load(self.config_source.clone())?;

        let app_node = config.subtree("app");
        self.title = app_node
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Voltaic Engine")
            .to_string();
        self.organization = app_node
            .get("organization")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.frame_budget = app_node
            .get("fps_cap")
            .and_then(Value::as_u64)
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / fps as f64));

        info!("Awaking {} modules", self.modules.len());

        for module in &self.modules {
            let mut module = module.borrow_mut();
            let subtree = config.subtree(module.name());
            module.awake(subtree).map_err(|e| {
                error!("Module '{}' failed to awake: {}", module.name(), e);
                e
            })?;
        }

        self.config = Some(config);
        Ok(())
    }

    /// Starts every module in order; the first failure aborts startup.
    pub fn start(&mut self) -> Result<(), ModuleError> {
        for module in &self.modules {
            let mut module = module.borrow_mut();
            module.start().map_err(|e| {
                error!("Module '{}' failed to start: {}", module.name(), e);
                e
            })?;
        }
        Ok(())
    }

    //--- Frame Loop -------------------------------------------------------

    /// Runs one frame of the lifecycle protocol.
    ///
    /// Returns `Ok(TickControl::Exit)` on a quit request and `Err` on the
    /// first module phase failure; both end the frame loop (the caller
    /// begins shutdown — a phase failure is not a recoverable condition).
    pub fn update(&mut self) -> Result<TickControl, ModuleError> {
        self.prepare_update();

        if self.signals.quit_requested() {
            info!("Quit requested, leaving frame loop");
            return Ok(TickControl::Exit);
        }

        self.pre_update()?;
        self.do_update()?;
        self.post_update()?;

        self.finish_update();

        Ok(TickControl::Continue)
    }

    /// Previous frame duration in seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    //--- Shutdown ---------------------------------------------------------

    /// Cleans up every module in reverse registration order.
    ///
    /// Unlike the startup phases this does not stop at the first failure:
    /// every module gets its clean_up call, and the first error is reported
    /// afterwards.
    pub fn clean_up(&mut self) -> Result<(), ModuleError> {
        info!("Cleaning up {} modules", self.modules.len());

        let mut first_error = None;

        for module in self.modules.iter().rev() {
            let mut module = module.borrow_mut();
            if let Err(e) = module.clean_up() {
                error!("Module '{}' failed to clean up: {}", module.name(), e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        if let Some(config) = self.config.as_mut() {
            for (module, key, value) in self.signals.drain_config_edits() {
                config.set(&module, &key, value);
            }
            if let Err(e) = config.persist() {
                error!("Config write-back failed: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        self.modules.clear();

        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    //--- Frame Phases -----------------------------------------------------

    fn prepare_update(&mut self) {
        let now = Instant::now();
        self.dt = match self.frame_start {
            Some(start) => (now - start).as_secs_f32(),
            None => 0.0,
        };
        self.frame_start = Some(now);
    }

    fn pre_update(&mut self) -> Result<(), ModuleError> {
        for module in &self.modules {
            let mut module = module.borrow_mut();
            if !module.is_active() {
                continue;
            }
            module.pre_update().map_err(|e| {
                error!("Module '{}' failed in pre_update: {}", module.name(), e);
                e
            })?;
        }
        Ok(())
    }

    fn do_update(&mut self) -> Result<(), ModuleError> {
        for module in &self.modules {
            let mut module = module.borrow_mut();
            if !module.is_active() {
                continue;
            }
            module.update(self.dt).map_err(|e| {
                error!("Module '{}' failed in update: {}", module.name(), e);
                e
            })?;
        }
        Ok(())
    }

    fn post_update(&mut self) -> Result<(), ModuleError> {
        for module in &self.modules {
            let mut module = module.borrow_mut();
            if !module.is_active() {
                continue;
            }
            module.post_update().map_err(|e| {
                error!("Module '{}' failed in post_update: {}", module.name(), e);
                e
            })?;
        }
        Ok(())
    }

    /// Services deferred save/load requests, then paces the frame.
    ///
    /// Save/load failures are logged but not escalated: a corrupt save file
    /// should not take the session down with it.
    fn finish_update(&mut self) {
        if self.signals.take_load() {
            if let Err(e) = self.load_from_file() {
                error!("Load failed: {}", e);
            }
        }
        if self.signals.take_save() {
            if let Err(e) = self.save_to_file() {
                error!("Save failed: {}", e);
            }
        }

        if let (Some(budget), Some(start)) = (self.frame_budget, self.frame_start) {
            let elapsed = start.elapsed();
            if elapsed < budget {
                thread::sleep(budget - elapsed);
            }
        }
    }

    //--- Persisted State --------------------------------------------------

    /// Collects every module's state subtree, keyed by module name, and
    /// writes the document to the save file. Registration order.
    fn save_to_file(&mut self) -> Result<(), ModuleError> {
        let mut doc = Map::new();

        for module in &self.modules {
            let module = module.borrow();
            let mut subtree = Map::new();
            module.save_state(&mut subtree).map_err(|e| {
                error!("Module '{}' failed to save state: {}", module.name(), e);
                e
            })?;
            doc.insert(module.name().to_string(), Value::Object(subtree));
        }

        let text = serde_json::to_string_pretty(&Value::Object(doc))?;
        fs::write(&self.save_path, text)?;

        info!("Game state saved to {}", self.save_path.display());
        Ok(())
    }

    /// Mirror of save: hands each module its named subtree in order.
    fn load_from_file(&mut self) -> Result<(), ModuleError> {
        let text = fs::read_to_string(&self.save_path).map_err(|e| {
            ModuleError::State(format!("cannot read {}: {}", self.save_path.display(), e))
        })?;
        let doc: Value = serde_json::from_str(&text)?;

        for module in &self.modules {
            let mut module = module.borrow_mut();
            let subtree = doc.get(module.name()).unwrap_or(&Value::Null);
            module.load_state(subtree).map_err(|e| {
                error!("Module '{}' failed to load state: {}", module.name(), e);
                e
            })?;
        }

        info!("Game state loaded from {}", self.save_path.display());
        Ok(())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    //--- Test Helpers -----------------------------------------------------

    type CallLog = Rc<RefCell<Vec<String>>>;

    /// Module that records every lifecycle call into a shared log.
    struct Probe {
        name: &'static str,
        log: CallLog,
        active: bool,
        fail_phase: Option<&'static str>,
        request_save_in_update: Option<Rc<AppSignals>>,
    }

    impl Probe {
        fn new(name: &'static str, log: CallLog) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                name,
                log,
                active: true,
                fail_phase: None,
                request_save_in_update: None,
            }))
        }

        fn record(&self, phase: &str) {
            self.log.borrow_mut().push(format!("{}.{}", self.name, phase));
        }

        fn check(&self, phase: &'static str) -> Result<(), ModuleError> {
            self.record(phase);
            if self.fail_phase == Some(phase) {
                Err(ModuleError::Runtime(format!("{} failed", self.name)))
            } else {
                Ok(())
            }
        }
    }

    impl Module for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn init(&mut self) {
            self.record("init");
        }

        fn awake(&mut self, _config: &Value) -> Result<(), ModuleError> {
            self.check("awake")
        }

        fn start(&mut self) -> Result<(), ModuleError> {
            self.check("start")
        }

        fn pre_update(&mut self) -> Result<(), ModuleError> {
            self.check("pre_update")
        }

        fn update(&mut self, _dt: f32) -> Result<(), ModuleError> {
            if let Some(signals) = &self.request_save_in_update {
                signals.request_save();
            }
            self.check("update")
        }

        fn post_update(&mut self) -> Result<(), ModuleError> {
            self.check("post_update")
        }

        fn clean_up(&mut self) -> Result<(), ModuleError> {
            self.check("clean_up")
        }

        fn save_state(&self, state: &mut Map<String, Value>) -> Result<(), ModuleError> {
            self.record("save_state");
            state.insert("marker".into(), json!(self.name));
            Ok(())
        }

        fn load_state(&mut self, state: &Value) -> Result<(), ModuleError> {
            self.record("load_state");
            assert_eq!(state["marker"], json!(self.name));
            Ok(())
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn set_active(&mut self, active: bool) {
            self.active = active;
        }
    }

    fn empty_app() -> (App, Rc<AppSignals>) {
        let signals = AppSignals::new();
        let app = App::new(ConfigSource::Inline(json!({})), signals.clone());
        (app, signals)
    }

    fn app_with_probes(names: &[&'static str]) -> (App, Rc<AppSignals>, CallLog) {
        let (mut app, signals) = empty_app();
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        for name in names {
            app.add_module(Probe::new(name, log.clone()));
        }
        (app, signals, log)
    }

    fn calls(log: &CallLog) -> Vec<String> {
        log.borrow().clone()
    }

    //--- Lifecycle Ordering -----------------------------------------------

    #[test]
    fn add_module_invokes_init_immediately() {
        let (_, _, log) = app_with_probes(&["a", "b"]);
        assert_eq!(calls(&log), vec!["a.init", "b.init"]);
    }

    #[test]
    fn awake_and_start_run_in_registration_order() {
        let (mut app, _, log) = app_with_probes(&["a", "b", "c"]);
        log.borrow_mut().clear();

        app.awake().unwrap();
        app.start().unwrap();

        assert_eq!(
            calls(&log),
            vec!["a.awake", "b.awake", "c.awake", "a.start", "b.start", "c.start"]
        );
    }

    #[test]
    fn clean_up_runs_in_reverse_registration_order() {
        let (mut app, _, log) = app_with_probes(&["a", "b", "c"]);
        log.borrow_mut().clear();

        app.clean_up().unwrap();

        assert_eq!(calls(&log), vec!["c.clean_up", "b.clean_up", "a.clean_up"]);
    }

    #[test]
    fn frame_runs_phases_as_full_passes() {
        let (mut app, _, log) = app_with_probes(&["a", "b"]);
        app.awake().unwrap();
        app.start().unwrap();
        log.borrow_mut().clear();

        assert_eq!(app.update().unwrap(), TickControl::Continue);

        assert_eq!(
            calls(&log),
            vec![
                "a.pre_update",
                "b.pre_update",
                "a.update",
                "b.update",
                "a.post_update",
                "b.post_update",
            ]
        );
    }

    //--- Fail-fast Policy -------------------------------------------------

    #[test]
    fn awake_failure_aborts_before_later_modules() {
        let (mut app, _) = empty_app();
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));

        let a = Probe::new("a", log.clone());
        let b = Probe::new("b", log.clone());
        b.borrow_mut().fail_phase = Some("awake");
        let c = Probe::new("c", log.clone());

        app.add_module(a);
        app.add_module(b);
        app.add_module(c);
        log.borrow_mut().clear();

        assert!(app.awake().is_err());
        assert_eq!(calls(&log), vec!["a.awake", "b.awake"]);
    }

    #[test]
    fn phase_failure_stops_iteration_at_failing_module() {
        let (mut app, _) = empty_app();
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));

        let a = Probe::new("a", log.clone());
        let b = Probe::new("b", log.clone());
        b.borrow_mut().fail_phase = Some("update");
        let c = Probe::new("c", log.clone());

        app.add_module(a);
        app.add_module(b);
        app.add_module(c);
        app.awake().unwrap();
        app.start().unwrap();
        log.borrow_mut().clear();

        assert!(app.update().is_err());

        // Full pre_update pass ran; update stopped at b; post_update never ran.
        assert_eq!(
            calls(&log),
            vec!["a.pre_update", "b.pre_update", "c.pre_update", "a.update", "b.update"]
        );
    }

    #[test]
    fn clean_up_continues_past_failures_and_reports_one() {
        let (mut app, _) = empty_app();
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));

        let a = Probe::new("a", log.clone());
        let b = Probe::new("b", log.clone());
        b.borrow_mut().fail_phase = Some("clean_up");
        let c = Probe::new("c", log.clone());

        app.add_module(a);
        app.add_module(b);
        app.add_module(c);
        log.borrow_mut().clear();

        assert!(app.clean_up().is_err());
        assert_eq!(calls(&log), vec!["c.clean_up", "b.clean_up", "a.clean_up"]);
    }

    //--- Active Flag ------------------------------------------------------

    #[test]
    fn inactive_modules_skip_frame_phases_only() {
        let (mut app, _) = empty_app();
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));

        let a = Probe::new("a", log.clone());
        let b = Probe::new("b", log.clone());
        b.borrow_mut().set_active(false);

        app.add_module(a);
        app.add_module(b.clone());
        app.awake().unwrap();
        app.start().unwrap();
        log.borrow_mut().clear();

        app.update().unwrap();
        assert_eq!(calls(&log), vec!["a.pre_update", "a.update", "a.post_update"]);

        // One-time hooks still reach inactive modules.
        log.borrow_mut().clear();
        app.clean_up().unwrap();
        assert_eq!(calls(&log), vec!["b.clean_up", "a.clean_up"]);
    }

    //--- Quit Signal ------------------------------------------------------

    #[test]
    fn quit_request_exits_before_any_phase_runs() {
        let (mut app, signals, log) = app_with_probes(&["a"]);
        app.awake().unwrap();
        app.start().unwrap();
        log.borrow_mut().clear();

        signals.request_quit();

        assert_eq!(app.update().unwrap(), TickControl::Exit);
        assert!(calls(&log).is_empty());
    }

    //--- Save / Load ------------------------------------------------------

    #[test]
    fn save_request_is_serviced_after_post_update_before_next_frame() {
        let (mut app, signals) = empty_app();
        let path = std::env::temp_dir().join(format!(
            "voltaic_save_test_{}.json",
            std::process::id()
        ));
        app.set_save_path(path.clone());

        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let a = Probe::new("a", log.clone());
        a.borrow_mut().request_save_in_update = Some(signals.clone());
        let b = Probe::new("b", log.clone());

        app.add_module(a.clone());
        app.add_module(b);
        app.awake().unwrap();
        app.start().unwrap();
        log.borrow_mut().clear();

        app.update().unwrap();

        // save_state runs exactly once per module, after the post_update pass.
        assert_eq!(
            calls(&log),
            vec![
                "a.pre_update",
                "b.pre_update",
                "a.update",
                "b.update",
                "a.post_update",
                "b.post_update",
                "a.save_state",
                "b.save_state",
            ]
        );

        // Stop re-requesting so the next frame does not save again.
        a.borrow_mut().request_save_in_update = None;
        log.borrow_mut().clear();
        app.update().unwrap();
        assert!(!calls(&log).contains(&"a.save_state".to_string()));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn save_then_load_round_trips_module_subtrees() {
        let (mut app, signals, log) = app_with_probes(&["a", "b"]);
        let path = std::env::temp_dir().join(format!(
            "voltaic_roundtrip_test_{}.json",
            std::process::id()
        ));
        app.set_save_path(path.clone());
        app.awake().unwrap();
        app.start().unwrap();

        signals.request_save();
        app.update().unwrap();

        log.borrow_mut().clear();
        signals.request_load();
        app.update().unwrap();

        // load_state asserts internally that each module sees its own marker.
        assert!(calls(&log).contains(&"a.load_state".to_string()));
        assert!(calls(&log).contains(&"b.load_state".to_string()));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_with_missing_file_is_logged_not_fatal() {
        let (mut app, signals, _) = app_with_probes(&["a"]);
        app.set_save_path(PathBuf::from("/nonexistent/voltaic_save.json"));
        app.awake().unwrap();
        app.start().unwrap();

        signals.request_load();
        assert_eq!(app.update().unwrap(), TickControl::Continue);
    }

    //--- App Metadata -----------------------------------------------------

    #[test]
    fn awake_reads_app_identity_from_config() {
        let signals = AppSignals::new();
        let mut app = App::new(
            ConfigSource::Inline(json!({
                "app": { "title": "Voltaic Pinball", "organization": "Tungsten Protocol" }
            })),
            signals,
        );

        app.awake().unwrap();
        assert_eq!(app.title(), "Voltaic Pinball");
        assert_eq!(app.organization(), "Tungsten Protocol");
    }
}
