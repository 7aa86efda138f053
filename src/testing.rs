//! Mock plugins and an in-memory loader shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::rc::Rc;

use crate::contract::{HookError, HookResult, Plugin, UiSurface};
use crate::error::Result;
use crate::loader::{DylibLoader, ModuleLoader, PluginModule};

/// Counters observed from outside a mock plugin, shared across reloads.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tracker(Rc<TrackerState>);

#[derive(Debug, Default)]
struct TrackerState {
    instances: Cell<usize>,
    init_calls: Cell<usize>,
    shutdown_calls: Cell<usize>,
    reused_state: Cell<usize>,
    dropped: Cell<bool>,
}

impl Tracker {
    pub fn instances(&self) -> usize {
        self.0.instances.get()
    }

    pub fn init_calls(&self) -> usize {
        self.0.init_calls.get()
    }

    pub fn shutdown_calls(&self) -> usize {
        self.0.shutdown_calls.get()
    }

    /// Times `initialize` ran on an instance that was already initialized.
    pub fn reused_state(&self) -> usize {
        self.0.reused_state.get()
    }

    pub fn dropped(&self) -> bool {
        self.0.dropped.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    None,
    Error,
    Panic,
}

/// Surface offered by mock plugins, mirroring a media player's bindable object.
#[derive(Debug, Default)]
pub(crate) struct MockSurface {
    entry_point: String,
    properties: RefCell<HashMap<String, String>>,
}

impl UiSurface for MockSurface {
    fn entry_point(&self) -> String {
        self.entry_point.clone()
    }

    fn property(&self, key: &str) -> Option<String> {
        self.properties.borrow().get(key).cloned()
    }

    fn set_property(&self, key: &str, value: &str) -> bool {
        self.properties
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }
}

/// Configurable plugin used across the test modules.
#[derive(Debug)]
pub(crate) struct MockPlugin {
    name: String,
    tracker: Tracker,
    initialized: bool,
    init_failure: Failure,
    shutdown_failure: Failure,
    surface: Option<MockSurface>,
    panic_on_drop: bool,
}

impl MockPlugin {
    pub fn new(name: &str) -> Self {
        Self::with_tracker(name, Tracker::default())
    }

    pub fn with_tracker(name: &str, tracker: Tracker) -> Self {
        tracker.0.instances.set(tracker.instances() + 1);
        Self {
            name: name.to_string(),
            tracker,
            initialized: false,
            init_failure: Failure::None,
            shutdown_failure: Failure::None,
            surface: None,
            panic_on_drop: false,
        }
    }

    pub fn failing_init(mut self, failure: Failure) -> Self {
        self.init_failure = failure;
        self
    }

    pub fn failing_shutdown(mut self, failure: Failure) -> Self {
        self.shutdown_failure = failure;
        self
    }

    pub fn panicking_drop(mut self) -> Self {
        self.panic_on_drop = true;
        self
    }

    pub fn with_ui(mut self, entry_point: &str) -> Self {
        self.surface = Some(MockSurface {
            entry_point: entry_point.to_string(),
            properties: RefCell::default(),
        });
        self
    }

    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }
}

impl Plugin for MockPlugin {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn version(&self) -> String {
        "1.0".to_string()
    }

    fn description(&self) -> String {
        format!("{} mock plugin", self.name)
    }

    fn initialize(&mut self) -> HookResult {
        let state = &self.tracker.0;
        state.init_calls.set(state.init_calls.get() + 1);
        if self.initialized {
            state.reused_state.set(state.reused_state.get() + 1);
        }
        match self.init_failure {
            Failure::None => {
                self.initialized = true;
                Ok(())
            }
            Failure::Error => Err(HookError::new("init refused")),
            Failure::Panic => panic!("init exploded"),
        }
    }

    fn shutdown(&mut self) -> HookResult {
        let state = &self.tracker.0;
        state.shutdown_calls.set(state.shutdown_calls.get() + 1);
        self.initialized = false;
        match self.shutdown_failure {
            Failure::None => Ok(()),
            Failure::Error => Err(HookError::new("shutdown refused")),
            Failure::Panic => panic!("shutdown exploded"),
        }
    }

    fn ui_binding(&self) -> Option<&dyn UiSurface> {
        self.surface.as_ref().map(|s| s as &dyn UiSurface)
    }
}

impl Drop for MockPlugin {
    fn drop(&mut self) {
        self.tracker.0.dropped.set(true);
        if self.panic_on_drop {
            panic!("destructor exploded");
        }
    }
}

type ModuleFactory = Box<dyn Fn(&Path) -> Result<PluginModule>>;

/// Loader resolving known file names to in-process modules; other files go
/// through the real dynamic loader.
#[derive(Default)]
pub(crate) struct MockLoader {
    modules: HashMap<OsString, ModuleFactory>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(
        self,
        file_name: &str,
        factory: impl Fn() -> MockPlugin + 'static,
    ) -> Self {
        self.with_module(file_name, move |path| {
            PluginModule::from_instance(path, Box::new(factory()))
        })
    }

    pub fn with_module(
        mut self,
        file_name: &str,
        factory: impl Fn(&Path) -> Result<PluginModule> + 'static,
    ) -> Self {
        self.modules.insert(file_name.into(), Box::new(factory));
        self
    }
}

impl ModuleLoader for MockLoader {
    fn load(&self, path: &Path) -> Result<PluginModule> {
        match path.file_name().and_then(|name| self.modules.get(name)) {
            Some(factory) => factory(path),
            None => DylibLoader.load(path),
        }
    }
}
