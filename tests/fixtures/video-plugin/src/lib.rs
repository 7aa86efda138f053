//! Video player plugin used by the dylib loading tests.

use std::cell::RefCell;
use std::collections::HashMap;

use dyn_plugin_host::{HookResult, Plugin, UiSurface};

#[derive(Default)]
struct PlayerSurface {
    properties: RefCell<HashMap<String, String>>,
}

impl UiSurface for PlayerSurface {
    fn entry_point(&self) -> String {
        "qrc:/VideoPlayer.qml".to_string()
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

#[derive(Default)]
pub struct VideoPlayer {
    surface: PlayerSurface,
}

impl Plugin for VideoPlayer {
    fn name(&self) -> String {
        "VideoPlayer".to_string()
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn description(&self) -> String {
        "Plays local video files".to_string()
    }

    fn initialize(&mut self) -> HookResult {
        self.surface.set_property("currentVideo", "");
        Ok(())
    }

    fn shutdown(&mut self) -> HookResult {
        self.surface.properties.borrow_mut().clear();
        Ok(())
    }

    fn ui_binding(&self) -> Option<&dyn UiSurface> {
        Some(&self.surface)
    }
}

dyn_plugin_host::export_plugin!(VideoPlayer::default);
