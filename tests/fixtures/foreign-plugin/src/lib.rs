//! Exports a declaration for some other host's plugin interface.

use dyn_plugin_host::{HookResult, Plugin, PluginDeclaration};

struct Foreign;

impl Plugin for Foreign {
    fn name(&self) -> String {
        "Foreign".to_string()
    }

    fn version(&self) -> String {
        "0.1.0".to_string()
    }

    fn description(&self) -> String {
        String::new()
    }

    fn initialize(&mut self) -> HookResult {
        Ok(())
    }

    fn shutdown(&mut self) -> HookResult {
        Ok(())
    }
}

fn create() -> Box<dyn Plugin> {
    Box::new(Foreign)
}

#[allow(non_upper_case_globals)]
#[no_mangle]
pub static plugin_declaration: PluginDeclaration = PluginDeclaration {
    interface_id: "com.example.PluginInterface",
    create,
};
