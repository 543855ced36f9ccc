//! Macro scoping
//!
//! A macro is visible to an API when it is global or bound to the API's own
//! module. Macros of other modules are never visible.

use crate::models::{MacroDef, MacroType};

/// Macros visible to an API in `module_id`, in input order
pub fn macros_in_scope<'a>(macros: &'a [MacroDef], module_id: &str) -> Vec<&'a MacroDef> {
    macros
        .iter()
        .filter(|m| in_scope(m, module_id))
        .collect()
}

fn in_scope(macro_def: &MacroDef, module_id: &str) -> bool {
    match macro_def.module_id.as_deref() {
        None => true,
        Some(bound) => bound == module_id,
    }
}

/// Concatenated content of the in-scope macros of one language.
///
/// This is what gets prepended to API content for previews.
pub fn render_macro_preamble(macros: &[&MacroDef], macro_type: MacroType) -> String {
    macros
        .iter()
        .filter(|m| m.macro_type == macro_type)
        .map(|m| m.content.trim_end())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// In-scope macros for the module currently selected in an editor
#[derive(Debug, Clone)]
pub struct MacroScope {
    macros: Vec<MacroDef>,
    module_id: Option<String>,
}

impl MacroScope {
    pub fn new(macros: Vec<MacroDef>) -> Self {
        Self {
            macros,
            module_id: None,
        }
    }

    /// Change the module selection
    pub fn select_module(&mut self, module_id: impl Into<String>) {
        self.module_id = Some(module_id.into());
    }

    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    /// Visible macros; only global ones until a module is selected
    pub fn visible(&self) -> Vec<&MacroDef> {
        match self.module_id.as_deref() {
            Some(module_id) => macros_in_scope(&self.macros, module_id),
            None => self.macros.iter().filter(|m| m.is_global()).collect(),
        }
    }

    pub fn preamble(&self, macro_type: MacroType) -> String {
        render_macro_preamble(&self.visible(), macro_type)
    }
}
