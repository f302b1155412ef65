//! Startup mapping from supported tools to their setup scripts.

use crate::locator::{ResourceLocator, SCRIPTS_DIR};
use crate::model::{ActionName, ActionView, ScriptConvention};
use crate::validator;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    pub name: ActionName,
    pub script: PathBuf,
}

/// Read-only after construction; entries keep declaration order.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    entries: Vec<ActionEntry>,
}

impl ActionRegistry {
    /// Resolve `scripts/<Tool><marker>.<ext>` for every supported tool.
    ///
    /// No validation happens here; see [`ActionRegistry::eligibility_view`].
    pub fn build(locator: &ResourceLocator, convention: &ScriptConvention) -> Self {
        let entries = ActionName::ALL
            .into_iter()
            .map(|name| {
                let rel = Path::new(SCRIPTS_DIR).join(convention.file_name(name));
                let script = locator.resolve(rel);
                tracing::debug!(action = %name, script = %script.display(), "registered script");
                ActionEntry { name, script }
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: ActionName) -> Option<&ActionEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Validate every entry now. Not cached: call again to observe filesystem changes.
    pub fn eligibility_view(&self, convention: &ScriptConvention) -> Vec<ActionView> {
        self.entries
            .iter()
            .map(|e| {
                let eligible = validator::is_eligible(&e.script, &convention.extension);
                if !eligible {
                    tracing::error!(action = %e.name, script = %e.script.display(), "script missing or invalid; action disabled");
                }
                ActionView {
                    name: e.name,
                    script: e.script.clone(),
                    eligible,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Layout;
    use std::fs;

    fn convention() -> ScriptConvention {
        ScriptConvention {
            marker: "-setup".into(),
            extension: "vbs".into(),
            host: "wscript.exe".into(),
        }
    }

    #[test]
    fn one_entry_per_tool_in_declaration_order() {
        let loc = ResourceLocator::new(PathBuf::from("/srv/deck"), Layout::Explicit);
        let reg = ActionRegistry::build(&loc, &convention());
        assert_eq!(reg.len(), 8);
        let names: Vec<ActionName> = reg.entries.iter().map(|e| e.name).collect();
        assert_eq!(names, ActionName::ALL.to_vec());
    }

    #[test]
    fn paths_follow_naming_convention() {
        let loc = ResourceLocator::new(PathBuf::from("/srv/deck"), Layout::Explicit);
        let reg = ActionRegistry::build(&loc, &convention());
        assert_eq!(
            reg.get(ActionName::PyCharm).unwrap().script,
            PathBuf::from("/srv/deck/scripts/PyCharm-setup.vbs")
        );
        assert_eq!(
            reg.get(ActionName::Idea).unwrap().script,
            PathBuf::from("/srv/deck/scripts/IDEA-setup.vbs")
        );
        let again = ActionRegistry::build(&loc, &convention());
        assert_eq!(reg.entries, again.entries);
    }

    #[test]
    fn view_disables_missing_scripts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(SCRIPTS_DIR)).unwrap();
        fs::write(dir.path().join("scripts/Rider-setup.vbs"), "x").unwrap();
        fs::write(dir.path().join("scripts/GoLand-setup.txt"), "x").unwrap();

        let loc = ResourceLocator::new(dir.path().to_path_buf(), Layout::Explicit);
        let reg = ActionRegistry::build(&loc, &convention());
        let view = reg.eligibility_view(&convention());

        assert_eq!(view.len(), 8);
        for row in &view {
            assert_eq!(row.eligible, row.name == ActionName::Rider, "{}", row.name);
        }
    }
}
