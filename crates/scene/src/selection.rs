/// The region currently shown in the info panel, if any.
///
/// Changes only through `select` (a click) and `clear` (closing the panel).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    name: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `name`. Returns `true` if the selection changed.
    pub fn select(&mut self, name: &str) -> bool {
        if self.name.as_deref() == Some(name) {
            return false;
        }
        self.name = Some(name.to_string());
        true
    }

    /// Returns `true` if something was selected.
    pub fn clear(&mut self) -> bool {
        self.name.take().is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}
