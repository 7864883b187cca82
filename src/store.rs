use std::sync::RwLock;

use crate::error::{Result, SheetError};

/// Single-slot register holding the currently selected spreadsheet
///
/// Owned by the composition root and shared with the gateway through an `Arc`.
/// Writes are last-write-wins; there is no history and no way to clear the slot.
#[derive(Debug, Default)]
pub struct SheetStore {
    current: RwLock<Option<String>>,
}

impl SheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored identifier
    ///
    /// # Errors
    /// * `SheetError::InvalidInput` if `id` is empty
    pub fn set(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(SheetError::InvalidInput(
                "Sheet ID cannot be empty".to_string(),
            ));
        }
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(id.to_string());
        Ok(())
    }

    /// Return the stored identifier
    ///
    /// # Errors
    /// * `SheetError::NotConfigured` if nothing was ever set
    pub fn get(&self) -> Result<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| SheetError::NotConfigured("Sheet ID not set".to_string()))
    }

    pub fn is_configured(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_before_set_is_not_configured() {
        let store = SheetStore::new();
        assert!(!store.is_configured());
        assert!(matches!(store.get(), Err(SheetError::NotConfigured(_))));
    }

    #[test]
    fn test_set_then_get() {
        let store = SheetStore::new();
        store.set("abc").unwrap();
        assert!(store.is_configured());
        assert_eq!(store.get().unwrap(), "abc");
    }

    #[test]
    fn test_empty_id_is_rejected_and_keeps_previous() {
        let store = SheetStore::new();
        assert!(matches!(store.set(""), Err(SheetError::InvalidInput(_))));
        assert!(!store.is_configured());

        store.set("first").unwrap();
        assert!(store.set("").is_err());
        assert_eq!(store.get().unwrap(), "first");
    }

    #[test]
    fn test_last_write_wins() {
        let store = SheetStore::new();
        store.set("first").unwrap();
        store.set("second").unwrap();
        assert_eq!(store.get().unwrap(), "second");
    }
}
