//! Paste plugin configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasteOptions {
    /// Keep Excel cells without borders as they are instead of giving them
    /// Excel's default grid line.
    pub allow_excel_no_border_table: bool,
}

impl PasteOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options = PasteOptions::from_json(r#"{"allowExcelNoBorderTable": true}"#).unwrap();
        assert!(options.allow_excel_no_border_table);
        assert_eq!(PasteOptions::from_json("{}").unwrap(), PasteOptions::default());
    }
}
