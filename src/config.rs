use crate::topology::stitcher::CurveDirection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const DEFAULT_COMPARTMENT_NAMES: [(&str, &str); 22] = [
    ("c", "cytosol"),
    ("e", "extracellular space"),
    ("p", "periplasm"),
    ("m", "mitochondria"),
    ("x", "peroxisome/glyoxysome"),
    ("r", "endoplasmic reticulum"),
    ("v", "vacuole"),
    ("n", "nucleus"),
    ("g", "golgi apparatus"),
    ("u", "thylakoid"),
    ("l", "lysosome"),
    ("h", "chloroplast"),
    ("f", "flagellum"),
    ("s", "eyespot"),
    ("im", "intermembrane space of mitochondria"),
    ("cx", "carboxysome"),
    ("um", "thylakoid membrane"),
    ("cm", "cytosolic membrane"),
    ("i", "inner mitochondrial compartment"),
    ("mm", "mitochondrial intermembrane"),
    ("w", "wild type staph aureus"),
    ("y", "cytochrome complex"),
];

/// Compartment codes never drawn as inferred boundaries.
const DEFAULT_EXCLUDED_CODES: [&str; 2] = ["e", "n"];

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub export: ExportConfig,
    pub compartments: CompartmentTable,
}

/// Sizes and naming used when writing layout and notation documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub canvas_default_width: f64,
    pub canvas_default_height: f64,
    pub label_width: f64,
    pub label_height: f64,
    pub node_label_height: f64,
    pub reaction_label_height: f64,
    pub primary_node_width: f64,
    pub primary_node_height: f64,
    pub reaction_node_ratio: f64,
    pub secondary_node_ratio: f64,
    pub infer_compartment_bounds: bool,
    pub layout_id: String,
    pub layout_name: String,
    pub default_compartment_id: String,
    pub default_compartment_name: String,
    pub curve_direction: CurveDirection,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            canvas_default_width: 250.0,
            canvas_default_height: 250.0,
            label_width: 160.0,
            label_height: 50.0,
            node_label_height: 20.0,
            reaction_label_height: 30.0,
            primary_node_width: 30.0,
            primary_node_height: 30.0,
            reaction_node_ratio: 0.5,
            secondary_node_ratio: 2.0 / 3.0,
            infer_compartment_bounds: false,
            layout_id: "pathway_layout".to_string(),
            layout_name: String::new(),
            default_compartment_id: "default".to_string(),
            default_compartment_name: "default compartment".to_string(),
            curve_direction: CurveDirection::Flow,
        }
    }
}

impl ExportConfig {
    /// Width and height of a metabolite box.
    pub fn node_size(&self, is_primary: bool) -> (f64, f64) {
        if is_primary {
            (self.primary_node_width, self.primary_node_height)
        } else {
            (
                self.primary_node_width * self.secondary_node_ratio,
                self.primary_node_height * self.secondary_node_ratio,
            )
        }
    }

    /// Width and height of a reaction box.
    pub fn reaction_node_size(&self) -> (f64, f64) {
        (
            self.primary_node_width * self.reaction_node_ratio,
            self.primary_node_height * self.reaction_node_ratio,
        )
    }
}

/// Compartment code to display name, plus the codes excluded from boundary rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompartmentTable {
    names: BTreeMap<String, String>,
    excluded: BTreeSet<String>,
}

impl Default for CompartmentTable {
    fn default() -> Self {
        Self {
            names: DEFAULT_COMPARTMENT_NAMES
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
            excluded: DEFAULT_EXCLUDED_CODES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl CompartmentTable {
    pub fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
            excluded: BTreeSet::new(),
        }
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.names.insert(code.into(), name.into());
    }

    pub fn exclude(&mut self, code: impl Into<String>) {
        self.excluded.insert(code.into().to_lowercase());
    }

    /// Case-insensitive.
    pub fn is_excluded(&self, code: &str) -> bool {
        self.excluded.contains(&code.to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    export: Option<ExportConfigFile>,
    compartments: Option<CompartmentTableFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExportConfigFile {
    canvas_default_width: Option<f64>,
    canvas_default_height: Option<f64>,
    label_width: Option<f64>,
    label_height: Option<f64>,
    node_label_height: Option<f64>,
    reaction_label_height: Option<f64>,
    primary_node_width: Option<f64>,
    primary_node_height: Option<f64>,
    reaction_node_ratio: Option<f64>,
    secondary_node_ratio: Option<f64>,
    infer_compartment_bounds: Option<bool>,
    layout_id: Option<String>,
    layout_name: Option<String>,
    default_compartment_id: Option<String>,
    default_compartment_name: Option<String>,
    curve_direction: Option<CurveDirection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CompartmentTableFile {
    names: Option<BTreeMap<String, String>>,
    excluded: Option<Vec<String>>,
    /// Drop the built-in table before applying `names`.
    replace_defaults: Option<bool>,
}

/// Reads optional overrides from a camelCase JSON (or JSON5) file on top of the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = match serde_json::from_str(&contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(&contents).map_err(|_| json_err)?,
    };

    if let Some(export) = parsed.export {
        let target = &mut config.export;
        if let Some(v) = export.canvas_default_width {
            target.canvas_default_width = v;
        }
        if let Some(v) = export.canvas_default_height {
            target.canvas_default_height = v;
        }
        if let Some(v) = export.label_width {
            target.label_width = v;
        }
        if let Some(v) = export.label_height {
            target.label_height = v;
        }
        if let Some(v) = export.node_label_height {
            target.node_label_height = v;
        }
        if let Some(v) = export.reaction_label_height {
            target.reaction_label_height = v;
        }
        if let Some(v) = export.primary_node_width {
            target.primary_node_width = v;
        }
        if let Some(v) = export.primary_node_height {
            target.primary_node_height = v;
        }
        if let Some(v) = export.reaction_node_ratio {
            target.reaction_node_ratio = v;
        }
        if let Some(v) = export.secondary_node_ratio {
            target.secondary_node_ratio = v;
        }
        if let Some(v) = export.infer_compartment_bounds {
            target.infer_compartment_bounds = v;
        }
        if let Some(v) = export.layout_id {
            target.layout_id = v;
        }
        if let Some(v) = export.layout_name {
            target.layout_name = v;
        }
        if let Some(v) = export.default_compartment_id {
            target.default_compartment_id = v;
        }
        if let Some(v) = export.default_compartment_name {
            target.default_compartment_name = v;
        }
        if let Some(v) = export.curve_direction {
            target.curve_direction = v;
        }
    }

    if let Some(table) = parsed.compartments {
        if table.replace_defaults.unwrap_or(false) {
            config.compartments = CompartmentTable::empty();
        }
        for (code, name) in table.names.unwrap_or_default() {
            config.compartments.insert(code, name);
        }
        if let Some(excluded) = table.excluded {
            config.compartments.excluded.clear();
            for code in excluded {
                config.compartments.exclude(code);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("pmconv-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_match_reference_sizes() {
        let config = Config::default();
        assert_eq!(config.export.node_size(true), (30.0, 30.0));
        assert_eq!(config.export.reaction_node_size(), (15.0, 15.0));
        assert!((config.export.node_size(false).0 - 20.0).abs() < 1e-9);
        assert_eq!(config.export.curve_direction, CurveDirection::Flow);
        assert_eq!(config.compartments.name("c"), Some("cytosol"));
        assert!(config.compartments.is_excluded("E"));
        assert!(config.compartments.is_excluded("n"));
        assert!(!config.compartments.is_excluded("c"));
    }

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.export.layout_id, "pathway_layout");
    }

    #[test]
    fn merges_overrides() {
        let path = write_temp(
            "config.json",
            r#"{
                "export": { "primaryNodeWidth": 40, "curveDirection": "metabolite_to_reaction" },
                "compartments": { "names": { "c": "cytoplasm" }, "excluded": ["p"] }
            }"#,
        );
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.export.primary_node_width, 40.0);
        assert_eq!(config.export.primary_node_height, 30.0);
        assert_eq!(
            config.export.curve_direction,
            CurveDirection::MetaboliteToReaction
        );
        assert_eq!(config.compartments.name("c"), Some("cytoplasm"));
        assert_eq!(config.compartments.name("m"), Some("mitochondria"));
        assert!(config.compartments.is_excluded("p"));
        assert!(!config.compartments.is_excluded("e"));
    }

    #[test]
    fn accepts_json5_comments() {
        let path = write_temp(
            "config.json5",
            "{\n  // wider boxes\n  export: { labelWidth: 200, },\n}\n",
        );
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.export.label_width, 200.0);
    }
}
