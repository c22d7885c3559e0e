use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::diagnostics::{ConvertError, Diagnostics};
use crate::layout_doc::{LayoutDocument, export_layout, import_layout};
use crate::map_json::{map_from_value, map_to_value};
use crate::model::Map;
use crate::notation::{NotationDocument, export_notation, import_notation};
use crate::topology::linker::link_map;

/// The three interchange formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Map,
    Layout,
    Notation,
}

impl Format {
    /// Guesses the format of a parsed document from its top-level shape.
    pub fn sniff(value: &Value) -> Option<Self> {
        match value {
            Value::Array(_) => Some(Self::Map),
            Value::Object(fields) => {
                if fields.contains_key("speciesGlyphs") || fields.contains_key("reactionGlyphs") {
                    Some(Self::Layout)
                } else if fields.contains_key("glyphs") || fields.contains_key("arcs") {
                    Some(Self::Notation)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// A converted value together with everything noticed while producing it.
#[derive(Debug, Clone)]
pub struct Conversion<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Conversion<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Conversion<U> {
        Conversion {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }
}

/// An exported document in one of the target formats.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Map(Value),
    Layout(LayoutDocument),
    Notation(NotationDocument),
}

impl Document {
    pub fn format(&self) -> Format {
        match self {
            Self::Map(_) => Format::Map,
            Self::Layout(_) => Format::Layout,
            Self::Notation(_) => Format::Notation,
        }
    }

    pub fn to_value(&self) -> Result<Value, ConvertError> {
        Ok(match self {
            Self::Map(value) => value.clone(),
            Self::Layout(document) => serde_json::to_value(document)?,
            Self::Notation(document) => serde_json::to_value(document)?,
        })
    }
}

/// Parses a map document. Merged reactions are already split; the map is not linked.
pub fn read_map(input: &str) -> Result<Conversion<Map>, ConvertError> {
    let mut diagnostics = Diagnostics::new();
    let map = crate::map_json::parse_map(input, &mut diagnostics)?;
    Ok(Conversion { value: map, diagnostics })
}

/// Links `map` and exports it to `target`.
pub fn convert_map(mut map: Map, target: Format, config: &Config) -> Result<Conversion<Document>, ConvertError> {
    let mut diagnostics = Diagnostics::new();
    link_map(&mut map, &mut diagnostics);
    let value = match target {
        Format::Map => Document::Map(map_to_value(&map)?),
        Format::Layout => Document::Layout(export_layout(&map, config, &mut diagnostics)),
        Format::Notation => Document::Notation(export_notation(&map, config, &mut diagnostics)),
    };
    log::debug!("converted map to {target:?} with {} diagnostics", diagnostics.len());
    Ok(Conversion { value, diagnostics })
}

/// Reads a parsed document of format `source` into a linked map.
pub fn import_document(value: Value, source: Format) -> Result<Conversion<Map>, ConvertError> {
    let mut diagnostics = Diagnostics::new();
    let mut map = match source {
        Format::Map => map_from_value(value, &mut diagnostics)?,
        Format::Layout => {
            let document: LayoutDocument = serde_json::from_value(value)?;
            import_layout(&document, &mut diagnostics)?
        }
        Format::Notation => {
            let document: NotationDocument = serde_json::from_value(value)?;
            import_notation(&document, &mut diagnostics)?
        }
    };
    link_map(&mut map, &mut diagnostics);
    Ok(Conversion { value: map, diagnostics })
}

/// Converts one document from text. The source format is sniffed when not given.
pub fn convert(
    input: &str,
    source: Option<Format>,
    target: Format,
    config: &Config,
) -> Result<Conversion<Document>, ConvertError> {
    let value: Value = serde_json::from_str(input)?;
    let source = match source.or_else(|| Format::sniff(&value)) {
        Some(format) => format,
        None => {
            return Err(ConvertError::MalformedDocument(
                "unable to tell the input format".to_string(),
            ));
        }
    };
    let imported = import_document(value, source)?;
    let mut diagnostics = imported.diagnostics;
    let converted = convert_map(imported.value, target, config)?;
    diagnostics.extend(converted.diagnostics);
    Ok(Conversion {
        value: converted.value,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> String {
        json!([
            {"map_name": "sample", "map_id": "m1"},
            {
                "canvas": {"x": 0.0, "y": 0.0, "width": 400.0, "height": 300.0},
                "nodes": {
                    "1": {"node_type": "metabolite", "x": 0.0, "y": 0.0, "bigg_id": "glc__D_c", "name": "glucose"},
                    "2": {"node_type": "metabolite", "x": 200.0, "y": 0.0, "bigg_id": "g6p_c"},
                    "3": {"node_type": "midmarker", "x": 100.0, "y": 0.0}
                },
                "reactions": {
                    "10": {
                        "bigg_id": "HEX1",
                        "reversibility": false,
                        "metabolites": [
                            {"bigg_id": "glc__D_c", "coefficient": -1},
                            {"bigg_id": "g6p_c", "coefficient": 1}
                        ],
                        "segments": {
                            "a": {"from_node_id": "3", "to_node_id": "1"},
                            "b": {"from_node_id": "2", "to_node_id": "3"}
                        }
                    }
                },
                "text_labels": {}
            }
        ])
        .to_string()
    }

    #[test]
    fn sniffs_formats() {
        assert_eq!(Format::sniff(&json!([{}, {}])), Some(Format::Map));
        assert_eq!(Format::sniff(&json!({"reactionGlyphs": []})), Some(Format::Layout));
        assert_eq!(Format::sniff(&json!({"glyphs": [], "arcs": []})), Some(Format::Notation));
        assert_eq!(Format::sniff(&json!("text")), None);
    }

    #[test]
    fn converts_map_to_layout() {
        let converted = convert(&sample(), None, Format::Layout, &Config::default()).unwrap();
        assert!(!converted.diagnostics.has_errors(), "{:?}", converted.diagnostics);
        let Document::Layout(layout) = converted.value else {
            panic!("expected a layout document");
        };
        assert_eq!(layout.species_glyphs.len(), 2);
        assert_eq!(layout.reaction_glyphs[0].reaction, "HEX1");
    }

    #[test]
    fn read_map_leaves_map_unlinked() {
        let read = read_map(&sample()).unwrap();
        let node = read.value.node("1").unwrap();
        assert!(node.connected_segments("10").is_empty());
        let converted = convert_map(read.value, Format::Map, &Config::default()).unwrap();
        assert_eq!(converted.value.format(), Format::Map);
    }

    #[test]
    fn rejects_unknown_documents() {
        assert!(matches!(
            convert("{}", None, Format::Map, &Config::default()),
            Err(ConvertError::MalformedDocument(_))
        ));
        assert!(matches!(
            convert("[1, 2", Some(Format::Map), Format::Map, &Config::default()),
            Err(ConvertError::Json(_))
        ));
    }
}
