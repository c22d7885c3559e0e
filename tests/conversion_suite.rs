use std::path::Path;

use pathmap_converter::config::Config;
use pathmap_converter::layout_doc::SpeciesRole;
use pathmap_converter::model::{Point, Reaction};
use pathmap_converter::pipeline::{Document, Format, convert, convert_map, import_document, read_map};
use pathmap_converter::{Diagnostic, Map};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("fixture {name}: {err}"))
}

fn linked(name: &str) -> Map {
    let value = serde_json::from_str(&fixture(name)).expect("fixture is not JSON");
    import_document(value, Format::Map).expect("import failed").value
}

fn participants(reaction: &Reaction) -> Vec<(String, Option<f64>)> {
    let mut list: Vec<_> = reaction
        .metabolites()
        .map(|m| (m.external_id.clone(), m.coefficient))
        .collect();
    list.sort_by(|a, b| a.0.cmp(&b.0));
    list
}

fn coefficients(reaction: &Reaction) -> Vec<f64> {
    let mut list: Vec<f64> = reaction.metabolites().filter_map(|m| m.coefficient).collect();
    list.sort_by(f64::total_cmp);
    list
}

fn only_reaction(map: &Map) -> &Reaction {
    assert_eq!(map.reaction_count(), 1);
    map.reactions().next().unwrap()
}

#[test]
fn map_layout_map_round_trip() {
    let original = linked("hexokinase.json");
    let exported = convert_map(original.clone(), Format::Layout, &Config::default()).unwrap();
    assert!(exported.diagnostics.is_empty(), "{:?}", exported.diagnostics);
    let value = exported.value.to_value().unwrap();

    // The canvas starts at (-50, -50), so everything moves by (+50, +50).
    let Document::Layout(layout) = &exported.value else {
        panic!("expected a layout document");
    };
    let glucose = layout.species_glyphs.iter().find(|g| g.id == "sg_1").unwrap();
    assert_eq!(glucose.bounding_box.centre(), Point::new(50.0, 150.0));
    let curve = &layout.reaction_glyphs[0]
        .species_reference_glyphs
        .iter()
        .find(|r| r.species == "glc__D_c")
        .unwrap()
        .curve;
    assert_eq!(curve.start(), Some(Point::new(50.0, 150.0)));
    assert_eq!(curve.end(), Some(Point::new(250.0, 150.0)));
    let title = layout.text_glyphs.iter().find(|g| g.id == "tg_t1").unwrap();
    assert_eq!((title.bounding_box.x, title.bounding_box.y + title.bounding_box.height), (50.0, 50.0));

    let imported = import_document(value, Format::Layout).unwrap();
    assert!(!imported.diagnostics.has_errors(), "{:?}", imported.diagnostics);
    let before = only_reaction(&original);
    let after = only_reaction(&imported.value);
    assert_eq!(after.external_id.as_deref(), Some("HEX1"));
    assert_eq!(participants(after), participants(before));
    assert_eq!(after.segment_count(), before.segment_count());

    for segment in after.segments() {
        assert!(imported.value.node(&segment.from_node_id).is_some());
        assert!(imported.value.node(&segment.to_node_id).is_some());
    }

    let position = |id: &str| imported.value.node(id).unwrap().position();
    assert_eq!(position("sg_1"), Point::new(50.0, 150.0));
    assert_eq!(position("sg_2"), Point::new(450.0, 150.0));
    assert_eq!(position("rg_10"), Point::new(250.0, 150.0));
    let title = imported.value.text_label("tg_t1").unwrap();
    assert_eq!((title.x, title.y), (50.0, 50.0));
}

#[test]
fn layout_marks_side_metabolites() {
    let converted = convert(&fixture("hexokinase.json"), None, Format::Layout, &Config::default()).unwrap();
    let Document::Layout(layout) = converted.value else {
        panic!("expected a layout document");
    };
    assert_eq!(layout.species_glyphs.len(), 5);
    let free_text = layout
        .text_glyphs
        .iter()
        .filter(|g| g.graphical_object.is_none())
        .count();
    assert_eq!(free_text, 1);
    let reaction_label = layout
        .text_glyphs
        .iter()
        .find(|g| g.graphical_object.as_deref() == Some("rg_10"))
        .unwrap();
    assert_eq!(reaction_label.text, "hexokinase (D-glucose:ATP)");
    let glyph = &layout.reaction_glyphs[0];
    let role_of = |species: &str| {
        glyph
            .species_reference_glyphs
            .iter()
            .find(|r| r.species == species)
            .map(|r| r.role)
    };
    assert_eq!(role_of("glc__D_c"), Some(SpeciesRole::Substrate));
    assert_eq!(role_of("atp_c"), Some(SpeciesRole::Sidesubstrate));
    assert_eq!(role_of("h_c"), Some(SpeciesRole::Sideproduct));
}

#[test]
fn map_notation_map_keeps_stoichiometry() {
    let original = linked("hexokinase.json");
    let exported = convert_map(original.clone(), Format::Notation, &Config::default()).unwrap();
    let Document::Notation(notation) = &exported.value else {
        panic!("expected a notation document");
    };
    assert_eq!(notation.arcs.len(), 5);
    let chemical = notation.glyphs.iter().find(|g| g.id == "sc_1").unwrap();
    assert_eq!(chemical.bbox.centre(), Point::new(50.0, 150.0));
    let consumption = notation.arcs.iter().find(|a| a.id == "r10_n1").unwrap();
    assert_eq!(consumption.start, Point::new(50.0, 150.0));
    assert_eq!(consumption.curve().end(), Some(Point::new(250.0, 150.0)));
    let title = notation.glyphs.iter().find(|g| g.id == "an_t1").unwrap();
    assert_eq!((title.bbox.x, title.bbox.y), (50.0, 50.0));

    let imported = import_document(exported.value.to_value().unwrap(), Format::Notation).unwrap();
    assert!(!imported.diagnostics.has_errors(), "{:?}", imported.diagnostics);
    let before = only_reaction(&original);
    let after = only_reaction(&imported.value);
    assert_eq!(coefficients(after), coefficients(before));
    assert_eq!(after.segment_count(), before.segment_count());
    assert_eq!(imported.value.node("sc_1").unwrap().position(), Point::new(50.0, 150.0));
    assert_eq!(imported.value.node("pr_10").unwrap().position(), Point::new(250.0, 150.0));
}

#[test]
fn merged_reaction_is_split_per_midmarker() {
    let read = read_map(&fixture("merged.json")).unwrap();
    let map = read.value;
    assert_eq!(map.reaction_ids(), ["20_1", "20_2"]);
    for reaction in map.reactions() {
        assert_eq!(reaction.external_id.as_deref(), Some("LDH_D"));
        assert_eq!(reaction.metabolite_count(), 2);
    }
    assert_eq!(map.reaction("20_2").unwrap().segment_count(), 3);
    assert!(read.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::UnreachableParticipant { participant, .. } if participant == "nadh_c"
    )));

    let converted = convert_map(map, Format::Layout, &Config::default()).unwrap();
    let Document::Layout(layout) = converted.value else {
        panic!("expected a layout document");
    };
    assert_eq!(layout.reaction_glyphs.len(), 2);
}

#[test]
fn lost_segment_is_reported_not_dropped_silently() {
    let converted = convert(&fixture("lost_segment.json"), Some(Format::Map), Format::Layout, &Config::default())
        .unwrap();
    let lost: Vec<&Diagnostic> = converted
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::LostSegments { .. }))
        .collect();
    assert_eq!(lost.len(), 1);
    match lost[0] {
        Diagnostic::LostSegments { reaction, segments } => {
            assert_eq!(reaction, "30");
            assert_eq!(segments, &["2".to_string()]);
        }
        other => panic!("unexpected diagnostic {other:?}"),
    }
    let Document::Layout(layout) = converted.value else {
        panic!("expected a layout document");
    };
    assert_eq!(layout.reaction_glyphs.len(), 1);
    assert_eq!(layout.reaction_glyphs[0].species_reference_glyphs.len(), 2);
}

#[test]
fn imports_layout_document() {
    let converted = convert(&fixture("pgi.layout.json"), None, Format::Map, &Config::default()).unwrap();
    assert!(!converted.diagnostics.has_errors(), "{:?}", converted.diagnostics);
    let Document::Map(value) = converted.value else {
        panic!("expected a map document");
    };
    let reaction = &value[1]["reactions"]["rg_pgi"];
    assert_eq!(reaction["bigg_id"], "PGI");
    assert_eq!(reaction["reversibility"], true);
    assert_eq!(reaction["segments"].as_object().unwrap().len(), 3);
    assert_eq!(value[1]["nodes"]["srg_g6p.M1"]["node_type"], "multimarker");
    assert_eq!(value[1]["text_labels"]["tg_title"]["text"], "Upper glycolysis");
}

#[test]
fn imports_notation_document() {
    let value = serde_json::from_str(&fixture("tpi.notation.json")).unwrap();
    let imported = import_document(value, Format::Notation).unwrap();
    let map = &imported.value;
    assert_eq!(map.reaction_count(), 2);
    assert_eq!(map.reaction("p2").unwrap().name.as_deref(), Some("R1"));

    let tpi = map.reaction("p1").unwrap();
    assert_eq!(tpi.metabolite("dhap_c").unwrap().coefficient, Some(-1.0));
    assert_eq!(tpi.metabolite("g3p_c").unwrap().coefficient, Some(2.0));
    assert_eq!(tpi.segment_count(), 3);
    let joint = map.node("a2.M1").unwrap();
    assert!(joint.is_multimarker());
    assert_eq!((joint.x, joint.y), (140.0, 100.0));

    let skipped = imported
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::Skipped { .. }))
        .count();
    assert_eq!(skipped, 2);
}

#[test]
fn inferred_compartments_skip_excluded_codes() {
    let mut config = Config::default();
    config.export.infer_compartment_bounds = true;
    let converted = convert(&fixture("hexokinase.json"), None, Format::Layout, &config).unwrap();
    let Document::Layout(layout) = converted.value else {
        panic!("expected a layout document");
    };
    let ids: Vec<&str> = layout
        .compartment_glyphs
        .iter()
        .map(|g| g.compartment.as_str())
        .collect();
    assert_eq!(ids, ["c"]);
}

#[test]
fn malformed_container_is_fatal() {
    let result = convert("[{}]", Some(Format::Map), Format::Layout, &Config::default());
    assert!(matches!(
        result,
        Err(pathmap_converter::ConvertError::MalformedContainer(_))
    ));
}
