use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pathmap_converter::config::Config;
use pathmap_converter::diagnostics::Diagnostics;
use pathmap_converter::map_json::parse_map;
use pathmap_converter::pipeline::{Format, convert};
use pathmap_converter::topology::{CurveDirection, link_map, stitch_reaction};
use serde_json::{Map as JsonObject, Value, json};
use std::hint::black_box;

/// A linear pathway of `reactions` steps. Every participant reaches the
/// midmarker through `joints` multimarkers.
fn pathway_source(reactions: usize, joints: usize) -> String {
    let mut nodes = JsonObject::new();
    let mut entries = JsonObject::new();
    for step in 0..=reactions {
        nodes.insert(
            format!("met{step}"),
            json!({"node_type": "metabolite", "x": step as f64 * 300.0, "y": 0.0, "bigg_id": format!("m{step}_c")}),
        );
    }
    for step in 0..reactions {
        let x0 = step as f64 * 300.0;
        let mid = format!("mid{step}");
        nodes.insert(mid.clone(), json!({"node_type": "midmarker", "x": x0 + 150.0, "y": 0.0}));

        let mut segments: Vec<(String, Value)> = Vec::new();
        for (side, metabolite, sign) in [("a", step, -1.0), ("b", step + 1, 1.0)] {
            let mut previous = format!("met{metabolite}");
            for joint in 0..joints {
                let id = format!("j{step}{side}{joint}");
                let offset = (joint + 1) as f64 * 150.0 / (joints + 1) as f64;
                let x = if sign < 0.0 { x0 + offset } else { x0 + 300.0 - offset };
                nodes.insert(id.clone(), json!({"node_type": "multimarker", "x": x, "y": 20.0}));
                segments.push((
                    format!("s{step}{side}{joint}"),
                    json!({"from_node_id": previous, "to_node_id": id}),
                ));
                previous = id;
            }
            segments.push((
                format!("s{step}{side}x"),
                json!({"from_node_id": mid, "to_node_id": previous}),
            ));
        }
        let segments: JsonObject<String, Value> = segments.into_iter().collect();

        entries.insert(
            format!("r{step}"),
            json!({
                "bigg_id": format!("STEP{step}"),
                "reversibility": false,
                "metabolites": [
                    {"bigg_id": format!("m{step}_c"), "coefficient": -1},
                    {"bigg_id": format!("m{}_c", step + 1), "coefficient": 1}
                ],
                "segments": segments
            }),
        );
    }
    json!([
        {"map_name": "synthetic pathway"},
        {"nodes": nodes, "reactions": entries, "text_labels": {}}
    ])
    .to_string()
}

const SIZES: [(usize, usize); 4] = [(10, 1), (100, 2), (500, 4), (1000, 8)];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (reactions, joints) in SIZES {
        let input = pathway_source(reactions, joints);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{reactions}x{joints}")),
            &input,
            |b, data| {
                b.iter(|| {
                    let map = parse_map(black_box(data), &mut Diagnostics::new()).expect("parse failed");
                    black_box(map.reaction_count());
                });
            },
        );
    }
    group.finish();
}

fn bench_link_and_stitch(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_stitch");
    for (reactions, joints) in SIZES {
        let map = parse_map(&pathway_source(reactions, joints), &mut Diagnostics::new())
            .expect("parse failed");
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{reactions}x{joints}")),
            &map,
            |b, map| {
                b.iter(|| {
                    let mut map = map.clone();
                    let mut diagnostics = Diagnostics::new();
                    link_map(&mut map, &mut diagnostics);
                    let mut hops = 0usize;
                    for id in map.reaction_ids() {
                        let curves = stitch_reaction(&map, &id, CurveDirection::Flow, &mut diagnostics)
                            .expect("stitch failed");
                        hops += curves.curves.iter().map(|c| c.curve.len()).sum::<usize>();
                    }
                    black_box(hops);
                });
            },
        );
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    for (reactions, joints) in SIZES {
        let input = pathway_source(reactions, joints);
        for target in [Format::Layout, Format::Notation] {
            group.bench_with_input(
                BenchmarkId::new(format!("{target:?}"), format!("{reactions}x{joints}")),
                &input,
                |b, data| {
                    b.iter(|| {
                        let converted = convert(black_box(data), Some(Format::Map), target, &config)
                            .expect("convert failed");
                        black_box(converted.diagnostics.len());
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_link_and_stitch, bench_end_to_end
);
criterion_main!(benches);
