use std::collections::BTreeSet;

use crate::config::CompartmentTable;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{Compartment, Map};

/// Creates a compartment for every metabolite compartment code the map does
/// not define yet and grows it over the nodes carrying that code.
///
/// The box starts at the first node (by id) with zero extent. A later node
/// left of or above the origin moves the origin; one beyond the far edge sets
/// the extent to its absolute coordinate. Compartments that already existed are
/// left alone. Returns the ids of the created compartments.
pub fn infer_compartments(
    map: &mut Map,
    table: &CompartmentTable,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let mut placements = Vec::new();
    for node in map.nodes().filter(|node| node.is_metabolite()) {
        match node.compartment() {
            Some(code) => placements.push((code, node.x, node.y)),
            None => {
                if let Some(external_id) = &node.external_id {
                    diagnostics.push(Diagnostic::InvalidCompartmentId(external_id.clone()));
                }
            }
        }
    }

    let mut created: BTreeSet<String> = BTreeSet::new();
    for (code, x, y) in placements {
        if !created.contains(&code) {
            if map.compartment(&code).is_some() {
                continue;
            }
            map.add_compartment(Compartment {
                id: code.clone(),
                name: table.name(&code).map(String::from),
                x,
                y,
                width: 0.0,
                height: 0.0,
            });
            log::debug!("inferred compartment {code}");
            created.insert(code);
            continue;
        }
        let Some(compartment) = map.compartment_mut(&code) else {
            continue;
        };
        if x < compartment.x {
            compartment.x = x;
        } else if x > compartment.x + compartment.width {
            compartment.width = x;
        }
        if y < compartment.y {
            compartment.y = y;
        } else if y > compartment.y + compartment.height {
            compartment.height = y;
        }
    }
    created.into_iter().collect()
}
