use super::dreiding::{bond_length, ForceFieldParams, TypedAtom};
use super::error::StructureError;
use super::stereo::{point, ChiralCenter, DoubleBondStereo};
use crate::sanitize::MoleculeGraph;
use crate::valence::check_valence;

/// Bond lengths must stay within this factor window of their ideal value.
const BOND_WINDOW: (f64, f64) = (0.7, 1.3);

/// Check a minimized structure before it is handed out.
pub fn validate(
    graph: &MoleculeGraph,
    types: &[TypedAtom],
    params: &ForceFieldParams,
    coords: &[f64],
    chiral: &[ChiralCenter],
    double_bonds: &[DoubleBondStereo],
) -> Result<(), StructureError> {
    let fail = StructureError::OptimizationFailure;

    if coords.len() != 3 * graph.atom_count() || coords.iter().any(|c| !c.is_finite()) {
        return Err(fail("non-finite or missing coordinates".to_owned()));
    }
    check_valence(graph.mol()).map_err(|e| fail(format!("valence changed: {e}")))?;

    let mol = graph.mol();
    for e in mol.bonds() {
        let Some((a, b)) = mol.bond_endpoints(e) else {
            continue;
        };
        let (i, j) = (a.index(), b.index());
        let r0 = bond_length(types, params, i, j);
        let r = (point(coords, i) - point(coords, j)).norm();
        if r < BOND_WINDOW.0 * r0 || r > BOND_WINDOW.1 * r0 {
            return Err(fail(format!(
                "bond {i}-{j} is {r:.3} Å, expected about {r0:.3} Å"
            )));
        }
    }

    if let Some(c) = chiral.iter().find(|c| !c.is_satisfied(coords)) {
        return Err(fail(format!("stereocenter {} was inverted", c.center)));
    }
    if let Some(db) = double_bonds.iter().find(|db| !db.is_satisfied(coords)) {
        return Err(fail(format!(
            "double bond {}={} lost its {} geometry",
            db.atoms[1],
            db.atoms[2],
            if db.cis { "Z" } else { "E" }
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformer::dreiding::{assign_types, default_parameters};
    use crate::conformer::stereo::double_bond_stereo;

    fn setup(smiles: &str) -> (MoleculeGraph, Vec<TypedAtom>) {
        let graph = MoleculeGraph::from_smiles(smiles).unwrap().with_hydrogens();
        let types = assign_types(&graph, default_parameters().unwrap());
        (graph, types)
    }

    #[test]
    fn stretched_bond_is_rejected() {
        let (graph, types) = setup("[H][H]");
        let params = default_parameters().unwrap();
        assert!(validate(&graph, &types, params, &[0.0, 0.0, 0.0, 0.65, 0.0, 0.0], &[], &[]).is_ok());
        let err = validate(&graph, &types, params, &[0.0, 0.0, 0.0, 2.0, 0.0, 0.0], &[], &[]).unwrap_err();
        assert!(matches!(err, StructureError::OptimizationFailure(_)));
    }

    #[test]
    fn wrong_double_bond_geometry_is_rejected() {
        let (graph, types) = setup("F/C=C/F");
        let params = default_parameters().unwrap();
        let db = double_bond_stereo(&graph);
        // F0 C1 C2 F3 H4 H5 laid out cis (Z) while E was requested.
        let coords = [
            -0.64, 1.10, 0.0, // F
            0.0, 0.0, 0.0, // C
            1.33, 0.0, 0.0, // C
            1.97, 1.10, 0.0, // F
            -0.55, -0.95, 0.0, // H
            1.88, -0.95, 0.0, // H
        ];
        let err = validate(&graph, &types, params, &coords, &[], &db).unwrap_err();
        assert!(err.to_string().contains("E geometry"));
    }

    #[test]
    fn missing_coordinates_are_rejected() {
        let (graph, types) = setup("CC");
        assert!(validate(&graph, &types, default_parameters().unwrap(), &[0.0; 6], &[], &[]).is_err());
    }
}
