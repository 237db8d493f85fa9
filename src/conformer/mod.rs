//! 3D structure generation.
//!
//! [`generate`] takes a sanitized molecule through hydrogen addition,
//! distance-geometry embedding, DREIDING minimization and a final
//! geometry check. Results are deterministic for a given molecule and
//! seed.

mod bounds;
mod dreiding;
mod embed;
mod error;
mod forcefield;
mod minimize;
mod stereo;
mod validate;

pub use dreiding::{
    assign_types, default_parameters, load_parameters, AtomTypeParams, ForceFieldParams, Geometry,
    TypedAtom,
};
pub use embed::graph_seed;
pub use error::StructureError;
pub use forcefield::ForceField;
pub use minimize::{
    lbfgs, steepest_descent, MinimizeOutcome, MinimizerSettings, NonFiniteError, Objective,
};

use tracing::{debug, info, instrument, warn};

use crate::config::ConformerConfig;
use crate::molfile::write_mol_block;
use crate::sanitize::MoleculeGraph;

/// A hydrogen-complete molecule with optimized coordinates.
#[derive(Debug, Clone)]
pub struct Conformer3D {
    graph: MoleculeGraph,
    positions: Vec<[f64; 3]>,
    energy: f64,
    iterations: u32,
    seed: u64,
    optimization_converged: bool,
}

impl Conformer3D {
    pub fn graph(&self) -> &MoleculeGraph {
        &self.graph
    }

    /// One position per atom of [`Conformer3D::graph`], in Å.
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// Final force field energy, kcal/mol.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn optimization_converged(&self) -> bool {
        self.optimization_converged
    }

    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }

    /// V2000 MOL block titled with the input SMILES.
    pub fn to_mol_block(&self) -> String {
        write_mol_block(self.graph.mol(), &self.positions, self.graph.smiles())
    }
}

/// Parse `smiles` and generate a conformer for it.
pub fn build_3d(smiles: &str, config: &ConformerConfig) -> Result<Conformer3D, StructureError> {
    let graph = MoleculeGraph::from_smiles(smiles)?;
    generate(&graph, config)
}

/// Generate a conformer for an already sanitized molecule.
#[instrument(skip_all, fields(smiles = %graph.smiles()))]
pub fn generate(graph: &MoleculeGraph, config: &ConformerConfig) -> Result<Conformer3D, StructureError> {
    let fragments = graph.mol().fragments().len();
    if fragments > 1 {
        return Err(StructureError::EmbeddingFailure(format!(
            "molecule has {fragments} disconnected fragments"
        )));
    }

    let params = default_parameters()?;
    let full = graph.with_hydrogens();
    let types = assign_types(&full, params);
    let topo = bounds::topological_distances(&full);
    let chiral = stereo::chiral_centers(&full);
    let double_bonds = stereo::double_bond_stereo(&full);

    let seed = config.seed.unwrap_or_else(|| graph_seed(graph));
    let distance_bounds = embed::smoothed_bounds(&full, &types, params, &topo)?;

    let ff = ForceField::new(&full, &types, params, &topo).with_chiral_restraints(&chiral);
    debug!(terms = ?ff.term_counts(), restraints = ff.restraint_count(), "force field assembled");
    let settings = MinimizerSettings {
        max_iterations: config.max_iterations,
        gradient_tolerance: config.gradient_tolerance,
        energy_tolerance: config.energy_tolerance,
        max_step: 0.2,
    };

    // A rejected structure is re-embedded from the next unused seed.
    let attempts = config.max_embed_attempts.max(1);
    let mut next_seed = seed;
    let mut rejection = None;
    for _ in 0..attempts {
        let embedding = embed::embed(&distance_bounds, &chiral, next_seed, attempts)?;
        next_seed = embedding.seed.wrapping_add(1);
        let mut coords = embedding.coords;
        let outcome = lbfgs(&ff, &mut coords, &settings)
            .map_err(|e| StructureError::OptimizationFailure(e.to_string()))?;

        if let Err(e) = validate::validate(&full, &types, params, &coords, &chiral, &double_bonds) {
            warn!(seed = embedding.seed, error = %e, "minimized structure rejected");
            rejection = Some(e);
            continue;
        }

        info!(
            atoms = full.atom_count(),
            energy = outcome.energy,
            iterations = outcome.iterations,
            converged = outcome.converged,
            "conformer generated"
        );
        return Ok(Conformer3D {
            positions: coords.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
            graph: full,
            energy: outcome.energy,
            iterations: outcome.iterations,
            seed: embedding.seed,
            optimization_converged: outcome.converged,
        });
    }
    Err(rejection.unwrap_or_else(|| {
        StructureError::OptimizationFailure(format!("no acceptable structure after {attempts} attempts"))
    }))
}
