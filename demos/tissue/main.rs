//! Tissue demo: builds a two-cell sheet, runs a few edits, and evaluates
//! the constraint actors.
//!
//! ```text
//! cargo run --example tissue
//! ```
//!
//! Override log verbosity with `RUST_LOG` (e.g. `RUST_LOG=cytomesh=debug`).

use std::cell::Cell;
use std::rc::Rc;

use cytomesh::actors::{ActorOwner, ConstraintActor, ConvexPolygonConstraint, SurfaceAreaConstraint};
use cytomesh::math::Point3;
use cytomesh::mesh::{BodyClass, MeshTag, SurfaceClass};
use cytomesh::ops::{ExtrudeBody, InsertVertex, MakeStructure, MakeSurface};
use cytomesh::mesh::StructureParent;
use cytomesh::solver::{MeshEvent, MeshSolver};
use cytomesh::Mesh;

/// Counts notifications, standing in for a force/energy aggregation solver.
#[derive(Default)]
struct CountingSolver {
    events: Cell<usize>,
    position_changes: Cell<usize>,
}

impl MeshSolver for CountingSolver {
    fn log(&self, _mesh: MeshTag, event: MeshEvent) {
        self.events.set(self.events.get() + 1);
        tracing::debug!(?event.kind, operation = ?event.operation, "mesh change");
    }

    fn set_dirty(&self, _dirty: bool) {}

    fn position_changed(&self) {
        self.position_changes.set(self.position_changes.get() + 1);
    }
}

fn p(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

fn main() -> cytomesh::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut mesh = Mesh::default();
    let solver = Rc::new(CountingSolver::default());
    mesh.attach_solver(solver.clone());

    // Two cells extruded from neighboring base squares.
    let membrane = SurfaceClass::new("membrane");
    let cell_class = BodyClass::new("cell");
    let base_a = MakeSurface::new(
        membrane.clone(),
        vec![
            p(0.0, 0.0, 0.0).into(),
            p(1.0, 0.0, 0.0).into(),
            p(1.0, 1.0, 0.0).into(),
            p(0.0, 1.0, 0.0).into(),
        ],
    )
    .execute(&mut mesh)?;
    let shared_edge = mesh.surface(base_a)?.vertices().to_vec();
    let base_b = MakeSurface::new(
        membrane,
        vec![
            shared_edge[1].into(),
            p(2.0, 0.0, 0.0).into(),
            p(2.0, 1.0, 0.0).into(),
            shared_edge[2].into(),
        ],
    )
    .execute(&mut mesh)?;

    let cell_a = ExtrudeBody::new(base_a, cell_class.clone(), 1.0).execute(&mut mesh)?;
    let cell_b = ExtrudeBody::new(base_b, cell_class, 1.0).execute(&mut mesh)?;
    let tissue = MakeStructure::new(vec![
        StructureParent::Body(cell_a),
        StructureParent::Body(cell_b),
    ])
    .execute(&mut mesh)?;

    // Refine one membrane edge.
    let boundary = mesh.surface(base_a)?.vertices().to_vec();
    InsertVertex::new(p(0.5, 0.0, 0.0), boundary[0], boundary[1]).execute(&mut mesh)?;

    tracing::info!(
        vertices = mesh.vertex_count(),
        surfaces = mesh.surface_count(),
        bodies = mesh.body_count(),
        structures = mesh.structure_count(),
        "tissue assembled"
    );

    // Evaluate the actors the way a solver pass would.
    let area_actor = SurfaceAreaConstraint::new(2.0, 5.5);
    let convex_actor = ConvexPolygonConstraint::new(1.0);
    for body in [cell_a, cell_b] {
        let mut energy = 0.0;
        for s in mesh.body(body)?.surfaces().to_vec() {
            for v in mesh.surface(s)?.vertices().to_vec() {
                energy += convex_actor.energy(&mesh, ActorOwner::Surface(s), v)?;
            }
        }
        let first_vertex = mesh
            .surface(mesh.body(body)?.surfaces()[0])?
            .vertices()[0];
        energy += area_actor.energy(&mesh, ActorOwner::Body(body), first_vertex)?;
        let force = area_actor.force(&mesh, ActorOwner::Body(body), first_vertex)?;
        tracing::info!(
            body = %body,
            area = mesh.body_area(body)?,
            volume = mesh.body_volume(body)?,
            energy,
            force = ?force,
            "cell state"
        );
    }

    mesh.validate()?;
    tracing::info!(
        structure = %tissue,
        notifications = solver.events.get(),
        position_changes = solver.position_changes.get(),
        "done"
    );
    Ok(())
}
