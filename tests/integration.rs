use topoblend_engine::geom::{NurbsCurve3, NurbsSurface, Polyline3, OutputMesh, Point3, Tolerance, Vec3};
use topoblend_engine::structure::{Coord, CurvePath, Link, Node, NodeId, NodeKind};
use topoblend_engine::synth::sampler::{cylinder_resampling, plane_resampling};
use topoblend_engine::synth::stitch::{MeshBuilder, add_cylinder_faces, add_plane_faces};
use topoblend_engine::synth::{
    RayCast, RayCaster, ReferenceSurface, ResampleOptions, Resampling, SamplerOptions,
    SpatialIndex, SynthError, resample_node,
};
use topoblend_engine::{BlendRequest, Engine, EngineError, NodeDescription};

fn box_mesh(min: [f64; 3], max: [f64; 3]) -> OutputMesh {
    let positions = (0..8)
        .map(|i| {
            [
                if i & 1 == 0 { min[0] } else { max[0] },
                if i & 2 == 0 { min[1] } else { max[1] },
                if i & 4 == 0 { min[2] } else { max[2] },
            ]
        })
        .collect();
    let indices = vec![
        0, 2, 3, 0, 3, 1, 4, 5, 7, 4, 7, 6, 0, 1, 5, 0, 5, 4, 2, 6, 7, 2, 7, 3, 0, 4, 6, 0, 6,
        2, 1, 3, 7, 1, 7, 5,
    ];
    OutputMesh::new(positions, indices)
}

fn curve_node(id: usize) -> Node {
    let curve = NurbsCurve3::clamped(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 2.0),
        ],
        2,
    )
    .expect("curve");
    Node::curve(id, CurvePath::Nurbs(curve))
}

fn sheet_node(id: usize) -> Node {
    let surface = NurbsSurface::bilinear(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
        Point3::new(2.0, 2.0, 0.0),
    )
    .expect("sheet");
    Node::sheet(id, surface)
}

fn narrow_tube(id: usize) -> NodeDescription {
    NodeDescription {
        node: curve_node(id),
        surface: box_mesh([-1.0, -1.0, -1.0], [1.0, 1.0, 3.0]),
    }
}

fn wide_tube(id: usize) -> NodeDescription {
    NodeDescription {
        node: curve_node(id),
        surface: box_mesh([-2.0, -2.0, -1.0], [2.0, 2.0, 3.0]),
    }
}

fn index_of(mesh: &OutputMesh) -> SpatialIndex {
    SpatialIndex::build(ReferenceSurface::from_mesh(mesh.clone()).expect("surface"))
        .expect("index")
}

fn options() -> ResampleOptions {
    ResampleOptions {
        time_res: 6,
        theta_res: 10,
        phi_res: 4,
        u_res: 5,
        v_res: 4,
        ..ResampleOptions::default()
    }
}

fn cylinder_of(resampling: &Resampling) -> Vec<Point3> {
    match resampling {
        Resampling::Curve(curve) => curve.cylinder.positions().collect(),
        Resampling::Sheet(_) => panic!("expected a curve"),
    }
}

fn loaded_engine() -> Engine {
    let mut engine = Engine::new();
    engine.insert_node(narrow_tube(0)).expect("narrow");
    engine.insert_node(wide_tube(1)).expect("wide");
    engine.set_resample_options(Some(options()));
    engine
}

#[test]
fn engine_initializes() {
    let engine = Engine::new();
    assert!(engine.is_initialized());
    assert!(engine.node_info().is_empty());
}

#[test]
fn cylinder_samples_stay_inside_the_reference_bounds() {
    let surface = box_mesh([-1.0, -1.0, -1.0], [1.0, 1.0, 3.0]);
    let index = index_of(&surface);
    let caster = RayCaster::new(&index);
    let node = curve_node(0);
    let NodeKind::Curve(curve) = &node.kind else {
        panic!("expected a curve");
    };

    for (time_res, theta_res) in [(2, 3), (4, 7), (9, 16)] {
        let sampling = cylinder_resampling(
            &curve.path,
            Vec3::X,
            time_res,
            theta_res,
            std::f64::consts::TAU,
            &caster,
            false,
            &SamplerOptions::default(),
        )
        .expect("cylinder");
        assert_eq!(sampling.grid.len(), time_res * theta_res);
        let bounds = surface.bbox().expect("bounds").expand_by(1e-9);
        assert!(sampling.grid.positions().all(|p| bounds.contains_point(p)));

        // Full-circle rings close up: only the first and last ring are open.
        let mut builder = MeshBuilder::new();
        add_cylinder_faces(&sampling.grid, &mut builder, true).expect("faces");
        let diagnostics = builder.finish().diagnostics(Tolerance::default_geom());
        assert_eq!(diagnostics.open_edge_count, 2 * theta_res);
        assert_eq!(diagnostics.non_manifold_edge_count, 0);
    }
}

#[test]
fn blend_endpoints_reproduce_each_resampling() {
    let engine = loaded_engine();
    let narrow = narrow_tube(0);
    let wide = wide_tube(1);
    let ra = resample_node(&narrow.node, &RayCaster::new(&index_of(&narrow.surface)), &options())
        .expect("a");
    let rb = resample_node(&wide.node, &RayCaster::new(&index_of(&wide.surface)), &options())
        .expect("b");

    let at_zero = engine.blend_by_id(NodeId::new(0), NodeId::new(1), 0.0).expect("t = 0");
    let at_one = engine.blend_by_id(NodeId::new(0), NodeId::new(1), 1.0).expect("t = 1");

    let tol = Tolerance::LOOSE;
    for (expected, mesh) in [(cylinder_of(&ra), &at_zero), (cylinder_of(&rb), &at_one)] {
        for (i, p) in expected.iter().enumerate() {
            let got = mesh.position(i).expect("vertex");
            assert!(tol.approx_eq_point3(*p, got), "vertex {i}: {got:?} vs {p:?}");
        }
    }
}

#[test]
fn blend_moves_vertices_along_straight_segments() {
    let engine = loaded_engine();
    let (a, b) = (NodeId::new(0), NodeId::new(1));
    let start = engine.blend_by_id(a, b, 0.0).expect("start");
    let end = engine.blend_by_id(a, b, 1.0).expect("end");

    for t in [0.25, 0.6] {
        let mesh = engine.blend_by_id(a, b, t).expect("blend");
        assert_eq!(mesh.indices, start.indices);
        for i in 0..mesh.vertex_count() {
            let p0 = start.position(i).expect("p0");
            let p1 = end.position(i).expect("p1");
            let expected = p0.lerp(p1, t);
            assert!(Tolerance::LOOSE.approx_eq_point3(mesh.position(i).expect("p"), expected));
        }
    }
}

#[test]
fn blended_curves_form_a_closed_outward_solid() {
    let request = BlendRequest {
        a: narrow_tube(0),
        b: wide_tube(1),
        t: 0.5,
        options: None,
    };
    let mesh = request.run().expect("blend");
    assert!(mesh.validate().is_ok());
    let diagnostics = mesh.diagnostics(Tolerance::default_geom());
    assert!(diagnostics.is_outward_solid(), "{diagnostics}");
}

#[test]
fn planar_grid_stitches_into_quads_without_gaps() {
    let slab = box_mesh([-1.0, -1.0, -0.5], [3.0, 3.0, 0.5]);
    let index = index_of(&slab);
    let node = sheet_node(0);
    let NodeKind::Sheet(sheet) = &node.kind else {
        panic!("expected a sheet");
    };

    let sampling = plane_resampling(
        &sheet.surface,
        5,
        4,
        &RayCaster::new(&index),
        &SamplerOptions::default(),
    )
    .expect("planes");
    let front = &sampling.planes[0];
    assert_eq!(front.grid.len(), 5 * 4);

    let mut builder = MeshBuilder::new();
    add_plane_faces(front, &mut builder).expect("faces");
    let mesh = builder.finish();
    assert_eq!(mesh.vertex_count(), 20);
    assert_eq!(mesh.triangle_count(), 2 * 4 * 3);
    let diagnostics = mesh.diagnostics(Tolerance::default_geom());
    assert_eq!(diagnostics.unreferenced_vertex_count, 0);
    assert_eq!(diagnostics.non_manifold_edge_count, 0);
    // Boundary of a 4x3 quad grid.
    assert_eq!(diagnostics.open_edge_count, 2 * (4 + 3));
}

#[test]
fn mixed_kinds_produce_no_mesh() {
    let mut engine = loaded_engine();
    engine
        .insert_node(NodeDescription {
            node: sheet_node(2),
            surface: box_mesh([-1.0, -1.0, -0.5], [3.0, 3.0, 0.5]),
        })
        .expect("sheet");

    let result = engine.blend_by_id(NodeId::new(0), NodeId::new(2), 0.5);
    assert_eq!(
        result,
        Err(EngineError::Synth(SynthError::IncompatiblePrimitiveKinds {
            a: "curve",
            b: "sheet"
        }))
    );
}

#[test]
fn ray_pointing_away_misses_every_time() {
    let index = index_of(&box_mesh([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
    let caster = RayCaster::new(&index);
    let origin = Point3::new(5.0, 0.0, 0.0);
    for _ in 0..3 {
        assert_eq!(caster.cast(origin, Vec3::X), RayCast::Miss);
    }
    let back = caster.cast(origin, -Vec3::X).hit().expect("hit");
    assert!((back.distance - 4.0).abs() < 1e-12);
}

#[test]
fn engine_tracks_links_and_unknown_nodes() {
    let mut engine = loaded_engine();
    engine
        .insert_link(Link::new(
            NodeId::new(0),
            Coord::on_curve(1.0),
            NodeId::new(1),
            Coord::on_curve(0.0),
        ))
        .expect("link");

    let info = engine.node_info();
    assert_eq!(info.len(), 2);
    assert_eq!(info[0].kind, "curve");
    assert_eq!(info[0].valence, 1);
    assert_eq!(info[0].adjacent, vec![1]);
    assert_eq!(info[1].surface_triangles, 12);
    assert_eq!(engine.graph().link_count(), 1);

    assert!(matches!(
        engine.insert_node(narrow_tube(0)),
        Err(EngineError::Graph(_))
    ));
    assert!(matches!(
        engine.blend_by_id(NodeId::new(0), NodeId::new(7), 0.5),
        Err(EngineError::Graph(_))
    ));
    assert!(matches!(
        engine.insert_node(NodeDescription {
            node: curve_node(3),
            surface: OutputMesh::default(),
        }),
        Err(EngineError::Synth(SynthError::IndexUnavailable(_)))
    ));
}

#[test]
fn malformed_geometry_is_rejected_while_reading_a_request() {
    let polyline = Polyline3::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 2.0)])
        .expect("polyline");
    let request = BlendRequest {
        a: NodeDescription {
            node: Node::curve(0, CurvePath::Polyline(polyline)),
            surface: box_mesh([-1.0, -1.0, -1.0], [1.0, 1.0, 3.0]),
        },
        b: wide_tube(1),
        t: 0.5,
        options: None,
    };
    let mut value = serde_json::to_value(&request).expect("serialize");
    assert!(serde_json::from_value::<BlendRequest>(value.clone()).is_ok());

    value["a"]["node"]["kind"]["path"]["points"]
        .as_array_mut()
        .expect("points")
        .truncate(1);
    let err = serde_json::from_value::<BlendRequest>(value).expect_err("single point");
    assert!(err.to_string().contains("at least 2 points"), "{err}");

    let mut value = serde_json::to_value(&request).expect("serialize");
    value["b"]["node"]["kind"]["path"]["degree"] = serde_json::json!(3);
    assert!(serde_json::from_value::<BlendRequest>(value).is_err());
}

#[test]
fn blended_sheets_form_a_closed_outward_solid() {
    let slab = |id| NodeDescription {
        node: sheet_node(id),
        surface: box_mesh([-1.0, -1.0, -0.5], [3.0, 3.0, 0.5]),
    };
    let request = BlendRequest {
        a: slab(0),
        b: slab(1),
        t: 0.3,
        options: Some(options()),
    };
    let mesh = request.run().expect("blend");
    let diagnostics = mesh.diagnostics(Tolerance::default_geom());
    assert!(diagnostics.is_outward_solid(), "{diagnostics}");
    assert_eq!(diagnostics.unreferenced_vertex_count, 0);
}
