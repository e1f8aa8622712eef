use crate::geom::{NurbsCurve3, NurbsSurface, Point3, Polyline3, Tolerance, Vec3};
use crate::structure::{Coord, CurvePath, Link, Node, NodeId, NodeKind};

fn z_curve(id: usize) -> Node {
    let curve = NurbsCurve3::clamped(
        vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 2.0)],
        3,
    )
    .expect("curve");
    Node::curve(id, CurvePath::Nurbs(curve))
}

fn flat_sheet(id: usize) -> Node {
    let surface = NurbsSurface::bilinear(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
        Point3::new(2.0, 2.0, 0.0),
    )
    .expect("sheet");
    Node::sheet(id, surface)
}

fn assert_vec_close(a: Vec3, b: Vec3) {
    assert!(a.sub(b).length() < 1e-6, "{a:?} != {b:?}");
}

#[test]
fn curve_frame_is_orthonormal_around_the_tangent() {
    let node = z_curve(0);
    let (point, frame) = node.get(Coord::on_curve(0.5));
    assert!(Tolerance::LOOSE.approx_eq_point3(point, Point3::new(0.0, 0.0, 1.0)));
    assert_vec_close(frame.tangent, Vec3::Z);
    assert!(frame.tangent.dot(frame.normal).abs() < 1e-9);
    assert!(frame.tangent.dot(frame.bitangent).abs() < 1e-9);
    assert!((frame.normal.length() - 1.0).abs() < 1e-9);
    assert!((frame.bitangent.length() - 1.0).abs() < 1e-9);
}

#[test]
fn sheet_frame_follows_parameter_directions() {
    let node = flat_sheet(1);
    let (point, frame) = node.get(Coord::new(0.25, 0.5));
    assert!(Tolerance::LOOSE.approx_eq_point3(point, Point3::new(0.5, 1.0, 0.0)));
    assert_vec_close(frame.tangent, Vec3::X);
    assert_vec_close(frame.bitangent, Vec3::Y);
    assert_vec_close(frame.normal, Vec3::Z);
}

#[test]
fn node_metadata_reflects_kind() {
    let curve = z_curve(0);
    let sheet = flat_sheet(1);
    assert_eq!(curve.kind_name(), "curve");
    assert_eq!(sheet.kind_name(), "sheet");
    assert!(matches!(sheet.kind, NodeKind::Sheet(_)));
    assert_eq!(curve.control_count(), vec![2]);
    assert_eq!(sheet.control_count(), vec![2, 2]);

    let bbox = sheet.bbox(2.0).expect("bbox");
    assert_eq!(bbox.min, Point3::new(-1.0, -1.0, 0.0));
    assert_eq!(bbox.max, Point3::new(3.0, 3.0, 0.0));
}

#[test]
fn approx_projection_finds_nearby_coordinates() {
    let curve = z_curve(0);
    let coord = curve.approx_projection(Point3::new(1.0, 0.0, 1.5));
    assert!((coord.u - 0.75).abs() < 1e-2);

    let sheet = flat_sheet(1);
    let coord = sheet.approx_projection(Point3::new(1.0, 0.5, 3.0));
    assert!((coord.u - 0.5).abs() < 1e-9);
    assert!((coord.v - 0.25).abs() < 1e-9);
}

#[test]
fn polyline_paths_evaluate_like_curves() {
    let path = Polyline3::new(vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
    ])
    .expect("polyline");
    let node = Node::curve(3, CurvePath::Polyline(path));
    let (point, frame) = node.get(Coord::on_curve(0.75));
    assert!(Tolerance::LOOSE.approx_eq_point3(point, Point3::new(1.0, 0.5, 0.0)));
    assert_vec_close(frame.tangent, Vec3::Y);
    assert_eq!(node.control_points().len(), 3);
}

#[test]
fn link_position_evaluates_node_at_link_coordinate() {
    let curve = z_curve(0);
    let sheet = flat_sheet(1);
    let link = Link::new(
        NodeId::new(0),
        Coord::on_curve(1.0),
        NodeId::new(1),
        Coord::new(1.0, 0.0),
    );

    let on_curve = link.position(&curve).expect("curve end");
    let on_sheet = link.position(&sheet).expect("sheet end");
    assert!(Tolerance::LOOSE.approx_eq_point3(on_curve, curve.get(Coord::on_curve(1.0)).0));
    assert!(Tolerance::LOOSE.approx_eq_point3(on_sheet, Point3::new(2.0, 0.0, 0.0)));

    let stranger = Node::new(NodeId::new(9), curve.kind.clone());
    assert!(link.position(&stranger).is_none());
}
