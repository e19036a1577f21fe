use boldsurf_core::filter::spline_filter;
use boldsurf_core::mesh::{vertex_normals_sine_weight, Mesh};
use boldsurf_core::resample::{SourceSeries, VolumetricResampler};
use boldsurf_core::sampling::{default_depth_fractions, surface_coords_normal, surface_coords_pial};
use boldsurf_core::transform::{AffineTransform, DisplacementField, TransformChain};
use boldsurf_core::{SamplingBatch, SplineOrder, Volume};
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use ndarray::{Array3, Array4};

fn scanner_affine() -> Matrix4<f64> {
    #[rustfmt::skip]
    let m = Matrix4::new(
        -3.0, 0.0, 0.0, 45.0,
         0.0, 3.0, 0.0, -45.0,
         0.0, 0.0, 3.5, -30.0,
         0.0, 0.0, 0.0, 1.0,
    );
    m
}

fn small_sphere(radius: f64) -> Mesh {
    let r = radius;
    let vertices = vec![
        Vector3::new(r, 0.0, 0.0),
        Vector3::new(-r, 0.0, 0.0),
        Vector3::new(0.0, r, 0.0),
        Vector3::new(0.0, -r, 0.0),
        Vector3::new(0.0, 0.0, r),
        Vector3::new(0.0, 0.0, -r),
    ];
    let faces = vec![
        [0, 2, 4],
        [2, 1, 4],
        [1, 3, 4],
        [3, 0, 4],
        [2, 0, 5],
        [1, 2, 5],
        [3, 1, 5],
        [0, 3, 5],
    ];
    Mesh::new(vertices, faces)
}

#[test]
fn test_constant_series_survives_full_chain_at_every_order() {
    let affine = scanner_affine();
    let volumes: Vec<Volume> = (0..2)
        .map(|_| Volume::new(Array3::from_elem((31, 31, 20), 5.0), affine))
        .collect();
    let series = SourceSeries::new(volumes).unwrap();

    let hmc = vec![
        AffineTransform::identity(),
        AffineTransform::from_parts(&Matrix3::identity(), &Vector3::new(0.5, -0.25, 0.1)),
    ];
    let warp_data = Array4::from_shape_fn((8, 8, 8, 3), |(i, j, _, c)| if c == 0 { 0.1 * i as f64 } else { 0.05 * j as f64 });
    let mut warp_affine = Matrix4::identity() * 10.0;
    warp_affine[(3, 3)] = 1.0;
    warp_affine.fixed_view_mut::<3, 1>(0, 3).copy_from(&Vector3::new(-40.0, -40.0, -40.0));
    let warps = (0..2)
        .map(|_| DisplacementField::from_vector_volume(&warp_data, warp_affine).unwrap())
        .collect();
    let registration = AffineTransform::from_parts(&Matrix3::identity(), &Vector3::new(1.0, 2.0, -1.0));
    let chain = TransformChain::new(hmc, registration, AffineTransform::identity(), Some(warps), 2).unwrap();

    let surface = small_sphere(20.0);
    let normals = vertex_normals_sine_weight(surface.vertices(), surface.faces());
    let thickness = vec![2.5; surface.n_vertices()];
    let batch = surface_coords_normal(
        surface.vertices(),
        &Vector3::zeros(),
        &normals,
        &thickness,
        &default_depth_fractions(),
    );

    for n in 0..=5 {
        let order = SplineOrder::new(n).unwrap();
        let coeffs: Vec<Array3<f64>> = series.frames().iter().map(|f| spline_filter(f, order)).collect();
        let out = VolumetricResampler::new(&chain, order)
            .apply(&series, &coeffs, &batch)
            .unwrap();
        assert_eq!(out.n_volumes(), 2);
        assert_eq!(out.shape(), &[6]);
        for v in out.data().iter() {
            assert!((v - 5.0).abs() < 1e-9, "order {} gave {}", n, v);
        }
    }
}

#[test]
fn test_normal_and_pial_batches_share_shape() {
    let white = small_sphere(10.0);
    let pial = small_sphere(12.0);
    let normals = vertex_normals_sine_weight(white.vertices(), white.faces());
    let thickness = vec![2.0; white.n_vertices()];
    let fracs = default_depth_fractions();
    let c_ras = Vector3::new(1.0, -2.0, 3.0);

    let by_normal = surface_coords_normal(white.vertices(), &c_ras, &normals, &thickness, &fracs);
    let by_pial = surface_coords_pial(white.vertices(), &c_ras, pial.vertices(), &fracs);
    assert_eq!(by_normal.shape(), by_pial.shape());

    // on a sphere the normal offset and the pial surface coincide
    for (a, b) in by_normal.points().iter().zip(by_pial.points()) {
        assert!((a - b).norm() < 1e-9);
    }
}

#[test]
fn test_shifted_affine_samples_neighbour() {
    let data = Array3::from_shape_fn((5, 5, 5), |(i, _, _)| i as f64);
    let series = SourceSeries::new(vec![Volume::new(data, Matrix4::identity())]).unwrap();
    let hmc = vec![AffineTransform::from_parts(&Matrix3::identity(), &Vector3::new(1.0, 0.0, 0.0))];
    let chain = TransformChain::new(hmc, AffineTransform::identity(), AffineTransform::identity(), None, 1).unwrap();
    let batch = SamplingBatch::new(vec![Vector4::new(2.0, 2.0, 2.0, 1.0)], vec![1], None);
    let out = VolumetricResampler::new(&chain, SplineOrder::LINEAR)
        .apply(&series, series.frames(), &batch)
        .unwrap();
    assert_eq!(out.data()[[0, 0]], 3.0);
}

#[test]
fn test_warp_is_subtracted_between_pre_warp_affine_and_head_motion() {
    // value = i + 10 j + 100 k, exact under linear interpolation
    let data = Array3::from_shape_fn((20, 20, 20), |(i, j, k)| (i + 10 * j + 100 * k) as f64);
    let series = SourceSeries::new(vec![
        Volume::new(data.clone(), Matrix4::identity()),
        Volume::new(data, Matrix4::identity()),
    ])
    .unwrap();

    let scale = |s: f64| AffineTransform::from_parts(&(Matrix3::identity() * s), &Vector3::zeros());
    let anat_to_canonical = AffineTransform::from_parts(&Matrix3::identity(), &Vector3::new(0.0, 3.0, 0.0));

    // uniform +2 mm in x on a 4 mm grid covering world [0, 16]^3
    let mut warp_affine = Matrix4::identity() * 4.0;
    warp_affine[(3, 3)] = 1.0;
    let shifted = Array4::from_shape_fn((5, 5, 5, 3), |(_, _, _, c)| if c == 0 { 2.0 } else { 0.0 });
    let warps = vec![
        DisplacementField::from_vector_volume(&shifted, warp_affine).unwrap(),
        DisplacementField::zeros([5, 5, 5], warp_affine).unwrap(),
    ];
    let chain = TransformChain::new(
        vec![scale(0.5), AffineTransform::identity()],
        scale(2.0),
        anat_to_canonical,
        Some(warps),
        2,
    )
    .unwrap();

    let batch = SamplingBatch::new(
        vec![Vector4::new(2.0, 1.0, 2.0, 1.0), Vector4::new(9.0, 1.0, 2.0, 1.0)],
        vec![2],
        None,
    );
    let out = VolumetricResampler::new(&chain, SplineOrder::LINEAR)
        .apply(&series, series.frames(), &batch)
        .unwrap();

    // (2,1,2) → canonical (2,4,2) → registration (4,8,4) → warp (2,8,4)
    //   → hmc (1,4,2); (9,1,2) → (18,8,4) lies outside the warp grid → (9,4,2)
    let expected = [[241.0, 249.0], [484.0, 498.0]];
    for (volume, row) in expected.iter().enumerate() {
        for (point, want) in row.iter().enumerate() {
            let got = out.data()[[volume, point]];
            assert!((got - want).abs() < 1e-9, "volume {volume} point {point}: {got} vs {want}");
        }
    }
}
