//! End-to-end initialization pipeline scenarios on synthetic images.

use nalgebra::Point2;
use rust_dvo::{
    Camera, Frame, ImageF32, Keyframe, PixelGrid, PointStatus, Pyramid, SE3,
};

const IMAGE_SIZE: usize = 640;
const CELL_SIZE: usize = 16;
const NUM_LEVELS: usize = 4;

/// Checkerboard-ish intensity pattern so patches carry nonzero gradients.
fn test_image(size: usize) -> ImageF32 {
    ImageF32::from_fn(size, size, |x, y| {
        (((x / 8 + y / 8) % 2) as f32) * 0.8 + (x % 8) as f32 * 0.01
    })
}

/// Grid with every cell selecting its center pixel.
fn all_cells_selected(image_size: usize, cell_size: usize) -> PixelGrid {
    let n = image_size / cell_size;
    let mut grid = PixelGrid::new(n, n);
    for gr in 0..n {
        for gc in 0..n {
            grid.set(
                gr,
                gc,
                Some(Point2::new(
                    (gc * cell_size + cell_size / 2) as u32,
                    (gr * cell_size + cell_size / 2) as u32,
                )),
            );
        }
    }
    grid
}

fn test_keyframe() -> (Keyframe, PixelGrid, Camera) {
    let pyramid = Pyramid::build(test_image(IMAGE_SIZE), NUM_LEVELS);
    assert_eq!(pyramid.num_levels(), NUM_LEVELS);

    let mut kf = Keyframe::default();
    kf.set_frame(Frame::mono(pyramid, SE3::identity()));

    let grid = all_cells_selected(IMAGE_SIZE, CELL_SIZE);
    kf.allocate(NUM_LEVELS, (grid.rows(), grid.cols()));

    let camera = Camera::new(
        (IMAGE_SIZE as u32, IMAGE_SIZE as u32),
        [1.0, 1.0, 1.0, 1.0],
        0,
    );
    (kf, grid, camera)
}

#[test]
fn init_points_fills_every_selected_cell() {
    let (mut kf, grid, camera) = test_keyframe();
    assert_eq!(grid.len(), 1600);

    let n = kf.init_points(&grid, &camera).unwrap();
    assert_eq!(n, 1600);
    assert_eq!(kf.num_points(), 1600);
    assert!(kf
        .points()
        .iter()
        .all(|p| p.status == PointStatus::Guessed));
}

#[test]
fn init_patches_excludes_border_cells() {
    let (mut kf, grid, camera) = test_keyframe();
    let n = kf.init_points(&grid, &camera).unwrap();
    let m = kf.init_patches(0);

    assert!(m <= n);
    assert!(m > 0);
    // The outermost cell ring violates the level-3 sampling margin.
    assert_eq!(m, 38 * 38);
    assert_eq!(kf.num_patches(), m);

    // Excluded points keep their status.
    assert_eq!(kf.num_points(), n);
}

#[test]
fn larger_footprint_same_margin() {
    let (mut kf, grid, camera) = test_keyframe();
    kf.init_points(&grid, &camera).unwrap();
    let m0 = kf.init_patches(0);
    let m1 = kf.init_patches(1);

    assert_eq!(m0, m1);
    // The square footprint carries more samples per level.
    let patch = kf
        .patches()
        .iter()
        .find(|p| p.valid)
        .expect("some valid patch");
    assert_eq!(patch.levels.len(), NUM_LEVELS);
    assert_eq!(patch.levels[0].vals.len(), 9);
    assert_eq!(patch.levels[0].grads.len(), 9);
}

#[test]
fn init_from_depth_marks_measured() {
    let (mut kf, grid, camera) = test_keyframe();
    kf.init_points(&grid, &camera).unwrap();
    let m = kf.init_patches(0);

    let depth = ImageF32::filled(IMAGE_SIZE, IMAGE_SIZE, 1.0);
    let n_depth = kf.init_from_depth(&depth).unwrap();

    assert_eq!(n_depth, m);
    let measured = kf
        .points()
        .iter()
        .filter(|p| p.status == PointStatus::Measured)
        .count();
    assert_eq!(measured, n_depth);
    for p in kf.points().iter().filter(|p| p.status == PointStatus::Measured) {
        assert_eq!(p.idepth, 1.0);
    }
}

#[test]
fn init_from_depth_skips_bad_samples() {
    let (mut kf, grid, camera) = test_keyframe();
    kf.init_points(&grid, &camera).unwrap();

    // Depth invalid on the left half of the image.
    let depth = ImageF32::from_fn(IMAGE_SIZE, IMAGE_SIZE, |x, _| {
        if x < IMAGE_SIZE / 2 {
            f32::NAN
        } else {
            2.0
        }
    });
    let n_depth = kf.init_from_depth(&depth).unwrap();

    assert_eq!(n_depth, 1600 / 2);
    let guessed = kf
        .points()
        .iter()
        .filter(|p| p.status == PointStatus::Guessed)
        .count();
    assert_eq!(guessed, 1600 / 2);
    for p in kf.points().iter().filter(|p| p.status == PointStatus::Measured) {
        assert_eq!(p.idepth, 0.5);
    }
}

#[test]
fn init_from_depth_rejects_mismatched_size() {
    let (mut kf, grid, camera) = test_keyframe();
    kf.init_points(&grid, &camera).unwrap();

    let depth = ImageF32::filled(320, 320, 1.0);
    assert!(kf.init_from_depth(&depth).is_err());
    // State untouched by the rejected call.
    assert!(kf
        .points()
        .iter()
        .all(|p| p.status != PointStatus::Measured));
}

#[test]
fn precompute_reaches_ok() {
    let (mut kf, grid, camera) = test_keyframe();
    assert!(!kf.precomputed());
    assert!(!kf.ok());

    let m = kf.precompute(&grid, &camera, 0).unwrap();
    assert_eq!(m, 38 * 38);
    assert!(kf.precomputed());
    assert!(kf.ok());
}

#[test]
fn precompute_with_empty_grid_stays_frame_bound() {
    let (mut kf, _, camera) = test_keyframe();
    let empty = PixelGrid::new(40, 40);
    kf.allocate(NUM_LEVELS, (40, 40));

    let m = kf.precompute(&empty, &camera, 0).unwrap();
    assert_eq!(m, 0);
    assert!(!kf.precomputed());
    assert!(!kf.ok());
}

#[test]
fn counts_are_monotone_down_the_pipeline() {
    let (mut kf, grid, camera) = test_keyframe();

    // Patch stage before the point stage is a zero-count no-op.
    assert_eq!(kf.init_patches(0), 0);

    let n = kf.init_points(&grid, &camera).unwrap();
    let m = kf.init_patches(0);
    let depth = ImageF32::filled(IMAGE_SIZE, IMAGE_SIZE, 1.0);
    let d = kf.init_from_depth(&depth).unwrap();

    assert!(n <= grid.num_selected());
    assert!(m <= n);
    assert!(d <= n);
    assert_eq!(kf.num_points(), n);
}
