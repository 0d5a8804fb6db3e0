use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use schematic_system::{
    AxisGroup, BlockPosition, BlockRegistry, BlockType, Direction, MemoryWorld, Region,
    SchematicError, WorldPoint,
};

fn random_point(rng: &mut StdRng, world: &str) -> WorldPoint {
    WorldPoint::new(
        world,
        (
            rng.gen_range(-40..40),
            rng.gen_range(-10..10),
            rng.gen_range(-40..40),
        ),
    )
}

#[test]
fn test_corners_contained_and_volume() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let p1 = random_point(&mut rng, "w");
        let p2 = random_point(&mut rng, "w");
        let region = Region::new(&p1, &p2).unwrap();

        assert!(region.contains(&p1));
        assert!(region.contains(&p2));
        assert!(region.min().x <= region.max().x);
        assert!(region.min().y <= region.max().y);
        assert!(region.min().z <= region.max().z);
        assert_eq!(
            region.volume(),
            region.size_x() as u64 * region.size_y() as u64 * region.size_z() as u64
        );
    }
}

#[test]
fn test_corner_order_does_not_matter() {
    let a = WorldPoint::new("w", (5, -2, 9));
    let b = WorldPoint::new("w", (-3, 4, 1));
    assert_eq!(Region::new(&a, &b).unwrap(), Region::new(&b, &a).unwrap());
    assert_eq!(Region::new(&a, &a).unwrap().volume(), 1);
}

#[test]
fn test_cross_world_rejected() {
    let a = WorldPoint::new("overworld", (0, 0, 0));
    let b = WorldPoint::new("nether", (1, 1, 1));
    assert!(matches!(
        Region::new(&a, &b),
        Err(SchematicError::CrossWorld { .. })
    ));

    let here = Region::single(&a);
    let there = Region::single(&b);
    assert!(here.bounding_union(Some(&there)).is_err());
    assert!(!here.contains(&WorldPoint::new("nether", (0, 0, 0))));
}

#[test]
fn test_shift_preserves_size() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let region = Region::new(&random_point(&mut rng, "w"), &random_point(&mut rng, "w")).unwrap();
        for dir in Direction::ALL {
            let amount = rng.gen_range(-20..20);
            let shifted = region.shift(dir, amount);
            assert_eq!(shifted.dimensions(), region.dimensions(), "{:?} by {}", dir, amount);
            let step = dir.unit();
            let expected = region
                .min()
                .offset(step.x * amount, step.y * amount, step.z * amount);
            assert_eq!(shifted.min(), expected);
        }
    }
}

#[test]
fn test_enumeration_is_exact() {
    let region = Region::from_bounds("w", (-1, 3, 2), (2, 4, 4));
    let points: Vec<BlockPosition> = region.iter().collect();
    assert_eq!(points.len() as u64, region.volume());

    let unique: FxHashSet<BlockPosition> = points.iter().copied().collect();
    assert_eq!(unique.len(), points.len());
    assert!(points.iter().all(|p| region.contains_xyz(p.x, p.y, p.z)));

    // X varies fastest, then Y, then Z.
    assert_eq!(points[0], BlockPosition::new(-1, 3, 2));
    assert_eq!(points[1], BlockPosition::new(0, 3, 2));
    assert_eq!(points[4], BlockPosition::new(-1, 4, 2));
    assert_eq!(points[8], BlockPosition::new(-1, 3, 3));
    assert_eq!(points.last(), Some(&region.max()));
}

#[test]
fn test_outset_inset() {
    let region = Region::from_bounds("w", (0, 0, 0), (4, 4, 4));
    let grown = region.outset(AxisGroup::Horizontal, 2);
    assert_eq!(grown.min(), BlockPosition::new(-2, 0, -2));
    assert_eq!(grown.max(), BlockPosition::new(6, 4, 6));
    assert_eq!(grown.inset(AxisGroup::Horizontal, 2), region);

    let both = region.inset(AxisGroup::Both, 1);
    assert_eq!(both.dimensions(), (3, 3, 3));
}

#[test]
fn test_face_is_one_thick() {
    let region = Region::from_bounds("w", (0, 0, 0), (3, 5, 7));
    let top = region.face(Direction::Up);
    assert_eq!(top.min(), BlockPosition::new(0, 5, 0));
    assert_eq!(top.dimensions(), (4, 1, 8));

    let north = region.face(Direction::North);
    assert_eq!(north.max().x, 0);
    assert_eq!(north.size_x(), 1);
}

#[test]
fn test_contract_to_single_block() {
    let mut world = MemoryWorld::new(BlockRegistry::from_names(["Stone"]));
    world.put("w", BlockPosition::new(3, 2, -1), BlockType::new("Stone"));

    let region = Region::from_bounds("w", (-5, -5, -5), (5, 5, 5));
    let contracted = region.contract(&world, &BlockType::air());
    assert_eq!(contracted.min(), BlockPosition::new(3, 2, -1));
    assert_eq!(contracted.max(), BlockPosition::new(3, 2, -1));
}

#[test]
fn test_contract_full_region_is_noop() {
    let mut world = MemoryWorld::new(BlockRegistry::from_names(["Stone"]));
    let region = Region::from_bounds("w", (0, 0, 0), (2, 2, 2));
    for pos in &region {
        world.put("w", pos, BlockType::new("Stone"));
    }
    assert_eq!(region.contract(&world, &BlockType::air()), region);
}

#[test]
fn test_region_json_normalizes() {
    let json = r#"{"world_id":"w","min":{"x":4,"y":0,"z":4},"max":{"x":0,"y":2,"z":0}}"#;
    let region: Region = serde_json::from_str(json).unwrap();
    assert_eq!(region.min(), BlockPosition::new(0, 0, 0));
    assert_eq!(region.max(), BlockPosition::new(4, 2, 4));
}
