//! # Frame Loop Verification Tests
//!
//! Systems resolve resource handles through a shared registry; an
//! asynchronous load becomes visible to systems in the first frame after
//! the worker finishes.
//!
//! Run with: cargo test -p ember --test frame_loop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ember::resources::MemoryFileSystem;
use ember::{
    Component, Entity, FnSystem, FrameLoop, FrameLoopConfig, LoadOutcome, RegistryConfig,
    ResourceHandle, ResourceKind, ResourceRegistry, World,
};

/// A resource reference held by an entity.
#[derive(Debug, Clone, Copy)]
struct Sprite {
    texture: ResourceHandle,
}
impl Component for Sprite {}

/// Bytes of the texture once the system has seen them.
#[derive(Debug, Clone, Copy, Default)]
struct Resolved {
    bytes: usize,
}
impl Component for Resolved {}

fn setup() -> (FrameLoop, Arc<MemoryFileSystem>) {
    let fs = Arc::new(MemoryFileSystem::new());
    let registry =
        ResourceRegistry::with_file_system(RegistryConfig::default(), fs.clone()).unwrap();
    let mut world = World::with_capacity(16);
    world.register_component::<Sprite>();
    world.register_component::<Resolved>();
    (
        FrameLoop::new(world, Arc::new(registry), FrameLoopConfig::default()),
        fs,
    )
}

#[test]
fn verify_systems_observe_async_loads() {
    let (mut frames, fs) = setup();
    fs.insert("/hero.png", vec![0u8; 64]);

    let loaded = Arc::new(AtomicUsize::new(0));
    let texture = {
        let loaded = Arc::clone(&loaded);
        frames.registry().load_async("/hero.png", ResourceKind::Unknown, move |_, outcome| {
            if outcome == LoadOutcome::Loaded {
                loaded.fetch_add(1, Ordering::SeqCst);
            }
        })
    };
    assert_eq!(texture.kind(), ResourceKind::Texture);

    let registry = Arc::clone(frames.registry());
    let world = frames.world_mut();
    let hero = world.create_entity();
    world.add(hero, Sprite { texture });
    world.add(hero, Resolved::default());
    world.register_system_for::<(Sprite, Resolved), _>(
        FnSystem::new("resolve", move |world: &mut World, entities: &[Entity], _dt: f32| {
            for &entity in entities {
                let handle = world.get::<Sprite>(entity).texture;
                if let Some(bytes) = registry.get_as::<Vec<u8>>(handle) {
                    world.get_mut::<Resolved>(entity).bytes = bytes.len();
                }
            }
        }),
        0,
    );

    let start = Instant::now();
    while frames.world().get::<Resolved>(hero).bytes == 0 {
        assert!(start.elapsed() < Duration::from_secs(5), "load never completed");
        frames.frame_with(Duration::from_millis(16));
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(frames.world().get::<Resolved>(hero).bytes, 64);
    assert_eq!(loaded.load(Ordering::SeqCst), 1);
    assert!(frames.frame_count() >= 1);

    let (world, registry) = frames.into_parts();
    assert!(!world.is_initialized());
    registry.release(texture);
    assert!(registry.is_empty());
}

#[test]
fn verify_frame_stats_follow_frames() {
    let (mut frames, _fs) = setup();
    let first = frames.frame();
    let second = frames.frame_with(Duration::from_millis(10));

    assert_eq!(first.frame, 0);
    assert!(first.delta <= frames.config().max_delta());
    assert_eq!(second.frame, 1);
    assert_eq!(second.delta, Duration::from_millis(10));
    assert_eq!(frames.stats().frames_recorded, 2);
}
