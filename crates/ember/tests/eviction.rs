//! Per-tick eviction through the engine context: entries survive while any
//! handle is alive, leave one tick after the last handle drops, and a later
//! request is a fresh load.

use std::io::Cursor;
use std::sync::Arc;

use ember::{EngineConfig, EngineContext};
use ember_core::{LoadMode, MemorySource};
use ember_rendering::{Material, MaterialParams, Texture, TextureParams, TextureSlot};

/// Entries owned by the default textures.
const DEFAULTS: usize = 5;

fn png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn context(source: MemorySource) -> EngineContext {
    let config = EngineConfig {
        worker_threads: 1,
        ..EngineConfig::default()
    };
    EngineContext::new(&config, Arc::new(source)).unwrap()
}

#[test]
fn test_referenced_entry_survives_ticks() {
    let ctx = context(MemorySource::new().with_file("a.png", png([1, 1, 1, 255])));
    let handle = ctx.load::<Texture>(TextureParams::color("a.png"), LoadMode::Blocking);

    for _ in 0..3 {
        assert_eq!(ctx.loader().update(), 0);
    }
    assert_eq!(ctx.stats().live, DEFAULTS + 1);
    assert!(handle.is_valid());
}

#[test]
fn test_unreferenced_entry_evicted_and_reloaded() {
    let ctx = context(MemorySource::new().with_file("a.png", png([1, 1, 1, 255])));
    let params = TextureParams::color("a.png");

    let first = ctx.load::<Texture>(params.clone(), LoadMode::Blocking);
    let identity = first.identity();
    drop(first);

    assert_eq!(ctx.loader().update(), 1);
    assert_eq!(ctx.stats().live, DEFAULTS);

    let second = ctx.load::<Texture>(params, LoadMode::NonBlocking);
    ctx.wait_idle();
    assert_eq!(second.identity(), identity);
    assert!(second.is_valid());
    assert_eq!(ctx.stats().scheduled, 2);
}

#[test]
fn test_rerequest_before_tick_reuses_entry() {
    let ctx = context(MemorySource::new().with_file("a.png", png([1, 1, 1, 255])));
    let params = TextureParams::color("a.png");

    drop(ctx.load::<Texture>(params.clone(), LoadMode::Blocking));
    let again = ctx.load::<Texture>(params, LoadMode::NonBlocking);

    assert!(again.is_ready());
    assert_eq!(ctx.loader().update(), 0);
    assert_eq!(ctx.stats().scheduled, 1);
}

#[test]
fn test_material_keeps_textures_alive() {
    let source = MemorySource::new()
        .with_file("wood.png", png([120, 80, 40, 255]))
        .with_file(
            "wood.toml",
            "name = \"wood\"\n[textures]\nalbedo = \"wood.png\"\n",
        );
    let ctx = context(source);

    let material = ctx.load::<Material>(MaterialParams::new("wood.toml"), LoadMode::Blocking);
    let albedo = material
        .wait()
        .texture(TextureSlot::Albedo)
        .cloned()
        .unwrap();
    assert!(albedo.is_valid());
    let albedo_identity = albedo.identity();
    drop(albedo);

    // Only the material refers to the albedo now.
    assert_eq!(ctx.loader().update(), 0);
    assert_eq!(ctx.stats().live, DEFAULTS + 2);

    drop(material);
    while ctx.loader().update() > 0 {}
    assert_eq!(ctx.stats().live, DEFAULTS);

    let reloaded = ctx.load::<Texture>(TextureParams::color("wood.png"), LoadMode::Blocking);
    assert_eq!(reloaded.identity(), albedo_identity);
    assert!(reloaded.is_valid());
    assert_eq!(ctx.stats().live, DEFAULTS + 1);
}
