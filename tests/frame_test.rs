use uniflow_ngin::{
    buffer::layout::{decode_global_block, decode_local_block},
    cgmath::{Matrix4, Vector3},
    data_structures::{block::Block, entity::View},
    error::StreamError,
    frame::{FrameAggregator, FrameScene, local_bytes},
    water::WaterPlane,
};

use crate::common::test_utils::{camera, entity_at, host_buffer, lamp, sun};

mod common;

fn local_at(bytes: &[u8], block: Block) -> (Matrix4<f32>, Matrix4<f32>) {
    decode_local_block(&bytes[block.offset as usize..block.end() as usize]).unwrap()
}

#[test]
fn aggregator_rejects_unusable_alignments() {
    assert_eq!(
        FrameAggregator::new(0, 4),
        Err(StreamError::InvalidAlignment(0))
    );
    assert_eq!(
        FrameAggregator::new(3, 4),
        Err(StreamError::InvalidAlignment(3))
    );
    assert!(FrameAggregator::new(256, 4).is_ok());
}

#[test]
fn second_entity_starts_on_the_next_aligned_offset() {
    let aggregator = FrameAggregator::new(256, 4).unwrap();
    let mut lights_buffer = host_buffer(512);
    let mut uniform_buffer = host_buffer(1024);
    let mut entities = vec![entity_at("a", 1.0, 0.0, 0.0), entity_at("b", 0.0, 0.0, -2.0)];
    let camera = camera();

    let frame = aggregator
        .write_frame(
            &mut lights_buffer,
            &mut uniform_buffer,
            &mut entities,
            &FrameScene {
                camera: &camera,
                lights: &[sun()],
                water: None,
            },
        )
        .unwrap();

    let first = entities[0].local_block(View::Main).unwrap();
    let second = entities[1].local_block(View::Main).unwrap();
    assert_eq!(first, Block { offset: 0, size: 128 });
    assert_eq!(second, Block { offset: 256, size: 128 });
    assert_eq!(frame.uniform_bytes, 384);
    assert_eq!(frame.views, vec![View::Main]);
    assert_eq!(entities[0].local_block(View::WaterReflection), None);
}

#[test]
fn frame_blocks_hold_camera_lights_and_matrices() {
    let aggregator = FrameAggregator::new(64, 4).unwrap();
    let mut lights_buffer = host_buffer(512);
    let mut uniform_buffer = host_buffer(1024);
    let mut entities = vec![entity_at("a", 1.0, 2.0, 3.0), entity_at("b", -5.0, 0.0, 0.0)];
    let camera = camera();
    let lights = [sun(), lamp(2.0)];

    let frame = aggregator
        .write_frame(
            &mut lights_buffer,
            &mut uniform_buffer,
            &mut entities,
            &FrameScene {
                camera: &camera,
                lights: &lights,
                water: None,
            },
        )
        .unwrap();

    assert_eq!(frame.global, Block { offset: 0, size: 16 + 2 * 64 });
    assert_eq!(frame.light_count, 2);
    let global = decode_global_block(lights_buffer.backend().contents()).unwrap();
    assert_eq!(global.camera_position, Vector3::new(0.0, 5.0, 10.0));
    assert_eq!(global.lights, lights);

    let uploaded = uniform_buffer.backend().contents();
    for entity in &entities {
        let (world, wvp) = local_at(uploaded, entity.local_block(View::Main).unwrap());
        assert_eq!(world, Matrix4::from_translation(entity.transform.position));
        assert_eq!(wvp, camera.view_projection() * world);
    }
}

#[test]
fn water_views_are_written_after_the_main_view() {
    let aggregator = FrameAggregator::new(256, 4).unwrap();
    let mut lights_buffer = host_buffer(512);
    let mut uniform_buffer = host_buffer(2048);
    let mut entities = vec![entity_at("a", 0.0, 1.0, 0.0), entity_at("b", 3.0, 1.0, 0.0)];
    let camera = camera();
    let water = WaterPlane::new(0.5);

    let frame = aggregator
        .write_frame(
            &mut lights_buffer,
            &mut uniform_buffer,
            &mut entities,
            &FrameScene {
                camera: &camera,
                lights: &[],
                water: Some(water),
            },
        )
        .unwrap();

    assert_eq!(frame.views, View::ALL.to_vec());
    assert_eq!(frame.uniform_bytes, local_bytes(2, 3, 256));
    let offsets: Vec<u64> = View::ALL
        .iter()
        .flat_map(|view| entities.iter().map(|e| e.local_block(*view).unwrap().offset))
        .collect();
    assert_eq!(offsets, vec![0, 256, 512, 768, 1024, 1280]);

    let uploaded = uniform_buffer.backend().contents();
    let block = entities[1].local_block(View::WaterReflection).unwrap();
    let (world, wvp) = local_at(uploaded, block);
    assert_eq!(wvp, water.reflection_camera(&camera).view_projection() * world);
    let block = entities[1].local_block(View::WaterRefraction).unwrap();
    let (_, refraction_wvp) = local_at(uploaded, block);
    assert_ne!(refraction_wvp, wvp);
}

#[test]
fn failed_frame_clears_every_recorded_block() {
    let aggregator = FrameAggregator::new(256, 4).unwrap();
    let mut lights_buffer = host_buffer(512);
    let mut uniform_buffer = host_buffer(300);
    let mut entities = vec![entity_at("a", 0.0, 0.0, 0.0)];
    let camera = camera();
    let scene = FrameScene {
        camera: &camera,
        lights: &[sun()],
        water: None,
    };

    aggregator
        .write_frame(&mut lights_buffer, &mut uniform_buffer, &mut entities, &scene)
        .unwrap();
    assert!(entities[0].local_block(View::Main).is_some());

    // The second block would end at 384.
    entities.push(entity_at("b", 1.0, 0.0, 0.0));
    let err = aggregator
        .write_frame(&mut lights_buffer, &mut uniform_buffer, &mut entities, &scene)
        .unwrap_err();
    assert!(matches!(err, StreamError::CapacityExceeded { capacity: 300, .. }));
    assert!(entities.iter().all(|e| e.local_block(View::Main).is_none()));
}

#[test]
fn too_many_lights_fails_the_frame() {
    let aggregator = FrameAggregator::new(256, 1).unwrap();
    let mut lights_buffer = host_buffer(512);
    let mut uniform_buffer = host_buffer(512);
    let mut entities = vec![entity_at("a", 0.0, 0.0, 0.0)];
    let camera = camera();

    let result = aggregator.write_frame(
        &mut lights_buffer,
        &mut uniform_buffer,
        &mut entities,
        &FrameScene {
            camera: &camera,
            lights: &[sun(), lamp(1.0)],
            water: None,
        },
    );
    assert_eq!(result, Err(StreamError::TooManyLights { count: 2, max: 1 }));
    assert_eq!(entities[0].local_block(View::Main), None);
}

#[test]
fn transform_edits_show_up_in_the_next_frame() {
    let aggregator = FrameAggregator::new(256, 4).unwrap();
    let mut lights_buffer = host_buffer(512);
    let mut uniform_buffer = host_buffer(512);
    let mut entities = vec![entity_at("a", 0.0, 0.0, 0.0)];
    let camera = camera();
    let scene = FrameScene {
        camera: &camera,
        lights: &[],
        water: None,
    };

    aggregator
        .write_frame(&mut lights_buffer, &mut uniform_buffer, &mut entities, &scene)
        .unwrap();
    entities[0].transform.position = Vector3::new(4.0, 0.0, 0.0);
    entities[0].transform.scale = Vector3::new(2.0, 2.0, 2.0);
    aggregator
        .write_frame(&mut lights_buffer, &mut uniform_buffer, &mut entities, &scene)
        .unwrap();

    let (world, _) = local_at(
        uniform_buffer.backend().contents(),
        entities[0].local_block(View::Main).unwrap(),
    );
    assert_eq!(
        world,
        Matrix4::from_translation(Vector3::new(4.0, 0.0, 0.0)) * Matrix4::from_scale(2.0)
    );
    assert_eq!(entities[0].world(), world);
}

#[test]
fn local_bytes_includes_alignment_gaps() {
    assert_eq!(local_bytes(0, 3, 256), 0);
    assert_eq!(local_bytes(1, 1, 256), 128);
    assert_eq!(local_bytes(2, 1, 256), 384);
    assert_eq!(local_bytes(3, 1, 64), 384);
    assert_eq!(local_bytes(2, 3, 256), 1408);
}

#[test]
fn rewriting_a_frame_reproduces_its_bytes() {
    let aggregator = FrameAggregator::new(256, 4).unwrap();
    let mut lights_buffer = host_buffer(512);
    let mut uniform_buffer = host_buffer(2048);
    let camera = camera();
    let lights = [sun(), lamp(2.0)];
    let scene = FrameScene {
        camera: &camera,
        lights: &lights,
        water: None,
    };
    let mut entities = vec![entity_at("a", 1.0, 0.0, 0.0), entity_at("b", 0.0, 2.0, -1.0)];

    let first = aggregator
        .write_frame(&mut lights_buffer, &mut uniform_buffer, &mut entities, &scene)
        .unwrap();
    let global_bytes = lights_buffer.backend().contents().to_vec();
    let local_bytes_first = uniform_buffer.backend().contents().to_vec();

    // A larger frame in between leaves other bytes behind in both buffers.
    let mut crowd: Vec<_> = (0..5).map(|i| entity_at("crowd", i as f32, 3.0, 1.0)).collect();
    aggregator
        .write_frame(
            &mut lights_buffer,
            &mut uniform_buffer,
            &mut crowd,
            &FrameScene {
                camera: &camera,
                lights: &[lamp(-4.0), lamp(7.0), sun(), lamp(0.5)],
                water: Some(WaterPlane::new(-1.0)),
            },
        )
        .unwrap();

    let second = aggregator
        .write_frame(&mut lights_buffer, &mut uniform_buffer, &mut entities, &scene)
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(lights_buffer.backend().contents(), global_bytes.as_slice());
    assert_eq!(uniform_buffer.backend().contents(), local_bytes_first.as_slice());
}
