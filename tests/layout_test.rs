use uniflow_ngin::{
    buffer::layout::{
        self, GLOBAL_HEADER_SIZE, LIGHT_RECORD_SIZE, LOCAL_BLOCK_SIZE, decode_global_block,
        decode_local_block,
    },
    cgmath::{Matrix4, Vector3},
    data_structures::block::Block,
    error::StreamError,
};

use crate::common::test_utils::{host_buffer, lamp, sun};

mod common;

#[test]
fn vec3_then_count_then_one_light_ends_at_80() {
    let mut buffer = host_buffer(256);
    let mut mapping = buffer.map_for_write();

    assert_eq!(mapping.push_vec3(Vector3::new(1.0, 2.0, 3.0)), Ok(0));
    assert_eq!(mapping.head(), 12);
    // The count packs into the fourth slot of the vec3.
    assert_eq!(mapping.push_u32(1), Ok(12));
    assert_eq!(mapping.head(), 16);
    assert_eq!(mapping.push_light(&sun()), Ok(16));
    assert_eq!(mapping.head(), 80);
    assert_eq!(mapping.unmap(), 80);
}

#[test]
fn light_fields_sit_at_their_std140_offsets() {
    let mut buffer = host_buffer(256);
    let mut mapping = buffer.map_for_write();
    mapping.push_u32(0xFFFF_FFFF).unwrap();
    let start = mapping.push_light(&lamp(3.0)).unwrap();
    drop(mapping);

    assert_eq!(start, 16);
    let bytes = &buffer.written()[start as usize..];
    let f32_at = |at: usize| f32::from_ne_bytes(bytes[at..at + 4].try_into().unwrap());
    assert_eq!(u32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 1);
    assert_eq!(&bytes[4..16], &[0; 12]);
    assert_eq!([f32_at(16), f32_at(20), f32_at(24)], [0.2, 0.4, 1.0]);
    assert_eq!([f32_at(48), f32_at(52), f32_at(56)], [3.0, 2.0, 0.0]);
    assert_eq!(f32_at(60), 0.5);
    assert_eq!(bytes.len() as u64, LIGHT_RECORD_SIZE);
}

#[test]
fn global_block_decodes_to_what_was_written() {
    let camera_position = Vector3::new(-4.0, 7.5, 12.25);
    let lights = [sun(), lamp(-1.0), lamp(6.0)];

    let mut buffer = host_buffer(1024);
    let block = {
        let mut mapping = buffer.map_for_write();
        mapping
            .write_global_block(camera_position, &lights, 16)
            .unwrap()
    };

    assert_eq!(
        block,
        Block {
            offset: 0,
            size: GLOBAL_HEADER_SIZE + 3 * LIGHT_RECORD_SIZE,
        }
    );
    let decoded = decode_global_block(buffer.backend().contents()).unwrap();
    assert_eq!(decoded.camera_position, camera_position);
    assert_eq!(decoded.lights, lights);
}

#[test]
fn global_block_without_lights_is_just_the_header() {
    let mut buffer = host_buffer(64);
    let block = buffer
        .map_for_write()
        .write_global_block(Vector3::new(0.0, 1.0, 0.0), &[], 4)
        .unwrap();
    assert_eq!(block.size, GLOBAL_HEADER_SIZE);
    assert_eq!(decode_global_block(buffer.written()).unwrap().lights, vec![]);
}

#[test]
fn too_many_lights_writes_nothing() {
    let mut buffer = host_buffer(1024);
    let mut mapping = buffer.map_for_write();
    let lights = [sun(), lamp(1.0), lamp(2.0)];
    assert_eq!(
        mapping.write_global_block(Vector3::new(0.0, 0.0, 0.0), &lights, 2),
        Err(StreamError::TooManyLights { count: 3, max: 2 })
    );
    assert_eq!(mapping.head(), 0);
}

#[test]
fn global_block_capacity_covers_the_shader_array() {
    assert_eq!(layout::global_block_capacity(0), 16);
    assert_eq!(layout::global_block_capacity(1), 80);
    assert_eq!(layout::global_block_capacity(16), 1040);
}

#[test]
fn local_block_is_two_matrices_on_the_block_alignment() {
    let world = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
    let wvp = Matrix4::from_scale(2.0) * world;

    let mut buffer = host_buffer(512);
    let block = {
        let mut mapping = buffer.map_for_write();
        mapping.push_u32(42).unwrap();
        mapping.write_local_block(&world, &wvp, 256).unwrap()
    };

    assert_eq!(
        block,
        Block {
            offset: 256,
            size: LOCAL_BLOCK_SIZE,
        }
    );
    assert_eq!(block.end(), 384);
    assert!(buffer.written()[4..256].iter().all(|b| *b == 0));
    let (decoded_world, decoded_wvp) =
        decode_local_block(&buffer.written()[256..384]).unwrap();
    assert_eq!(decoded_world, world);
    assert_eq!(decoded_wvp, wvp);
}

#[test]
fn truncated_global_block_does_not_decode() {
    let mut buffer = host_buffer(256);
    buffer
        .map_for_write()
        .write_global_block(Vector3::new(0.0, 0.0, 0.0), &[sun()], 4)
        .unwrap();
    let written = buffer.written();
    assert!(decode_global_block(&written[..written.len() - 1]).is_none());
}

#[test]
fn decoding_rejects_a_light_count_the_bytes_cannot_hold() {
    let mut header = [0u8; GLOBAL_HEADER_SIZE as usize];
    header[12..16].copy_from_slice(&u32::MAX.to_ne_bytes());
    assert!(decode_global_block(&header).is_none());

    // One light claimed, none present.
    header[12..16].copy_from_slice(&1u32.to_ne_bytes());
    assert!(decode_global_block(&header).is_none());
}
