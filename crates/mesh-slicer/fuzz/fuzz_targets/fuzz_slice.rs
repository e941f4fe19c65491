#![no_main]

use libfuzzer_sys::fuzz_target;
use mesh_slicer::{SliceParams, TriangleSoup, slice_soup};

fuzz_target!(|data: &[u8]| {
    // First byte picks the layer height, the rest are little-endian f32 coordinates
    let Some((&step, rest)) = data.split_first() else {
        return;
    };
    let coords: Vec<f64> = rest
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
        .take(9 * 64)
        .collect();
    let usable = coords.len() - coords.len() % 9;

    // Non-finite coordinates must be rejected, never panic
    let Ok(soup) = TriangleSoup::from_coords(&coords[..usable]) else {
        return;
    };

    // Keep the plane count bounded for wide soups
    let span = soup
        .bounds()
        .map(|(min, max)| max.z - min.z)
        .unwrap_or(0.0);
    let layer = (span / 64.0).max(0.05 + f64::from(step) / 64.0);

    let _ = slice_soup(&soup, &SliceParams::for_fdm(layer));
});
