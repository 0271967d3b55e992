//! Direct-arrival removal.
//!
//! The direct wave from source to receiver dominates the shallow part of a
//! trace and carries no reflectivity information. This mute zeroes every
//! sample within `t_width` of the straight-ray travel time from any source
//! to the receiver, using the background speed sampled at the source cell.

use tremor_core::{ShotPosition, VelocityModel};

/// Zero `data[it*ng + ig]` wherever `|it*dt - travel_time(s, g)| < t_width`
/// for some source `s`. `data` is a `(nt, ng)` trace block; positions are
/// in padded-grid index space.
///
/// Two widths are in use by callers: `1.5 / fm` when muting observed data
/// and `0.15 s` when muting line-search synthetics.
pub fn remove_direct_arrival(
    data: &mut [f32],
    nt: usize,
    dt: f32,
    sources: &ShotPosition,
    receivers: &ShotPosition,
    vel: &VelocityModel,
    t_width: f32,
) {
    if nt == 0 {
        return;
    }
    let grid = vel.grid();
    let ng = receivers.len();
    for (sz, sx) in sources.iter() {
        let speed = grid.physical(vel.data()[grid.index(sz, sx)]);
        for (ig, (gz, gx)) in receivers.iter().enumerate() {
            let dz = sz as f32 - gz as f32;
            let dx = sx as f32 - gx as f32;
            let travel = (dz * dz + dx * dx).sqrt() * grid.dx() / speed;
            let lo = ((travel - t_width) / dt).ceil().max(0.0) as usize;
            let hi = (((travel + t_width) / dt).floor().max(0.0) as usize).min(nt.saturating_sub(1));
            for it in lo..=hi {
                if (it as f32 * dt - travel).abs() < t_width {
                    data[it * ng + ig] = 0.0;
                }
            }
        }
    }
}
