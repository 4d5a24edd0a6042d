//! Island packing into the unit UV square using shelf (row) packing.

use glam::Vec2;

use crate::math::Rect;

const SCALE_SEARCH_STEPS: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct UvIsland {
    pub faces: Vec<usize>,
    /// Corner UVs, parallel to `faces`.
    pub corners: Vec<[Vec2; 3]>,
}

impl UvIsland {
    pub fn new(faces: Vec<usize>, corners: Vec<[Vec2; 3]>) -> Self {
        Self { faces, corners }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.corners.iter().flatten().copied())
            .unwrap_or(Rect::new(Vec2::ZERO, Vec2::ZERO))
    }

    fn map(&mut self, f: impl Fn(Vec2) -> Vec2) {
        for corner in self.corners.iter_mut().flatten() {
            *corner = f(*corner);
        }
    }

    fn normalize(&mut self) {
        let min = self.bounds().min;
        self.map(|uv| uv - min);
    }

    /// Quarter turn, keeping the island in the positive quadrant.
    fn rotate_quarter(&mut self) {
        self.map(|uv| Vec2::new(-uv.y, uv.x));
        self.normalize();
    }
}

/// Packs islands into [0, 1]² with at least `margin` between islands and
/// around the border, scaling all islands uniformly as large as they fit.
///
/// Returns false, leaving the islands untouched, when the margin alone does
/// not leave room for every island.
pub fn pack_islands(islands: &mut [UvIsland], margin: f32, rotate: bool) -> bool {
    if islands.is_empty() {
        return true;
    }

    let margin = margin.max(0.0);
    let mut working = islands.to_vec();
    for island in &mut working {
        island.normalize();
        let size = island.bounds().size();
        if rotate && size.y > size.x {
            island.rotate_quarter();
        }
    }

    let sizes = working
        .iter()
        .map(|island| island.bounds().size())
        .collect::<Vec<_>>();

    if shelf_pack(&sizes, 0.0, margin).is_none() {
        return false;
    }

    let largest = sizes
        .iter()
        .map(|size| size.max_element())
        .fold(0.0f32, f32::max);
    if largest <= f32::EPSILON {
        // Only degenerate islands: park them along the margin.
        let Some(offsets) = shelf_pack(&sizes, 0.0, margin) else {
            return false;
        };
        for (island, offset) in working.iter_mut().zip(offsets) {
            island.map(|uv| uv + offset);
        }
        islands.clone_from_slice(&working);
        return true;
    }

    // Largest uniform scale that still fits.
    let mut low = 0.0f32;
    let mut high = 1.0 / largest;
    for _ in 0..SCALE_SEARCH_STEPS {
        let mid = (low + high) * 0.5;
        if shelf_pack(&sizes, mid, margin).is_some() {
            low = mid;
        } else {
            high = mid;
        }
    }

    let scale = low;
    let Some(offsets) = shelf_pack(&sizes, scale, margin) else {
        return false;
    };

    for (island, offset) in working.iter_mut().zip(offsets) {
        island.map(|uv| uv * scale + offset);
    }
    islands.clone_from_slice(&working);
    true
}

/// Row packing of scaled rectangles, tallest first. Returns the offset of
/// each rectangle, or `None` if they do not fit in the unit square.
fn shelf_pack(sizes: &[Vec2], scale: f32, margin: f32) -> Option<Vec<Vec2>> {
    let mut order = (0..sizes.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| sizes[b].y.total_cmp(&sizes[a].y));

    let mut offsets = vec![Vec2::ZERO; sizes.len()];
    let mut current_x = margin;
    let mut current_y = margin;
    let mut row_height = 0.0f32;

    for index in order {
        let size = sizes[index] * scale;

        if size.x + 2.0 * margin > 1.0 {
            return None;
        }

        // Check if we need to start a new row
        if current_x + size.x + margin > 1.0 {
            current_x = margin;
            current_y += row_height + margin;
            row_height = 0.0;
        }

        if current_y + size.y + margin > 1.0 {
            return None;
        }

        offsets[index] = Vec2::new(current_x, current_y);
        current_x += size.x + margin;
        row_height = row_height.max(size.y);
    }

    Some(offsets)
}
