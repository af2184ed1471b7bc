use anyhow::Result;
use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::features::backend::{Descriptor, FeatureBackend, FeatureMatch, Keypoint};

/// FAST segment-test circle: 16 offsets at radius 3, clockwise from 12
/// o'clock.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Minimum contiguous arc length for a FAST-9 corner.
const FAST_ARC: usize = 9;

/// Intensity threshold for the segment test.
const FAST_THRESHOLD: i16 = 20;

/// Half-width of the descriptor sampling patch. Keypoints closer than this
/// to the image border are discarded before description.
const PATCH_RADIUS: i32 = 15;

/// Fixed seed for the descriptor sampling pattern. The pattern must be
/// identical for every image a single backend instance describes.
const PATTERN_SEED: u64 = 0x6f72_6269_7432;

/// CPU feature backend: FAST-9 corners with a BRIEF-style 256-bit binary
/// descriptor and brute-force Hamming cross-check matching.
pub struct CpuBackend {
    /// 256 precomputed point pairs inside the sampling patch.
    pattern: Vec<((i32, i32), (i32, i32))>,
}

impl CpuBackend {
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let pattern = (0..256)
            .map(|_| {
                let p = (
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                );
                let q = (
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                );
                (p, q)
            })
            .collect();
        Self { pattern }
    }

    fn describe(&self, image: &GrayImage, keypoint: &Keypoint) -> Descriptor {
        let cx = keypoint.x as i32;
        let cy = keypoint.y as i32;
        let mut bytes = [0u8; 32];
        for (bit, (p, q)) in self.pattern.iter().enumerate() {
            let a = luma(image, cx + p.0, cy + p.1);
            let b = luma(image, cx + q.0, cy + q.1);
            if a < b {
                bytes[bit / 8] |= 1 << (bit % 8);
            }
        }
        Descriptor(bytes)
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn detect_and_describe(
        &mut self,
        image: &GrayImage,
        max_features: usize,
    ) -> Result<(Vec<Keypoint>, Vec<Descriptor>)> {
        let mut corners = detect_corners(image);

        // Strongest first, capped at the feature ceiling.
        corners.sort_by(|a, b| b.score.cmp(&a.score));
        corners.truncate(max_features);

        let mut keypoints = Vec::with_capacity(corners.len());
        let mut descriptors = Vec::with_capacity(corners.len());
        for corner in &corners {
            let keypoint = Keypoint {
                x: corner.x as f32,
                y: corner.y as f32,
            };
            descriptors.push(self.describe(image, &keypoint));
            keypoints.push(keypoint);
        }
        Ok((keypoints, descriptors))
    }

    fn cross_checked_match(
        &mut self,
        query: &[Descriptor],
        train: &[Descriptor],
    ) -> Result<Vec<FeatureMatch>> {
        if query.is_empty() || train.is_empty() {
            return Ok(Vec::new());
        }

        let forward: Vec<Option<(usize, u32)>> =
            query.iter().map(|d| best_match(d, train)).collect();
        let backward: Vec<Option<(usize, u32)>> =
            train.iter().map(|d| best_match(d, query)).collect();

        let mut matches: Vec<FeatureMatch> = forward
            .iter()
            .enumerate()
            .filter_map(|(qi, hit)| {
                let (ti, distance) = (*hit)?;
                // Keep only mutual best matches.
                match backward[ti] {
                    Some((back, _)) if back == qi => Some(FeatureMatch {
                        query: qi,
                        train: ti,
                        distance,
                    }),
                    _ => None,
                }
            })
            .collect();

        matches.sort_by_key(|m| m.distance);
        Ok(matches)
    }
}

struct Corner {
    x: u32,
    y: u32,
    score: u32,
}

/// Single best match of `descriptor` within `candidates`.
fn best_match(descriptor: &Descriptor, candidates: &[Descriptor]) -> Option<(usize, u32)> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, descriptor.distance(c)))
        .min_by_key(|&(_, d)| d)
}

/// FAST-9 segment test over the interior of the image, followed by 3x3
/// non-maximum suppression on the corner score.
fn detect_corners(image: &GrayImage) -> Vec<Corner> {
    let (width, height) = image.dimensions();
    let margin = PATCH_RADIUS.max(3) as u32;
    if width <= 2 * margin || height <= 2 * margin {
        return Vec::new();
    }

    let mut scores = vec![0u32; (width * height) as usize];
    for y in margin..height - margin {
        for x in margin..width - margin {
            if let Some(score) = fast_score(image, x as i32, y as i32) {
                scores[(y * width + x) as usize] = score;
            }
        }
    }

    let mut corners = Vec::new();
    for y in margin..height - margin {
        for x in margin..width - margin {
            let score = scores[(y * width + x) as usize];
            if score == 0 {
                continue;
            }
            let mut is_max = true;
            'nms: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = (x as i32 + dx) as u32;
                    let ny = (y as i32 + dy) as u32;
                    if scores[(ny * width + nx) as usize] > score {
                        is_max = false;
                        break 'nms;
                    }
                }
            }
            if is_max {
                corners.push(Corner { x, y, score });
            }
        }
    }
    corners
}

/// Segment-test score at (x, y): the summed absolute intensity difference
/// over the circle when at least `FAST_ARC` contiguous circle pixels are all
/// brighter or all darker than the center by the threshold, else None.
fn fast_score(image: &GrayImage, x: i32, y: i32) -> Option<u32> {
    let center = luma(image, x, y);
    let mut brighter = [false; 16];
    let mut darker = [false; 16];
    let mut score = 0u32;
    for (i, (dx, dy)) in CIRCLE.iter().enumerate() {
        let value = luma(image, x + dx, y + dy);
        let diff = value - center;
        if diff > FAST_THRESHOLD {
            brighter[i] = true;
        } else if diff < -FAST_THRESHOLD {
            darker[i] = true;
        }
        score += diff.unsigned_abs() as u32;
    }
    if has_contiguous_arc(&brighter) || has_contiguous_arc(&darker) {
        Some(score)
    } else {
        None
    }
}

/// True when `flags` contains a wrapping run of at least `FAST_ARC` set
/// entries.
fn has_contiguous_arc(flags: &[bool; 16]) -> bool {
    let mut run = 0usize;
    // Doubling the circle handles wraparound runs.
    for i in 0..32 {
        if flags[i % 16] {
            run += 1;
            if run >= FAST_ARC {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn luma(image: &GrayImage, x: i32, y: i32) -> i16 {
    i16::from(image.get_pixel(x as u32, y as u32).0[0])
}
