use anyhow::Result;
use image_hasher::{HashAlg, HasherConfig, ImageHash};

pub fn compute_phash(image_bytes: &[u8]) -> Result<String> {
    let img = image::load_from_memory(image_bytes)?;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(8, 8)
        .to_hasher();

    let hash = hasher.hash_image(&img);
    Ok(hash.to_base64())
}

pub fn compute_hamming_distance(lhs: &str, rhs: &str) -> u32 {
    let Ok(h1) = ImageHash::<Vec<u8>>::from_base64(lhs) else {
        return u32::MAX;
    };
    let Ok(h2) = ImageHash::<Vec<u8>>::from_base64(rhs) else {
        return u32::MAX;
    };
    h1.dist(&h2)
}

/// Remembers the previous screen's hash to spot a list that stopped moving.
#[derive(Debug, Default)]
pub struct ScreenChangeDetector {
    max_unchanged_distance: u32,
    last_phash: Option<String>,
}

impl ScreenChangeDetector {
    pub fn new(max_unchanged_distance: u32) -> Self {
        Self {
            max_unchanged_distance,
            last_phash: None,
        }
    }

    /// True when `image_bytes` looks the same as the previous screen.
    /// Images that cannot be hashed always count as changed.
    pub fn is_unchanged(&mut self, image_bytes: &[u8]) -> bool {
        let Ok(phash) = compute_phash(image_bytes) else {
            self.last_phash = None;
            return false;
        };

        let unchanged = self
            .last_phash
            .as_deref()
            .map(|prev| compute_hamming_distance(&phash, prev) <= self.max_unchanged_distance)
            .unwrap_or(false);

        self.last_phash = Some(phash);
        unchanged
    }
}
