/// A dense row-major 2D grid. Rows are indexed by `y`, columns by `x`.
///
/// Unlike a map projection grid this one never wraps: edges are hard and
/// out-of-range indices are a caller bug (`get`/`set` panic).
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap an existing row-major buffer. Returns `None` if the length does not
    /// match `width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "tilemap index ({}, {}) out of bounds for {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Whether the rectangle `[x, x+w) x [y, y+h)` lies fully inside the map.
    pub fn contains_rect(&self, x: usize, y: usize, w: usize, h: usize) -> bool {
        x.checked_add(w).is_some_and(|r| r <= self.width)
            && y.checked_add(h).is_some_and(|b| b <= self.height)
    }

    /// Copy out the rectangle `[x, x+w) x [y, y+h)`.
    ///
    /// The rectangle must be inside the map; check with `contains_rect` first.
    pub fn sub_map(&self, x: usize, y: usize, w: usize, h: usize) -> Tilemap<T> {
        assert!(self.contains_rect(x, y, w, h), "sub_map rectangle out of bounds");
        let mut data = Vec::with_capacity(w * h);
        for row in y..y + h {
            let start = row * self.width + x;
            data.extend_from_slice(&self.data[start..start + w]);
        }
        Tilemap { width: w, height: h, data }
    }

    /// Write `src` into this map with its top-left corner at `(x, y)`.
    ///
    /// `src` must fit; check with `contains_rect` first.
    pub fn blit(&mut self, x: usize, y: usize, src: &Tilemap<T>) {
        assert!(
            self.contains_rect(x, y, src.width, src.height),
            "blit rectangle out of bounds"
        );
        for row in 0..src.height {
            let dst_start = (y + row) * self.width + x;
            let src_start = row * src.width;
            self.data[dst_start..dst_start + src.width]
                .clone_from_slice(&src.data[src_start..src_start + src.width]);
        }
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }
}

impl Tilemap<f32> {
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| v as f64).sum();
        (sum / self.data.len() as f64) as f32
    }

    /// Sample using bilinear interpolation. Coordinates are clamped to the map edges.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let v00 = *self.get(x0, y0);
        let v10 = *self.get(x1, y0);
        let v01 = *self.get(x0, y1);
        let v11 = *self.get(x1, y1);

        let v0 = v00 * (1.0 - fx) + v10 * fx;
        let v1 = v01 * (1.0 - fx) + v11 * fx;
        v0 * (1.0 - fy) + v1 * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_map_and_blit() {
        let mut map = Tilemap::new_with(6, 5, 0.0f32);
        for (x, y, v) in map.iter_mut() {
            *v = (y * 10 + x) as f32;
        }

        let sub = map.sub_map(2, 1, 3, 2);
        assert_eq!(sub.width, 3);
        assert_eq!(sub.height, 2);
        assert_eq!(*sub.get(0, 0), 12.0);
        assert_eq!(*sub.get(2, 1), 24.0);

        let patch = Tilemap::new_with(2, 2, -1.0f32);
        map.blit(4, 3, &patch);
        assert_eq!(*map.get(4, 3), -1.0);
        assert_eq!(*map.get(5, 4), -1.0);
        assert_eq!(*map.get(3, 3), 33.0);
    }

    #[test]
    fn test_contains_rect_edges() {
        let map: Tilemap<f32> = Tilemap::new(513, 513);
        assert!(map.contains_rect(0, 0, 513, 513));
        assert!(map.contains_rect(500, 500, 13, 13));
        assert!(!map.contains_rect(500, 500, 14, 13));
        assert!(!map.contains_rect(usize::MAX, 0, 2, 1));
    }

    #[test]
    fn test_bilinear_clamps_at_edges() {
        let mut map = Tilemap::new_with(2, 2, 0.0f32);
        map.set(1, 0, 1.0);
        map.set(1, 1, 1.0);
        assert!((map.sample_bilinear(0.5, 0.5) - 0.5).abs() < 1e-6);
        assert!((map.sample_bilinear(-3.0, 0.0) - 0.0).abs() < 1e-6);
        assert!((map.sample_bilinear(9.0, 9.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_vec_rejects_bad_length() {
        assert!(Tilemap::from_vec(3, 3, vec![0.0f32; 8]).is_none());
        assert!(Tilemap::from_vec(3, 3, vec![0.0f32; 9]).is_some());
    }
}
