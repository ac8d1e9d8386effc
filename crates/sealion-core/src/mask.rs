#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>, // row-major, len = w*h
}

impl BinaryMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Out-of-bounds reads are background.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.width + x] = v;
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Set every background pixel that is not 4-connected to the border.
    pub fn fill_holes(&mut self) {
        let (w, h) = (self.width, self.height);
        if w == 0 || h == 0 {
            return;
        }
        let mut outside = vec![false; w * h];
        let mut stack = Vec::new();
        let mut seed = |x: usize, y: usize, stack: &mut Vec<usize>| {
            let idx = y * w + x;
            if !self.data[idx] && !outside[idx] {
                outside[idx] = true;
                stack.push(idx);
            }
        };
        for x in 0..w {
            seed(x, 0, &mut stack);
            seed(x, h - 1, &mut stack);
        }
        for y in 0..h {
            seed(0, y, &mut stack);
            seed(w - 1, y, &mut stack);
        }
        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            if x > 0 {
                seed(x - 1, y, &mut stack);
            }
            if x + 1 < w {
                seed(x + 1, y, &mut stack);
            }
            if y > 0 {
                seed(x, y - 1, &mut stack);
            }
            if y + 1 < h {
                seed(x, y + 1, &mut stack);
            }
        }
        for (v, out) in self.data.iter_mut().zip(outside) {
            if !out {
                *v = true;
            }
        }
    }
}
