/// Park-Miller linear congruential generator used to shuffle the
/// permutation table. Any integer seed maps to a valid non-zero state.
struct Lcg {
    state: i64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        let mut state = (seed % 2147483647) as i64;
        if state <= 0 {
            state += 2147483646;
        }
        Self { state }
    }

    /// Next value normalized to [0, 1).
    fn next(&mut self) -> f64 {
        self.state = self.state * 16807 % 2147483647;
        (self.state - 1) as f64 / 2147483646.0
    }
}

pub struct SimplexNoise {
    // 256 entries duplicated to 512 to avoid index-wrap branching
    permutations: [u8; 512],
}

impl SimplexNoise {
    // Skew constants for 2D simplex noise
    const F2: f32 = 0.3660254037844387; // (sqrt(3) - 1) / 2
    const G2: f32 = 0.21132486540518713; // (3 - sqrt(3)) / 6

    // Skew constants for 3D simplex noise
    const F3: f32 = 1.0 / 3.0;
    const G3: f32 = 1.0 / 6.0;

    const GRADIENT_2D: [(f32, f32); 8] = [
        (1.0, 1.0),
        (-1.0, 1.0),
        (1.0, -1.0),
        (-1.0, -1.0),
        (1.0, 0.0),
        (-1.0, 0.0),
        (0.0, 1.0),
        (0.0, -1.0),
    ];

    // The 12 edge midpoints of a cube
    const GRADIENT_3D: [(f32, f32, f32); 12] = [
        (1.0, 1.0, 0.0),
        (-1.0, 1.0, 0.0),
        (1.0, -1.0, 0.0),
        (-1.0, -1.0, 0.0),
        (1.0, 0.0, 1.0),
        (-1.0, 0.0, 1.0),
        (1.0, 0.0, -1.0),
        (-1.0, 0.0, -1.0),
        (0.0, 1.0, 1.0),
        (0.0, -1.0, 1.0),
        (0.0, 1.0, -1.0),
        (0.0, -1.0, -1.0),
    ];

    pub fn new(seed: u64) -> Self {
        let mut table = std::array::from_fn::<u8, 256, _>(|i| i as u8);

        // Fisher-Yates driven by the seeded generator
        let mut rng = Lcg::new(seed);
        for i in (1..256usize).rev() {
            let j = (rng.next() * (i + 1) as f64) as usize;
            table.swap(i, j);
        }

        let mut permutations = [0u8; 512];
        for i in 0..512 {
            permutations[i] = table[i % 256];
        }

        Self { permutations }
    }

    pub fn noise2d(&self, x: f32, y: f32) -> f32 {
        let s = (x + y) * Self::F2;
        let i = (x + s).floor();
        let j = (y + s).floor();

        let t = (i + j) * Self::G2;
        let x0 = x - (i - t);
        let y0 = y - (j - t);

        // which simplex triangle the point falls in
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f32 + Self::G2;
        let y1 = y0 - j1 as f32 + Self::G2;

        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i as i32 & 255) as usize;
        let jj = (j as i32 & 255) as usize;

        let gi0 = self.permutations[ii + self.permutations[jj] as usize] as usize % 8;
        let gi1 = self.permutations[ii + i1 + self.permutations[jj + j1] as usize] as usize % 8;
        let gi2 = self.permutations[ii + 1 + self.permutations[jj + 1] as usize] as usize % 8;

        let n0 = Self::corner2d(gi0, x0, y0);
        let n1 = Self::corner2d(gi1, x1, y1);
        let n2 = Self::corner2d(gi2, x2, y2);

        70.0 * (n0 + n1 + n2)
    }

    pub fn noise3d(&self, x: f32, y: f32, z: f32) -> f32 {
        let s = (x + y + z) * Self::F3;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();

        let t = (i + j + k) * Self::G3;
        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);

        // coordinate-ordering comparisons pick the traversal order of the
        // simplex tetrahedron corners
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - i1 as f32 + Self::G3;
        let y1 = y0 - j1 as f32 + Self::G3;
        let z1 = z0 - k1 as f32 + Self::G3;

        let x2 = x0 - i2 as f32 + 2.0 * Self::G3;
        let y2 = y0 - j2 as f32 + 2.0 * Self::G3;
        let z2 = z0 - k2 as f32 + 2.0 * Self::G3;

        let x3 = x0 - 1.0 + 3.0 * Self::G3;
        let y3 = y0 - 1.0 + 3.0 * Self::G3;
        let z3 = z0 - 1.0 + 3.0 * Self::G3;

        let ii = (i as i32 & 255) as usize;
        let jj = (j as i32 & 255) as usize;
        let kk = (k as i32 & 255) as usize;

        let hash = |di: usize, dj: usize, dk: usize| -> usize {
            let p = &self.permutations;
            p[ii + di + p[jj + dj + p[kk + dk] as usize] as usize] as usize % 12
        };

        let n0 = Self::corner3d(hash(0, 0, 0), x0, y0, z0);
        let n1 = Self::corner3d(hash(i1, j1, k1), x1, y1, z1);
        let n2 = Self::corner3d(hash(i2, j2, k2), x2, y2, z2);
        let n3 = Self::corner3d(hash(1, 1, 1), x3, y3, z3);

        32.0 * (n0 + n1 + n2 + n3)
    }

    // radial falloff raised to the 4th power
    fn corner2d(gi: usize, x: f32, y: f32) -> f32 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            return 0.0;
        }
        let grad = Self::GRADIENT_2D[gi];
        let t_sq = t * t;
        t_sq * t_sq * (grad.0 * x + grad.1 * y)
    }

    fn corner3d(gi: usize, x: f32, y: f32, z: f32) -> f32 {
        let t = 0.6 - x * x - y * y - z * z;
        if t < 0.0 {
            return 0.0;
        }
        let grad = Self::GRADIENT_3D[gi];
        let t_sq = t * t;
        t_sq * t_sq * (grad.0 * x + grad.1 * y + grad.2 * z)
    }
}
