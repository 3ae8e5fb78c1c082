//! Chunked terrain height grid and the divine interventions that reshape it.
//!
//! The grid covers `grid_size` tiles per edge, so `(grid_size + 1)^2` height
//! vertices. Vertices are grouped into square chunks of `chunk_tiles` tiles;
//! each chunk stores its own `(chunk_tiles + 1)^2` heights, which means
//! adjacent chunks duplicate the vertices along their shared edge. Every
//! write goes through to all sharing chunks, so the duplicates agree at all
//! times and a renderer can rebuild any dirty chunk in isolation.
//!
//! All mutation entry points restore the slope invariant before returning:
//! the heights of 4-adjacent vertices never differ by more than one step.
//! Out-of-range target heights clamp to `[water_level, MAX_HEIGHT]` instead
//! of failing.

use std::collections::{BTreeSet, VecDeque};

use godhand_core::{ChunkIndex, GridPoint, GridRect, MAX_HEIGHT};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Terrain mutations accumulated since the last collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainChange {
    /// Bounding box of every vertex whose height changed.
    pub region: GridRect,
    /// Chunks whose stored heights changed, in ascending index order.
    pub chunks: Vec<ChunkIndex>,
}

struct Chunk {
    heights: Vec<i32>,
}

/// Authoritative height grid for one match.
pub struct Terrain {
    grid_size: u32,
    chunk_tiles: u32,
    chunks_per_axis: u32,
    water_level: i32,
    chunks: Vec<Chunk>,
    dirty: BTreeSet<ChunkIndex>,
    modified: Option<GridRect>,
}

impl Terrain {
    /// Creates a flat grid one step above the initial water level.
    ///
    /// `grid_size` is rounded up to a whole number of chunks.
    #[must_use]
    pub fn new(grid_size: u32, chunk_tiles: u32, water_level: i32) -> Self {
        let chunk_tiles = chunk_tiles.max(1);
        let chunks_per_axis = grid_size.max(1).div_ceil(chunk_tiles);
        let grid_size = chunks_per_axis * chunk_tiles;
        let water_level = water_level.clamp(0, MAX_HEIGHT - 1);
        let vertex_count = ((chunk_tiles + 1) * (chunk_tiles + 1)) as usize;
        let chunks = (0..chunks_per_axis * chunks_per_axis)
            .map(|_| Chunk {
                heights: vec![water_level + 1; vertex_count],
            })
            .collect();
        Self {
            grid_size,
            chunk_tiles,
            chunks_per_axis,
            water_level,
            chunks,
            dirty: BTreeSet::new(),
            modified: None,
        }
    }

    /// Number of tiles along each edge of the grid.
    #[must_use]
    pub const fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Number of tiles along each edge of a chunk.
    #[must_use]
    pub const fn chunk_tiles(&self) -> u32 {
        self.chunk_tiles
    }

    /// Number of chunks along each axis.
    #[must_use]
    pub const fn chunks_per_axis(&self) -> u32 {
        self.chunks_per_axis
    }

    /// Current global water level in height steps.
    #[must_use]
    pub const fn water_level(&self) -> i32 {
        self.water_level
    }

    /// Reports whether the vertex lies on the grid.
    #[must_use]
    pub fn is_in_bounds(&self, point: GridPoint) -> bool {
        let limit = self.grid_size as i32;
        point.x() >= 0 && point.x() <= limit && point.z() >= 0 && point.z() <= limit
    }

    /// Height of the vertex, or the water level for out-of-bounds lookups.
    ///
    /// The boundary value keeps neighbor scans near the grid edge total
    /// without a separate bounds branch at every call site.
    #[must_use]
    pub fn height(&self, point: GridPoint) -> i32 {
        if !self.is_in_bounds(point) {
            return self.water_level;
        }
        let (x, z) = (point.x() as u32, point.z() as u32);
        let cx = (x / self.chunk_tiles).min(self.chunks_per_axis - 1);
        let cz = (z / self.chunk_tiles).min(self.chunks_per_axis - 1);
        let lx = x - cx * self.chunk_tiles;
        let lz = z - cz * self.chunk_tiles;
        self.chunks[(cz * self.chunks_per_axis + cx) as usize].heights
            [(lz * (self.chunk_tiles + 1) + lx) as usize]
    }

    /// Height stored inside a specific chunk at chunk-local coordinates.
    #[must_use]
    pub fn chunk_vertex_height(&self, chunk: ChunkIndex, lx: u32, lz: u32) -> i32 {
        self.chunks[(chunk.cz() * self.chunks_per_axis + chunk.cx()) as usize].heights
            [(lz * (self.chunk_tiles + 1) + lx) as usize]
    }

    /// Reports whether the vertex and all eight neighbors sit at or below water.
    ///
    /// A shoreline vertex at water level with dry neighbors still counts as
    /// walkable; only fully surrounded vertices are lethal.
    #[must_use]
    pub fn is_underwater(&self, point: GridPoint) -> bool {
        if self.height(point) > self.water_level {
            return false;
        }
        for dz in -1..=1 {
            for dx in -1..=1 {
                if self.height(point.offset(dx, dz)) > self.water_level {
                    return false;
                }
            }
        }
        true
    }

    /// Reports whether every vertex of the rectangle is on the grid, dry,
    /// and at one common height.
    #[must_use]
    pub fn is_flat_above_water(&self, rect: GridRect) -> bool {
        if !self.is_in_bounds(rect.min()) || !self.is_in_bounds(rect.max()) {
            return false;
        }
        let level = self.height(rect.min());
        level > self.water_level && rect.iter().all(|point| self.height(point) == level)
    }

    /// Raises or lowers a single vertex by one step, then relaxes outward.
    pub fn mold(&mut self, point: GridPoint, raise: bool) {
        let delta = if raise { 1 } else { -1 };
        self.set_height(point, self.height(point) + delta);
    }

    /// Sets a single vertex to an explicit height, then relaxes outward.
    ///
    /// The target clamps to `[water_level, MAX_HEIGHT]`; when the clamped
    /// value equals the current height the grid is left untouched.
    pub fn set_height(&mut self, point: GridPoint, height: i32) {
        if !self.is_in_bounds(point) {
            return;
        }
        self.write_height(point, height);
        self.relax(vec![point]);
    }

    /// Flattens a Chebyshev square to water level plus random rubble.
    ///
    /// Each in-bounds vertex of the square drops to the water level plus
    /// zero or one step drawn from the quake stream, then the surrounding
    /// terrain relaxes outward until the slope invariant holds again.
    pub fn cause_earthquake(&mut self, center: GridPoint, radius: u32, rng: &mut ChaCha8Rng) {
        let rect = GridRect::around(center, radius);
        let mut seeds = Vec::new();
        for point in rect.iter() {
            if !self.is_in_bounds(point) {
                continue;
            }
            let rubble: i32 = rng.gen_range(0..=1);
            self.write_height(point, self.water_level + rubble);
            seeds.push(point);
        }
        self.relax(seeds);
    }

    /// Raises a cone of rock centered on the target vertex.
    ///
    /// The peak rises `radius + 1` steps above the highest vertex on the
    /// cone's rim, and each ring outward from the peak steps down by one, so
    /// the new mountain always clears the surrounding terrain.
    pub fn cause_volcano(&mut self, center: GridPoint, radius: u32) {
        let rect = GridRect::around(center, radius);
        let rim_base = rect
            .iter()
            .filter(|point| point.chebyshev_distance(center) == radius)
            .map(|point| self.height(point))
            .max()
            .unwrap_or(self.water_level);
        let peak = rim_base + radius as i32 + 1;
        let mut seeds = Vec::new();
        for point in rect.iter() {
            if !self.is_in_bounds(point) {
                continue;
            }
            let ring = point.chebyshev_distance(center) as i32;
            self.write_height(point, peak - ring);
            seeds.push(point);
        }
        self.relax(seeds);
    }

    /// Raises the global water level by one step.
    ///
    /// Existing heights below the new level clamp up to it, so the whole
    /// grid stays within the valid height range and every chunk is marked
    /// dirty.
    pub fn raise_water_level(&mut self) {
        if self.water_level >= MAX_HEIGHT {
            return;
        }
        self.water_level += 1;
        let limit = self.grid_size as i32;
        for z in 0..=limit {
            for x in 0..=limit {
                let point = GridPoint::new(x, z);
                if self.height(point) < self.water_level {
                    self.write_height(point, self.water_level);
                }
            }
        }
        for cz in 0..self.chunks_per_axis {
            for cx in 0..self.chunks_per_axis {
                let _ = self.dirty.insert(ChunkIndex::new(cx, cz));
            }
        }
        self.extend_modified(GridRect::from_points(
            GridPoint::new(0, 0),
            GridPoint::new(limit, limit),
        ));
    }

    /// Collects the mutations accumulated since the previous call.
    pub fn take_changes(&mut self) -> Option<TerrainChange> {
        let region = self.modified.take()?;
        let chunks = std::mem::take(&mut self.dirty).into_iter().collect();
        Some(TerrainChange { region, chunks })
    }

    /// Restores the slope invariant by propagating outward from the seeds.
    ///
    /// Seeds must be visited in a deterministic order; callers pass them in
    /// row-major order so relaxation is replay-stable.
    fn relax(&mut self, seeds: Vec<GridPoint>) {
        let mut queue: VecDeque<GridPoint> = seeds.into();
        while let Some(point) = queue.pop_front() {
            let level = self.height(point);
            for (dx, dz) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
                let neighbor = point.offset(dx, dz);
                if !self.is_in_bounds(neighbor) {
                    continue;
                }
                let neighbor_level = self.height(neighbor);
                if neighbor_level > level + 1 {
                    self.write_height(neighbor, level + 1);
                    queue.push_back(neighbor);
                } else if neighbor_level < level - 1 {
                    self.write_height(neighbor, level - 1);
                    queue.push_back(neighbor);
                }
            }
        }
    }

    fn write_height(&mut self, point: GridPoint, value: i32) {
        let clamped = value.clamp(self.water_level, MAX_HEIGHT);
        if !self.is_in_bounds(point) || self.height(point) == clamped {
            return;
        }
        let (x, z) = (point.x() as u32, point.z() as u32);
        for cx in self.sharing_chunk_coords(x) {
            for cz in self.sharing_chunk_coords(z) {
                let lx = x - cx * self.chunk_tiles;
                let lz = z - cz * self.chunk_tiles;
                self.chunks[(cz * self.chunks_per_axis + cx) as usize].heights
                    [(lz * (self.chunk_tiles + 1) + lx) as usize] = clamped;
                let _ = self.dirty.insert(ChunkIndex::new(cx, cz));
            }
        }
        self.extend_modified(GridRect::from_points(point, point));
    }

    /// Chunk coordinates along one axis that store the vertex at `coord`.
    ///
    /// Interior vertices live in one chunk; vertices on a chunk seam live in
    /// two per axis.
    fn sharing_chunk_coords(&self, coord: u32) -> Vec<u32> {
        let mut coords = Vec::with_capacity(2);
        let primary = coord / self.chunk_tiles;
        if primary < self.chunks_per_axis {
            coords.push(primary);
        }
        if coord > 0 && coord % self.chunk_tiles == 0 {
            coords.push(primary - 1);
        }
        coords
    }

    fn extend_modified(&mut self, rect: GridRect) {
        self.modified = Some(match self.modified {
            Some(existing) => existing.union(rect),
            None => rect,
        });
    }
}
